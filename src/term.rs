// Terminal styling helpers
//
// Produces colorized status strings for log narration. Whether colors are used
// is decided once at startup and carried around as a plain `TermStyle` value.

use console::Style;
use std::io::IsTerminal;

/// Environment variable that disables colored output when set (any value).
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Named terminal colors understood by [`TermStyle::stylize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Cyan,
    Grey,
}

impl Color {
    fn apply(self, style: Style) -> Style {
        match self {
            Color::Red => style.red(),
            Color::Green => style.green(),
            Color::Yellow => style.yellow(),
            Color::Cyan => style.cyan(),
            Color::Grey => style.black().bright(),
        }
    }
}

/// Color capability of the output, computed once per process.
///
/// When disabled every helper returns its input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStyle {
    enabled: bool,
}

impl TermStyle {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Styling that never emits escape sequences.
    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Detect capability from the environment: colors are used only when
    /// `NO_COLOR` is unset and stderr (where log narration goes) is a terminal.
    pub fn detect() -> Self {
        let no_color = std::env::var_os(NO_COLOR_ENV).is_some();
        Self::from_capabilities(no_color, std::io::stderr().is_terminal())
    }

    pub fn from_capabilities(no_color: bool, is_terminal: bool) -> Self {
        Self::new(!no_color && is_terminal)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wrap `text` in the escape sequences for `color` (and bold weight).
    ///
    /// Without a color the text is returned as-is, even if `bold` is set.
    pub fn stylize(&self, text: &str, color: Option<Color>, bold: bool) -> String {
        let Some(color) = color.filter(|_| self.enabled) else {
            return text.to_string();
        };

        let mut style = color.apply(Style::new().force_styling(true));
        if bold {
            style = style.bold();
        }
        style.apply_to(text).to_string()
    }

    pub fn header(&self, text: &str) -> String {
        self.stylize(text, Some(Color::Cyan), true)
    }

    pub fn action(&self, text: &str) -> String {
        self.stylize(text, Some(Color::Green), false)
    }

    pub fn note(&self, text: &str) -> String {
        self.stylize(text, Some(Color::Yellow), false)
    }

    pub fn warn(&self, text: &str) -> String {
        self.stylize(text, Some(Color::Red), false)
    }

    pub fn meta(&self, text: &str) -> String {
        self.stylize(text, Some(Color::Grey), false)
    }
}

impl Default for TermStyle {
    fn default() -> Self {
        Self::detect()
    }
}
