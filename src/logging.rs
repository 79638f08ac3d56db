use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fmt;
use std::io;
use tracing::field::Field;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::{Writer, debug_fn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Where and how verbosely to log.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Directory for daily rotating log files; console only when `None`
    pub log_dir: Option<Utf8PathBuf>,

    /// Prefix for log file names (e.g., "unpack-mods")
    pub prefix: String,

    /// Use debug level instead of info
    pub debug: bool,
}

/// Setup console logging on stderr, plus a rotating log file when
/// `options.log_dir` is set.
///
/// Console lines carry only the message, which is already styled by
/// [`crate::term::TermStyle`]. The file copy has ANSI codes stripped and
/// keeps timestamps, levels and targets.
///
/// # Returns
/// The file appender guard, which must be held for the duration of the
/// program so buffered lines are flushed.
pub fn setup_logging(options: &LoggingOptions) -> Result<Option<WorkerGuard>> {
    let level = if options.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .fmt_fields(debug_fn(format_field))
        .with_writer(io::stderr);

    let (file_layer, guard) = match &options.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory: {}", log_dir))?;

            let file_appender = rolling::daily(log_dir, &options.prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .fmt_fields(debug_fn(format_field))
                .with_writer(move || StripAnsiWriter(non_blocking.clone()));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install the global tracing subscriber")?;

    tracing::debug!(
        "Logging initialized: dir={:?}, prefix={}, debug={}",
        options.log_dir,
        options.prefix,
        options.debug
    );

    Ok(guard)
}

/// Render an error with all of its sources, joined by `": "`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// Writes messages verbatim so styling escapes reach the terminal intact.
fn format_field(writer: &mut Writer<'_>, field: &Field, value: &dyn fmt::Debug) -> fmt::Result {
    if field.name() == "message" {
        write!(writer, "{:?}", value)
    } else {
        write!(writer, " {}={:?}", field.name(), value)
    }
}

/// Removes ANSI escape sequences before handing lines to the file appender.
struct StripAnsiWriter<W>(W);

impl<W: io::Write> io::Write for StripAnsiWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.0.write_all(console::strip_ansi_codes(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
