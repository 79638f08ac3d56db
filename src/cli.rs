//! Startup shared by the binaries: locate the tool home, load settings,
//! install logging and resolve paths.

use crate::config::{ConfigManager, HOME_ENV};
use crate::logging::{self, LoggingOptions};
use crate::models::ModPaths;
use crate::term::TermStyle;
use anyhow::Result;
use camino::Utf8PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

/// Options every binary accepts.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CommonArgs {
    /// Tool home holding env.yaml, raw_mods/ and valmods.yaml [default: directory of the executable]
    #[arg(long, env = HOME_ENV, value_name = "DIR")]
    pub home: Option<Utf8PathBuf>,

    /// Log at debug level
    #[arg(long)]
    pub debug: bool,
}

/// Everything a binary needs after startup.
pub struct Session {
    pub paths: ModPaths,
    pub style: TermStyle,
    _guard: Option<WorkerGuard>,
}

impl CommonArgs {
    /// Run the startup sequence. `log_prefix` names this binary's log files.
    ///
    /// A broken settings file still gets console logging installed before
    /// its error is returned.
    pub fn bootstrap(&self, log_prefix: &str) -> Result<Session> {
        let config = ConfigManager::discover(self.home.clone())?;
        let settings = config.load_settings();

        let guard = logging::setup_logging(&LoggingOptions {
            log_dir: settings.as_ref().ok().and_then(|s| s.log_dir.clone()),
            prefix: log_prefix.to_string(),
            debug: self.debug,
        })?;
        tracing::debug!("Starting {} v{} from {}", crate::APP_NAME, crate::VERSION, config.tool_home());

        let settings = settings?;
        let paths = config.resolve_paths(&settings)?;
        tracing::debug!("Resolved paths: {:?}", paths);

        Ok(Session {
            paths,
            style: TermStyle::detect(),
            _guard: guard,
        })
    }
}
