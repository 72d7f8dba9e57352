use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Log verbosity selected from the `-v`/`-q` command line flags.
///
/// Variants are declared from least to most verbose so the derived ordering
/// can be used for threshold checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Debug,
    Trace,
}

const LOG_TARGETS: [&str; 2] = ["crypto_inventory_core", "crypto_inventory"];

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, 2) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directives for our own targets; tree-sitter and other
    /// dependencies stay silent unless `RUST_LOG` asks for them.
    fn directives(self) -> String {
        let level = self.level();
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Installs the global subscriber. Logs go to stderr so that the inventory
/// written to stdout stays machine readable.
///
/// `RUST_LOG` takes precedence over the flag-derived filter. Calling this
/// more than once keeps the first subscriber.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));
    let detailed = verbosity >= Verbosity::Debug;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(verbosity == Verbosity::Trace)
        .with_file(detailed)
        .with_line_number(detailed)
        .compact();

    let installed = match verbosity {
        Verbosity::Quiet => builder.with_writer(std::io::sink).try_init(),
        Verbosity::Normal => builder.without_time().with_writer(std::io::stderr).try_init(),
        _ => builder.with_writer(std::io::stderr).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
