use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "cascade_builder=info,warn";
pub const VERBOSE_FILTER: &str = "cascade_builder=debug,info";

pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `verbose`.
pub fn init_tracing(verbose: bool) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()
        .map_err(|err| format!("failed to initialise logging: {err}"))
}
