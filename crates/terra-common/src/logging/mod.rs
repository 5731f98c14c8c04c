//! Logging initialization shared by the Terra binaries
//!
//! Filter selection follows a fixed priority:
//! 1. CLI flags (`-v/-q`)
//! 2. `RUST_LOG`
//! 3. The caller's default filter

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resolve the filter for the given verbosity flags and default directive.
pub fn resolve_filter<L: LogLevel>(
    verbosity: &Verbosity<L>,
    default_filter: &str,
) -> Result<EnvFilter> {
    if let Some(level) = verbosity.log_level() {
        return Ok(EnvFilter::try_new(level.to_string())?);
    }

    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
}

/// Install the global subscriber.
///
/// # Example
///
/// ```no_run
/// use clap_verbosity_flag::{InfoLevel, Verbosity};
///
/// let verbosity = Verbosity::<InfoLevel>::default();
/// terra_common::logging::init_logging(&verbosity, "terra_auth=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = resolve_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Initialize logging only when the user asked for it.
///
/// The `terra` CLI prints tokens and status on stdout, so logging stays off
/// unless `-v` or `RUST_LOG` is given. Returns whether a subscriber was
/// installed.
pub fn init_cli_logging<L: LogLevel>(
    verbosity: &Verbosity<L>,
    default_filter: &str,
) -> Result<bool> {
    if verbosity.log_level().is_some() || std::env::var("RUST_LOG").is_ok() {
        init_logging(verbosity, default_filter)?;
        Ok(true)
    } else {
        Ok(false)
    }
}
