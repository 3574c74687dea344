//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level unless `debug` is set.
pub fn init_logging(config: &LoggingConfig, debug: bool) -> Result<()> {
    let env_filter = if debug {
        EnvFilter::new(
            "endorsement_api=debug,endorsement_core=debug,endorsement_storage=debug,tower_http=debug,sqlx=debug",
        )
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()?;
    }

    Ok(())
}

fn default_directives(level: &str) -> String {
    format!(
        "endorsement_api={level},endorsement_core={level},endorsement_storage={level},tower_http={level}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_workspace_crates() {
        let directives = default_directives("warn");
        assert!(directives.contains("endorsement_core=warn"));
        assert!(directives.contains("endorsement_storage=warn"));
        EnvFilter::new(directives);
    }
}
