use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "monwatch=info";

/// Builds the event filter: `RUST_LOG` first, then the configured filter,
/// then the `monwatch=info` default.
pub fn env_filter(configured: Option<&str>) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let filter = match configured {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::default().add_directive(DEFAULT_DIRECTIVE.parse()?),
    };
    Ok(filter)
}

/// Installs the global fmt subscriber. Call once, before anything logs.
pub fn init(configured: Option<&str>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(configured)?)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_directives_are_reported() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(env_filter(Some("monwatch=debug,monwatch_alert=trace")).is_ok());
        assert!(env_filter(Some("monwatch=loudest")).is_err());
    }
}
