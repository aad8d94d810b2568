use tracing_subscriber::EnvFilter;

/// Default filter directives: the requested level for our own crates,
/// with the chatty transport crates capped at warn so per-item sync
/// logs stay readable.
fn default_directives(log_level: &str) -> String {
    format!("{log_level},tokio_postgres=warn,hyper=warn,reqwest=warn")
}

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence when set; otherwise the `--log-level`
/// flag drives the default directives.
pub fn init(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cap_transport_crates() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("tokio_postgres=warn"));
        assert!(directives.contains("hyper=warn"));
        assert!(directives.contains("reqwest=warn"));
    }
}
