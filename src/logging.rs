pub mod logging {
    use tracing_subscriber::EnvFilter;

    /// `RUST_LOG` wins; otherwise info, or debug with `--verbose`.
    pub fn init(verbose: bool) {
        let default_level = if verbose { "debug" } else { "info" };
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
        tracing::debug!(verbose, "logging initialized");
    }
}
