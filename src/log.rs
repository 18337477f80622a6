use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "TASKBOARD_LOG";

/// Pick the filter directive: `TASKBOARD_LOG` wins, then `-v` flags, then the
/// configured level.
pub fn filter_directive(env_value: Option<&str>, verbose: u8, config_level: &str) -> String {
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return value.to_string();
    }
    match verbose {
        0 => config_level.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays
/// parseable under `--json`.
pub fn setup(verbose: u8, config_level: &str) {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env_value.as_deref(), verbose, config_level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
