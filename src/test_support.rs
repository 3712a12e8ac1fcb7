// src/test_support.rs
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub fn init_test_logging() {
    // Initialize tracing for tests, if not already done globally
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,source_compute=debug")),
        )
        .with_test_writer() // Redirect logs to the test output
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber); // Use `let _ =` to ignore errors if already set
}

pub fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}
