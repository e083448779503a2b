//! Shared test setup: tracing subscriber and application fixtures

use std::io::Cursor;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::Application;
use crate::config::AppConfig;
use crate::infrastructure::CapturedOutput;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clidispatch=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else if let Err(e) = subscriber.try_init() {
        eprintln!("Error: Failed to set up logging: {}", e);
    }
}

/// Config for tests: errors are returned, help stays registered but is not
/// the default.
pub fn test_config() -> AppConfig {
    AppConfig {
        raise_errors: true,
        help_as_default: false,
        ..AppConfig::named("test")
    }
}

/// Application writing into a capture buffer, reading `input`.
pub fn captured_app(config: AppConfig, input: &str) -> (Application, CapturedOutput) {
    let output = CapturedOutput::new();
    let app = Application::new(config)
        .with_input(Cursor::new(input.to_string().into_bytes()))
        .with_output(output.clone());
    (app, output)
}
