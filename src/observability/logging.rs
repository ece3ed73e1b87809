//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick default filters per deployment mode
//!
//! # Design Decisions
//! - `RUST_LOG` always wins over configuration
//! - Development also enables tower-http request traces

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Environment, ObservabilityConfig};

/// Default filter directives when `RUST_LOG` is not set.
pub fn default_directives(config: &ObservabilityConfig, environment: Environment) -> String {
    match environment {
        Environment::Development => format!("relay_proxy={},tower_http=debug", config.log_level),
        Environment::Production | Environment::Test => format!("relay_proxy={}", config.log_level),
    }
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig, environment: Environment) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(config, environment).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
