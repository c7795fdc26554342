use anyhow::Result;
use prometheus::Registry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;
use crate::metrics;

const DEFAULT_FILTER: &str = "api=debug,tower_http=info";

pub struct Observability {
    pub registry: Registry,
}

impl Observability {
    /// Installs the global subscriber and builds the metrics registry.
    ///
    /// Production logs are JSON lines; development gets the human formatter.
    /// `RUST_LOG` overrides the default filter in both.
    pub fn init(environment: Environment) -> Result<Self> {
        let registry = build_registry()?;

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

        if environment.is_production() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }

        tracing::info!(environment = %environment, "Observability stack initialized");
        Ok(Self { registry })
    }
}

/// Registry namespaced `boilerplate` with every collector registered.
pub fn build_registry() -> Result<Registry> {
    let registry = Registry::new_custom(Some("boilerplate".into()), None)?;
    metrics::register_all(&registry)?;
    Ok(registry)
}
