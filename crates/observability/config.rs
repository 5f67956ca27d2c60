use std::env;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone, Debug)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) log_filter: String,
    /// Warnings captured during config parsing so they can be logged after tracing is initialized.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let component = component.trim().to_string();
        let mut warnings = Vec::new();

        let service_name = non_empty(lookup("SERVICE_NAME")).unwrap_or_else(|| component.clone());
        let environment = non_empty(lookup("STAGE")).unwrap_or_else(|| "local".to_string());

        let log_filter = match non_empty(lookup("RUST_LOG")) {
            Some(raw) if EnvFilter::try_new(&raw).is_ok() => raw,
            Some(raw) => {
                warnings.push(format!(
                    "RUST_LOG is invalid (value: {raw}); defaulting to {DEFAULT_LOG_FILTER}"
                ));
                DEFAULT_LOG_FILTER.to_string()
            }
            None => DEFAULT_LOG_FILTER.to_string(),
        };

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            log_filter,
            warnings,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_component_and_info() {
        let config = ObservabilityConfig::from_lookup(" gateway ", lookup(&[]));

        assert_eq!(config.service_context.service_name, "gateway");
        assert_eq!(config.service_context.component, "gateway");
        assert_eq!(config.service_context.environment, "local");
        assert_eq!(config.log_filter, "info");
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn invalid_rust_log_falls_back_with_warning() {
        let config = ObservabilityConfig::from_lookup(
            "gateway",
            lookup(&[("RUST_LOG", "gateway=notalevel"), ("STAGE", "prod")]),
        );

        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.service_context.environment, "prod");
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn valid_rust_log_is_kept() {
        let config = ObservabilityConfig::from_lookup(
            "gateway",
            lookup(&[("RUST_LOG", "gateway=debug,tower_http=info")]),
        );

        assert_eq!(config.log_filter, "gateway=debug,tower_http=info");
        assert!(config.warnings.is_empty());
    }
}
