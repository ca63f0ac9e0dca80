//! Controller configuration
//!
//! Flags with environment fallbacks, validated once at startup. Missing
//! required settings are fatal here; nothing inside an enforcement pass ever
//! re-validates configuration.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

/// Soft-limit enforcement controller
#[derive(Debug, Parser)]
#[command(name = "soft-limit-controller")]
#[command(
    author,
    version,
    about = "Terminates pods whose usage exceeds annotation-declared soft resource limits",
    long_about = None
)]
pub struct ControllerConfig {
    /// Path to the kubeconfig file (in-cluster configuration when omitted)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace the controller watches and records events in
    #[arg(long, env = "MY_POD_NAMESPACE")]
    pub namespace: Option<String>,

    /// Seconds between enforcement passes
    #[arg(long, default_value_t = 10)]
    pub interval: u64,

    /// Port for the health and metrics endpoints
    #[arg(long, default_value_t = 8080)]
    pub api_port: u16,
}

impl ControllerConfig {
    /// Validate startup configuration, returning the target namespace.
    pub fn validate(&self) -> Result<&str> {
        let namespace = match self.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => namespace,
            _ => bail!("missing namespace: set --namespace or MY_POD_NAMESPACE"),
        };
        if self.interval == 0 {
            bail!("interval must be at least 1 second");
        }
        Ok(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(namespace: Option<&str>, interval: u64) -> ControllerConfig {
        ControllerConfig {
            kubeconfig: None,
            namespace: namespace.map(str::to_string),
            interval,
            api_port: 8080,
        }
    }

    #[test]
    fn test_validate_accepts_namespace_and_interval() {
        let settings = config(Some("production"), 10);
        assert_eq!(settings.validate().unwrap(), "production");
    }

    #[test]
    fn test_validate_rejects_missing_namespace() {
        assert!(config(None, 10).validate().is_err());
        assert!(config(Some(""), 10).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        assert!(config(Some("production"), 0).validate().is_err());
    }

    #[test]
    fn test_defaults_from_empty_args() {
        let settings = ControllerConfig::parse_from(["soft-limit-controller"]);
        assert_eq!(settings.interval, 10);
        assert_eq!(settings.api_port, 8080);
    }
}
