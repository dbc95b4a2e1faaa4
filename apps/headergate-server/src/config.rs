//! Application configuration: defaults, then an optional YAML file, then
//! `HEADERGATE__`-prefixed environment variables (`__` separates levels).

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use security_gateway::SecurityGatewayConfig;
use serde::{Deserialize, Serialize};
use static_authn_delegate::StaticAuthnDelegateConfig;

pub const ENV_PREFIX: &str = "HEADERGATE__";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityGatewayConfig,
    /// Static delegate settings. When present the delegate is always wired,
    /// which is a startup error if `security.enabled` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authn_delegate: Option<StaticAuthnDelegateConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Layer defaults, the optional YAML file and the environment.
    ///
    /// # Errors
    /// Fails when the file is missing or malformed, or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            anyhow::ensure!(path.exists(), "config file not found: {}", path.display());
            figment = figment.merge(Yaml::file(path));
        }
        let cfg = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(cfg)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.server.bind_addr, "127.0.0.1:8087");
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.security.enabled);
        assert!(cfg.authn_delegate.is_none());
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let file = write_yaml(
            r"
server:
  bind_addr: 0.0.0.0:9000
security:
  enabled: true
  header_name: X-Remote-User
  management_path_prefix: /actuator
authn_delegate:
  mode: static_users
  users:
    - principal: alice
      authorities: [USER, ADMIN]
",
        );

        let cfg = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(cfg.server.bind_addr, "0.0.0.0:9000");
        assert!(cfg.security.enabled);
        assert_eq!(cfg.security.header_name, "X-Remote-User");
        assert!(cfg.security.csrf_enabled);
        assert_eq!(cfg.authn_delegate.unwrap().users.len(), 1);
    }

    #[test]
    fn bundled_sample_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/headergate.yaml");

        let cfg = AppConfig::load(Some(&path)).unwrap();

        assert!(cfg.security.enabled);
        assert_eq!(cfg.security.management_path_prefix, "/actuator");
        assert_eq!(cfg.authn_delegate.unwrap().users.len(), 3);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_yaml("security:\n  enabeld: true\n");

        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
