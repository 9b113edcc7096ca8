use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    dispatcher::AckMode,
    registry::ScopePolicy,
    rest::{DEFAULT_API_BASE_URL, RestClient},
    server::DEFAULT_BODY_LIMIT,
    verify::SignatureVerifier,
};

pub const DEFAULT_CONFIG_PATH: &str = "~/.hookline/config.toml";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_PATH: &str = "/interactions";

#[derive(Debug, Clone, Default)]
pub struct CliFlags {
    pub application_id: Option<String>,
    pub public_key: Option<String>,
    pub token: Option<String>,
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionsConfig {
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default)]
    pub id: String,
    /// Hex-encoded Ed25519 key from the developer portal.
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub path: String,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            path: DEFAULT_PATH.to_string(),
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub ack_mode: AckMode,
    pub scope_policy: ScopePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl InteractionsConfig {
    /// File, then environment, then CLI flags, then validation.
    pub fn load(config_path: Option<&Path>, cli: &CliFlags) -> Result<Self> {
        Self::load_with(config_path, cli, |key| std::env::var(key).ok())
    }

    fn load_with(
        config_path: Option<&Path>,
        cli: &CliFlags,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = config_path
            .map(expand_tilde_path)
            .unwrap_or_else(default_config_path);

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|error| anyhow!("failed to read config {}: {error}", path.display()))?;
            toml::from_str(&text)
                .map_err(|error| anyhow!("failed to parse config {}: {error}", path.display()))?
        } else {
            InteractionsConfig::default()
        };

        config.apply_overrides_from(lookup);
        config.apply_cli_overrides(cli);
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, config_path: Option<&Path>) -> Result<PathBuf> {
        let path = config_path
            .map(expand_tilde_path)
            .unwrap_or_else(default_config_path);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                anyhow!("failed to create config dir {}: {error}", parent.display())
            })?;
        }

        let text = toml::to_string_pretty(self)
            .map_err(|error| anyhow!("failed to serialize config: {error}"))?;
        std::fs::write(&path, text)
            .map_err(|error| anyhow!("failed to write config {}: {error}", path.display()))?;

        Ok(path)
    }

    /// Checks shape only. Credentials are checked by [`Self::verifier`] and
    /// [`Self::rest_client`], since not every command needs all of them.
    pub fn validate(&self) -> Result<()> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|error| anyhow!("invalid server.bind '{}': {error}", self.server.bind))?;

        if !self.server.path.starts_with('/') {
            return Err(anyhow!(
                "server.path must start with '/', got '{}'",
                self.server.path
            ));
        }

        if self.server.path == "/health" {
            return Err(anyhow!("server.path cannot be /health"));
        }

        if self.server.body_limit_bytes == 0 {
            return Err(anyhow!("server.body_limit_bytes must be greater than zero"));
        }

        if !self.application.public_key.trim().is_empty() {
            self.verifier()?;
        }

        if self.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url cannot be empty"));
        }

        Ok(())
    }

    pub fn verifier(&self) -> Result<SignatureVerifier> {
        if self.application.public_key.trim().is_empty() {
            return Err(anyhow!(
                "application.public_key is required (or set DISCORD_PUBLIC_KEY)"
            ));
        }

        SignatureVerifier::from_hex(&self.application.public_key)
            .map_err(|error| anyhow!("invalid application.public_key: {error}"))
    }

    pub fn rest_client(&self) -> Result<RestClient> {
        if self.application.id.trim().is_empty() {
            return Err(anyhow!(
                "application.id is required (or set DISCORD_APPLICATION_ID)"
            ));
        }
        if self.application.token.trim().is_empty() {
            return Err(anyhow!(
                "application.token is required (or set DISCORD_BOT_TOKEN)"
            ));
        }

        Ok(RestClient::with_base_url(
            self.api.base_url.clone(),
            self.application.id.clone(),
            self.application.token.clone(),
        ))
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = read("DISCORD_APPLICATION_ID") {
            self.application.id = value;
        }
        if let Some(value) = read("DISCORD_PUBLIC_KEY") {
            self.application.public_key = value;
        }
        if let Some(value) = read("DISCORD_BOT_TOKEN") {
            self.application.token = value;
        }
        if let Some(value) = read("HOOKLINE_BIND") {
            self.server.bind = value;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &CliFlags) {
        if let Some(id) = &cli.application_id {
            self.application.id = id.clone();
        }
        if let Some(public_key) = &cli.public_key {
            self.application.public_key = public_key.clone();
        }
        if let Some(token) = &cli.token {
            self.application.token = token.clone();
        }
        if let Some(bind) = &cli.bind {
            self.server.bind = bind.clone();
        }
    }
}

pub fn default_config_path() -> PathBuf {
    expand_tilde_path(Path::new(DEFAULT_CONFIG_PATH))
}

fn expand_tilde_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if let Some(stripped) = path_str.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }

    if path_str == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{CliFlags, InteractionsConfig, default_config_path};
    use crate::{dispatcher::AckMode, registry::ScopePolicy};

    const PUBLIC_KEY: &str = "ea4a6c63e29c520abef5507b132ec5f9954776aebebe7b92421eea691446d22c";

    #[test]
    fn defaults_are_valid() {
        let config = InteractionsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatch.ack_mode, AckMode::Immediate);
        assert_eq!(config.dispatch.scope_policy, ScopePolicy::Strict);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: InteractionsConfig = match toml::from_str(
            r#"
            [application]
            id = "123"

            [dispatch]
            ack_mode = "after_handler"
            scope_policy = "fallback_to_global"
            "#,
        ) {
            Ok(config) => config,
            Err(error) => panic!("config should parse: {error}"),
        };

        assert_eq!(config.application.id, "123");
        assert_eq!(config.server.path, "/interactions");
        assert_eq!(config.dispatch.ack_mode, AckMode::AfterHandler);
        assert_eq!(config.dispatch.scope_policy, ScopePolicy::FallbackToGlobal);
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let mut config = InteractionsConfig::default();
        config.server.path = "interactions".to_string();
        assert!(config.validate().is_err());

        let mut config = InteractionsConfig::default();
        config.server.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = InteractionsConfig::default();
        config.application.public_key = "abcd".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn credentials_are_required_where_used() {
        let mut config = InteractionsConfig::default();
        assert!(config.verifier().is_err());
        assert!(config.rest_client().is_err());

        config.application.public_key = PUBLIC_KEY.to_string();
        config.application.id = "app".to_string();
        config.application.token = "secret".to_string();
        assert!(config.verifier().is_ok());
        assert!(config.rest_client().is_ok());
    }

    #[test]
    fn env_then_cli_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DISCORD_APPLICATION_ID", "from-env"),
            ("DISCORD_BOT_TOKEN", "env-token"),
            ("HOOKLINE_BIND", "   "),
        ]);
        let mut config = InteractionsConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|value| value.to_string()));
        config.apply_cli_overrides(&CliFlags {
            application_id: Some("from-cli".to_string()),
            ..Default::default()
        });

        assert_eq!(config.application.id, "from-cli");
        assert_eq!(config.application.token, "env-token");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let path = dir.path().join("nested").join("config.toml");

        let mut config = InteractionsConfig::default();
        config.application.public_key = PUBLIC_KEY.to_string();
        config.dispatch.ack_mode = AckMode::AfterHandler;
        if let Err(error) = config.save(Some(&path)) {
            panic!("save failed: {error}");
        }

        let loaded =
            match InteractionsConfig::load_with(Some(&path), &CliFlags::default(), |_| None) {
                Ok(config) => config,
                Err(error) => panic!("load failed: {error}"),
            };
        assert_eq!(loaded, config);

        let cli = CliFlags {
            bind: Some("127.0.0.1:9000".to_string()),
            ..CliFlags::default()
        };
        let overridden = match InteractionsConfig::load_with(Some(&path), &cli, |_| None) {
            Ok(config) => config,
            Err(error) => panic!("load failed: {error}"),
        };
        assert_eq!(overridden.server.bind, "127.0.0.1:9000");
        assert_eq!(overridden.dispatch.ack_mode, AckMode::AfterHandler);
    }

    #[test]
    fn default_config_path_expands() {
        let path = default_config_path();
        assert!(!path.to_string_lossy().contains('~'));
    }
}
