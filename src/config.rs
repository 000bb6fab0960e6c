//! Configuration types for the conversation engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration for the talking-poster engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MuralConfig {
    /// Content gateway settings (backend endpoints, retry/backoff).
    pub gateway: GatewayConfig,
    /// Detection gate settings (cooldown suppression).
    pub gate: GateConfig,
    /// Conversation flow settings.
    pub conversation: ConversationConfig,
    /// Known poster objects, keyed by the identity the external matcher
    /// reports. Detections for keys absent from this table are dropped.
    pub catalog: BTreeMap<String, CatalogEntry>,
}

/// Content gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the content generation backend.
    pub base_url: String,
    /// Per-request timeout in seconds.
    ///
    /// Generation endpoints render video server-side, so this is
    /// deliberately generous compared to a typical API call.
    pub timeout_secs: u64,
    /// Maximum attempts per request (first try + retries).
    pub max_attempts: u32,
    /// Backoff before the second attempt in milliseconds; doubles per attempt.
    pub backoff_initial_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".into(),
            timeout_secs: 45,
            max_attempts: 3,
            backoff_initial_ms: 500,
        }
    }
}

/// Detection gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum seconds before the same object key may re-trigger detection.
    ///
    /// Chosen to suppress re-triggering on a still-visible poster while a
    /// different poster can interrupt immediately.
    pub cooldown_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { cooldown_secs: 10 }
    }
}

/// Conversation flow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Delay in milliseconds between a conversation finishing and scanning
    /// resuming.
    pub rescan_delay_ms: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            rescan_delay_ms: 3000,
        }
    }
}

/// One poster object the engine can hold a conversation about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    /// Backend content identifier for this object.
    pub content_id: String,
    /// Human-readable name shown by the presentation layer.
    pub display_name: String,
    /// Bundled intro video used when the gateway is exhausted.
    pub intro_asset: Option<PathBuf>,
    /// Bundled response video used when the gateway is exhausted.
    pub response_asset: Option<PathBuf>,
}

impl MuralConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::MuralError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::MuralError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/mural/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("mural")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MuralConfig::default();
        assert!(!config.gateway.base_url.is_empty());
        assert!(config.gateway.timeout_secs > 0);
        assert!(config.gateway.max_attempts > 0);
        assert!(config.gateway.backoff_initial_ms > 0);
        assert!(config.gate.cooldown_secs > 0);
        assert!(config.conversation.rescan_delay_ms > 0);
        assert!(config.catalog.is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = MuralConfig::default();
        config.gateway.base_url = "http://poster-backend.local:9000".into();
        config.gate.cooldown_secs = 4;
        config.catalog.insert(
            "p1".into(),
            CatalogEntry {
                content_id: "poster-p1".into(),
                display_name: "Widget".into(),
                intro_asset: Some(PathBuf::from("assets/p1_intro.mp4")),
                response_asset: None,
            },
        );

        config.save_to_file(&path).unwrap();
        let loaded = MuralConfig::from_file(&path).unwrap();

        assert_eq!(loaded.gateway.base_url, "http://poster-backend.local:9000");
        assert_eq!(loaded.gate.cooldown_secs, 4);
        let entry = loaded.catalog.get("p1").unwrap();
        assert_eq!(entry.content_id, "poster-p1");
        assert_eq!(
            entry.intro_asset.as_deref(),
            Some(std::path::Path::new("assets/p1_intro.mp4"))
        );
        assert!(entry.response_asset.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
            [gateway]
            base_url = "http://example.test"

            [catalog.mona]
            content_id = "mona-lisa"
            display_name = "Mona Lisa"
        "#;
        let config: MuralConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gateway.base_url, "http://example.test");
        assert_eq!(config.gateway.max_attempts, 3);
        assert_eq!(config.gate.cooldown_secs, 10);
        assert_eq!(config.catalog["mona"].content_id, "mona-lisa");
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: MuralConfig = toml::from_str("").unwrap();
        assert_eq!(config.gateway.max_attempts, 3);
        assert_eq!(config.conversation.rescan_delay_ms, 3000);
    }
}
