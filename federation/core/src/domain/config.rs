// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0

// Federation Gateway Configuration
//
// Defines the configuration schema for a federation gateway process:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Handshake, session, presence and event-stream tuning
// - Routing backend (in-memory or PostgreSQL mapping store)
// - Signing key seed (optional; a fresh keypair is generated when absent)
// - Logging and metrics settings

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "sage.federation/v1";
pub const KIND: &str = "FederationGateway";
pub const CONFIG_PATH_ENV: &str = "SAGE_FEDERATION_CONFIG";

/// Top-level Kubernetes-style gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfigManifest {
    /// API version (must be "sage.federation/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "FederationGateway")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: FederationConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable gateway name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FederationConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub handshake: HandshakeConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub events: EventStreamConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// How long a pending challenge stays answerable
    #[serde(default = "default_challenge_ttl_ms")]
    pub challenge_ttl_ms: i64,

    /// Period of the background sweep over all in-memory stores
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Age after which a cached session entry is dropped (the token itself stays verifiable)
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Silence after which a node reads as offline
    #[serde(default = "default_offline_threshold_ms")]
    pub offline_threshold_ms: i64,

    /// Silence after which a node is dropped from the registry entirely
    #[serde(default = "default_node_retention")]
    pub retention_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStreamConfig {
    /// Number of most recent events kept in memory
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingBackend {
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_routing_backend")]
    pub backend: RoutingBackend,

    /// Default (non-federated) database; also holds the federation mapping tables.
    /// Supports "env:VAR_NAME".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Pool size for each node connection
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound on a cached connection's liveness probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Base64 32-byte Ed25519 seed (supports "env:VAR_NAME").
    /// When absent, a new keypair is generated at startup and tokens do not
    /// survive a restart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Expose a Prometheus scrape endpoint
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_challenge_ttl_ms() -> i64 {
    crate::domain::handshake::CHALLENGE_TTL_MS
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_session_ttl() -> u64 {
    crate::domain::token::TOKEN_EXPIRES_IN_MS / 1000
}

fn default_offline_threshold_ms() -> i64 {
    crate::domain::node::OFFLINE_THRESHOLD_MS
}

fn default_node_retention() -> u64 {
    86_400
}

fn default_event_capacity() -> usize {
    crate::domain::events::EVENT_STREAM_CAPACITY
}

fn default_routing_backend() -> RoutingBackend {
    RoutingBackend::InMemory
}

fn default_max_connections() -> u32 {
    5
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            challenge_ttl_ms: default_challenge_ttl_ms(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_secs: default_session_ttl() }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            offline_threshold_ms: default_offline_threshold_ms(),
            retention_secs: default_node_retention(),
        }
    }
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self { capacity: default_event_capacity() }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            backend: default_routing_backend(),
            database_url: None,
            max_connections: default_max_connections(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Default for FederationConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "sage-federation".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: FederationConfigSpec::default(),
        }
    }
}

impl HandshakeConfig {
    pub fn challenge_ttl(&self) -> Duration {
        Duration::milliseconds(self.challenge_ttl_ms)
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs as i64)
    }
}

impl RegistryConfig {
    pub fn retention(&self) -> Duration {
        Duration::seconds(self.retention_secs as i64)
    }
}

/// Resolve "env:VAR_NAME" indirection; other values pass through unchanged.
pub fn resolve_secret(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("Environment variable '{}' referenced by config is not set", var)),
        None => Ok(value.to_string()),
    }
}

impl FederationConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SAGE_FEDERATION_CONFIG environment variable
    /// 2. ./sage-federation.yaml (working directory)
    /// 3. ~/.sage/federation.yaml (user home)
    /// 4. /etc/sage/federation.yaml (system, Unix) or C:\ProgramData\Sage\federation.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./sage-federation.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".sage").join("federation.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/sage/federation.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Sage\\federation.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SAGE_FEDERATION_DATABASE_URL") {
            tracing::info!("Environment override: SAGE_FEDERATION_DATABASE_URL (backend=postgres)");
            self.spec.routing.database_url = Some(url);
            self.spec.routing.backend = RoutingBackend::Postgres;
        }

        if let Ok(seed) = std::env::var("SAGE_FEDERATION_SIGNING_SEED") {
            tracing::info!("Environment override: SAGE_FEDERATION_SIGNING_SEED");
            self.spec.signing.seed = Some(seed);
        }

        if let Ok(val) = std::env::var("SAGE_FEDERATION_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: SAGE_FEDERATION_PORT={}", port);
                    self.spec.server.port = port;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for SAGE_FEDERATION_PORT: '{}'. Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Resolved default database URL, if configured.
    pub fn database_url(&self) -> anyhow::Result<Option<String>> {
        self.spec
            .routing
            .database_url
            .as_deref()
            .map(resolve_secret)
            .transpose()
    }

    /// Resolved signing seed, if configured.
    pub fn signing_seed(&self) -> anyhow::Result<Option<String>> {
        self.spec.signing.seed.as_deref().map(resolve_secret).transpose()
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let spec = &self.spec;
        if spec.handshake.challenge_ttl_ms <= 0 {
            anyhow::bail!("spec.handshake.challenge_ttl_ms must be positive");
        }
        if spec.handshake.sweep_interval_secs == 0 {
            anyhow::bail!("spec.handshake.sweep_interval_secs must be positive");
        }
        if spec.sessions.ttl_secs == 0 {
            anyhow::bail!("spec.sessions.ttl_secs must be positive");
        }
        if spec.registry.offline_threshold_ms <= 0 {
            anyhow::bail!("spec.registry.offline_threshold_ms must be positive");
        }
        if spec.registry.retention_secs as i64 * 1000 < spec.registry.offline_threshold_ms {
            anyhow::bail!("spec.registry.retention_secs must not be shorter than the offline threshold");
        }
        if spec.events.capacity == 0 {
            anyhow::bail!("spec.events.capacity must be positive");
        }
        if spec.routing.max_connections == 0 {
            anyhow::bail!("spec.routing.max_connections must be positive");
        }

        if spec.routing.backend == RoutingBackend::Postgres {
            match self.database_url()? {
                Some(url) if !url.is_empty() => {}
                _ => anyhow::bail!("spec.routing.database_url is required for the postgres backend"),
            }
        }

        if let Some(seed) = self.signing_seed()? {
            let bytes = STANDARD
                .decode(seed.trim())
                .map_err(|e| anyhow::anyhow!("spec.signing.seed is not valid base64: {}", e))?;
            if bytes.len() != 32 {
                anyhow::bail!("spec.signing.seed must decode to 32 bytes, got {}", bytes.len());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = FederationConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.handshake.challenge_ttl_ms, 30_000);
        assert_eq!(manifest.spec.registry.offline_threshold_ms, 45_000);
        assert_eq!(manifest.spec.events.capacity, 200);
        assert_eq!(manifest.spec.sessions.ttl_secs, 3_600);
        assert_eq!(manifest.spec.routing.backend, RoutingBackend::InMemory);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_minimal_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: sage.federation/v1
kind: FederationGateway
metadata:
  name: edge-gateway
spec:
  server:
    port: 9000
  routing:
    backend: postgres
    database_url: postgres://localhost/sage
  observability:
    logging:
      format: json
"#;
        let manifest = FederationConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "edge-gateway");
        assert_eq!(manifest.spec.server.port, 9000);
        assert_eq!(manifest.spec.server.bind_address, "0.0.0.0");
        assert_eq!(manifest.spec.routing.backend, RoutingBackend::Postgres);
        assert_eq!(manifest.spec.routing.max_connections, 5);
        assert_eq!(manifest.spec.observability.logging.format, LogFormat::Json);
        assert_eq!(manifest.spec.handshake.sweep_interval_secs, 60);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.yaml");

        let mut manifest = FederationConfigManifest::default();
        manifest.metadata.name = "roundtrip".to_string();
        manifest.spec.events.capacity = 50;
        manifest.to_yaml_file(&path).unwrap();

        let parsed = FederationConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(parsed.metadata.name, "roundtrip");
        assert_eq!(parsed.spec.events.capacity, 50);
    }

    #[test]
    fn test_validation() {
        let mut manifest = FederationConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.events.capacity = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.events.capacity = 200;

        manifest.spec.routing.backend = RoutingBackend::Postgres;
        assert!(manifest.validate().is_err());
        manifest.spec.routing.database_url = Some("postgres://localhost/sage".to_string());
        assert!(manifest.validate().is_ok());

        manifest.spec.signing.seed = Some("not-base64!".to_string());
        assert!(manifest.validate().is_err());
        manifest.spec.signing.seed = Some(STANDARD.encode([7u8; 16]));
        assert!(manifest.validate().is_err());
        manifest.spec.signing.seed = Some(STANDARD.encode([7u8; 32]));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_resolve_secret_env_indirection() {
        std::env::set_var("SAGE_FEDERATION_TEST_SECRET_7731", "s3cret");
        assert_eq!(resolve_secret("env:SAGE_FEDERATION_TEST_SECRET_7731").unwrap(), "s3cret");
        assert_eq!(resolve_secret("literal").unwrap(), "literal");
        assert!(resolve_secret("env:SAGE_FEDERATION_TEST_UNSET_7731").is_err());
    }
}
