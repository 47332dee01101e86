//! Server configuration.
//!
//! Every option is a plain serde field with a default, so a `Config` can be
//! deserialized from JSON, built in code, or overridden from the process
//! environment via [`Config::from_env`]. Environment variables use the `A2A_`
//! prefix with section names joined by underscores, e.g.
//! `A2A_QUEUE_MAX_SIZE=200`.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Listener port for the JSON-RPC endpoint.
    pub port: u16,
    /// Enables verbose logging and debug HTTP behaviour.
    pub debug: bool,
    /// Agent card identity fields, mutable at runtime through the server.
    pub agent_name: String,
    pub agent_description: String,
    pub agent_url: String,
    pub agent_version: String,
    /// Advertised capability flags.
    pub capabilities: CapabilitiesConfig,
    /// Task queue sizing and eviction.
    pub queue: QueueConfig,
    /// HTTP server timeouts.
    pub server: HttpConfig,
    /// Optional TLS material; termination itself is delegated upstream.
    pub tls: TlsConfig,
    /// Optional bearer-token authentication on the RPC endpoint.
    pub auth: AuthConfig,
    /// Metrics and tracing.
    pub telemetry: TelemetryConfig,
    /// Agent loop bounds.
    pub agent: AgentLoopConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            debug: false,
            agent_name: "switchboard-agent".to_string(),
            agent_description: "an A2A-compatible agent".to_string(),
            agent_url: "http://localhost:8080".to_string(),
            agent_version: "0.1.0".to_string(),
            capabilities: CapabilitiesConfig::default(),
            queue: QueueConfig::default(),
            server: HttpConfig::default(),
            tls: TlsConfig::default(),
            auth: AuthConfig::default(),
            telemetry: TelemetryConfig::default(),
            agent: AgentLoopConfig::default(),
        }
    }
}

/// Capability flags advertised on the agent card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CapabilitiesConfig {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            push_notifications: true,
            state_transition_history: false,
        }
    }
}

/// Bounded queue sizing and terminal-task eviction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueueConfig {
    /// Capacity of the bounded task queue.
    pub max_size: usize,
    /// Eviction period for terminal tasks, in milliseconds. Doubles as the
    /// retention age: a terminal task older than this is evicted on the next
    /// tick.
    pub cleanup_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            cleanup_interval_ms: 30_000,
        }
    }
}

impl QueueConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }
}

/// HTTP listener timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub idle_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            idle_timeout_ms: 60_000,
        }
    }
}

impl HttpConfig {
    /// The per-request handling deadline applied to the RPC surface.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms + self.write_timeout_ms)
    }
}

/// Optional TLS material for the listener. The runtime serves plain HTTP and
/// expects termination at the fronting proxy; the paths are carried so the
/// deployment layer can wire them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct TlsConfig {
    pub enable: bool,
    pub cert_path: String,
    pub key_path: String,
}

/// Optional OIDC bearer-token validation on the RPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub enable: bool,
    pub issuer: String,
    pub audience: String,
}

/// Metrics and tracing switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enable: bool,
    /// Port for the dedicated metrics listener.
    pub metrics_port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable: false,
            metrics_port: 9090,
        }
    }
}

/// Bounds for the multi-turn agent loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentLoopConfig {
    /// Upper bound on provider round-trips per task.
    pub max_iterations: usize,
    /// Optional system prompt prepended to every conversation.
    pub system_prompt: Option<String>,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            system_prompt: None,
        }
    }
}

impl Config {
    /// Loads a configuration from defaults overridden by `A2A_`-prefixed
    /// environment variables. Unparseable values are ignored in favour of the
    /// default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        env_override("A2A_PORT", &mut cfg.port);
        env_override("A2A_DEBUG", &mut cfg.debug);
        env_override_string("A2A_AGENT_NAME", &mut cfg.agent_name);
        env_override_string("A2A_AGENT_DESCRIPTION", &mut cfg.agent_description);
        env_override_string("A2A_AGENT_URL", &mut cfg.agent_url);
        env_override_string("A2A_AGENT_VERSION", &mut cfg.agent_version);

        env_override(
            "A2A_CAPABILITIES_STREAMING",
            &mut cfg.capabilities.streaming,
        );
        env_override(
            "A2A_CAPABILITIES_PUSH_NOTIFICATIONS",
            &mut cfg.capabilities.push_notifications,
        );
        env_override(
            "A2A_CAPABILITIES_STATE_TRANSITION_HISTORY",
            &mut cfg.capabilities.state_transition_history,
        );

        env_override("A2A_QUEUE_MAX_SIZE", &mut cfg.queue.max_size);
        env_override(
            "A2A_QUEUE_CLEANUP_INTERVAL_MS",
            &mut cfg.queue.cleanup_interval_ms,
        );

        env_override("A2A_SERVER_READ_TIMEOUT_MS", &mut cfg.server.read_timeout_ms);
        env_override(
            "A2A_SERVER_WRITE_TIMEOUT_MS",
            &mut cfg.server.write_timeout_ms,
        );
        env_override("A2A_SERVER_IDLE_TIMEOUT_MS", &mut cfg.server.idle_timeout_ms);

        env_override("A2A_TLS_ENABLE", &mut cfg.tls.enable);
        env_override_string("A2A_TLS_CERT_PATH", &mut cfg.tls.cert_path);
        env_override_string("A2A_TLS_KEY_PATH", &mut cfg.tls.key_path);

        env_override("A2A_AUTH_ENABLE", &mut cfg.auth.enable);
        env_override_string("A2A_AUTH_ISSUER", &mut cfg.auth.issuer);
        env_override_string("A2A_AUTH_AUDIENCE", &mut cfg.auth.audience);

        env_override("A2A_TELEMETRY_ENABLE", &mut cfg.telemetry.enable);
        env_override(
            "A2A_TELEMETRY_METRICS_PORT",
            &mut cfg.telemetry.metrics_port,
        );

        env_override("A2A_AGENT_MAX_ITERATIONS", &mut cfg.agent.max_iterations);
        if let Ok(prompt) = std::env::var("A2A_AGENT_SYSTEM_PROMPT") {
            if !prompt.is_empty() {
                cfg.agent.system_prompt = Some(prompt);
            }
        }

        cfg
    }

    /// The bind address for the RPC listener.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// The bind address for the metrics listener.
    pub fn metrics_address(&self) -> String {
        format!("0.0.0.0:{}", self.telemetry.metrics_port)
    }
}

fn env_override<T: FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        if let Ok(value) = raw.parse::<T>() {
            *slot = value;
        }
    }
}

fn env_override_string(key: &str, slot: &mut String) {
    if let Ok(value) = std::env::var(key) {
        if !value.is_empty() {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.queue.max_size, 100);
        assert_eq!(cfg.queue.cleanup_interval(), Duration::from_secs(30));
        assert!(cfg.capabilities.streaming);
        assert!(cfg.capabilities.push_notifications);
        assert!(!cfg.capabilities.state_transition_history);
        assert_eq!(cfg.agent.max_iterations, 10);
        assert_eq!(cfg.telemetry.metrics_port, 9090);
        assert!(!cfg.auth.enable);
    }

    #[test]
    fn deserializes_partial_json() {
        let cfg: Config = serde_json::from_str(
            r#"{"port": 9000, "queue": {"max_size": 5}, "agent_name": "test-agent"}"#,
        )
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.queue.max_size, 5);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.queue.cleanup_interval_ms, 30_000);
        assert_eq!(cfg.agent_name, "test-agent");
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("A2A_QUEUE_MAX_SIZE", "7");
        std::env::set_var("A2A_DEBUG", "true");
        std::env::set_var("A2A_AGENT_NAME", "env-agent");
        let cfg = Config::from_env();
        std::env::remove_var("A2A_QUEUE_MAX_SIZE");
        std::env::remove_var("A2A_DEBUG");
        std::env::remove_var("A2A_AGENT_NAME");

        assert_eq!(cfg.queue.max_size, 7);
        assert!(cfg.debug);
        assert_eq!(cfg.agent_name, "env-agent");
    }
}
