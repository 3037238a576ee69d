//! Runtime configuration (`spec.md` §6.4), loaded from `MCP_*` environment
//! variables or assembled programmatically with the fluent setters below —
//! the same split the teacher's `HttpMcpServerBuilder` offers in
//! `turul-http-mcp-server/src/server.rs`.

use std::time::Duration;

/// Which HTTP routes beyond `/sse` a server would expose. Debug/inspect
/// routes are out of scope for this runtime; the variants exist so
/// `RuntimeConfig` is forward-compatible, per `SPEC_FULL.md` §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerMode {
    #[default]
    SseOnly,
    Debug,
    Inspect,
}

/// Which transport adapter a binary wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Sse,
    Stdio,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Protocol versions this server accepts on `initialize`, in order of
    /// preference. Default: `["2024-11-05"]`.
    pub supported_versions: Vec<String>,
    pub log_level: tracing::Level,
    /// URL prefix under which `/sse` and `/rpc/...` are mounted. Must start
    /// with `/` if non-empty and not end with `/`.
    pub path_prefix: String,
    pub bind_host: String,
    pub bind_port: u16,
    pub mode: ServerMode,
    pub transport_select: TransportKind,
    /// Gates `tools/register` — local extension, not protocol-mandated
    /// (`SPEC_FULL.md` §4.5 Open Question #2).
    pub allow_dynamic_tool_registration: bool,
    /// SSE adapter inactivity window before the session is torn down.
    pub sse_idle_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            supported_versions: vec!["2024-11-05".to_string()],
            log_level: tracing::Level::INFO,
            path_prefix: String::new(),
            bind_host: "127.0.0.1".to_string(),
            bind_port: 8080,
            mode: ServerMode::SseOnly,
            transport_select: TransportKind::Sse,
            allow_dynamic_tool_registration: false,
            sse_idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl RuntimeConfig {
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Load overrides from `MCP_*` environment variables, falling back to
    /// `Default::default()` for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(versions) = std::env::var("MCP_SUPPORTED_VERSIONS") {
            config.supported_versions =
                versions.split(',').map(|v| v.trim().to_string()).collect();
        }
        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            if let Ok(parsed) = level.parse() {
                config.log_level = parsed;
            }
        }
        if let Ok(prefix) = std::env::var("MCP_PATH_PREFIX") {
            config.path_prefix = prefix;
        }
        if let Ok(host) = std::env::var("MCP_BIND_HOST") {
            config.bind_host = host;
        }
        if let Ok(port) = std::env::var("MCP_BIND_PORT") {
            if let Ok(parsed) = port.parse() {
                config.bind_port = parsed;
            }
        }
        if let Ok(flag) = std::env::var("MCP_ALLOW_DYNAMIC_TOOL_REGISTRATION") {
            config.allow_dynamic_tool_registration = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
        if let Ok(secs) = std::env::var("MCP_SSE_IDLE_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse() {
                config.sse_idle_timeout = Duration::from_secs(parsed);
            }
        }
        if let Ok(transport) = std::env::var("MCP_TRANSPORT") {
            config.transport_select = match transport.to_ascii_lowercase().as_str() {
                "stdio" => TransportKind::Stdio,
                _ => TransportKind::Sse,
            };
        }

        config
    }

    pub fn supports_version(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|v| v == version)
    }

    /// Load overrides from a TOML file, falling back to `Default::default()`
    /// for anything the file leaves unset — the same override-over-defaults
    /// shape as [`RuntimeConfig::from_env`].
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let mut config = Self::default();

        if let Some(versions) = raw.supported_versions {
            config.supported_versions = versions;
        }
        if let Some(level) = raw.log_level.and_then(|l| l.parse().ok()) {
            config.log_level = level;
        }
        if let Some(prefix) = raw.path_prefix {
            config.path_prefix = prefix;
        }
        if let Some(host) = raw.bind_host {
            config.bind_host = host;
        }
        if let Some(port) = raw.bind_port {
            config.bind_port = port;
        }
        if let Some(flag) = raw.allow_dynamic_tool_registration {
            config.allow_dynamic_tool_registration = flag;
        }
        if let Some(secs) = raw.sse_idle_timeout_secs {
            config.sse_idle_timeout = Duration::from_secs(secs);
        }
        if let Some(transport) = raw.transport {
            config.transport_select = match transport.to_ascii_lowercase().as_str() {
                "stdio" => TransportKind::Stdio,
                _ => TransportKind::Sse,
            };
        }

        Ok(config)
    }
}

/// On-disk shape `from_file` parses. Plain scalars only — `tracing::Level`
/// and `std::time::Duration` don't implement `serde::Deserialize` on their
/// own, so this mirrors `from_env`'s string/seconds parsing rather than
/// leaning on a blanket derive over `RuntimeConfig` itself.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RawConfig {
    supported_versions: Option<Vec<String>>,
    log_level: Option<String>,
    path_prefix: Option<String>,
    bind_host: Option<String>,
    bind_port: Option<u16>,
    allow_dynamic_tool_registration: Option<bool>,
    sse_idle_timeout_secs: Option<u64>,
    transport: Option<String>,
}

/// Errors loading [`RuntimeConfig`] from a file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Fluent builder mirroring `HttpMcpServerBuilder`'s setter style.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    pub fn supported_versions(mut self, versions: Vec<String>) -> Self {
        self.config.supported_versions = versions;
        self
    }

    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.config.log_level = level;
        self
    }

    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.path_prefix = prefix.into();
        self
    }

    pub fn bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.bind_host = host.into();
        self.config.bind_port = port;
        self
    }

    pub fn mode(mut self, mode: ServerMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.config.transport_select = transport;
        self
    }

    pub fn allow_dynamic_tool_registration(mut self, allow: bool) -> Self {
        self.config.allow_dynamic_tool_registration = allow;
        self
    }

    pub fn sse_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.sse_idle_timeout = timeout;
        self
    }

    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}
