use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SLOW_QUERY_MS: u64 = 0;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Optional `{data_dir}/config.toml` overlay. Every field may be omitted.
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    /// HTTP server port (default: 5000).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,boardd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Slow-query warning threshold in milliseconds (default: 0 = disabled).
    slow_query_ms: Option<u64>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // Config is read before the tracing subscriber is installed, so
            // this has to go straight to stderr.
            eprintln!(
                "warn: failed to parse '{}': {e} — using defaults",
                path.display()
            );
            None
        }
    }
}

/// Resolved service configuration.
///
/// Built once at startup and passed around explicitly — there is no ambient
/// global. Priority (highest to lowest):
///   1. CLI / env — passed as `Some(value)` from clap
///   2. TOML file at `{data_dir}/config.toml`
///   3. Built-in defaults
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    /// Bind address for the HTTP server (default: "127.0.0.1").
    pub bind_address: String,
    /// Queries slower than this many milliseconds are logged at WARN (0 = off).
    pub slow_query_ms: u64,
}

impl BoardConfig {
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        log_format: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());
        let log_format = log_format
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());
        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);
        let slow_query_ms = toml.slow_query_ms.unwrap_or(DEFAULT_SLOW_QUERY_MS);

        Self {
            port,
            data_dir,
            log,
            log_format,
            bind_address,
            slow_query_ms,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/boardd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("boardd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/boardd or ~/.local/share/boardd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("boardd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("boardd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\boardd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("boardd");
        }
    }
    // Fallback
    PathBuf::from(".boardd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_given() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BoardConfig::new(None, Some(dir.path().to_path_buf()), None, None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.log, "info");
        assert_eq!(cfg.bind_address, "127.0.0.1");
        assert_eq!(cfg.slow_query_ms, 0);
    }

    #[test]
    fn toml_overlay_fills_gaps_but_cli_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "port = 8080\nlog = \"debug\"\nbind_address = \"0.0.0.0\"\n",
        )
        .unwrap();
        let cfg = BoardConfig::new(
            Some(9000),
            Some(dir.path().to_path_buf()),
            None,
            None,
            None,
        );
        assert_eq!(cfg.port, 9000, "CLI port overrides TOML");
        assert_eq!(cfg.log, "debug");
        assert_eq!(cfg.bind_address, "0.0.0.0");
    }

    #[test]
    fn malformed_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "port = \"not a number\"").unwrap();
        let cfg = BoardConfig::new(None, Some(dir.path().to_path_buf()), None, None, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }
}
