//! Configuration file management for nalp.
//!
//! Provides a TOML-based config file at `~/.config/nalp/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.
//!
//! The model API key is only ever read from the environment; it is never
//! written to the config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nalp_core::llm::{GeminiClient, LanguageModel, ModelConfig};
use nalp_core::search::{DuckDuckGoSearch, SearchConfig, SearchProvider};
use nalp_core::{Catalog, Synthesizer, SynthesizerOptions};
use nalp_store::{HistoryStore, StoreConfig};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub model: ModelConfig,
    pub search: SearchConfig,
    pub history: HistorySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub dir: PathBuf,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(StoreConfig::DEFAULT_DIR),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the nalp config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/nalp` or `~/.config/nalp`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("nalp");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("nalp")
}

/// Return the path to the nalp config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`. Returns an error if it does
/// not exist.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Load the config file if present. A missing file is `None`; a file that
/// exists but does not parse is an error.
pub fn load_config_if_exists(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        return Ok(None);
    }
    load_config(path).map(Some)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None` defers to the rest of the
/// chain.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub model: Option<String>,
    pub history_dir: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct NalpConfig {
    pub bind: String,
    pub port: u16,
    pub model: ModelConfig,
    pub search: SearchConfig,
    pub store: StoreConfig,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl NalpConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Bind: `--bind` > `NALP_BIND` > `server.bind` > `127.0.0.1`
    /// - Port: `--port` > `NALP_PORT` > `server.port` > `8000`
    /// - Model: `--model` > `NALP_MODEL` > `model.name` > `gemini-2.5-flash`
    /// - History dir: `--history-dir` > `NALP_HISTORY_DIR` > `history.dir` > `history`
    pub fn resolve(overrides: &CliOverrides) -> Result<Self> {
        let path = overrides.config.clone().unwrap_or_else(config_path);
        let file = load_config_if_exists(&path)?.unwrap_or_default();

        let bind = overrides
            .bind
            .clone()
            .or_else(|| env_var("NALP_BIND"))
            .unwrap_or(file.server.bind);

        let port = match (overrides.port, env_var("NALP_PORT")) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .parse()
                .with_context(|| format!("NALP_PORT is not a valid port: {raw:?}"))?,
            (None, None) => file.server.port,
        };

        let mut model = file.model;
        if let Some(name) = overrides.model.clone().or_else(|| env_var("NALP_MODEL")) {
            model.name = name;
        }

        let history_dir = overrides
            .history_dir
            .clone()
            .or_else(|| env_var("NALP_HISTORY_DIR").map(PathBuf::from))
            .unwrap_or(file.history.dir);

        Ok(Self {
            bind,
            port,
            model,
            search: file.search,
            store: StoreConfig::new(history_dir),
        })
    }

    pub fn history_store(&self) -> HistoryStore {
        HistoryStore::new(&self.store)
    }

    /// Wire the built-in catalog, the Gemini client and (when enabled) the
    /// DuckDuckGo search adapter into a [`Synthesizer`].
    ///
    /// A missing API key does not fail here; model-dependent calls report
    /// it instead.
    pub fn synthesizer(&self) -> Result<Synthesizer> {
        let catalog = Catalog::builtin().context("failed to load built-in tool catalog")?;
        let model = GeminiClient::from_config(&self.model).context("failed to build model client")?;
        if !model.is_configured() {
            tracing::warn!(
                env = %self.model.api_key_env,
                "model API key is not set; questions and plans will fail until it is"
            );
        }

        let search: Option<Arc<dyn SearchProvider>> = if self.search.enabled {
            let client = DuckDuckGoSearch::from_config(&self.search)
                .context("failed to build search client")?;
            Some(Arc::new(client))
        } else {
            None
        };

        Ok(Synthesizer::new(
            Arc::new(catalog),
            Arc::new(model) as Arc<dyn LanguageModel>,
            search,
            SynthesizerOptions::from_config(&self.model, &self.search),
        ))
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 4] = ["NALP_BIND", "NALP_PORT", "NALP_MODEL", "NALP_HISTORY_DIR"];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    fn clear_env() {
        for var in ENV_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    fn write_file(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn overrides_for(path: PathBuf) -> CliOverrides {
        CliOverrides {
            config: Some(path),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut original = ConfigFile::default();
        original.server.port = 9100;
        original.model.plan_retries = 3;
        original.search.enabled = false;
        original.history.dir = PathBuf::from("/var/lib/nalp");

        save_config(&original, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, original);
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_config(&ConfigFile::default(), &path).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn saved_config_never_contains_a_key_value() {
        let _lock = lock_env();
        unsafe { std::env::set_var("GEMINI_API_KEY", "super-secret-value") };

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_config(&ConfigFile::default(), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();

        unsafe { std::env::remove_var("GEMINI_API_KEY") };

        assert!(!contents.contains("super-secret-value"));
        assert!(contents.contains("api_key_env = \"GEMINI_API_KEY\""));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_file(&tmp, "[server]\nport = 9000\n");

        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.server.bind, "127.0.0.1");
        assert_eq!(loaded.model, ModelConfig::default());
        assert_eq!(loaded.history.dir, PathBuf::from("history"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let _lock = lock_env();
        clear_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_file(&tmp, "[server\nport = ");

        let err = NalpConfig::resolve(&overrides_for(path)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        clear_env();
        let tmp = tempfile::TempDir::new().unwrap();

        let config = NalpConfig::resolve(&overrides_for(tmp.path().join("missing.toml"))).unwrap();

        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert_eq!(config.store.dir(), Path::new("history"));
        assert!(config.search.enabled);
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        clear_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_file(
            &tmp,
            "[server]\nbind = \"0.0.0.0\"\nport = 9000\n[model]\nname = \"file-model\"\n[history]\ndir = \"/from/file\"\n",
        );

        unsafe { std::env::set_var("NALP_PORT", "9500") };
        unsafe { std::env::set_var("NALP_MODEL", "env-model") };
        unsafe { std::env::set_var("NALP_HISTORY_DIR", "/from/env") };

        let config = NalpConfig::resolve(&overrides_for(path)).unwrap();
        clear_env();

        assert_eq!(config.bind, "0.0.0.0", "file value kept when env unset");
        assert_eq!(config.port, 9500);
        assert_eq!(config.model.name, "env-model");
        assert_eq!(config.store.dir(), Path::new("/from/env"));
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        clear_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write_file(&tmp, "[server]\nport = 9000\n");

        unsafe { std::env::set_var("NALP_PORT", "9500") };
        unsafe { std::env::set_var("NALP_BIND", "10.0.0.1") };

        let overrides = CliOverrides {
            config: Some(path),
            port: Some(7000),
            bind: Some("0.0.0.0".to_string()),
            model: Some("cli-model".to_string()),
            history_dir: Some(PathBuf::from("/from/cli")),
        };
        let config = NalpConfig::resolve(&overrides).unwrap();
        clear_env();

        assert_eq!(config.port, 7000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.model.name, "cli-model");
        assert_eq!(config.store.dir(), Path::new("/from/cli"));
    }

    #[test]
    fn invalid_port_env_is_an_error() {
        let _lock = lock_env();
        clear_env();
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("NALP_PORT", "eighty") };

        let result = NalpConfig::resolve(&overrides_for(tmp.path().join("missing.toml")));
        clear_env();

        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("NALP_PORT"), "unexpected error: {msg}");
    }

    #[test]
    fn synthesizer_builds_without_api_key() {
        let _lock = lock_env();
        clear_env();
        unsafe { std::env::remove_var("GEMINI_API_KEY") };
        let tmp = tempfile::TempDir::new().unwrap();

        let config = NalpConfig::resolve(&overrides_for(tmp.path().join("missing.toml"))).unwrap();
        let synth = config.synthesizer().unwrap();

        assert_eq!(synth.model_id(), "gemini-2.5-flash");
        assert_eq!(synth.catalog().len(), 16);
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("nalp/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
