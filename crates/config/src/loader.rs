use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::BridgeConfig;

/// Standard config file name.
const CONFIG_FILENAME: &str = "wabridge.toml";

/// Load config from the given path.
pub fn load_config(path: &Path) -> anyhow::Result<BridgeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    Ok(toml::from_str(&raw)?)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./wabridge.toml` (project-local)
/// 2. `~/.config/wabridge/wabridge.toml` (user-global)
///
/// Returns `BridgeConfig::default()` if no config file is found.
pub fn discover_and_load() -> BridgeConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    BridgeConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "wabridge") {
        let p = dirs.config_dir().join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }

    None
}

/// Apply environment overrides on top of the loaded config.
pub fn apply_env_overrides(config: &mut BridgeConfig) {
    apply_env_overrides_from(config, |key| std::env::var(key).ok());
}

/// Testable core of [`apply_env_overrides`]: reads variables through
/// the provided lookup.
pub fn apply_env_overrides_from(
    config: &mut BridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(url) = lookup("WEBHOOK_URL") {
        config.webhook_url = Some(url);
    }
    if let Some(port) = lookup("PORT") {
        match port.parse() {
            Ok(port) => config.gateway.port = port,
            Err(_) => warn!(value = %port, "ignoring unparseable PORT"),
        }
    }
    if let Some(dir) = lookup("WABRIDGE_AUTH_DIR") {
        config.whatsapp.auth_dir = Some(dir.into());
    }
    if let Some(dir) = lookup("WABRIDGE_SIDECAR_DIR") {
        config.whatsapp.sidecar_dir = Some(dir.into());
    }
    if let Some(port) = lookup("WABRIDGE_SIDECAR_PORT") {
        match port.parse() {
            Ok(port) => config.whatsapp.sidecar_port = port,
            Err(_) => warn!(value = %port, "ignoring unparseable WABRIDGE_SIDECAR_PORT"),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let mut cfg = BridgeConfig {
            webhook_url: Some("https://file.example/hook".into()),
            ..Default::default()
        };
        let vars = env(&[
            ("WEBHOOK_URL", "https://env.example/hook"),
            ("PORT", "8080"),
            ("WABRIDGE_AUTH_DIR", "/tmp/auth"),
        ]);

        apply_env_overrides_from(&mut cfg, |k| vars.get(k).cloned());

        assert_eq!(cfg.webhook_url.as_deref(), Some("https://env.example/hook"));
        assert_eq!(cfg.gateway.port, 8080);
        assert_eq!(cfg.whatsapp.auth_dir(), PathBuf::from("/tmp/auth"));
    }

    #[test]
    fn unset_env_leaves_config_alone() {
        let mut cfg = BridgeConfig {
            webhook_url: Some("https://file.example/hook".into()),
            ..Default::default()
        };
        apply_env_overrides_from(&mut cfg, |_| None);
        assert_eq!(
            cfg.webhook_url.as_deref(),
            Some("https://file.example/hook")
        );
        assert_eq!(cfg.gateway.port, 3000);
    }

    #[test]
    fn bad_port_is_ignored() {
        let mut cfg = BridgeConfig::default();
        let vars = env(&[("PORT", "not-a-port")]);
        apply_env_overrides_from(&mut cfg, |k| vars.get(k).cloned());
        assert_eq!(cfg.gateway.port, 3000);
    }

    #[test]
    fn load_config_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "webhook_url = \"https://example.com/hook\"\n[gateway]\nport = 4000\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.webhook_url.as_deref(), Some("https://example.com/hook"));
        assert_eq!(cfg.gateway.port, 4000);
    }

    #[test]
    fn load_config_fails_on_missing_file() {
        assert!(load_config(Path::new("/nonexistent/wabridge.toml")).is_err());
    }
}
