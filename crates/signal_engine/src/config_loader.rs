use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::EngineConfig;

pub const CONFIG_PATH_ENV: &str = "STUDIO_ENGINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "configs/engine.toml";

pub fn engine_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_engine_config() -> Result<EngineConfig> {
    load_engine_config_from(engine_config_path())
}

/// A missing file means defaults; anything unreadable or malformed is an error.
pub fn load_engine_config_from(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "engine config not found; using defaults");
            return Ok(EngineConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read engine config {}", path.display()))
        }
    };
    let cfg = parse_engine_config(&raw)
        .with_context(|| format!("load engine config {}", path.display()))?;
    tracing::info!(path = %path.display(), "engine config loaded");
    Ok(cfg)
}

pub fn parse_engine_config(raw: &str) -> Result<EngineConfig> {
    let cfg: EngineConfig = toml::from_str(raw).context("parse engine config toml")?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn render_engine_config(cfg: &EngineConfig) -> Result<String> {
    toml::to_string_pretty(cfg).context("render engine config toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{name}", core_types::new_id()))
    }

    #[test]
    fn partial_sections_fill_with_defaults() {
        let cfg = parse_engine_config(
            r#"
            [alternation]
            window = 8

            [manipulation]
            draw_lock_pressure = 40
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.alternation.window, 8);
        assert_eq!(cfg.alternation.threshold, 0.70);
        assert_eq!(cfg.manipulation.draw_lock_pressure, 40);
        assert_eq!(cfg.history, EngineConfig::default().history);
    }

    #[test]
    fn rendered_config_parses_back() {
        let mut cfg = EngineConfig::default();
        cfg.history.capacity = 90;
        cfg.fusion.draw_entry_confidence = 60;
        let raw = render_engine_config(&cfg).expect("render");
        assert_eq!(parse_engine_config(&raw).expect("parse"), cfg);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_engine_config("[alternation]\nthreshold = 0.0\n").expect_err("invalid");
        assert!(format!("{err:#}").contains("alternation.threshold"));
        assert!(parse_engine_config("[history\ncapacity = 3").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_engine_config_from(scratch_path("absent.toml")).expect("defaults");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = scratch_path("broken.toml");
        fs::write(&path, "[regime]\nwindow_blocks = \"six\"\n").expect("write");
        let res = load_engine_config_from(&path);
        let _ = fs::remove_file(&path);
        assert!(res.is_err());
    }
}
