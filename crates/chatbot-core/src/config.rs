use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::ai::GenerationConfig;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_USERS_FILE: &str = "users.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub users_file: PathBuf,
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        let generation = GenerationConfig::default();
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: generation.temperature,
            top_p: generation.top_p,
            top_k: generation.top_k,
            max_output_tokens: generation.max_output_tokens,
            users_file: PathBuf::from(DEFAULT_USERS_FILE),
            export_dir: None,
        }
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// API key from the environment wins over the one saved in the config file
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.gemini_api_key.clone())
    }

    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
            ..GenerationConfig::default()
        }
    }

    /// Directory transcripts are written to; falls back to the current directory
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbot").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.top_k, 40);
        assert_eq!(config.max_output_tokens, 8192);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.model = "gemini-1.5-pro".to_string();
        config.temperature = 0.2;
        config.users_file = PathBuf::from("/tmp/people.json");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": "gemini-2.0-flash"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.users_file, PathBuf::from("users.json"));
        assert!((config.top_p - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn test_generation_uses_config_values() {
        let mut config = Config::new();
        config.top_k = 10;
        let generation = config.generation();
        assert_eq!(generation.top_k, 10);
        assert_eq!(generation.response_mime_type, "text/plain");
    }
}
