use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Base URL of the Ultron service (e.g., "http://localhost:8000")
    pub base_url: Option<String>,
    /// Category slug opened when the console starts without one
    pub default_category: Option<String>,
    /// UI theme name ("dark" or "light")
    pub theme: Option<String>,
    /// Name shown before your own messages in the transcript and logs
    pub display_name: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        match ProjectDirs::from("org", "permacommons", "ultron-console") {
            Some(proj_dirs) => proj_dirs.config_dir().join("config.toml"),
            None => PathBuf::from("config.toml"),
        }
    }

    pub fn resolved_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn resolved_display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("You")
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset, using {DEFAULT_BASE_URL})"),
        }
        match &self.default_category {
            Some(category) => println!("  default-category: {category}"),
            None => println!("  default-category: (unset)"),
        }
        match &self.theme {
            Some(theme) => println!("  theme: {theme}"),
            None => println!("  theme: (unset)"),
        }
        match &self.display_name {
            Some(name) => println!("  display-name: {name}"),
            None => println!("  display-name: (unset)"),
        }
    }

    /// Set a config key from the CLI. Returns a confirmation line.
    pub fn set_key(&mut self, key: &str, value: String) -> Result<String, String> {
        match key {
            "base-url" => {
                self.base_url = Some(value.clone());
                Ok(format!("Set base-url to: {value}"))
            }
            "default-category" => {
                if crate::core::categories::find_category(&value).is_none() {
                    return Err(format!("Unknown category: {value}"));
                }
                self.default_category = Some(value.to_ascii_lowercase());
                Ok(format!("Set default-category to: {value}"))
            }
            "theme" => {
                if !matches!(value.as_str(), "dark" | "light") {
                    return Err(format!("Unknown theme: {value} (expected dark or light)"));
                }
                self.theme = Some(value.clone());
                Ok(format!("Set theme to: {value}"))
            }
            "display-name" => {
                self.display_name = Some(value.clone());
                Ok(format!("Set display-name to: {value}"))
            }
            _ => Err(format!("Unknown config key: {key}")),
        }
    }

    pub fn unset_key(&mut self, key: &str) -> Result<String, String> {
        match key {
            "base-url" => {
                self.base_url = None;
                Ok("Unset base-url".to_string())
            }
            "default-category" => {
                self.default_category = None;
                Ok("Unset default-category".to_string())
            }
            "theme" => {
                self.theme = None;
                Ok("Unset theme".to_string())
            }
            "display-name" => {
                self.display_name = None;
                Ok("Unset display-name".to_string())
            }
            _ => Err(format!("Unknown config key: {key}")),
        }
    }
}
