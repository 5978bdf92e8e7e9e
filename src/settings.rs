use serde::{Deserialize, Serialize};

/// Settings file next to the executable; load and save must agree on it.
pub const SETTINGS_FILE: &str = "settings.json";

fn default_store_path() -> String {
    "protected_apps.json".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional log file. When unset, logs go to stderr only.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Where the protected-app list is persisted.
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            store_path: default_store_path(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
