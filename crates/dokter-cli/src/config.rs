//! Secrets and configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides the secrets file location
pub const SECRETS_PATH_ENV: &str = "DOKTER_SECRETS_PATH";

/// A secrets file that exists but cannot be used
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `secrets.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Secrets {
    /// Gemini API key
    pub gemini_api_key: Option<String>,
    /// Model id to chat with
    pub model: Option<String>,
    /// Whether to use the full-screen UI by default
    pub tui: Option<bool>,
    /// "dark" or "light"
    pub theme: Option<String>,
}

impl Secrets {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dokter")
    }

    /// Location of the secrets file, honoring `DOKTER_SECRETS_PATH`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(SECRETS_PATH_ENV) {
            return PathBuf::from(path);
        }
        Self::config_dir().join("secrets.toml")
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the file at `path`. A missing file yields defaults; an
    /// unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no secrets file");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the commented template to `path` unless a file is already there
    pub fn init(path: &Path) -> io::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, example_config())?;
        Ok(true)
    }

    /// The key from the file, else from `GEMINI_API_KEY` / `GOOGLE_API_KEY`
    pub fn api_key(&self) -> Option<String> {
        dokter_ai::providers::get_api_key(self.gemini_api_key.as_deref()).ok()
    }

    pub fn theme(&self) -> dokter_tui::Theme {
        match self.theme.as_deref() {
            Some("light") => dokter_tui::Theme::light(),
            _ => dokter_tui::Theme::dark(),
        }
    }
}

/// Template written by `--init-config`
pub fn example_config() -> &'static str {
    r#"# dokter secrets file
# Place at ~/.config/dokter/secrets.toml (Linux), ~/Library/Application Support/dokter/secrets.toml (macOS)
# or point DOKTER_SECRETS_PATH at it.

# Gemini API key (required). GEMINI_API_KEY or GOOGLE_API_KEY are used when unset.
# gemini_api_key = "AIza..."

# Model to chat with
model = "gemini-1.5-flash"

# Full-screen terminal UI (set to false for plain line mode)
tui = true

# Color theme: "dark" or "light"
theme = "dark"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let secrets = Secrets::parse(
            r#"
gemini_api_key = "AIzaSyExample"
model = "gemini-2.0-flash"
tui = false
"#,
        )
        .unwrap();
        assert_eq!(secrets.gemini_api_key.as_deref(), Some("AIzaSyExample"));
        assert_eq!(secrets.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(secrets.tui, Some(false));
        assert_eq!(secrets.api_key().as_deref(), Some("AIzaSyExample"));
    }

    #[test]
    fn test_template_parses_without_key() {
        let secrets = Secrets::parse(example_config()).unwrap();
        assert!(secrets.gemini_api_key.is_none());
        assert_eq!(secrets.model.as_deref(), Some(dokter_ai::models::DEFAULT_MODEL_ID));
        assert_eq!(secrets.tui, Some(true));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let secrets = Secrets::parse("theme = \"light\"\nextra = 1\n").unwrap();
        assert!(secrets.model.is_none());
        assert_eq!(secrets.theme().text, dokter_tui::Theme::light().text);
    }

    #[test]
    fn test_load_and_init_round_trip() {
        let dir = std::env::temp_dir().join(format!("dokter-config-{}", std::process::id()));
        let path = dir.join("secrets.toml");
        let _ = fs::remove_dir_all(&dir);

        assert!(Secrets::load(&path).unwrap().gemini_api_key.is_none());
        assert!(Secrets::init(&path).unwrap());
        assert!(!Secrets::init(&path).unwrap());
        assert_eq!(Secrets::load(&path).unwrap().tui, Some(true));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("dokter-bad-config-{}", std::process::id()));
        let path = dir.join("secrets.toml");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        // The key is fine but the unquoted theme breaks the file
        fs::write(&path, "gemini_api_key = \"AIzaSyReal\"\ntheme = dark\n").unwrap();
        let err = Secrets::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("secrets.toml"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        // A directory exists at the path but cannot be read as a file
        let dir = std::env::temp_dir().join(format!("dokter-dir-config-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        assert!(matches!(Secrets::load(&dir), Err(ConfigError::Read { .. })));

        let _ = fs::remove_dir_all(&dir);
    }
}
