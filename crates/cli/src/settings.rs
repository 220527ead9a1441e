// CLI settings
// Loaded from ~/.config/gridcalc/settings.toml

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use gridcalc_engine::cell_ref::Limits;

/// Grid limits for every sheet this invocation touches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            max_rows: limits.max_rows,
            max_cols: limits.max_cols,
        }
    }
}

impl Settings {
    fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridcalc");
        config_dir.join("settings.toml")
    }

    /// Load settings, preferring an explicit path over the default
    /// location. A missing file falls back to defaults silently; a
    /// malformed one falls back with a warning.
    pub fn load(override_path: Option<&Path>) -> Self {
        match override_path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::config_path()),
        }
    }

    fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                eprintln!("warning: could not read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match toml::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("warning: ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_rows: self.max_rows,
            max_cols: self.max_cols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_from(Path::new("/nonexistent/settings.toml"));
        let defaults = Limits::default();
        assert_eq!(settings.max_rows, defaults.max_rows);
        assert_eq!(settings.max_cols, defaults.max_cols);
    }

    #[test]
    fn test_full_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "max_rows = 100").unwrap();
        writeln!(file, "max_cols = 10").unwrap();
        let settings = Settings::load_from(file.path());
        assert_eq!(settings.max_rows, 100);
        assert_eq!(settings.max_cols, 10);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "max_rows = 1000").unwrap();
        let settings = Settings::load_from(file.path());
        assert_eq!(settings.max_rows, 1000);
        assert_eq!(settings.max_cols, Limits::default().max_cols);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "max_rows = \"lots\"").unwrap();
        let settings = Settings::load_from(file.path());
        assert_eq!(settings.max_rows, Limits::default().max_rows);
    }
}
