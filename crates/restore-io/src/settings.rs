//! `model.toml` loading.

use std::path::Path;

use anyhow::{Context, Result};
use restore_core::ModelSettings;

pub fn parse_settings(text: &str) -> Result<ModelSettings> {
    let settings: ModelSettings = toml::from_str(text).context("parsing model settings TOML")?;
    settings.validate()?;
    Ok(settings)
}

/// Load and validate settings. A relative `profiles_dir` is resolved against
/// the settings file's directory.
pub fn load_settings(path: &Path) -> Result<ModelSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings '{}'", path.display()))?;
    let mut settings =
        parse_settings(&text).with_context(|| format!("in settings '{}'", path.display()))?;
    if let (Some(profiles), Some(parent)) = (settings.profiles_dir.as_ref(), path.parent()) {
        if profiles.is_relative() {
            settings.profiles_dir = Some(parent.join(profiles));
        }
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_settings_rejected() {
        let err = parse_settings("first_year = 2020\nlast_year = 2030\nhour_slice = 5\n").unwrap_err();
        assert!(format!("{err:#}").contains("hour_slice"));
    }

    #[test]
    fn test_relative_profiles_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.toml");
        std::fs::write(&path, "profiles_dir = \"profiles\"\n").unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.profiles_dir, Some(dir.path().join("profiles")));
    }
}
