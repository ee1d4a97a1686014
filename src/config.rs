//! On-disk configuration: settings file, controller descriptors, profiles.
//!
//! Layout under the base directory (defaults to the platform config dir):
//!
//! ```text
//! joymap/
//! ├── settings.toml             active profile, paths, timestep
//! ├── settings/controllers.json descriptor per controller type
//! └── profiles/*.json           one or more profiles per file
//! ```

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::controller::ControllerDescriptor;
use crate::mapping::ProfileConfig;

fn default_controllers_path() -> PathBuf {
    PathBuf::from("settings/controllers.json")
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from("profiles")
}

fn default_step_dt() -> f32 {
    crate::mapping::engine::DEFAULT_STEP_DT
}

/// Top-level settings from `settings.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Name of the profile to activate at startup
    pub profile: String,

    /// Descriptor table path, relative to the base directory
    #[serde(default = "default_controllers_path")]
    pub controllers: PathBuf,

    /// Profile directory, relative to the base directory
    #[serde(default = "default_profiles_dir")]
    pub profiles: PathBuf,

    /// Fixed simulation timestep in seconds
    #[serde(default = "default_step_dt")]
    pub step_dt: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: "desktop".to_string(),
            controllers: default_controllers_path(),
            profiles: default_profiles_dir(),
            step_dt: default_step_dt(),
        }
    }
}

/// Base directory holding settings, descriptors, and profiles
pub fn base_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("joymap"))
        .unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        })
}

/// Loads `settings.toml`, falling back to defaults if it does not exist
pub async fn load_settings(base: &Path) -> Result<Settings> {
    let path = base.join("settings.toml");
    if !path.exists() {
        warn!("Settings file {:?} does not exist, using defaults", path);
        return Ok(Settings::default());
    }

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| eyre!("Failed to read settings file {:?}: {}", path, e))?;
    let settings: Settings =
        toml::from_str(&content).map_err(|e| eyre!("Failed to parse settings file: {}", e))?;
    info!("Loaded settings: active profile {:?}", settings.profile);
    Ok(settings)
}

/// Loads the descriptor table and validates every descriptor
pub async fn load_descriptors(
    base: &Path,
    settings: &Settings,
) -> Result<HashMap<String, Arc<ControllerDescriptor>>> {
    let path = base.join(&settings.controllers);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| eyre!("Failed to read controller descriptors {:?}: {}", path, e))?;
    let raw: HashMap<String, ControllerDescriptor> = serde_json::from_str(&content)
        .map_err(|e| eyre!("Failed to parse controller descriptors: {}", e))?;

    let mut descriptors = HashMap::new();
    for (name, descriptor) in raw {
        descriptor
            .validate()
            .map_err(|e| eyre!("Invalid descriptor for controller {:?}: {}", name, e))?;
        debug!(
            "Descriptor {:?}: {} buttons, {} axes, {} vectors",
            name,
            descriptor.buttons.len(),
            descriptor.axes.len(),
            descriptor.vectors.len()
        );
        descriptors.insert(name, Arc::new(descriptor));
    }
    info!("Loaded {} controller descriptors", descriptors.len());
    Ok(descriptors)
}

/// Loads and merges every profile file in the profile directory
///
/// Each `*.json` file maps profile names to their configs; a name defined in
/// two files is an error rather than a silent override.
pub async fn load_profiles(
    base: &Path,
    settings: &Settings,
) -> Result<HashMap<String, ProfileConfig>> {
    let dir = base.join(&settings.profiles);
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| eyre!("Failed to read profile directory {:?}: {}", dir, e))?;

    let mut profiles: HashMap<String, ProfileConfig> = HashMap::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| eyre!("Failed to list profile directory {:?}: {}", dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| eyre!("Failed to read profile file {:?}: {}", path, e))?;
        let file_profiles: HashMap<String, ProfileConfig> = serde_json::from_str(&content)
            .map_err(|e| eyre!("Failed to parse profile file {:?}: {}", path, e))?;

        for (name, config) in file_profiles {
            debug!("Profile {:?} from {:?}", name, path);
            if profiles.insert(name.clone(), config).is_some() {
                return Err(eyre!("Profile {:?} is defined more than once", name));
            }
        }
    }

    info!("Loaded {} profiles", profiles.len());
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults_fill_missing_fields() {
        let settings: Settings = toml::from_str(r#"profile = "gaming""#).unwrap();
        assert_eq!(settings.profile, "gaming");
        assert_eq!(settings.controllers, default_controllers_path());
        assert_eq!(settings.profiles, default_profiles_dir());
        assert!((settings.step_dt - default_step_dt()).abs() < 1e-6);
    }

    #[tokio::test]
    async fn missing_settings_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("joymap-test-missing-settings");
        let settings = load_settings(&dir).await.unwrap();
        assert_eq!(settings.profile, Settings::default().profile);
    }

    #[tokio::test]
    async fn profiles_merge_across_files_and_reject_duplicates() {
        let dir = std::env::temp_dir().join("joymap-test-profiles");
        let profiles_dir = dir.join("profiles");
        tokio::fs::create_dir_all(&profiles_dir).await.unwrap();

        let entry = r#"{ "desktop": { "controller": "xbox", "id": 0, "mappings": {} } }"#;
        tokio::fs::write(profiles_dir.join("a.json"), entry)
            .await
            .unwrap();

        let settings = Settings::default();
        let profiles = load_profiles(&dir, &settings).await.unwrap();
        assert!(profiles.contains_key("desktop"));

        tokio::fs::write(profiles_dir.join("b.json"), entry)
            .await
            .unwrap();
        assert!(load_profiles(&dir, &settings).await.is_err());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
