//! Project manifest (`package.json`) loading.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::RegistryError;

/// Parsed project manifest. Only dependency-related fields matter here;
/// everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: HashMap<String, String>,
}

/// Extra dependencies injected by the caller, merged over the manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestOverride {
    pub dependencies: HashMap<String, String>,
    pub dev_dependencies: HashMap<String, String>,
}

impl Manifest {
    /// Union of dev and production dependencies (production wins on a name
    /// collision), with the override merged on top, sorted by name.
    pub fn declared_dependencies(
        &self,
        override_: Option<&ManifestOverride>,
    ) -> BTreeMap<String, String> {
        let mut declared = BTreeMap::new();
        for (name, version) in &self.dev_dependencies {
            declared.insert(name.clone(), version.clone());
        }
        for (name, version) in &self.dependencies {
            declared.insert(name.clone(), version.clone());
        }
        if let Some(extra) = override_ {
            for (name, version) in &extra.dev_dependencies {
                declared.insert(name.clone(), version.clone());
            }
            for (name, version) in &extra.dependencies {
                declared.insert(name.clone(), version.clone());
            }
        }
        declared
    }
}

/// Walk up from `dir` looking for a `package.json`.
///
/// The first directory that has one becomes the project root. A missing
/// manifest is not an error; unreadable or malformed ones surface.
pub(crate) async fn locate(dir: &Path) -> Result<Option<(PathBuf, Manifest)>, RegistryError> {
    let mut current = Some(dir);
    while let Some(candidate_dir) = current {
        let candidate = candidate_dir.join("package.json");
        match tokio::fs::read(&candidate).await {
            Ok(bytes) => {
                let manifest = serde_json::from_slice(&bytes).map_err(|err| {
                    RegistryError::Manifest {
                        path: candidate.display().to_string(),
                        message: err.to_string(),
                    }
                })?;
                return Ok(Some((candidate_dir.to_path_buf(), manifest)));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(RegistryError::Read {
                    path: candidate.display().to_string(),
                    message: err.to_string(),
                });
            }
        }
        current = candidate_dir.parent();
    }
    Ok(None)
}
