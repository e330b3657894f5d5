use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to canonicalize path while searching for config file: {0}")]
    DiscoverFailed(#[source] io::Error),
    #[error("Failed to read config file at {path:?}: {cause}")]
    ReadFailed { path: PathBuf, cause: io::Error },
    #[error("Failed to parse config file at {path:?}: {cause}")]
    ParseFailed {
        path: PathBuf,
        cause: toml::de::Error,
    },
}

/// `snapshot.toml`, as written by the user.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Raw {
    pub workspace: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub scheme: Option<String>,
    pub configuration: Option<String>,
    pub devices: Option<Vec<String>>,
    pub ios_version: Option<String>,
    pub xcpretty_args: Option<String>,
    pub sdk: Option<String>,
    pub derived_data_path: Option<PathBuf>,
    pub result_bundle_path: Option<PathBuf>,
    pub testplan: Option<String>,
    pub only_testing: Option<Vec<String>>,
    pub skip_testing: Option<Vec<String>>,
    pub xcargs: Option<String>,
    pub test_target_name: Option<String>,
    pub clean: Option<bool>,
    pub test_without_building: Option<bool>,
    pub log_path: Option<PathBuf>,
}

impl Raw {
    pub fn file_name() -> String {
        format!("{}.toml", crate::NAME)
    }

    pub fn discover_root(cwd: impl AsRef<Path>) -> io::Result<Option<PathBuf>> {
        let file_name = Self::file_name();
        let mut path = cwd.as_ref().canonicalize()?.join(&file_name);
        log::info!("looking for config file at {:?}", path);
        while !path.exists() {
            if let Some(parent) = path.parent().and_then(Path::parent) {
                path = parent.join(&file_name);
                log::info!("looking for config file at {:?}", path);
            } else {
                log::info!("no config file was ever found");
                return Ok(None);
            }
        }
        log::info!("found config file at {:?}", path);
        path.pop();
        Ok(Some(path))
    }

    pub fn from_toml(path: &Path, bytes: &[u8]) -> Result<Self, LoadError> {
        toml::from_slice::<Self>(bytes).map_err(|cause| LoadError::ParseFailed {
            path: path.to_owned(),
            cause,
        })
    }

    pub fn load(cwd: impl AsRef<Path>) -> Result<Option<(PathBuf, Self)>, LoadError> {
        Self::discover_root(cwd)
            .map_err(LoadError::DiscoverFailed)?
            .map(|root_dir| {
                let path = root_dir.join(Self::file_name());
                let bytes = fs::read(&path).map_err(|cause| LoadError::ReadFailed {
                    path: path.clone(),
                    cause,
                })?;
                Self::from_toml(&path, &bytes).map(|raw| (root_dir, raw))
            })
            .transpose()
    }
}
