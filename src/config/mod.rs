mod raw;

pub use self::raw::*;

use crate::util::{
    self,
    cli::{Report, Reportable},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub static DEFAULT_DEVICE: &str = "iPhone 15";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Neither `workspace` nor `project` was set.")]
    ProjectMissing,
    #[error("Both `workspace` ({workspace:?}) and `project` ({project:?}) were set; only one is allowed.")]
    ProjectAmbiguous { workspace: PathBuf, project: PathBuf },
    #[error("`scheme` wasn't set.")]
    SchemeMissing,
    #[error("`devices` was set to an empty list.")]
    DevicesEmpty,
    #[error("`test-without-building` and `clean` can't be combined.")]
    CleanWithoutBuilding,
    #[error("Failed to expand `log-path`: {0}")]
    LogPathInvalid(#[from] util::NoHomeDir),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        let msg = format!("`{}` is invalid", Raw::file_name());
        match self {
            Self::ProjectMissing | Self::SchemeMissing | Self::DevicesEmpty => {
                Report::action_request(msg, self)
            }
            _ => Report::error(msg, self),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    RawFailed(#[from] raw::LoadError),
    #[error("No `{}` was found in {cwd:?} or any of its parents.", Raw::file_name())]
    NotFound { cwd: PathBuf },
    #[error(transparent)]
    Invalid(#[from] Error),
}

impl Reportable for LoadError {
    fn report(&self) -> Report {
        match self {
            Self::RawFailed(err) => Report::error("Failed to load config", err),
            Self::NotFound { .. } => Report::action_request(
                format!("Please create a `{}` and try again!", Raw::file_name()),
                self,
            ),
            Self::Invalid(err) => err.report(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Project {
    Workspace(PathBuf),
    Project(PathBuf),
}

impl Project {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Workspace(_) => "-workspace",
            Self::Project(_) => "-project",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Workspace(path) | Self::Project(path) => path,
        }
    }
}

/// Validated snapshot settings. Paths are absolute, relative ones having been
/// joined onto the directory containing `snapshot.toml`.
#[derive(Clone, Debug)]
pub struct Config {
    root_dir: PathBuf,
    project: Project,
    scheme: String,
    configuration: Option<String>,
    devices: Vec<String>,
    ios_version: Option<String>,
    xcpretty_args: String,
    sdk: Option<String>,
    derived_data_path: Option<PathBuf>,
    result_bundle_path: Option<PathBuf>,
    testplan: Option<String>,
    only_testing: Vec<String>,
    skip_testing: Vec<String>,
    xcargs: Option<String>,
    test_target_name: Option<String>,
    clean: bool,
    test_without_building: bool,
    log_path: Option<PathBuf>,
}

impl Config {
    pub fn from_raw(root_dir: PathBuf, raw: Raw) -> Result<Self, Error> {
        let resolve = |path: PathBuf| root_dir.join(path);
        let project = match (raw.workspace, raw.project) {
            (Some(workspace), None) => Project::Workspace(resolve(workspace)),
            (None, Some(project)) => Project::Project(resolve(project)),
            (Some(workspace), Some(project)) => {
                return Err(Error::ProjectAmbiguous { workspace, project })
            }
            (None, None) => return Err(Error::ProjectMissing),
        };
        let scheme = raw.scheme.ok_or(Error::SchemeMissing)?;
        let devices = match raw.devices {
            Some(devices) if devices.is_empty() => return Err(Error::DevicesEmpty),
            Some(devices) => devices,
            None => {
                log::info!("`devices` not set; defaulting to {:?}", DEFAULT_DEVICE);
                vec![DEFAULT_DEVICE.to_owned()]
            }
        };
        let clean = raw.clean.unwrap_or_default();
        let test_without_building = raw.test_without_building.unwrap_or_default();
        if clean && test_without_building {
            return Err(Error::CleanWithoutBuilding);
        }
        let log_path = raw
            .log_path
            .map(|path| util::expand_home(path).map(resolve))
            .transpose()?;
        Ok(Self {
            project,
            scheme,
            configuration: raw.configuration,
            devices,
            ios_version: raw.ios_version,
            xcpretty_args: raw.xcpretty_args.unwrap_or_default(),
            sdk: raw.sdk,
            derived_data_path: raw.derived_data_path.map(resolve),
            result_bundle_path: raw.result_bundle_path.map(resolve),
            testplan: raw.testplan,
            only_testing: raw.only_testing.unwrap_or_default(),
            skip_testing: raw.skip_testing.unwrap_or_default(),
            xcargs: raw.xcargs,
            test_target_name: raw.test_target_name,
            clean,
            test_without_building,
            log_path,
            root_dir,
        })
    }

    pub fn load(cwd: impl AsRef<Path>) -> Result<Self, LoadError> {
        let cwd = cwd.as_ref();
        let (root_dir, raw) = Raw::load(cwd)?.ok_or_else(|| LoadError::NotFound {
            cwd: cwd.to_owned(),
        })?;
        Self::from_raw(root_dir, raw).map_err(LoadError::from)
    }

    /// Replaces the configured devices, unless `devices` is empty.
    pub fn override_devices(&mut self, devices: Vec<String>) {
        if !devices.is_empty() {
            self.devices = devices;
        }
    }

    pub fn override_ios_version(&mut self, ios_version: Option<String>) {
        if ios_version.is_some() {
            self.ios_version = ios_version;
        }
    }

    /// Relative paths are taken from `cwd`, where the flag was typed, since
    /// the command itself runs from `root_dir`.
    pub fn override_log_path(
        &mut self,
        log_path: Option<PathBuf>,
        cwd: &Path,
    ) -> Result<(), Error> {
        if let Some(log_path) = log_path {
            self.log_path = Some(cwd.join(util::expand_home(log_path)?));
        }
        Ok(())
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    pub fn ios_version(&self) -> Option<&str> {
        self.ios_version.as_deref()
    }

    pub fn xcpretty_args(&self) -> &str {
        &self.xcpretty_args
    }

    pub fn sdk(&self) -> Option<&str> {
        self.sdk.as_deref()
    }

    pub fn derived_data_path(&self) -> Option<&Path> {
        self.derived_data_path.as_deref()
    }

    pub fn result_bundle_path(&self) -> Option<&Path> {
        self.result_bundle_path.as_deref()
    }

    pub fn testplan(&self) -> Option<&str> {
        self.testplan.as_deref()
    }

    pub fn only_testing(&self) -> &[String] {
        &self.only_testing
    }

    pub fn skip_testing(&self) -> &[String] {
        &self.skip_testing
    }

    pub fn xcargs(&self) -> Option<&str> {
        self.xcargs.as_deref()
    }

    pub fn test_target_name(&self) -> Option<&str> {
        self.test_target_name.as_deref()
    }

    pub fn clean(&self) -> bool {
        self.clean
    }

    pub fn test_without_building(&self) -> bool {
        self.test_without_building
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}

#[cfg(test)]
pub(crate) fn test_config(raw: Raw) -> Config {
    Config::from_raw(PathBuf::from("/Users/ci/App"), raw).unwrap()
}
