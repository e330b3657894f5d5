use crate::{
    opts::SigningStyle,
    util::cli::{Report, Reportable},
};
use once_cell_regex::{exports::regex::NoExpand, regex};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

static PROJECT_FILE_NAME: &str = "project.pbxproj";

#[derive(Debug, Error)]
pub enum CodesigningError {
    #[error("Could not find path to project config {path:?}. Pass the path to your project (not workspace)!")]
    ProjectFileMissing { path: PathBuf },
    #[error("Failed to read project config {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("Failed to write project config {path:?}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

impl Reportable for CodesigningError {
    fn report(&self) -> Report {
        match self {
            Self::ProjectFileMissing { .. } => {
                Report::action_request("Please pass the path to an `.xcodeproj`", self)
            }
            _ => Report::error("Failed to update codesigning settings", self),
        }
    }
}

/// Rewrites every `ProvisioningStyle` entry, returning the patched text and
/// how many entries were rewritten.
pub fn set_provisioning_style(pbxproj: &str, style: SigningStyle) -> (String, usize) {
    let re = regex!(r"ProvisioningStyle = .*;");
    let count = re.find_iter(pbxproj).count();
    let replacement = format!("ProvisioningStyle = {};", style);
    let patched = re.replace_all(pbxproj, NoExpand(&replacement)).into_owned();
    (patched, count)
}

pub fn update_project_automatic_codesigning(
    project_dir: &Path,
    style: SigningStyle,
) -> Result<usize, CodesigningError> {
    let path = project_dir.join(PROJECT_FILE_NAME);
    if !path.is_file() {
        return Err(CodesigningError::ProjectFileMissing { path });
    }
    log::info!(
        "updating the automatic codesigning flag to {} for {:?}",
        if style.automatic() { "enabled" } else { "disabled" },
        path
    );
    let pbxproj = fs::read_to_string(&path).map_err(|source| CodesigningError::ReadFailed {
        path: path.clone(),
        source,
    })?;
    let (patched, count) = set_provisioning_style(&pbxproj, style);
    fs::write(&path, patched).map_err(|source| CodesigningError::WriteFailed {
        path: path.clone(),
        source,
    })?;
    log::info!(
        "set `ProvisioningStyle = {}` on {} target(s) in {:?}",
        style,
        count,
        path
    );
    Ok(count)
}

#[cfg(test)]
mod test {
    use super::*;

    static PBXPROJ: &str = "\
\t\tTargetAttributes = {
\t\t\t1D6058900D05DD3D006BFB54 = {
\t\t\t\tDevelopmentTeam = ABCDE12345;
\t\t\t\tProvisioningStyle = Manual;
\t\t\t};
\t\t\t2A1C9F0B1F2E3D4C5B6A7988 = {
\t\t\t\tProvisioningStyle = Automatic;
\t\t\t\tTestTargetID = 1D6058900D05DD3D006BFB54;
\t\t\t};
\t\t};
";

    #[test]
    fn test_set_provisioning_style_rewrites_every_target() {
        let (patched, count) = set_provisioning_style(PBXPROJ, SigningStyle::Automatic);
        assert_eq!(count, 2);
        assert_eq!(patched.matches("ProvisioningStyle = Automatic;").count(), 2);
        assert!(patched.contains("DevelopmentTeam = ABCDE12345;"));
        assert!(patched.contains("TestTargetID = 1D6058900D05DD3D006BFB54;"));
    }

    #[test]
    fn test_update_writes_project_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_FILE_NAME), PBXPROJ).unwrap();
        let count = update_project_automatic_codesigning(dir.path(), SigningStyle::Manual).unwrap();
        assert_eq!(count, 2);
        let written = fs::read_to_string(dir.path().join(PROJECT_FILE_NAME)).unwrap();
        assert!(!written.contains("Automatic"));
    }

    #[test]
    fn test_update_requires_project_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            update_project_automatic_codesigning(dir.path(), SigningStyle::Automatic),
            Err(CodesigningError::ProjectFileMissing { .. })
        ));
    }
}
