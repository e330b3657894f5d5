use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to get user's home directory!")]
pub struct NoHomeDir;

pub fn home_dir() -> Result<PathBuf, NoHomeDir> {
    home::home_dir().ok_or(NoHomeDir)
}

pub fn expand_home(path: impl AsRef<Path>) -> Result<PathBuf, NoHomeDir> {
    let path = path.as_ref();
    if let Ok(rest) = path.strip_prefix("~") {
        Ok(home_dir()?.join(rest))
    } else {
        Ok(path.to_owned())
    }
}
