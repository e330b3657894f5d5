use crate::util::cli::{Report, Reportable};
use std::{ffi::OsStr, fmt::Debug};
use thiserror::Error;

pub trait ExplicitEnv: Debug {
    fn explicit_env(&self) -> Vec<(&str, &OsStr)>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("The `HOME` environment variable isn't set, which is pretty weird: {0}")]
    HomeNotSet(#[source] std::env::VarError),
    #[error("The `PATH` environment variable isn't set, which is super weird: {0}")]
    PathNotSet(#[source] std::env::VarError),
}

impl Reportable for Error {
    fn report(&self) -> Report {
        Report::error("Failed to initialize base environment", self)
    }
}

/// The subset of the caller's environment forwarded to `xcrun` and
/// `xcodebuild`. `DEVELOPER_DIR` selects between installed Xcodes.
#[derive(Debug)]
pub struct Env {
    home: String,
    path: String,
    term: Option<String>,
    developer_dir: Option<String>,
}

impl Env {
    pub fn new() -> Result<Self, Error> {
        let home = std::env::var("HOME").map_err(Error::HomeNotSet)?;
        let path = std::env::var("PATH").map_err(Error::PathNotSet)?;
        let term = std::env::var("TERM").ok();
        let developer_dir = std::env::var("DEVELOPER_DIR").ok();
        if let Some(developer_dir) = &developer_dir {
            log::info!("using Xcode at `DEVELOPER_DIR` {:?}", developer_dir);
        }
        Ok(Self {
            home,
            path,
            term,
            developer_dir,
        })
    }
}

impl ExplicitEnv for Env {
    fn explicit_env(&self) -> Vec<(&str, &OsStr)> {
        let mut env = vec![("HOME", self.home.as_ref()), ("PATH", self.path.as_ref())];
        if let Some(term) = self.term.as_ref() {
            env.push(("TERM", term.as_ref()));
        }
        if let Some(developer_dir) = self.developer_dir.as_ref() {
            env.push(("DEVELOPER_DIR", developer_dir.as_ref()));
        }
        env
    }
}
