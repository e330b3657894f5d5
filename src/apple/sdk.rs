use super::snapshot::{LatestOsVersion, OsFamily};
use crate::{
    env::{Env, ExplicitEnv as _},
    util::{self, RunAndSearchError},
    DuctExpressionExt,
};
use once_cell_regex::{exports::regex::Regex, regex};
use std::{cell::RefCell, collections::HashMap};
use thiserror::Error;

static SDK_COMMAND: &str = "xcodebuild -version -sdk";

#[derive(Debug, Error)]
pub enum VersionLookupError {
    #[error("Failed to find the latest {os} simulator SDK: {source}")]
    LookupFailed {
        os: OsFamily,
        source: RunAndSearchError,
    },
}

// `xcodebuild -version -sdk` prints a header per SDK such as
// `iPhoneSimulator16.4.sdk - Simulator - iOS 16.4 (iphonesimulator16.4)`.
fn sdk_regex(os: OsFamily) -> &'static Regex {
    match os {
        OsFamily::Ios => regex!(r"\biOS (?P<version>\d+(?:\.\d+)*) \(iphonesimulator[\d.]*\)"),
        OsFamily::Tvos => {
            regex!(r"\btvOS (?P<version>\d+(?:\.\d+)*) \(appletvsimulator[\d.]*\)")
        }
        OsFamily::Macos => regex!(r"\bmacOS (?P<version>\d+(?:\.\d+)*) \(macosx[\d.]*\)"),
    }
}

pub fn parse_latest_version(os: OsFamily, output: &str) -> Result<String, RunAndSearchError> {
    util::search(SDK_COMMAND, output, sdk_regex(os), |_text, caps| {
        caps["version"].to_owned()
    })
}

/// Latest installed SDK version per OS family, as reported by the active
/// Xcode. Each family is looked up at most once per instance.
#[derive(Debug)]
pub struct XcodebuildSdks<'a> {
    env: &'a Env,
    cache: RefCell<HashMap<OsFamily, String>>,
}

impl<'a> XcodebuildSdks<'a> {
    pub fn new(env: &'a Env) -> Self {
        Self {
            env,
            cache: Default::default(),
        }
    }
}

impl LatestOsVersion for XcodebuildSdks<'_> {
    fn version(&self, os: OsFamily) -> Result<String, VersionLookupError> {
        if let Some(version) = self.cache.borrow().get(&os) {
            return Ok(version.clone());
        }
        let version = util::run_and_search(
            &mut duct::cmd("xcodebuild", ["-version", "-sdk"])
                .vars(self.env.explicit_env())
                .stderr_null(),
            sdk_regex(os),
            |_text, caps| caps["version"].to_owned(),
        )
        .map_err(|source| VersionLookupError::LookupFailed { os, source })?;
        log::info!("detected latest {} SDK version {}", os, version);
        self.cache.borrow_mut().insert(os, version.clone());
        Ok(version)
    }
}
