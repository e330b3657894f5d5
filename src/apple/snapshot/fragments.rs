use super::CommandFragments;
use crate::{
    config::Config,
    util::{self, ShellEscapeError},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

static PREFIX: &str = "set -o pipefail &&";
static SNAPSHOT_SETTING: &str = "FASTLANE_SNAPSHOT=YES";

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("`{key}` path {path:?} isn't valid UTF-8.")]
    PathInvalidUtf8 { key: &'static str, path: PathBuf },
    #[error("`{key}` can't be passed to `xcodebuild`: {source}")]
    Unescapable {
        key: &'static str,
        source: ShellEscapeError,
    },
}

fn escape(key: &'static str, value: &str) -> Result<String, FragmentError> {
    util::shell_escape(value)
        .map(|escaped| escaped.into_owned())
        .map_err(|source| FragmentError::Unescapable { key, source })
}

fn escape_path(key: &'static str, path: &Path) -> Result<String, FragmentError> {
    let raw = path.to_str().ok_or_else(|| FragmentError::PathInvalidUtf8 {
        key,
        path: path.to_owned(),
    })?;
    escape(key, raw)
}

/// The non-destination parts of the command line, derived from `snapshot.toml`.
///
/// Everything user-supplied is escaped up front, except `xcargs`, which is
/// a verbatim argument string.
#[derive(Clone, Debug)]
pub struct ConfigFragments {
    options: Vec<String>,
    test_target_name: Option<String>,
    actions: Vec<&'static str>,
}

impl ConfigFragments {
    pub fn new(config: &Config) -> Result<Self, FragmentError> {
        let project = config.project();
        let mut options = vec![
            format!(
                "{} {}",
                project.flag(),
                escape_path("project", project.path())?
            ),
            format!("-scheme {}", escape("scheme", config.scheme())?),
        ];
        if let Some(configuration) = config.configuration() {
            options.push(format!(
                "-configuration {}",
                escape("configuration", configuration)?
            ));
        }
        if let Some(sdk) = config.sdk() {
            options.push(format!("-sdk {}", escape("sdk", sdk)?));
        }
        if let Some(path) = config.derived_data_path() {
            options.push(format!(
                "-derivedDataPath {}",
                escape_path("derived-data-path", path)?
            ));
        }
        if let Some(path) = config.result_bundle_path() {
            options.push(format!(
                "-resultBundlePath {}",
                escape_path("result-bundle-path", path)?
            ));
        }
        if let Some(testplan) = config.testplan() {
            options.push(format!("-testPlan {}", escape("testplan", testplan)?));
        }
        for identifier in config.only_testing() {
            options.push(escape("only-testing", &format!("-only-testing:{}", identifier))?);
        }
        for identifier in config.skip_testing() {
            options.push(escape("skip-testing", &format!("-skip-testing:{}", identifier))?);
        }
        if let Some(xcargs) = config.xcargs() {
            options.push(xcargs.to_owned());
        }
        let test_target_name = config
            .test_target_name()
            .map(|name| escape("test-target-name", name))
            .transpose()?;
        let actions = if config.test_without_building() {
            vec!["test-without-building"]
        } else if config.clean() {
            vec!["clean", "build", "test"]
        } else {
            vec!["build", "test"]
        };
        Ok(Self {
            options,
            test_target_name,
            actions,
        })
    }
}

impl CommandFragments for ConfigFragments {
    fn prefix(&self) -> Vec<String> {
        vec![PREFIX.to_owned()]
    }

    fn options(&self) -> Vec<String> {
        self.options.clone()
    }

    fn build_settings(
        &self,
        language: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Vec<String>, FragmentError> {
        let mut settings = vec![SNAPSHOT_SETTING.to_owned()];
        if let Some(language) = language {
            settings.push(format!("FASTLANE_LANGUAGE={}", escape("language", language)?));
        }
        if let Some(locale) = locale {
            settings.push(format!("FASTLANE_LOCALE={}", escape("locale", locale)?));
        }
        if let Some(name) = &self.test_target_name {
            settings.push(format!("TEST_TARGET_NAME={}", name));
        }
        Ok(settings)
    }

    fn actions(&self) -> Vec<String> {
        self.actions.iter().map(|action| (*action).to_owned()).collect()
    }
}
