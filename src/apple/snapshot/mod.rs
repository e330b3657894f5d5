//! Building the `xcodebuild` invocation that runs snapshot UI tests.
//!
//! A command line is an ordered list of fragments: prefix, `xcodebuild`,
//! options, destinations, build settings, actions, suffix and the output
//! pipe. Each fragment is escaped by whatever produced it; joining them
//! with single spaces gives a shell command.

mod destination;
mod fragments;
mod pipe;

pub use self::{destination::*, fragments::*, pipe::*};

use crate::{
    config::Config,
    util::cli::{Report, Reportable},
};
use std::path::Path;
use thiserror::Error;

pub static BASE_COMMAND: &str = "xcodebuild";

/// Producers of the fragments surrounding the destinations.
pub trait CommandFragments {
    fn prefix(&self) -> Vec<String>;

    fn options(&self) -> Vec<String>;

    fn build_settings(
        &self,
        language: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Vec<String>, FragmentError>;

    fn actions(&self) -> Vec<String>;

    fn suffix(&self) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    DestinationFailed(#[from] DestinationError),
    #[error(transparent)]
    FragmentFailed(#[from] FragmentError),
    #[error(transparent)]
    PipeFailed(#[from] PipeError),
}

impl Reportable for GenerateError {
    fn report(&self) -> Report {
        match self {
            Self::DestinationFailed(DestinationError::IncompatibleDeviceSet { .. }) => {
                Report::action_request(
                    "Please request only iPhones and iPads, or a single other device",
                    self,
                )
            }
            Self::DestinationFailed(DestinationError::DeviceNotFound { .. }) => {
                Report::action_request(
                    "Please create the simulator or pick another device, then try again",
                    self,
                )
            }
            Self::DestinationFailed(err) => Report::error("Failed to resolve destinations", err),
            Self::FragmentFailed(err) => Report::error("Failed to build `xcodebuild` options", err),
            Self::PipeFailed(err) => Report::error("Failed to build output pipe", err),
        }
    }
}

pub struct TestCommandGenerator<'a, F, C, L> {
    fragments: &'a F,
    catalog: &'a C,
    latest: &'a L,
    ios_version: Option<&'a str>,
    xcpretty_args: &'a str,
}

impl<'a, F, C, L> TestCommandGenerator<'a, F, C, L>
where
    F: CommandFragments,
    C: DeviceCatalog,
    L: LatestOsVersion,
{
    pub fn new(fragments: &'a F, catalog: &'a C, latest: &'a L) -> Self {
        Self {
            fragments,
            catalog,
            latest,
            ios_version: None,
            xcpretty_args: "",
        }
    }

    pub fn from_config(config: &'a Config, fragments: &'a F, catalog: &'a C, latest: &'a L) -> Self {
        Self::new(fragments, catalog, latest)
            .with_ios_version(config.ios_version())
            .with_xcpretty_args(config.xcpretty_args())
    }

    pub fn with_ios_version(mut self, ios_version: Option<&'a str>) -> Self {
        self.ios_version = ios_version;
        self
    }

    pub fn with_xcpretty_args(mut self, xcpretty_args: &'a str) -> Self {
        self.xcpretty_args = xcpretty_args;
        self
    }

    pub fn destination(&self, devices: &[impl AsRef<str>]) -> Result<Vec<String>, DestinationError> {
        let destinations =
            resolve_destinations(devices, self.ios_version, self.catalog, self.latest)?;
        Ok(vec![destination_fragment(&destinations)])
    }

    pub fn pipe(
        &self,
        language: Option<&str>,
        locale: Option<&str>,
        log_path: Option<&Path>,
    ) -> Result<Vec<String>, PipeError> {
        pipe(language, locale, log_path, self.xcpretty_args).map(|pipe| vec![pipe])
    }

    pub fn generate(
        &self,
        devices: &[impl AsRef<str>],
        language: Option<&str>,
        locale: Option<&str>,
        log_path: Option<&Path>,
    ) -> Result<Vec<String>, GenerateError> {
        let mut parts = self.fragments.prefix();
        parts.push(BASE_COMMAND.to_owned());
        parts.extend(self.fragments.options());
        parts.extend(self.destination(devices)?);
        parts.extend(self.fragments.build_settings(language, locale)?);
        parts.extend(self.fragments.actions());
        parts.extend(self.fragments.suffix());
        parts.extend(self.pipe(language, locale, log_path)?);
        log::debug!("generated command fragments {:#?}", parts);
        Ok(parts)
    }
}

pub fn command_string(parts: &[String]) -> String {
    parts.join(" ")
}


#[cfg(test)]
mod test {
    use super::{fake::*, *};
    use crate::config::{test_config, Raw};

    fn position(parts: &[String], pred: impl Fn(&str) -> bool) -> Vec<usize> {
        parts
            .iter()
            .enumerate()
            .filter(|(_, part)| pred(part))
            .map(|(index, _)| index)
            .collect()
    }

    #[test]
    fn test_generate_orders_fragments() {
        let catalog = FakeCatalog::new(&[("iPhone 11", "16.0"), ("iPad Pro", "16.0")]);
        let latest = FakeLatest::new("16.0");
        let parts = TestCommandGenerator::new(&FakeFragments, &catalog, &latest)
            .with_xcpretty_args("--color")
            .generate(&["iPhone 11", "iPad Pro"], Some("en-US"), None, None)
            .unwrap();
        assert_eq!(
            parts,
            vec![
                "set -o pipefail &&",
                "xcodebuild",
                "-workspace App.xcworkspace",
                "-scheme AppUITests",
                "-destination 'platform=iOS Simulator,name=iPhone 11,OS=16.0' \
                 -destination 'platform=iOS Simulator,name=iPad Pro,OS=16.0'",
                "FASTLANE_SNAPSHOT=YES",
                "FASTLANE_LANGUAGE=en-US",
                "build",
                "test",
                "| tee | xcpretty --color",
            ]
        );
    }

    #[test]
    fn test_destination_sits_between_options_and_build_settings() {
        let catalog = FakeCatalog::new(&[("iPhone 14", "16.4"), ("iPhone 14 Plus", "16.4")]);
        let latest = FakeLatest::new("16.4");
        let parts = TestCommandGenerator::new(&FakeFragments, &catalog, &latest)
            .generate(&["iPhone 14", "iPhone 14 Plus"], None, None, None)
            .unwrap();
        let destinations = position(&parts, |part| part.starts_with("-destination"));
        assert_eq!(destinations.len(), 1);
        let destination = destinations[0];
        let options = position(&parts, |part| part.starts_with("-workspace") || part.starts_with("-scheme"));
        let settings = position(&parts, |part| part.starts_with("FASTLANE_"));
        assert!(options.iter().all(|&index| index < destination));
        assert!(settings.iter().all(|&index| index > destination));
        assert!(parts.last().unwrap().starts_with("| tee"));
    }

    #[test]
    fn test_generate_uses_configured_version_and_formatter() {
        let config = test_config(Raw {
            workspace: Some("App.xcworkspace".into()),
            scheme: Some("AppUITests".into()),
            ios_version: Some("15.5".into()),
            xcpretty_args: Some("--simple".into()),
            ..Default::default()
        });
        let fragments = ConfigFragments::new(&config).unwrap();
        let catalog = FakeCatalog::new(&[("iPhone 13", "15.5")]);
        let latest = FakeLatest::new("16.4");
        let parts = TestCommandGenerator::from_config(&config, &fragments, &catalog, &latest)
            .generate(&["iPhone 13"], None, None, None)
            .unwrap();
        assert_eq!(
            command_string(&parts),
            "set -o pipefail && xcodebuild -workspace /Users/ci/App/App.xcworkspace \
             -scheme AppUITests \
             -destination 'platform=iOS Simulator,name=iPhone 13,OS=15.5' \
             FASTLANE_SNAPSHOT=YES build test | tee | xcpretty --simple"
        );
        assert_eq!(latest.lookups(), 0);
    }

    #[test]
    fn test_generate_aborts_without_partial_result() {
        let catalog = FakeCatalog::new(&[("iPhone 11", "16.0")]);
        let latest = FakeLatest::new("16.0");
        let err = TestCommandGenerator::new(&FakeFragments, &catalog, &latest)
            .generate(&["iPhone 11", "iPhone 99"], None, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::DestinationFailed(DestinationError::DeviceNotFound { .. })
        ));
        assert_eq!(err.report().msg(), "Please create the simulator or pick another device, then try again");
    }

    #[test]
    fn test_generate_for_mac() {
        let catalog = FakeCatalog::new(&[]);
        let latest = FakeLatest::new("14.0");
        let parts = TestCommandGenerator::new(&FakeFragments, &catalog, &latest)
            .generate(&["Mac"], None, None, None)
            .unwrap();
        assert_eq!(parts[4], MACOS_DESTINATION);
    }
}
