use super::snapshot::{DeviceCatalog, ResolvedDevice};
use crate::{
    env::{Env, ExplicitEnv as _},
    util::cli::{Report, Reportable},
    DuctExpressionExt,
};
use once_cell_regex::regex;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceListError {
    #[error("Failed to request device list from `simctl`: {0}")]
    DetectionFailed(#[from] std::io::Error),
    #[error("`simctl list` returned an invalid JSON: {0}")]
    InvalidDeviceList(#[from] serde_json::Error),
}

impl Reportable for DeviceListError {
    fn report(&self) -> Report {
        Report::error("Failed to detect available simulators", self)
    }
}

#[derive(Deserialize)]
struct DeviceListOutput {
    devices: BTreeMap<String, Vec<RawSimulator>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSimulator {
    name: String,
    udid: String,
    #[serde(default)]
    state: String,
    #[serde(default = "available_by_default")]
    is_available: bool,
}

const fn available_by_default() -> bool {
    true
}

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Simulator {
    name: String,
    udid: String,
    os: String,
    os_version: String,
    state: String,
}

impl Display for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.os, self.os_version)
    }
}

impl ResolvedDevice for Simulator {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Simulator {
    pub fn udid(&self) -> &str {
        &self.udid
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn os_version(&self) -> &str {
        &self.os_version
    }

    pub fn state(&self) -> &str {
        &self.state
    }
}

// Runtime keys look like `com.apple.CoreSimulator.SimRuntime.iOS-16-4`;
// Xcode 8 and older used `iOS 10.3` instead.
fn parse_runtime(key: &str) -> Option<(String, String)> {
    let caps = regex!(r"(?P<os>[A-Za-z]+)[- ](?P<version>\d+(?:[-.]\d+)*)$").captures(key)?;
    Some((caps["os"].to_owned(), caps["version"].replace('-', ".")))
}

pub fn parse_device_list(json: &str) -> Result<Vec<Simulator>, DeviceListError> {
    let mut simulators = Vec::new();
    for (runtime, devices) in serde_json::from_str::<DeviceListOutput>(json)?.devices {
        let (os, os_version) = match parse_runtime(&runtime) {
            Some(parsed) => parsed,
            None => {
                log::debug!("skipping unrecognized simulator runtime {:?}", runtime);
                continue;
            }
        };
        simulators.extend(
            devices
                .into_iter()
                .filter(|device| device.is_available)
                .map(|device| Simulator {
                    name: device.name,
                    udid: device.udid,
                    os: os.clone(),
                    os_version: os_version.clone(),
                    state: device.state,
                }),
        );
    }
    simulators.sort();
    Ok(simulators)
}

pub fn device_list(env: &Env) -> Result<Vec<Simulator>, DeviceListError> {
    let output = duct::cmd(
        "xcrun",
        ["simctl", "list", "--json", "devices", "available"],
    )
    .vars(env.explicit_env())
    .stdout_capture()
    .stderr_capture()
    .unchecked()
    .run()?;
    if output.stdout.is_empty() && output.stderr.is_empty() {
        log::info!("device detection returned a non-zero exit code, but stdout and stderr are both empty; interpreting as a successful run with no devices available");
        return Ok(Vec::new());
    }
    parse_device_list(&String::from_utf8_lossy(&output.stdout))
}

/// Available simulators, listed once and then queried by name and OS version.
#[derive(Debug, Default)]
pub struct SimctlCatalog {
    simulators: Vec<Simulator>,
}

impl SimctlCatalog {
    pub fn detect(env: &Env) -> Result<Self, DeviceListError> {
        let simulators = device_list(env)?;
        log::info!("found {} available simulators", simulators.len());
        Ok(Self::from_simulators(simulators))
    }

    pub fn from_simulators(simulators: Vec<Simulator>) -> Self {
        Self { simulators }
    }

    pub fn simulators(&self) -> &[Simulator] {
        &self.simulators
    }
}

impl DeviceCatalog for SimctlCatalog {
    type Device = Simulator;

    fn find_device(&self, name: &str, os_version: &str) -> Option<Simulator> {
        let name = name.trim();
        self.simulators
            .iter()
            .find(|simulator| simulator.name.trim() == name && simulator.os_version == os_version)
            .cloned()
    }
}
