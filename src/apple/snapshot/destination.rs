//! Turning requested device names into `-destination` arguments.
//!
//! Only the iOS simulator family accepts several named destinations in one
//! `xcodebuild` invocation; Apple TV and Mac targets are always run alone.

use super::super::sdk::VersionLookupError;
use crate::util::{self, list_display, ShellEscapeError};
use std::fmt::{self, Display};
use thiserror::Error;

static IOS_FAMILY_PREFIXES: &[&str] = &["iphone", "ipad"];
static MAC_PREFIX: &str = "Mac";
static APPLE_TV_PREFIX: &str = "Apple TV";

/// The host Mac is the only macOS destination, so no device or version is named.
pub static MACOS_DESTINATION: &str = "-destination 'platform=macOS'";

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum OsFamily {
    Ios,
    Tvos,
    Macos,
}

impl Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OsFamily {
    /// Classifies a batch by its first device.
    pub fn detect(device: &str) -> Self {
        if device.starts_with(MAC_PREFIX) {
            Self::Macos
        } else if device.starts_with(APPLE_TV_PREFIX) {
            Self::Tvos
        } else {
            Self::Ios
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "iOS",
            Self::Tvos => "tvOS",
            Self::Macos => "macOS",
        }
    }
}

/// A catalog entry that a requested device name resolved to.
pub trait ResolvedDevice {
    fn name(&self) -> &str;
}

pub trait DeviceCatalog {
    type Device: ResolvedDevice;

    fn find_device(&self, name: &str, os_version: &str) -> Option<Self::Device>;
}

pub trait LatestOsVersion {
    fn version(&self, os: OsFamily) -> Result<String, VersionLookupError>;
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("No devices were requested.")]
    InvalidInput,
    #[error(
        "All devices provided to snapshot should run the same operating system, but {} were requested together.",
        list_display(.devices)
    )]
    IncompatibleDeviceSet { devices: Vec<String> },
    #[error("No device found named '{device}' for version '{os_version}'")]
    DeviceNotFound { device: String, os_version: String },
    #[error("Destination for {device:?} can't be passed to `xcodebuild`: {source}")]
    DestinationUnquotable {
        device: String,
        source: ShellEscapeError,
    },
    #[error(transparent)]
    VersionLookupFailed(#[from] VersionLookupError),
}

fn is_ios_family(device: &str) -> bool {
    let device = device.to_lowercase();
    IOS_FAMILY_PREFIXES
        .iter()
        .any(|prefix| device.starts_with(prefix))
}

/// Whether `devices` can share one destination pass: any number of
/// iPhones and iPads, or exactly one device of another kind.
pub fn devices_share_os(devices: &[impl AsRef<str>]) -> bool {
    devices.iter().all(|device| is_ios_family(device.as_ref())) || devices.len() == 1
}

// Simulator names are user-editable and may contain quotes.
fn simulator_destination(
    os: OsFamily,
    name: &str,
    os_version: &str,
) -> Result<String, ShellEscapeError> {
    let value = format!("platform={} Simulator,name={},OS={}", os, name, os_version);
    util::shell_escape(&value).map(|value| format!("-destination {}", value))
}

pub fn resolve_destinations<C, L>(
    devices: &[impl AsRef<str>],
    explicit_os_version: Option<&str>,
    catalog: &C,
    latest: &L,
) -> Result<Vec<String>, DestinationError>
where
    C: DeviceCatalog,
    L: LatestOsVersion,
{
    let first = devices
        .first()
        .map(|device| device.as_ref())
        .ok_or(DestinationError::InvalidInput)?;
    if !devices_share_os(devices) {
        return Err(DestinationError::IncompatibleDeviceSet {
            devices: devices
                .iter()
                .map(|device| device.as_ref().to_owned())
                .collect(),
        });
    }
    // A Mac batch always has exactly one device, since the check above
    // rejects a Mac mixed with anything else.
    let os = OsFamily::detect(first);
    if os == OsFamily::Macos {
        log::info!("{:?} runs on the host machine; only specifying platform", first);
        return Ok(vec![MACOS_DESTINATION.to_owned()]);
    }
    let os_version = match explicit_os_version {
        Some(version) => version.to_owned(),
        None => {
            let version = latest.version(os)?;
            log::info!("no {} version configured; using latest {}", os, version);
            version
        }
    };
    devices
        .iter()
        .map(|device| {
            let device = device.as_ref();
            let found = catalog.find_device(device, &os_version).ok_or_else(|| {
                DestinationError::DeviceNotFound {
                    device: device.to_owned(),
                    os_version: os_version.clone(),
                }
            })?;
            simulator_destination(os, found.name(), &os_version).map_err(|source| {
                DestinationError::DestinationUnquotable {
                    device: device.to_owned(),
                    source,
                }
            })
        })
        .collect()
}

/// Joins resolved destinations, in order, into the single fragment the
/// command line carries.
pub fn destination_fragment(destinations: &[String]) -> String {
    destinations.join(" ")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::apple::snapshot::fake::{FakeCatalog, FakeLatest};
    use rstest::rstest;

    #[rstest(
        devices,
        case(&["iPhone 11"]),
        case(&["iPhone 11", "iPad Pro (12.9-inch)"]),
        case(&["iphone SE", "IPAD mini", "iPhone 14 Pro Max"]),
        case(&["Apple TV 4K"]),
        case(&["Mac"])
    )]
    fn test_compatible_device_sets(devices: &[&str]) {
        assert!(devices_share_os(devices));
    }

    #[rstest(
        devices,
        case(&["Apple TV 4K", "iPhone 11"]),
        case(&["iPhone 11", "Apple TV 4K"]),
        case(&["Apple TV", "Apple TV 4K"]),
        case(&["Mac", "iPhone 11"])
    )]
    fn test_incompatible_device_sets(devices: &[&str]) {
        assert!(!devices_share_os(devices));
    }

    #[rstest(
        device,
        expected,
        case("Mac", OsFamily::Macos),
        case("Apple TV 4K (at 1080p)", OsFamily::Tvos),
        case("iPhone 11", OsFamily::Ios),
        case("mac", OsFamily::Ios),
        case("apple tv", OsFamily::Ios)
    )]
    fn test_os_family_detection(device: &str, expected: OsFamily) {
        assert_eq!(OsFamily::detect(device), expected);
    }

    #[test]
    fn test_incompatible_set_aborts_resolution() {
        let catalog = FakeCatalog::new(&[("Apple TV 4K", "16.0"), ("iPhone 11", "16.0")]);
        let err = resolve_destinations(
            &["Apple TV 4K", "iPhone 11"],
            Some("16.0"),
            &catalog,
            &FakeLatest::new("16.0"),
        )
        .unwrap_err();
        assert!(matches!(err, DestinationError::IncompatibleDeviceSet { .. }));
        assert!(err.to_string().contains("Apple TV 4K and iPhone 11"));
        assert_eq!(catalog.lookups(), 0);
    }

    #[rstest(explicit_os_version, case(None), case(Some("13.0")))]
    fn test_mac_short_circuits(explicit_os_version: Option<&str>) {
        let catalog = FakeCatalog::new(&[]);
        let latest = FakeLatest::new("14.0");
        let destinations =
            resolve_destinations(&["Mac"], explicit_os_version, &catalog, &latest).unwrap();
        assert_eq!(destinations, vec![MACOS_DESTINATION.to_owned()]);
        assert_eq!(catalog.lookups(), 0);
        assert_eq!(latest.lookups(), 0);
    }

    #[test]
    fn test_ios_devices_resolve_in_order() {
        let catalog = FakeCatalog::new(&[
            ("iPhone 12", "16.0"),
            ("iPhone 11", "15.5"),
            ("iPhone 11", "16.0"),
        ]);
        let destinations = resolve_destinations(
            &["iPhone 11", "iPhone 12"],
            Some("16.0"),
            &catalog,
            &FakeLatest::new("17.0"),
        )
        .unwrap();
        assert_eq!(
            destinations,
            vec![
                "-destination 'platform=iOS Simulator,name=iPhone 11,OS=16.0'".to_owned(),
                "-destination 'platform=iOS Simulator,name=iPhone 12,OS=16.0'".to_owned(),
            ]
        );
        assert_eq!(
            destination_fragment(&destinations),
            "-destination 'platform=iOS Simulator,name=iPhone 11,OS=16.0' \
             -destination 'platform=iOS Simulator,name=iPhone 12,OS=16.0'"
        );
    }

    #[rstest(
        name,
        case("Bob's Phone"),
        case("iPhone \"QA\" 14"),
        case("iPhone $HOME (2)")
    )]
    fn test_destination_survives_shell_splitting(name: &str) {
        let catalog = FakeCatalog::new(&[(name, "16.0")]);
        let destinations =
            resolve_destinations(&[name], Some("16.0"), &catalog, &FakeLatest::new("16.0"))
                .unwrap();
        assert_eq!(
            shlex::split(&destinations[0]).unwrap(),
            vec![
                "-destination".to_owned(),
                format!("platform=iOS Simulator,name={},OS=16.0", name),
            ]
        );
    }

    #[test]
    fn test_nul_in_version_is_unquotable() {
        let catalog = FakeCatalog::new(&[("iPhone 11", "16.0\0")]);
        let err = resolve_destinations(
            &["iPhone 11"],
            Some("16.0\0"),
            &catalog,
            &FakeLatest::new("16.0"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DestinationError::DestinationUnquotable { ref device, .. } if device == "iPhone 11"
        ));
    }

    #[test]
    fn test_latest_version_is_looked_up_once() {
        let catalog = FakeCatalog::new(&[("iPhone 14", "16.4"), ("iPad Air", "16.4")]);
        let latest = FakeLatest::new("16.4");
        let destinations =
            resolve_destinations(&["iPhone 14", "iPad Air"], None, &catalog, &latest).unwrap();
        assert_eq!(destinations.len(), 2);
        assert!(destinations.iter().all(|d| d.contains("OS=16.4")));
        assert_eq!(latest.lookups(), 1);
        assert_eq!(latest.last_os(), Some(OsFamily::Ios));
    }

    #[test]
    fn test_apple_tv_uses_tvos_platform() {
        let catalog = FakeCatalog::new(&[("Apple TV 4K", "16.1")]);
        let latest = FakeLatest::new("16.1");
        let destinations =
            resolve_destinations(&["Apple TV 4K"], None, &catalog, &latest).unwrap();
        assert_eq!(
            destinations,
            vec!["-destination 'platform=tvOS Simulator,name=Apple TV 4K,OS=16.1'".to_owned()]
        );
        assert_eq!(latest.last_os(), Some(OsFamily::Tvos));
    }

    #[test]
    fn test_missing_device_aborts_on_first_miss() {
        let catalog = FakeCatalog::new(&[("iPhone 11", "16.0"), ("iPhone 13", "16.0")]);
        let err = resolve_destinations(
            &["iPhone 11", "iPhone 12", "iPhone 13"],
            Some("16.0"),
            &catalog,
            &FakeLatest::new("16.0"),
        )
        .unwrap_err();
        match &err {
            DestinationError::DeviceNotFound { device, os_version } => {
                assert_eq!(device, "iPhone 12");
                assert_eq!(os_version, "16.0");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "No device found named 'iPhone 12' for version '16.0'"
        );
        assert_eq!(catalog.lookups(), 2);
    }

    #[test]
    fn test_version_lookup_failure_propagates() {
        let catalog = FakeCatalog::new(&[("iPhone 11", "16.0")]);
        let err =
            resolve_destinations(&["iPhone 11"], None, &catalog, &FakeLatest::failing()).unwrap_err();
        assert!(matches!(err, DestinationError::VersionLookupFailed(_)));
    }

    #[test]
    fn test_empty_request_is_invalid_input() {
        let devices: &[&str] = &[];
        let err = resolve_destinations(
            devices,
            Some("16.0"),
            &FakeCatalog::new(&[]),
            &FakeLatest::new("16.0"),
        )
        .unwrap_err();
        assert!(matches!(err, DestinationError::InvalidInput));
    }
}
