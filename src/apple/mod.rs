#[cfg(feature = "cli")]
pub mod cli;
pub mod codesigning;
pub mod sdk;
pub mod simctl;
pub mod snapshot;

pub static NAME: &str = "snapshot";
