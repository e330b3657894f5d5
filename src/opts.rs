use std::fmt::{self, Display};

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum NoiseLevel {
    Polite,
    LoudAndProud,
    FranklyQuitePedantic,
}

impl Default for NoiseLevel {
    fn default() -> Self {
        Self::Polite
    }
}

impl NoiseLevel {
    pub fn from_occurrences(occurrences: u64) -> Self {
        match occurrences {
            0 => Self::Polite,
            1 => Self::LoudAndProud,
            _ => Self::FranklyQuitePedantic,
        }
    }

    pub fn polite(self) -> bool {
        matches!(self, Self::Polite)
    }

    pub fn pedantic(self) -> bool {
        matches!(self, Self::FranklyQuitePedantic)
    }
}

/// Value written to every `ProvisioningStyle` entry of a project.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigningStyle {
    Automatic,
    Manual,
}

impl Default for SigningStyle {
    fn default() -> Self {
        Self::Manual
    }
}

impl Display for SigningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SigningStyle {
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            Self::Automatic
        } else {
            Self::Manual
        }
    }

    pub fn automatic(self) -> bool {
        matches!(self, Self::Automatic)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "Automatic",
            Self::Manual => "Manual",
        }
    }
}
