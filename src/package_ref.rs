use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

pub const DEFAULT_VERSION: &str = "latest";
pub const DEFAULT_PRESET: &str = "main";

const NAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const VERSION_MAX_LEN: usize = 32;
const PRESET_MAX_LEN: usize = 26;

/// `name[:version][@preset]`, with `latest` and `main` filled in when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub preset: String,
}

impl PackageRef {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        preset: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let reference = Self {
            name: name.into(),
            version: version.into(),
            preset: preset.into(),
        };
        reference.validate()?;
        Ok(reference)
    }

    pub fn full_ref(&self) -> String {
        self.to_string()
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if !is_valid_name(&self.name) {
            return Err(RegistryError::InvalidInput(format!(
                "invalid package name {:?}",
                self.name
            )));
        }
        if !is_valid_label(&self.version, VERSION_MAX_LEN, true) {
            return Err(RegistryError::InvalidInput(format!(
                "invalid package version {:?}",
                self.version
            )));
        }
        if !is_valid_label(&self.preset, PRESET_MAX_LEN, false) {
            return Err(RegistryError::InvalidInput(format!(
                "invalid package preset {:?}",
                self.preset
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.name, self.version, self.preset)
    }
}

impl FromStr for PackageRef {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let (rest, preset) = match value.split_once('@') {
            Some((rest, preset)) => (rest, preset),
            None => (value, DEFAULT_PRESET),
        };
        let (name, version) = match rest.split_once(':') {
            Some((name, version)) => (name, version),
            None => (rest, DEFAULT_VERSION),
        };
        Self::new(name, version, preset)
    }
}

pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    NAME_LEN.contains(&bytes.len())
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes.first().is_some_and(|b| *b != b'-')
        && bytes.last().is_some_and(|b| *b != b'-')
}

fn is_valid_label(label: &str, max_len: usize, allow_dots: bool) -> bool {
    !label.is_empty()
        && label.len() <= max_len
        && label.chars().all(|ch| {
            ch.is_ascii_alphanumeric()
                || ch == '-'
                || ch == '_'
                || (allow_dots && (ch == '.' || ch == '+'))
        })
}

/// True when `value` is a complete `name:version@preset` reference.
pub fn is_full_ref(value: &str) -> bool {
    let Some((rest, _)) = value.split_once('@') else {
        return false;
    };
    rest.contains(':') && value.parse::<PackageRef>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_default_version_and_preset() {
        let reference: PackageRef = "token-vault".parse().expect("parse");
        assert_eq!(reference.full_ref(), "token-vault:latest@main");
    }

    #[test]
    fn parses_full_reference() {
        let reference: PackageRef = "token-vault:1.2.0@with-proxy".parse().expect("parse");
        assert_eq!(reference.name, "token-vault");
        assert_eq!(reference.version, "1.2.0");
        assert_eq!(reference.preset, "with-proxy");
    }

    #[test]
    fn preset_without_version() {
        let reference: PackageRef = "synthetix@andromeda".parse().expect("parse");
        assert_eq!(reference.full_ref(), "synthetix:latest@andromeda");
    }

    #[test]
    fn rejects_malformed_references() {
        for input in ["", "ab", "Upper", "-lead", "trail-", "foo:", "foo@", "foo:1 0"] {
            let err = input.parse::<PackageRef>().expect_err(input);
            assert!(
                matches!(err, RegistryError::InvalidInput(_)),
                "unexpected error for {:?}: {}",
                input,
                err
            );
        }
    }

    #[test]
    fn full_ref_detection_requires_all_parts() {
        assert!(is_full_ref("foo:1.0.0@main"));
        assert!(!is_full_ref("foo@main"));
        assert!(!is_full_ref("foo:1.0.0"));
        assert!(!is_full_ref("Foo:1.0.0@main"));
    }
}
