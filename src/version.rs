use crate::cache::{Property, PropertyMap};
use crate::host::Arch;
use serde::{Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

fn is_allowed_in_version(c: char) -> bool {
  c.is_ascii_alphanumeric() || ".+~".contains(c)
}

// dpkg splits the revision at the last `-`, so a hyphenated suffix still
// parses as part of the upstream version
fn is_allowed_in_suffix(c: char) -> bool {
  is_allowed_in_version(c) || c == '-'
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseVersionError {
  #[error("{0} is empty")]
  Empty(&'static str),
  #[error("{0} contains invalid character `{1}`")]
  InvalidChar(&'static str, char),
}

fn check_component(
  key: &'static str,
  s: &str,
  is_allowed: fn(char) -> bool,
) -> Result<(), ParseVersionError> {
  if s.is_empty() {
    return Err(ParseVersionError::Empty(key));
  }
  match s.chars().find(|c| !is_allowed(*c)) {
    None => Ok(()),
    Some(c) => Err(ParseVersionError::InvalidChar(key, c)),
  }
}

/// Product version as configured in the CMake cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductVersion {
  major: Box<str>,
  minor: Box<str>,
  revision: Box<str>,
  suffix: Option<Box<str>>,
}

impl ProductVersion {
  pub fn new(
    major: &str,
    minor: &str,
    revision: &str,
    suffix: &str,
  ) -> Result<Self, ParseVersionError> {
    check_component(Property::VersionMajor.key(), major, is_allowed_in_version)?;
    check_component(Property::VersionMinor.key(), minor, is_allowed_in_version)?;
    check_component(Property::VersionRevision.key(), revision, is_allowed_in_version)?;
    if !suffix.is_empty() {
      check_component(Property::VersionSuffix.key(), suffix, is_allowed_in_suffix)?;
    }
    Ok(Self {
      major: major.into(),
      minor: minor.into(),
      revision: revision.into(),
      suffix: (!suffix.is_empty()).then(|| suffix.into()),
    })
  }

  pub fn from_properties(properties: &PropertyMap) -> Result<Self, ParseVersionError> {
    Self::new(
      properties.get(Property::VersionMajor),
      properties.get(Property::VersionMinor),
      properties.get(Property::VersionRevision),
      properties.get(Property::VersionSuffix),
    )
  }
}

impl Display for ProductVersion {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let (x, y, z) = (&self.major, &self.minor, &self.revision);
    match &self.suffix {
      None => write!(f, "{x}.{y}.{z}"),
      Some(s) => write!(f, "{x}.{y}.{z}-{s}"),
    }
  }
}

impl Serialize for ProductVersion {
  fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
    ser.collect_str(self)
  }
}

/// `{product}_{version}_{arch}`, also the name of the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageName(Box<str>);

impl PackageName {
  pub fn new(product: &str, version: &ProductVersion, arch: Arch) -> Self {
    Self(format!("{product}_{version}_{arch}").into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Display for PackageName {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
