use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const CACHE_FILE_NAME: &str = "CMakeCache.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Property {
  VersionMajor,
  VersionMinor,
  VersionRevision,
  VersionSuffix,
  InstallPrefix,
}

impl Property {
  pub const ALL: [Self; 5] = [
    Self::VersionMajor,
    Self::VersionMinor,
    Self::VersionRevision,
    Self::VersionSuffix,
    Self::InstallPrefix,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Self::VersionMajor => "FW_VERSION_MAJOR",
      Self::VersionMinor => "FW_VERSION_MINOR",
      Self::VersionRevision => "FW_VERSION_REVISION",
      Self::VersionSuffix => "FW_VERSION_SUFFIX",
      Self::InstallPrefix => "CMAKE_INSTALL_PREFIX",
    }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("property {0} not found in cache")]
pub struct PropertyError(pub &'static str);

/// The required entries of a CMake cache. Every [`Property`] is present once
/// the map is constructed.
#[derive(Debug, Clone)]
pub struct PropertyMap(BTreeMap<Property, Box<str>>);

fn is_word_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

/// Finds the first `KEY:TYPE=VALUE` line for `key`. The value may be empty.
fn find_entry<'a>(text: &'a str, key: &str) -> Option<&'a str> {
  text.lines().find_map(|line| {
    let rest = line.strip_prefix(key)?.strip_prefix(':')?;
    let (ty, value) = rest.split_once('=')?;
    (!ty.is_empty() && ty.chars().all(is_word_char)).then_some(value)
  })
}

impl PropertyMap {
  pub fn parse(text: &str) -> Result<Self, PropertyError> {
    let mut map = BTreeMap::new();
    for property in Property::ALL {
      let key = property.key();
      let value = find_entry(text, key).ok_or(PropertyError(key))?;
      map.insert(property, value.into());
    }
    Ok(Self(map))
  }

  pub fn get(&self, property: Property) -> &str {
    self.0.get(&property).map(|x| &**x).unwrap_or_default()
  }

  pub fn install_prefix(&self) -> &str {
    self.get(Property::InstallPrefix)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CACHE: &str = "\
# This is the CMakeCache file.
//Install path prefix, prepended onto install directories.
CMAKE_INSTALL_PREFIX:PATH=/usr/local
CMAKE_INSTALL_PREFIX_EXTRA:STRING=/nope
FW_VERSION_MAJOR:STRING=1
FW_VERSION_MINOR:STRING=2
FW_VERSION_REVISION:STRING=3
FW_VERSION_SUFFIX:STRING=
";

  #[test]
  fn test_parse_properties() {
    let map = PropertyMap::parse(CACHE).unwrap();
    assert_eq!(map.get(Property::VersionMajor), "1");
    assert_eq!(map.get(Property::VersionMinor), "2");
    assert_eq!(map.get(Property::VersionRevision), "3");
    assert_eq!(map.get(Property::VersionSuffix), "");
    assert_eq!(map.install_prefix(), "/usr/local");
  }

  #[test]
  fn test_missing_property_is_named() {
    for property in Property::ALL {
      let text: String = CACHE
        .lines()
        .filter(|line| !line.starts_with(&format!("{}:", property.key())))
        .map(|line| format!("{line}\n"))
        .collect();
      let error = PropertyMap::parse(&text).unwrap_err();
      assert_eq!(error, PropertyError(property.key()));
      assert_eq!(
        error.to_string(),
        format!("property {} not found in cache", property.key())
      );
    }
  }

  #[test]
  fn test_entry_syntax() {
    assert_eq!(find_entry("A:BOOL=ON\r\n", "A"), Some("ON"));
    assert_eq!(find_entry("A:=ON", "A"), None);
    assert_eq!(find_entry("A=ON", "A"), None);
    assert_eq!(find_entry("  A:STRING=ON", "A"), None);
    assert_eq!(find_entry("A:STRING=x=y", "A"), Some("x=y"));
    assert_eq!(find_entry("A:INTERNAL=1\nA:STRING=2", "A"), Some("1"));
  }
}
