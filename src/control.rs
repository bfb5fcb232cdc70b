use crate::version::ProductVersion;
use anyhow::Context;
use std::fs::read_to_string;
use std::path::Path;

pub const VERSION_PLACEHOLDER: &str = "@VERSION@";
pub const INSTALLED_SIZE_PLACEHOLDER: &str = "@INSTALLED_SIZE@";

/// Installed size in KiB as written to `Installed-Size`, truncating.
pub fn installed_size_kib(bytes: u64) -> u64 {
  bytes / 1024
}

/// A distribution-specific `DEBIAN/control` template.
#[derive(Debug, Clone)]
pub struct ControlTemplate {
  text: String,
}

impl ControlTemplate {
  pub fn new(text: impl Into<String>) -> Self {
    Self { text: text.into() }
  }

  pub fn read(path: &Path) -> anyhow::Result<Self> {
    let text = read_to_string(path)
      .with_context(|| format!("failed to read control template {}", path.display()))?;
    Ok(Self::new(text))
  }

  /// Placeholders the template does not contain.
  pub fn missing_placeholders(&self) -> Vec<&'static str> {
    [VERSION_PLACEHOLDER, INSTALLED_SIZE_PLACEHOLDER]
      .into_iter()
      .filter(|x| !self.text.contains(x))
      .collect()
  }

  pub fn render(&self, version: &ProductVersion, installed_bytes: u64) -> String {
    self
      .text
      .replace(VERSION_PLACEHOLDER, &version.to_string())
      .replace(
        INSTALLED_SIZE_PLACEHOLDER,
        &installed_size_kib(installed_bytes).to_string(),
      )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TEMPLATE: &str = "\
Package: flexworld
Version: @VERSION@
Architecture: amd64
Installed-Size: @INSTALLED_SIZE@
Description: Voxel sandbox game
";

  #[test]
  fn test_render() {
    let version = ProductVersion::new("1", "2", "3", "beta").unwrap();
    let control = ControlTemplate::new(TEMPLATE).render(&version, 3 * 1024 + 1023);
    assert_eq!(
      control,
      "\
Package: flexworld
Version: 1.2.3-beta
Architecture: amd64
Installed-Size: 3
Description: Voxel sandbox game
"
    );
  }

  #[test]
  fn test_installed_size_truncates() {
    assert_eq!(installed_size_kib(0), 0);
    assert_eq!(installed_size_kib(1023), 0);
    assert_eq!(installed_size_kib(1024), 1);
    assert_eq!(installed_size_kib(2047), 1);
  }

  #[test]
  fn test_missing_placeholders() {
    assert!(ControlTemplate::new(TEMPLATE).missing_placeholders().is_empty());
    assert_eq!(
      ControlTemplate::new("Version: @VERSION@\n").missing_placeholders(),
      [INSTALLED_SIZE_PLACEHOLDER]
    );
  }
}
