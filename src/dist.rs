use crate::host::Distro;
use std::path::PathBuf;

pub const CHANGELOG_FILE_NAME: &str = "changelog";

/// Directory holding the packaging inputs that do not come from the build:
/// `<distro>.control` templates, the changelog and the desktop entry.
#[derive(Debug, Clone)]
pub struct DistDir {
  root: PathBuf,
}

impl DistDir {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn template(&self, distro: &Distro) -> PathBuf {
    self.root.join(distro.template_file_name())
  }

  pub fn changelog(&self) -> PathBuf {
    self.root.join(CHANGELOG_FILE_NAME)
  }

  pub fn desktop_entry(&self, product: &str) -> PathBuf {
    self.root.join(desktop_file_name(product))
  }
}

pub fn desktop_file_name(product: &str) -> String {
  format!("{product}.desktop")
}
