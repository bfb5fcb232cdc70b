use anyhow::Context;
use std::fs::read_to_string;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE_NAME: &str = "install_manifest.txt";

/// Installed files land under this directory of the package root.
pub const TARGET_PATH_PREFIX: &str = "usr";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
  #[error("manifest entry `{}` is not below install prefix `{}`", .0.display(), .1)]
  OutsidePrefix(PathBuf, Box<str>),
  #[error("manifest entry `{}` escapes the install prefix", .0.display())]
  Unsafe(PathBuf),
}

/// One installed file, as listed in `install_manifest.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry(PathBuf);

impl ManifestEntry {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self(path.into())
  }

  pub fn source(&self) -> &Path {
    &self.0
  }

  /// Path of the entry relative to the install prefix. A trailing slash on
  /// the prefix makes no difference.
  pub fn relative_to(&self, prefix: &str) -> Result<&Path, ManifestError> {
    let relative = self
      .0
      .strip_prefix(prefix)
      .ok()
      .filter(|x| !x.as_os_str().is_empty())
      .ok_or_else(|| ManifestError::OutsidePrefix(self.0.clone(), prefix.into()))?;
    // same rule as ZipArchive::enclosed_name
    let mut depth = 0usize;
    for component in relative.components() {
      match component {
        Component::Prefix(_) | Component::RootDir => return Err(ManifestError::Unsafe(self.0.clone())),
        Component::ParentDir => {
          if depth == 0 {
            return Err(ManifestError::Unsafe(self.0.clone()));
          }
          depth -= 1;
        }
        Component::Normal(_) => depth += 1,
        Component::CurDir => {}
      }
    }
    Ok(relative)
  }

  /// Where the entry goes inside a staging tree rooted at `root`.
  pub fn destination(&self, root: &Path, prefix: &str) -> Result<PathBuf, ManifestError> {
    Ok(root.join(TARGET_PATH_PREFIX).join(self.relative_to(prefix)?))
  }
}

/// Parses manifest text: one absolute path per line, surrounding whitespace
/// trimmed, blank lines ignored.
pub fn parse(text: &str) -> Vec<ManifestEntry> {
  text
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty())
    .map(ManifestEntry::new)
    .collect()
}

pub fn read(path: &Path) -> anyhow::Result<Vec<ManifestEntry>> {
  let text = read_to_string(path)
    .with_context(|| format!("failed to read install manifest {}", path.display()))?;
  Ok(parse(&text))
}
