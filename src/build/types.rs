use crate::cache::PropertyError;
use crate::host::{Arch, Distro, ParseArchError, ParseDistroError};
use crate::manifest::ManifestError;
use crate::version::{PackageName, ParseVersionError, ProductVersion};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("path does not exist: {}", .0.display())]
  PathNotFound(PathBuf),
  #[error("invalid product name `{0}`")]
  InvalidProduct(Box<str>),
  #[error(transparent)]
  Arch(#[from] ParseArchError),
  #[error(transparent)]
  Distro(#[from] ParseDistroError),
  #[error("{kind} missing: {}", .path.display())]
  MissingFile { kind: &'static str, path: PathBuf },
  #[error(transparent)]
  Property(#[from] PropertyError),
  #[error(transparent)]
  Version(#[from] ParseVersionError),
  #[error(transparent)]
  Manifest(#[from] ManifestError),
}

/// Result of copying the install manifest into the staging tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
  pub copied: usize,
  /// Directory and symlink entries, which are not materialized.
  pub skipped: usize,
  pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackagingOutcome {
  /// The tool exited successfully. `artifact` is set when the expected
  /// `.deb` exists afterwards.
  Built { artifact: Option<PathBuf> },
  ToolFailed { code: Option<i32> },
  Skipped,
}

impl PackagingOutcome {
  pub fn from_status(status: ExitStatus, artifact: PathBuf) -> Self {
    if status.success() {
      Self::Built {
        artifact: artifact.exists().then_some(artifact),
      }
    } else {
      Self::ToolFailed {
        code: status.code(),
      }
    }
  }

  pub fn is_failure(&self) -> bool {
    matches!(self, Self::ToolFailed { .. })
  }
}

impl Display for PackagingOutcome {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Self::Built {
        artifact: Some(path),
      } => write!(f, "built {}", path.display()),
      Self::Built { artifact: None } => f.write_str("built"),
      Self::ToolFailed { code: Some(code) } => write!(f, "packaging tool exited with code {code}"),
      Self::ToolFailed { code: None } => f.write_str("packaging tool terminated by signal"),
      Self::Skipped => f.write_str("skipped"),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub package: PackageName,
  pub version: ProductVersion,
  pub arch: Arch,
  pub distro: Distro,
  pub staging_dir: PathBuf,
  pub files: CopyStats,
  pub installed_size_kib: u64,
  pub packaging: PackagingOutcome,
}
