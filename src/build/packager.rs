use super::staging::StagingTree;
use super::types::PackagingOutcome;
use anyhow::Context;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// External command that turns a staging tree into a `.deb`.
///
/// Invoked as `<program> <args>... <staging root>`.
#[derive(Debug, Clone)]
pub struct Packager {
  program: OsString,
  args: Vec<OsString>,
}

impl Packager {
  pub fn new(
    program: impl Into<OsString>,
    args: impl IntoIterator<Item = impl Into<OsString>>,
  ) -> Self {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
    }
  }

  /// `dpkg -b <dir>` writes `<dir>.deb` next to the directory.
  pub fn artifact_path(root: &Path) -> PathBuf {
    let mut path = root.as_os_str().to_owned();
    path.push(".deb");
    path.into()
  }

  /// Runs the tool on `tree`. A tool that cannot be started is an error; a
  /// tool that runs and fails is reported as [`PackagingOutcome::ToolFailed`].
  pub fn build(&self, tree: &StagingTree) -> anyhow::Result<PackagingOutcome> {
    let mut cmd = Command::new(&self.program);
    cmd.args(&self.args).arg(tree.root());
    log::debug!("running {cmd:?}");

    let output = cmd
      .output()
      .with_context(|| format!("failed to run {}", self.program.to_string_lossy()))?;
    // keep stdout clean for the report
    let mut stderr = io::stderr().lock();
    stderr.write_all(&output.stdout)?;
    stderr.write_all(&output.stderr)?;

    Ok(PackagingOutcome::from_status(
      output.status,
      Self::artifact_path(tree.root()),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::Arch;
  use crate::version::{PackageName, ProductVersion};
  use std::fs::write;
  use tempfile::TempDir;

  fn tree(out: &Path) -> StagingTree {
    let version = ProductVersion::new("1", "2", "3", "").unwrap();
    StagingTree::create(out, PackageName::new("flexworld", &version, Arch::Amd64)).unwrap()
  }

  #[test]
  fn test_artifact_path_keeps_dots() {
    assert_eq!(
      Packager::artifact_path(Path::new("/out/flexworld_1.2.3_amd64")),
      Path::new("/out/flexworld_1.2.3_amd64.deb")
    );
  }

  #[test]
  fn test_successful_tool() {
    let temp = TempDir::new().unwrap();
    let tree = tree(temp.path());
    let outcome = Packager::new("true", Vec::<OsString>::new()).build(&tree).unwrap();
    assert_eq!(outcome, PackagingOutcome::Built { artifact: None });

    write(Packager::artifact_path(tree.root()), "!<arch>\n").unwrap();
    let outcome = Packager::new("true", Vec::<OsString>::new()).build(&tree).unwrap();
    assert_eq!(
      outcome,
      PackagingOutcome::Built {
        artifact: Some(temp.path().join("flexworld_1.2.3_amd64.deb"))
      }
    );
  }

  #[test]
  fn test_failing_tool_is_surfaced() {
    let temp = TempDir::new().unwrap();
    let tree = tree(temp.path());
    let outcome = Packager::new("false", Vec::<OsString>::new()).build(&tree).unwrap();
    assert_eq!(outcome, PackagingOutcome::ToolFailed { code: Some(1) });
    assert!(outcome.is_failure());

    let outcome = Packager::new("sh", ["-c", "exit 3", "sh"]).build(&tree).unwrap();
    assert_eq!(outcome, PackagingOutcome::ToolFailed { code: Some(3) });
  }

  #[test]
  fn test_missing_tool_is_an_error() {
    let temp = TempDir::new().unwrap();
    let tree = tree(temp.path());
    let packager = Packager::new("definitely-not-a-packager-12345", ["-b"]);
    assert!(packager.build(&tree).is_err());
  }
}
