use super::types::{BuildError, CopyStats};
use crate::dist::desktop_file_name;
use crate::manifest::{ManifestEntry, TARGET_PATH_PREFIX};
use crate::util::PB_STYLE;
use crate::version::PackageName;
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{copy, create_dir, create_dir_all, remove_dir_all, remove_file, write};
use std::path::{Path, PathBuf};

pub const METADATA_DIR_NAME: &str = "DEBIAN";
const MENU_DIR: &str = "share/applications";

/// Package root filesystem assembled before handing it to the packaging tool.
///
/// The directory is named after the package and is left on disk after the
/// run.
#[derive(Debug)]
pub struct StagingTree {
  root: PathBuf,
  name: PackageName,
}

impl StagingTree {
  /// Creates `<out_dir>/<name>`, removing whatever a previous run left there.
  pub fn create(out_dir: &Path, name: PackageName) -> anyhow::Result<Self> {
    let root = out_dir.join(name.as_str());
    if let Ok(meta) = root.symlink_metadata() {
      log::debug!("removing previous staging tree {}", root.display());
      let removed = if meta.is_dir() {
        remove_dir_all(&root)
      } else {
        remove_file(&root)
      };
      removed.with_context(|| format!("failed to remove {}", root.display()))?;
    }
    create_dir_all(out_dir)
      .with_context(|| format!("failed to create {}", out_dir.display()))?;
    create_dir(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(Self { root, name })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn metadata_dir(&self) -> PathBuf {
    self.root.join(METADATA_DIR_NAME)
  }

  pub fn menu_dir(&self) -> PathBuf {
    self.root.join(TARGET_PATH_PREFIX).join(MENU_DIR)
  }

  /// Copies every manifest entry below `<root>/usr`, stripping `prefix`.
  ///
  /// Directories and symlinks are skipped and not counted. The parent
  /// directory of every entry is created regardless.
  pub fn populate(&self, entries: &[ManifestEntry], prefix: &str) -> anyhow::Result<CopyStats> {
    let pb = ProgressBar::new(entries.len() as _);
    pb.set_prefix("copying");
    pb.set_message(self.name.to_string());
    pb.set_style(ProgressStyle::with_template(PB_STYLE)?.progress_chars("=> "));

    let mut stats = CopyStats::default();
    for entry in entries {
      let source = entry.source();
      let dst = entry
        .destination(&self.root, prefix)
        .map_err(BuildError::from)?;
      if let Some(parent) = dst.parent() {
        create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
      }

      let meta = source
        .symlink_metadata()
        .with_context(|| format!("failed to stat manifest entry {}", source.display()))?;
      if meta.is_dir() || meta.file_type().is_symlink() {
        log::debug!("skipping {}", source.display());
        stats.skipped += 1;
      } else {
        log::debug!("copying {} -> {}", source.display(), dst.display());
        copy(source, &dst)
          .with_context(|| format!("failed to copy {} to {}", source.display(), dst.display()))?;
        stats.copied += 1;
        stats.bytes += meta.len();
      }
      pb.inc(1);
    }

    pb.set_prefix("done");
    pb.finish();
    Ok(stats)
  }

  /// Writes `DEBIAN/control`, `DEBIAN/changelog` and the desktop entry.
  pub fn assemble_metadata(
    &self,
    control: &str,
    changelog: &Path,
    desktop_entry: &Path,
    product: &str,
  ) -> anyhow::Result<()> {
    let metadata_dir = self.metadata_dir();
    create_dir_all(&metadata_dir)
      .with_context(|| format!("failed to create {}", metadata_dir.display()))?;
    copy(changelog, metadata_dir.join("changelog"))
      .with_context(|| format!("failed to copy {}", changelog.display()))?;

    let menu_dir = self.menu_dir();
    create_dir_all(&menu_dir).with_context(|| format!("failed to create {}", menu_dir.display()))?;
    copy(desktop_entry, menu_dir.join(desktop_file_name(product)))
      .with_context(|| format!("failed to copy {}", desktop_entry.display()))?;

    let control_path = metadata_dir.join("control");
    write(&control_path, control)
      .with_context(|| format!("failed to write {}", control_path.display()))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::Arch;
  use crate::version::ProductVersion;
  use std::fs::{read_dir, read_to_string};
  use std::os::unix::fs::symlink;
  use tempfile::TempDir;

  fn name() -> PackageName {
    let version = ProductVersion::new("1", "2", "3", "").unwrap();
    PackageName::new("flexworld", &version, Arch::Amd64)
  }

  /// Lays out a fake install prefix and returns its manifest.
  fn install_prefix(prefix: &Path) -> Vec<ManifestEntry> {
    create_dir_all(prefix.join("bin")).unwrap();
    create_dir_all(prefix.join("share/flexworld/data")).unwrap();
    write(prefix.join("bin/flexworld"), vec![0u8; 3000]).unwrap();
    write(prefix.join("share/flexworld/data/a.txt"), "hello").unwrap();
    symlink("flexworld", prefix.join("bin/fw")).unwrap();
    [
      "bin/flexworld",
      "bin/fw",
      "share/flexworld/data",
      "share/flexworld/data/a.txt",
    ]
    .iter()
    .map(|x| ManifestEntry::new(prefix.join(x)))
    .collect()
  }

  #[test]
  fn test_populate_skips_symlinks_and_dirs() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("prefix");
    let entries = install_prefix(&prefix);
    let tree = StagingTree::create(&temp.path().join("out"), name()).unwrap();

    let stats = tree.populate(&entries, prefix.to_str().unwrap()).unwrap();
    assert_eq!(
      stats,
      CopyStats {
        copied: 2,
        skipped: 2,
        bytes: 3005,
      }
    );

    let usr = tree.root().join("usr");
    assert_eq!(read_to_string(usr.join("share/flexworld/data/a.txt")).unwrap(), "hello");
    assert!(usr.join("bin/flexworld").is_file());
    assert!(usr.join("bin/fw").symlink_metadata().is_err());
    // directory entries only get their parent created
    assert!(usr.join("share/flexworld").is_dir());
    assert_eq!(read_dir(usr.join("share/flexworld/data")).unwrap().count(), 1);
  }

  #[test]
  fn test_recreate_replaces_previous_tree() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("prefix");
    let entries = install_prefix(&prefix);
    let out = temp.path().join("out");

    let tree = StagingTree::create(&out, name()).unwrap();
    tree.populate(&entries, prefix.to_str().unwrap()).unwrap();
    write(tree.root().join("stale"), "left over").unwrap();

    let tree = StagingTree::create(&out, name()).unwrap();
    assert_eq!(tree.root(), out.join("flexworld_1.2.3_amd64"));
    assert_eq!(read_dir(tree.root()).unwrap().count(), 0);
    tree.populate(&entries, prefix.to_str().unwrap()).unwrap();
    assert!(!tree.root().join("stale").exists());
  }

  #[test]
  fn test_populate_missing_source_fails() {
    let temp = TempDir::new().unwrap();
    let tree = StagingTree::create(temp.path(), name()).unwrap();
    let entries = [ManifestEntry::new("/usr/local/bin/does-not-exist")];
    assert!(tree.populate(&entries, "/usr/local").is_err());
  }

  #[test]
  fn test_assemble_metadata() {
    let temp = TempDir::new().unwrap();
    let changelog = temp.path().join("changelog");
    let desktop = temp.path().join("flexworld.desktop");
    write(&changelog, "flexworld (1.2.3) unstable; urgency=low\n").unwrap();
    write(&desktop, "[Desktop Entry]\nName=FlexWorld\n").unwrap();

    let tree = StagingTree::create(&temp.path().join("out"), name()).unwrap();
    tree
      .assemble_metadata("Package: flexworld\n", &changelog, &desktop, "flexworld")
      .unwrap();

    let debian = tree.root().join("DEBIAN");
    assert_eq!(read_to_string(debian.join("control")).unwrap(), "Package: flexworld\n");
    assert!(debian.join("changelog").is_file());
    assert_eq!(
      read_to_string(tree.root().join("usr/share/applications/flexworld.desktop")).unwrap(),
      "[Desktop Entry]\nName=FlexWorld\n"
    );
  }
}
