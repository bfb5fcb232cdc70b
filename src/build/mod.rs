mod inspect;
mod packager;
mod staging;
mod types;

use crate::cache::{PropertyMap, CACHE_FILE_NAME};
use crate::control::{installed_size_kib, ControlTemplate};
use crate::dist::DistDir;
use crate::host::{Arch, Distro, HostInfo};
use crate::manifest::{self, ManifestEntry, MANIFEST_FILE_NAME};
use crate::version::{PackageName, ProductVersion};
use crate::{segment_info, segment_warn};
use anyhow::Context;
use inspect::inspect_file;
use staging::StagingTree;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

pub use packager::Packager;
pub use types::{BuildError, BuildReport, PackagingOutcome};

#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// CMake build directory holding the cache and install manifest.
  pub build_dir: PathBuf,
  /// Skips distribution detection when set.
  pub distro: Option<Distro>,
  pub product: String,
  pub dist: DistDir,
  /// Parent of the staging tree.
  pub out_dir: PathBuf,
  /// `None` stops after the staging tree is assembled.
  pub packager: Option<Packager>,
  pub verify: bool,
}

/// Inputs resolved and validated before anything is written.
#[derive(Debug)]
pub struct BuildPlan {
  pub arch: Arch,
  pub distro: Distro,
  pub properties: PropertyMap,
  pub version: ProductVersion,
  pub name: PackageName,
  pub template: ControlTemplate,
  pub manifest: Vec<ManifestEntry>,
  pub changelog: PathBuf,
  pub desktop_entry: PathBuf,
}

fn require_file(kind: &'static str, path: PathBuf) -> Result<PathBuf, BuildError> {
  if path.is_file() {
    Ok(path)
  } else {
    Err(BuildError::MissingFile { kind, path })
  }
}

fn check_product(product: &str) -> Result<(), BuildError> {
  let is_valid = |c: char| c.is_ascii_alphanumeric() || "+-.".contains(c);
  if product.is_empty() || product.starts_with('.') || !product.chars().all(is_valid) {
    return Err(BuildError::InvalidProduct(product.into()));
  }
  Ok(())
}

/// Validates every input in order, failing on the first problem.
pub fn plan(options: &BuildOptions, host: &HostInfo) -> anyhow::Result<BuildPlan> {
  let build_dir = &options.build_dir;
  if !build_dir.exists() {
    return Err(BuildError::PathNotFound(build_dir.clone()).into());
  }
  check_product(&options.product)?;

  let arch = host.arch().map_err(BuildError::from)?;
  let distro = match &options.distro {
    Some(distro) => distro.clone(),
    None => host.distro().map_err(BuildError::from)?,
  };
  log::debug!("target {arch} on {distro}");

  let template_path = require_file("control file", options.dist.template(&distro))?;
  let cache_path = require_file("CMake cache", build_dir.join(CACHE_FILE_NAME))?;
  let cache = read_to_string(&cache_path)
    .with_context(|| format!("failed to read CMake cache {}", cache_path.display()))?;
  let properties = PropertyMap::parse(&cache).map_err(BuildError::from)?;
  let version = ProductVersion::from_properties(&properties).map_err(BuildError::from)?;
  let name = PackageName::new(&options.product, &version, arch);

  let manifest_path = require_file("CMake install manifest", build_dir.join(MANIFEST_FILE_NAME))?;
  let changelog = require_file("changelog", options.dist.changelog())?;
  let desktop_entry = require_file(
    "desktop entry",
    options.dist.desktop_entry(&options.product),
  )?;

  Ok(BuildPlan {
    arch,
    distro,
    version,
    name,
    template: ControlTemplate::read(&template_path)?,
    manifest: manifest::read(&manifest_path)?,
    properties,
    changelog,
    desktop_entry,
  })
}

fn verify(artifact: &Path, plan: &BuildPlan, installed_bytes: u64) -> anyhow::Result<()> {
  let info = inspect_file(artifact)
    .with_context(|| format!("failed to inspect {}", artifact.display()))?;
  info.control.require("Version", &plan.version.to_string())?;
  info
    .control
    .require("Installed-Size", &installed_size_kib(installed_bytes).to_string())?;
  log::debug!("{} carries {}", artifact.display(), info.data_member);
  Ok(())
}

/// Assembles the staging tree for `plan` and hands it to the packaging tool.
pub fn execute(plan: BuildPlan, options: &BuildOptions) -> anyhow::Result<BuildReport> {
  segment_info!("Creating staging tree...");
  let tree = StagingTree::create(&options.out_dir, plan.name.clone())?;
  eprintln!("{}", tree.root().display());

  segment_info!("Copying installed files...");
  let files = tree.populate(&plan.manifest, plan.properties.install_prefix())?;
  if files.skipped > 0 {
    eprintln!("Skipped {} directory or symlink entries", files.skipped);
  }

  segment_info!("Writing package metadata...");
  for placeholder in plan.template.missing_placeholders() {
    segment_warn!("control template has no {placeholder} placeholder");
  }
  let control = plan.template.render(&plan.version, files.bytes);
  tree.assemble_metadata(
    &control,
    &plan.changelog,
    &plan.desktop_entry,
    &options.product,
  )?;

  let packaging = match &options.packager {
    Some(packager) => {
      segment_info!("Building package...");
      packager.build(&tree)?
    }
    None => PackagingOutcome::Skipped,
  };

  if options.verify {
    match &packaging {
      PackagingOutcome::Built {
        artifact: Some(path),
      } => {
        segment_info!("Verifying package...");
        verify(path, &plan, files.bytes)?;
      }
      PackagingOutcome::Built { artifact: None } => {
        segment_warn!("no package found next to the staging tree, skipping verification");
      }
      _ => {}
    }
  }

  Ok(BuildReport {
    package: plan.name,
    version: plan.version,
    arch: plan.arch,
    distro: plan.distro,
    staging_dir: tree.root().to_path_buf(),
    files,
    installed_size_kib: installed_size_kib(files.bytes),
    packaging,
  })
}

pub fn run(options: &BuildOptions, host: &HostInfo) -> anyhow::Result<BuildReport> {
  let plan = plan(options, host)?;
  segment_info!(
    "Starting packaging:",
    "{} ({}, {})",
    plan.name,
    plan.distro,
    plan.arch
  );
  execute(plan, options)
}
