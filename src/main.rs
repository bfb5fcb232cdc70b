mod build;
mod cache;
mod control;
mod dist;
mod host;
mod manifest;
mod util;
mod version;

use build::{BuildOptions, Packager, PackagingOutcome};
use clap::Parser;
use dist::DistDir;
use env_logger::Env;
use host::{Distro, HostInfo};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use util::red_bold;

/// Turns an installed CMake build into a Debian binary package.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// CMake build directory containing CMakeCache.txt and install_manifest.txt
  path: PathBuf,

  /// Distribution name, detected from the running kernel when omitted
  distro: Option<Distro>,

  /// Product name used for the package and desktop entry
  #[arg(long, default_value = "flexworld")]
  product: String,

  /// Directory holding <distro>.control, changelog and <product>.desktop
  #[arg(long, default_value = "dist/linux")]
  dist_dir: PathBuf,

  /// Where the staging tree is created [default: the dist directory]
  #[arg(long)]
  out_dir: Option<PathBuf>,

  /// Packaging tool invoked on the staging tree
  #[arg(long, default_value = "dpkg")]
  packager: OsString,

  /// Arguments passed to the packaging tool before the staging tree
  #[arg(long = "packager-arg", default_values = ["-b"], allow_hyphen_values = true)]
  packager_args: Vec<OsString>,

  /// Stop after assembling the staging tree
  #[arg(long)]
  no_package: bool,

  /// Check the produced package against the computed metadata
  #[arg(long, conflicts_with = "no_package")]
  verify: bool,

  /// Print a JSON build report on stdout
  #[arg(long)]
  json: bool,
}

/// Exit status when the packaging tool itself fails.
const EXIT_PACKAGING_FAILED: u8 = 2;

fn exit_status(packaging: &PackagingOutcome) -> u8 {
  if packaging.is_failure() {
    EXIT_PACKAGING_FAILED
  } else {
    0
  }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
  let host = HostInfo::detect()?;
  let options = BuildOptions {
    build_dir: args.path,
    distro: args.distro,
    product: args.product,
    out_dir: args.out_dir.unwrap_or_else(|| args.dist_dir.clone()),
    dist: DistDir::new(args.dist_dir),
    packager: (!args.no_package).then(|| Packager::new(args.packager, args.packager_args)),
    verify: args.verify,
  };

  let report = build::run(&options, &host)?;
  if args.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  }
  let status = exit_status(&report.packaging);
  if status == 0 {
    segment_info!("Done:", "{}", report.packaging);
  } else {
    eprintln!("{} {}", red_bold("error:"), report.packaging);
  }
  Ok(ExitCode::from(status))
}

fn main() -> ExitCode {
  env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
  util::init_colors();

  // usage errors exit with 1 like every other validation failure
  let args = match Args::try_parse() {
    Ok(args) => args,
    Err(error) => {
      let _ = error.print();
      return if error.use_stderr() {
        ExitCode::FAILURE
      } else {
        ExitCode::SUCCESS
      };
    }
  };

  match run(args) {
    Ok(code) => code,
    Err(error) => {
      eprintln!("{} {error:?}", red_bold("error:"));
      ExitCode::FAILURE
    }
  }
}
