use anyhow::{bail, Context};
use serde::Serialize;
use std::fmt::{self, Debug, Display, Formatter};
use std::fs::read_to_string;
use std::ops::Deref;
use std::process::Command;
use std::str::{from_utf8, FromStr};
use thiserror::Error;

/// Kernel version markers and the distribution family they identify, checked
/// in order.
pub const DISTRO_MARKERS: &[(&str, &str)] = &[("Debian", "debian"), ("Ubuntu", "ubuntu")];

const KERNEL_VERSION_PATH: &str = "/proc/version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  Amd64,
  I386,
}

impl Arch {
  /// Maps the output of an architecture query (`uname -m`) to a Debian
  /// architecture identifier.
  pub fn from_query_output(output: &str) -> Result<Self, ParseArchError> {
    if output.contains("x86_64") {
      Ok(Self::Amd64)
    } else if output.contains("386") {
      Ok(Self::I386)
    } else {
      Err(ParseArchError(output.trim().into()))
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Amd64 => "amd64",
      Self::I386 => "i386",
    }
  }
}

impl Display for Arch {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized architecture `{0}`")]
pub struct ParseArchError(Box<str>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseDistroError {
  #[error("distribution name is empty")]
  Empty,
  #[error("distribution name contains invalid character `{0}`")]
  InvalidChar(char),
  #[error("unrecognized distribution: {0}")]
  Unrecognized(Box<str>),
}

/// Distribution family name, used to pick `<name>.control`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Distro(Box<str>);

impl Distro {
  pub fn detect(kernel_version: &str) -> Result<Self, ParseDistroError> {
    DISTRO_MARKERS
      .iter()
      .find(|(marker, _)| kernel_version.contains(marker))
      .map(|(_, name)| Self((*name).into()))
      .ok_or_else(|| ParseDistroError::Unrecognized(kernel_version.trim().into()))
  }

  pub fn template_file_name(&self) -> String {
    format!("{self}.control")
  }
}

impl FromStr for Distro {
  type Err = ParseDistroError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.is_empty() {
      return Err(ParseDistroError::Empty);
    }
    match s.chars().find(|c| !c.is_alphanumeric() && !"-_.".contains(*c)) {
      None if s.starts_with('.') => Err(ParseDistroError::InvalidChar('.')),
      None => Ok(Self(s.into())),
      Some(c) => Err(ParseDistroError::InvalidChar(c)),
    }
  }
}

impl Deref for Distro {
  type Target = str;

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl Debug for Distro {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    <str as Debug>::fmt(self, f)
  }
}

impl Display for Distro {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str(self)
  }
}

/// Snapshot of the host facts the packager depends on.
///
/// The pipeline never queries the system itself; it is handed a `HostInfo`,
/// either captured from the running machine with [`HostInfo::detect`] or built
/// by hand.
#[derive(Debug, Clone)]
pub struct HostInfo {
  pub arch_query: Box<str>,
  pub kernel_version: Option<Box<str>>,
}

impl HostInfo {
  pub fn new(arch_query: &str, kernel_version: Option<&str>) -> Self {
    Self {
      arch_query: arch_query.into(),
      kernel_version: kernel_version.map(Into::into),
    }
  }

  pub fn detect() -> anyhow::Result<Self> {
    let output = Command::new("uname")
      .arg("-m")
      .output()
      .context("failed to run `uname -m`")?;
    if !output.status.success() {
      bail!("`uname -m` exited with {}", output.status);
    }
    let arch_query = from_utf8(&output.stdout)?.trim();
    log::debug!("architecture query returned `{arch_query}`");

    let kernel_version = match read_to_string(KERNEL_VERSION_PATH) {
      Ok(text) => Some(text),
      Err(error) => {
        log::debug!("cannot read {KERNEL_VERSION_PATH}: {error}");
        None
      }
    };

    Ok(Self::new(arch_query, kernel_version.as_deref()))
  }

  pub fn arch(&self) -> Result<Arch, ParseArchError> {
    Arch::from_query_output(&self.arch_query)
  }

  pub fn distro(&self) -> Result<Distro, ParseDistroError> {
    match &self.kernel_version {
      Some(text) => Distro::detect(text),
      None => Err(ParseDistroError::Unrecognized(
        "kernel version unavailable".into(),
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_arch_from_query_output() {
    assert_eq!(Arch::from_query_output("x86_64\n"), Ok(Arch::Amd64));
    assert_eq!(Arch::from_query_output("i386"), Ok(Arch::I386));
    assert_eq!(
      Arch::from_query_output("aarch64\n"),
      Err(ParseArchError("aarch64".into()))
    );
    // only the literal `386` class is recognized
    assert!(Arch::from_query_output("i686").is_err());
    assert_eq!(Arch::Amd64.to_string(), "amd64");
  }

  #[test]
  fn test_detect_distro() {
    let debian = "Linux version 6.1.0-13-amd64 (debian-kernel@lists.debian.org) \
                  (gcc-12 (Debian 12.2.0-14) 12.2.0) #1 SMP PREEMPT_DYNAMIC Debian 6.1.55-1";
    assert_eq!(&*Distro::detect(debian).unwrap(), "debian");

    let ubuntu = "Linux version 5.15.0-88-generic (buildd@lcy02-amd64-058) \
                  (gcc (Ubuntu 11.4.0-1ubuntu1~22.04) 11.4.0)";
    assert_eq!(&*Distro::detect(ubuntu).unwrap(), "ubuntu");

    assert!(matches!(
      Distro::detect("Linux version 6.5.6-arch2-1"),
      Err(ParseDistroError::Unrecognized(_))
    ));
  }

  #[test]
  fn test_parse_distro_name() {
    let distro: Distro = "debian".parse().unwrap();
    assert_eq!(distro.template_file_name(), "debian.control");
    assert_eq!("".parse::<Distro>(), Err(ParseDistroError::Empty));
    assert_eq!(
      "../etc".parse::<Distro>(),
      Err(ParseDistroError::InvalidChar('/'))
    );
    assert_eq!(
      "..".parse::<Distro>(),
      Err(ParseDistroError::InvalidChar('.'))
    );
  }

  #[test]
  fn test_host_info_without_kernel_version() {
    let host = HostInfo::new("x86_64", None);
    assert_eq!(host.arch(), Ok(Arch::Amd64));
    assert!(host.distro().is_err());
  }
}
