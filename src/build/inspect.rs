//! Reads back a produced `.deb` to check what the packaging tool wrote.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::from_utf8;
use thiserror::Error;
use xz2::read::XzDecoder;
use zstd::stream::read::Decoder as ZstDecoder;

const DEB_FORMAT_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
  Tar,
  TarGz,
  TarXz,
  TarBz2,
  TarZst,
}

impl ArchiveKind {
  const EXTENSIONS: [(&'static str, Self); 5] = [
    (".tar", Self::Tar),
    (".tar.gz", Self::TarGz),
    (".tar.xz", Self::TarXz),
    (".tar.bz2", Self::TarBz2),
    (".tar.zst", Self::TarZst),
  ];

  /// Splits `control.tar.gz` into its kind and `control`. The stem must not
  /// be empty.
  fn from_file_name(name: &str) -> Option<(Self, &str)> {
    Self::EXTENSIONS.iter().find_map(|(ext, kind)| {
      name
        .strip_suffix(ext)
        .filter(|stem| !stem.is_empty())
        .map(|stem| (*kind, stem))
    })
  }

  fn decoder<'a>(self, src: impl Read + 'a) -> io::Result<Box<dyn Read + 'a>> {
    use ArchiveKind::*;
    Ok(match self {
      Tar => Box::new(src),
      TarGz => Box::new(GzDecoder::new(src)),
      TarXz => Box::new(XzDecoder::new(src)),
      TarBz2 => Box::new(BzDecoder::new(src)),
      TarZst => Box::new(ZstDecoder::new(src)?),
    })
  }
}

#[derive(Debug, Error)]
pub enum InspectError {
  #[error(transparent)]
  Io(#[from] io::Error),
  #[error("archive member name is not UTF-8")]
  MemberName,
  #[error("not a Debian binary package: missing {0}")]
  MissingMember(&'static str),
  #[error("unsupported package format version `{0}`")]
  FormatVersion(Box<str>),
  #[error("control archive has no control file")]
  NoControlFile,
  #[error("control field {field} is `{found}`, expected `{expected}`")]
  Mismatch {
    field: &'static str,
    expected: Box<str>,
    found: Box<str>,
  },
}

/// Fields of a `DEBIAN/control` file. Continuation lines are folded into the
/// preceding field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlFields(BTreeMap<Box<str>, String>);

impl ControlFields {
  pub fn parse(text: &str) -> Self {
    let mut fields: BTreeMap<Box<str>, String> = BTreeMap::new();
    let mut last: Option<Box<str>> = None;
    for line in text.lines() {
      if line.starts_with(|c: char| c == ' ' || c == '\t') {
        if let Some(value) = last.as_ref().and_then(|k| fields.get_mut(k)) {
          value.push('\n');
          value.push_str(line.trim());
        }
      } else if let Some((key, value)) = line.split_once(':') {
        let key: Box<str> = key.trim().into();
        fields.insert(key.clone(), value.trim().to_string());
        last = Some(key);
      }
    }
    Self(fields)
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.0.get(field).map(|x| &**x)
  }

  pub fn require(&self, field: &'static str, expected: &str) -> Result<(), InspectError> {
    match self.get(field) {
      Some(found) if found == expected => Ok(()),
      found => Err(InspectError::Mismatch {
        field,
        expected: expected.into(),
        found: found.unwrap_or_default().into(),
      }),
    }
  }
}

#[derive(Debug, Clone)]
pub struct DebInfo {
  pub control: ControlFields,
  pub data_member: Box<str>,
}

fn read_control(kind: ArchiveKind, src: impl Read) -> Result<ControlFields, InspectError> {
  let mut archive = tar::Archive::new(kind.decoder(src)?);
  for entry in archive.entries()? {
    let mut entry = entry?;
    let is_control = {
      let path = entry.path()?;
      path == Path::new("./control") || path == Path::new("control")
    };
    if is_control {
      let mut text = String::new();
      entry.read_to_string(&mut text)?;
      return Ok(ControlFields::parse(&text));
    }
  }
  Err(InspectError::NoControlFile)
}

pub fn inspect(src: impl Read) -> Result<DebInfo, InspectError> {
  let mut ar = ar::Archive::new(src);
  let mut format_version = None;
  let mut control = None;
  let mut data_member = None;

  while let Some(mut entry) = ar.next_entry().transpose()? {
    let name = from_utf8(entry.header().identifier())
      .map_err(|_| InspectError::MemberName)?
      .trim_end_matches('/')
      .to_string();
    if name == "debian-binary" {
      let mut text = String::new();
      entry.read_to_string(&mut text)?;
      format_version = Some(text.trim().to_string());
    } else if let Some((kind, "control")) = ArchiveKind::from_file_name(&name) {
      control = Some(read_control(kind, &mut entry)?);
    } else if let Some((_, "data")) = ArchiveKind::from_file_name(&name) {
      data_member = Some(name.into_boxed_str());
    }
  }

  let format_version = format_version.ok_or(InspectError::MissingMember("debian-binary"))?;
  if format_version != DEB_FORMAT_VERSION {
    return Err(InspectError::FormatVersion(format_version.into()));
  }
  Ok(DebInfo {
    control: control.ok_or(InspectError::MissingMember("control.tar"))?,
    data_member: data_member.ok_or(InspectError::MissingMember("data.tar"))?,
  })
}

pub fn inspect_file(path: &Path) -> Result<DebInfo, InspectError> {
  inspect(File::open(path)?)
}
