use console::{style, StyledObject};
use std::fmt::Display;

pub const PB_STYLE: &str = "{prefix:>10.cyan.bold} [{bar:40}] {pos}/{len} {wide_msg}";

/// Prints a highlighted step header on stderr, optionally followed by details.
#[macro_export]
macro_rules! segment_info {
  ($title:expr) => {
    eprintln!("{}", $crate::util::header($title))
  };
  ($title:expr, $($arg:tt)*) => {
    eprintln!("{} {}", $crate::util::header($title), format_args!($($arg)*))
  };
}

/// Same as [`segment_info!`] but styled as a warning.
#[macro_export]
macro_rules! segment_warn {
  ($($arg:tt)*) => {
    eprintln!("{} {}", $crate::util::warning("warning:"), format_args!($($arg)*))
  };
}

pub fn header(s: impl Display) -> StyledObject<String> {
  style(format!("==> {s}")).green().bold()
}

pub fn warning(s: impl Display) -> StyledObject<String> {
  style(s.to_string()).yellow().bold()
}

pub fn red_bold(s: impl Display) -> StyledObject<String> {
  style(s.to_string()).red().bold()
}

/// Honors `NO_COLOR` in addition to console's own terminal detection.
pub fn init_colors() {
  if std::env::var_os("NO_COLOR").is_some() {
    console::set_colors_enabled(false);
  }
}
