//! Terminal styling with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::{ColoredString, Colorize};

/// Section header (cyan bold)
pub fn heading(msg: &(impl std::fmt::Display + ?Sized)) -> ColoredString {
    msg.to_string().cyan().bold()
}

/// Command or parameter name (green)
pub fn name(msg: &(impl std::fmt::Display + ?Sized)) -> ColoredString {
    msg.to_string().green()
}

/// Secondary detail (dimmed)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) -> ColoredString {
    msg.to_string().dimmed()
}
