//! Colored user-facing output
//!
//! Uses owo-colors for terminal colors. Colors follow terminal detection
//! unless [`set_color_mode`] forces them on or off.

use owo_colors::{OwoColorize, Stream, Style};

/// Color preference resolved from flags, config and environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Apply a color preference process-wide
pub fn set_color_mode(mode: ColorMode) {
    match mode {
        ColorMode::Auto => owo_colors::unset_override(),
        ColorMode::Always => owo_colors::set_override(true),
        ColorMode::Never => owo_colors::set_override(false),
    }
}

fn out(text: &str, style: Style) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.style(style))
        .to_string()
}

fn err(text: &str, style: Style) -> String {
    text.if_supports_color(Stream::Stderr, |t| t.style(style))
        .to_string()
}

/// Print an action header (blue, bold)
/// Example: "==> Switching to Terraform 1.7.5"
pub fn action(message: &str) {
    println!(
        "{} {}",
        out("==>", Style::new().blue().bold()),
        out(message, Style::new().bold())
    );
}

/// Print a detail line (dimmed)
/// Example: "     downloading https://..."
pub fn detail(message: &str) {
    println!("     {}", out(message, Style::new().dimmed()));
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!(
        "{} {}",
        out("==>", Style::new().green().bold()),
        out(message, Style::new().green())
    );
}

/// Print an info message (cyan marker)
pub fn info(message: &str) {
    println!("{} {}", out("::", Style::new().cyan()), message);
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        err("warning:", Style::new().yellow().bold()),
        err(message, Style::new().yellow())
    );
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        err("error:", Style::new().red().bold()),
        err(message, Style::new().red())
    );
}

/// Print a skip message (dimmed)
/// Example: "==> Terraform 1.7.5 already installed"
pub fn skip(message: &str) {
    println!(
        "{} {}",
        out("==>", Style::new().dimmed()),
        out(message, Style::new().dimmed())
    );
}

/// Print one version in a listing, highlighting recently used ones
pub fn list_item(version: &str, note: &str, is_recent: bool) {
    if is_recent {
        println!("  {} {}", out(version, Style::new().green()), out(note, Style::new().dimmed()));
    } else {
        println!("  {} {}", version, out(note, Style::new().dimmed()));
    }
}
