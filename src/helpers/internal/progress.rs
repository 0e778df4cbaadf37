//! Spinners and byte bars drawn on stderr
//!
//! Stdout is reserved for machine-readable output (`--show-latest`,
//! `--list-all`), so every indicator targets stderr. indicatif hides a
//! stderr target that is not a terminal.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Redraws per second; artifacts are tens of megabytes so this is plenty
const DRAW_HZ: u8 = 12;

const SPINNER_TEMPLATE: &str = "     {spinner:.cyan} {msg}";

const TRANSFER_TEMPLATE: &str =
    "     {spinner:.cyan} {msg:.dim} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})";

fn styled(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or(fallback)
        .tick_chars(TICKS)
}

/// Spinner on stderr carrying `message`
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(DRAW_HZ));
    pb.set_style(styled(SPINNER_TEMPLATE, ProgressStyle::default_spinner()));
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(1000 / u64::from(DRAW_HZ)));
    pb
}

/// Turn a spinner into a byte bar once `Content-Length` is known.
/// The message stays, so the artifact name remains visible.
pub fn upgrade_to_bytes(pb: &ProgressBar, total_bytes: u64) {
    pb.set_length(total_bytes);
    pb.set_style(
        styled(TRANSFER_TEMPLATE, ProgressStyle::default_bar()).progress_chars("━╸━"),
    );
}

/// Clears the indicator on drop, so an early `?` never leaves a stale line.
pub struct ProgressGuard<'a>(&'a ProgressBar);

impl<'a> ProgressGuard<'a> {
    pub fn new(pb: &'a ProgressBar) -> Self {
        Self(pb)
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

/// Run a blocking step (extraction, signature check) under a spinner.
pub fn with_spinner<T, E>(message: &str, step: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let pb = create_spinner(message);
    let _guard = ProgressGuard::new(&pb);
    step()
}
