//! Built-in query units.
//!
//! Each unit lives in its own module and registers into the
//! [`QueryRegistry`](crate::registry::QueryRegistry) via
//! `with_builtin_queries`. A unit owns its typed parameter struct, the
//! JSON-schema rendering of that struct, and the check body.

use indicatif::{ProgressBar, ProgressStyle};

pub mod large_closed_prs;
pub mod large_prs;
pub mod old_open_prs;
pub mod stale_or_long_lived_prs;

/// Default cap on the number of open PRs a scan may fetch.
pub(crate) fn default_max_items() -> usize {
    200
}

/// Progress bar over a PR scan. Hidden automatically off-tty.
pub(crate) fn scan_progress(len: usize, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(label.to_string());
    bar
}
