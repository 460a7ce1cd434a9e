//! Progress display for tile loading and grid filling

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::LazyLock;

static PROGRESS_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{msg:>14}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} [{{elapsed_precise}}]"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Coordinates the progress bars of one mosaic run
///
/// When quiet, every bar it hands out is hidden so callers never need to
/// branch on verbosity.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    quiet: bool,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ProgressManager {
    /// Create a progress manager, optionally suppressing all output
    pub fn new(quiet: bool) -> Self {
        let multi_progress = MultiProgress::new();
        if quiet {
            multi_progress.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            multi_progress,
            quiet,
        }
    }

    /// Whether bars are hidden
    pub const fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Bar advanced once per tile file decoded
    pub fn tile_bar(&self, files: usize) -> ProgressBar {
        self.bar(files, "Loading tiles")
    }

    /// Bar advanced once per grid cell resolved
    pub fn grid_bar(&self, cells: usize) -> ProgressBar {
        self.bar(cells, "Building mosaic")
    }

    /// Remove every bar from the terminal
    pub fn finish(&self) {
        let _ = self.multi_progress.clear();
    }

    fn bar(&self, length: usize, message: &'static str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(length as u64);
        bar.set_style(PROGRESS_STYLE.clone());
        bar.set_message(message);
        self.multi_progress.add(bar)
    }
}
