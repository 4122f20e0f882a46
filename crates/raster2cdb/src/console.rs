use cdb_ingest::{Host, Layer, Project};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Terminal host: status goes to the log, progress to a bar, and Ctrl-C
/// (via the shared flag) cancels.
pub struct ConsoleHost {
    project: Project,
    bar: ProgressBar,
    cancel: Arc<AtomicBool>,
}

impl ConsoleHost {
    pub fn new(project: Project, cancel: Arc<AtomicBool>) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos:>3}% {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
        Self {
            project,
            bar,
            cancel,
        }
    }

    pub fn finish(&self, message: &'static str) {
        self.bar.finish_with_message(message);
    }
}

impl Host for ConsoleHost {
    fn layers(&self) -> Vec<Layer> {
        self.project.layers.clone()
    }

    fn checked_names(&self) -> HashSet<String> {
        self.project.checked_names()
    }

    fn report_progress(&mut self, percent: f64) {
        self.bar.set_position(percent.clamp(0.0, 100.0).round() as u64);
    }

    fn report_status(&mut self, text: &str) {
        self.bar.suspend(|| info!("{text}"));
        self.bar.set_message(text.to_owned());
    }

    fn report_error(&mut self, text: &str) {
        self.bar.suspend(|| error!("{text}"));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}
