use crate::layer::Layer;
use std::collections::HashSet;

/// The application hosting an import run: it owns the project's layers,
/// shows status and progress, and decides when a run is cancelled.
pub trait Host {
    /// Project layers in draw order (first drawn first).
    fn layers(&self) -> Vec<Layer>;

    /// Names of layers the user has checked in the layer tree.
    fn checked_names(&self) -> HashSet<String>;

    /// Overall progress, 0..=100.
    fn report_progress(&mut self, percent: f64);

    fn report_status(&mut self, text: &str);

    fn report_error(&mut self, text: &str);

    fn is_cancelled(&self) -> bool;
}
