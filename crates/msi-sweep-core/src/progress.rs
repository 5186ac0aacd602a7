/// Trait for reporting scan progress.
///
/// Everything reported here is advisory. The CLI renders it with indicatif;
/// tests and embedders usually pass [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// Free-form status line, e.g. "Scanning installer cache folder...".
    fn on_message(&self, _message: &str) {}
    fn on_resolve_start(&self) {}
    fn on_products_found(&self, _count: usize) {}
    fn on_product(&self, _name: &str) {}
    fn on_component_scan_start(&self) {}
    fn on_component_progress(&self, _components_checked: usize) {}
    fn on_resolve_complete(&self, _registered: usize, _duration_secs: f64) {}
    fn on_reconcile_start(&self) {}
    fn on_reconcile_complete(&self, _orphans: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
