use indicatif::{ProgressBar, ProgressStyle};
use msi_sweep_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner per phase on stderr. Product and component counts are not known
/// up front, so nothing here is a bounded bar.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_spinner(&self, message: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICKS));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = guard.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn set_message(&self, message: String) {
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.as_ref() {
            pb.set_message(message);
        }
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_message(&self, message: &str) {
        self.set_message(message.to_string());
    }

    fn on_resolve_start(&self) {
        self.start_spinner("Enumerating installed products...");
    }

    fn on_products_found(&self, count: usize) {
        self.set_message(format!("{} installed products", count));
    }

    fn on_product(&self, name: &str) {
        self.set_message(format!("Reading {}", name));
    }

    fn on_component_scan_start(&self) {
        self.start_spinner("Scanning component registrations...");
    }

    fn on_component_progress(&self, components_checked: usize) {
        self.set_message(format!(
            "Scanning component registrations... {} checked",
            components_checked
        ));
    }

    fn on_resolve_complete(&self, registered: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Registrations resolved: {} packages in {:.2}s",
            registered, duration_secs
        );
    }

    fn on_reconcile_start(&self) {
        self.start_spinner("Scanning installer cache folder...");
    }

    fn on_reconcile_complete(&self, orphans: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Cache reconciled: {} orphaned packages in {:.2}s",
            orphans, duration_secs
        );
    }
}
