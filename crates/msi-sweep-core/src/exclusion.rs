use tracing::{debug, trace};

use crate::models::{FilteredResult, OrphanedFile, PackageSummary};

/// Source of package metadata for the exclusion pass.
///
/// Implementations return `None` for anything they cannot read; a missing
/// summary never excludes a file.
pub trait SummaryInfoSource {
    fn summary_info(&self, path: &str) -> Option<PackageSummary>;
}

/// Split orphaned files into actionable and excluded.
///
/// A file is excluded when any filter term occurs, ignoring case, in its
/// file name or, failing that, in its title, subject, author or signer.
/// Metadata is only fetched for files the name check did not exclude.
pub fn apply_filters(
    files: &[OrphanedFile],
    filters: &[String],
    metadata: Option<&dyn SummaryInfoSource>,
) -> FilteredResult {
    let terms: Vec<String> = filters
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();

    if terms.is_empty() {
        return FilteredResult {
            actionable: files.to_vec(),
            excluded: Vec::new(),
        };
    }

    let mut result = FilteredResult::default();
    for file in files {
        let excluded = matches_any(&terms, file.file_name())
            || metadata
                .and_then(|source| source.summary_info(&file.full_path))
                .is_some_and(|summary| summary_matches(&terms, &summary));

        if excluded {
            trace!("Excluded by filter: {}", file.full_path);
            result.excluded.push(file.clone());
        } else {
            result.actionable.push(file.clone());
        }
    }

    debug!(
        "Exclusion pass: {} actionable, {} excluded",
        result.actionable.len(),
        result.excluded.len()
    );
    result
}

fn summary_matches(terms: &[String], summary: &PackageSummary) -> bool {
    [
        &summary.title,
        &summary.subject,
        &summary.author,
        &summary.signer,
    ]
    .iter()
    .any(|field| matches_any(terms, field))
}

/// `terms` must already be lowercase.
fn matches_any(terms: &[String], haystack: &str) -> bool {
    if haystack.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    terms.iter().any(|term| haystack.contains(term.as_str()))
}

/// Reader for the packages on this machine, if the platform has one.
#[cfg(target_os = "windows")]
pub fn system_summary_source() -> Option<Box<dyn SummaryInfoSource>> {
    Some(Box::new(crate::msi::summary::MsiSummaryReader))
}

#[cfg(not(target_os = "windows"))]
pub fn system_summary_source() -> Option<Box<dyn SummaryInfoSource>> {
    None
}
