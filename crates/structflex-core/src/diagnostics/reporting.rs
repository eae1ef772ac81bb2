//! Summary statistics and human-readable reports for diagnostics

use super::collection::Diagnostics;
use super::types::DiagnosticCode;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Counts over a diagnostics list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub by_code: BTreeMap<DiagnosticCode, usize>,
    /// Distinct source paths with at least one diagnostic
    pub affected_paths: usize,
    pub most_common_code: Option<DiagnosticCode>,
}

impl DiagnosticSummary {
    pub fn from_diagnostics(diagnostics: &Diagnostics) -> Self {
        let mut by_code = BTreeMap::new();
        let mut paths = BTreeSet::new();
        for d in diagnostics {
            *by_code.entry(d.code).or_insert(0) += 1;
            paths.insert(d.path.to_string());
        }

        let most_common_code = by_code
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(code, _)| *code);

        Self {
            total: diagnostics.len(),
            errors: diagnostics.error_count(),
            warnings: diagnostics.warning_count(),
            by_code,
            affected_paths: paths.len(),
            most_common_code,
        }
    }
}

/// Render a report grouped by diagnostic code
pub fn generate_report(diagnostics: &Diagnostics, summary: &DiagnosticSummary) -> String {
    let mut report = String::new();

    report.push_str("=== Conversion Diagnostics Report ===\n\n");
    report.push_str(&format!("Total Diagnostics: {}\n", summary.total));
    report.push_str(&format!("Errors: {}\n", summary.errors));
    report.push_str(&format!("Warnings: {}\n", summary.warnings));
    report.push_str(&format!("Affected Paths: {}\n", summary.affected_paths));

    if let Some(code) = summary.most_common_code {
        report.push_str(&format!("Most Common: {}\n", code.title()));
    }
    report.push('\n');

    for (code, count) in &summary.by_code {
        report.push_str(&format!("--- {} ({}) ---\n", code.title(), count));
        for d in diagnostics.iter().filter(|d| d.code == *code).take(10) {
            let path = if d.path.is_root() {
                "<root>".to_string()
            } else {
                d.path.to_string()
            };
            report.push_str(&format!("  - [{}] {}: {}\n", d.severity, path, d.message));
        }
        if *count > 10 {
            report.push_str(&format!("  ... and {} more\n", count - 10));
        }
        report.push('\n');
    }

    report
}
