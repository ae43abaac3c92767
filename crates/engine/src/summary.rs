use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::RunMeta;
use crate::report::ExceptionReport;

/// Headline numbers for the audit summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_exceptions: usize,
    /// Distinct metrics with at least one exception, sorted.
    pub metrics: Vec<String>,
    pub exceptions_by_metric: BTreeMap<String, usize>,
}

pub fn compute_summary(report: &ExceptionReport) -> RunSummary {
    let mut exceptions_by_metric: BTreeMap<String, usize> = BTreeMap::new();
    for row in report.rows() {
        *exceptions_by_metric.entry(row.metric().to_string()).or_insert(0) += 1;
    }

    RunSummary {
        total_exceptions: report.len(),
        metrics: exceptions_by_metric.keys().cloned().collect(),
        exceptions_by_metric,
    }
}

/// Human-readable run summary, the audit-evidence block.
pub fn render_summary(meta: &RunMeta, summary: &RunSummary) -> String {
    let mut out = String::new();
    if summary.total_exceptions == 0 {
        out.push_str("No mismatches found\n");
        out.push_str(&format!("- Prepared by: {}\n", meta.preparer));
        out.push_str(&format!("- Reviewed by: {}\n", meta.reviewer));
        out.push_str(&format!("- Timestamp: {}\n", meta.run_at));
        return out;
    }

    out.push_str("Reconciliation Summary\n");
    out.push_str(&format!("- Prepared by: {}\n", meta.preparer));
    out.push_str(&format!("- Reviewed by: {}\n", meta.reviewer));
    out.push_str(&format!("- Timestamp: {}\n", meta.run_at));
    out.push_str(&format!("- Total Exceptions: {}\n", summary.total_exceptions));
    out.push_str(&format!(
        "- Metrics with Exceptions: {}\n",
        summary.metrics.join(", ")
    ));
    out
}
