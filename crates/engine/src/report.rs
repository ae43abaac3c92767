//! Exception report assembly and CSV export.

use serde::Serialize;

use crate::model::{ExceptionRow, STATUS_MISSING_POST};

/// The concatenated exception rows of one run, in emission order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ExceptionReport {
    rows: Vec<ExceptionRow>,
}

impl ExceptionReport {
    pub fn push(&mut self, row: ExceptionRow) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: Vec<ExceptionRow>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[ExceptionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Export as CSV with the union of both row shapes: `PlayerID, Metric`,
    /// a `_pre`/`_post` column pair per metric that produced value diffs
    /// (first-seen order), one shared `diff` column, and a `Status` column
    /// when any presence exception exists. Fields a row doesn't carry are
    /// left empty.
    pub fn to_csv(&self) -> String {
        let mut value_metrics: Vec<&str> = Vec::new();
        let mut has_status = false;
        for row in &self.rows {
            match row {
                ExceptionRow::ValueDiff { metric, .. } => {
                    if !value_metrics.contains(&metric.as_str()) {
                        value_metrics.push(metric);
                    }
                }
                ExceptionRow::MissingPost { .. } => has_status = true,
            }
        }

        let mut header = vec!["PlayerID".to_string(), "Metric".to_string()];
        for m in &value_metrics {
            header.push(format!("{m}_pre"));
            header.push(format!("{m}_post"));
        }
        if !value_metrics.is_empty() {
            header.push("diff".into());
        }
        if has_status {
            header.push("Status".into());
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        // Header write into a Vec cannot fail.
        let _ = writer.write_record(&header);

        for row in &self.rows {
            let mut record = vec![String::new(); header.len()];
            record[0] = row.player_id().to_string();
            record[1] = row.metric().to_string();
            match row {
                ExceptionRow::ValueDiff { metric, pre, post, diff, .. } => {
                    let slot = value_metrics.iter().position(|m| m == metric).unwrap_or(0);
                    record[2 + slot * 2] = pre.to_string();
                    record[3 + slot * 2] = post.to_string();
                    record[2 + value_metrics.len() * 2] = diff.to_string();
                }
                ExceptionRow::MissingPost { .. } => {
                    record[header.len() - 1] = STATUS_MISSING_POST.into();
                }
            }
            let _ = writer.write_record(&record);
        }

        let bytes = writer.into_inner().unwrap_or_default();
        String::from_utf8(bytes).unwrap_or_default()
    }
}
