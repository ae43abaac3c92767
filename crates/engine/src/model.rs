use chrono::NaiveDate;
use serde::Serialize;

/// Join key column shared by every source.
pub const KEY_COLUMN: &str = "PlayerID";

/// Metric names, in the fixed order they appear in the final report.
pub const METRIC_INTERACTIVE: &str = "InteractiveBalance";
pub const METRIC_SUBSCRIPTION: &str = "SubscriptionBalance";
pub const METRIC_LAST_LOGIN: &str = "LastLoginDate";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A validated in-memory table: header row plus raw string cells.
///
/// Cells are kept exactly as read — no type coercion happens at load time.
/// An empty cell is a null. Values are interpreted per metric at
/// comparison time via [`MetricValue::parse`].
#[derive(Debug, Clone)]
pub struct Table {
    /// Source label, used in diagnostics.
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name: name.into(), columns, rows }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell at (row, col); None for out-of-range or empty cells.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        let cell = self.rows.get(row)?.get(col)?.trim();
        if cell.is_empty() {
            None
        } else {
            Some(cell)
        }
    }

    /// PlayerID values in row order, first occurrence only.
    ///
    /// Rows with an empty key cell are skipped. This is the reference
    /// population used by the presence-only login check.
    pub fn player_ids(&self) -> Vec<String> {
        let Some(key_idx) = self.column_index(KEY_COLUMN) else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for row in 0..self.rows.len() {
            if let Some(id) = self.cell(row, key_idx) {
                if seen.insert(id.to_string()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }
}

/// All validated tables for one run. The pre-balances table is mandatory;
/// each optional table enables the metric(s) that depend on it.
pub struct RunInput {
    pub pre_balances: Table,
    pub pre_activity: Option<Table>,
    pub post_interactive: Option<Table>,
    pub post_subscription: Option<Table>,
    pub post_activity: Option<Table>,
}

// ---------------------------------------------------------------------------
// Metric values
// ---------------------------------------------------------------------------

/// A comparable cell value: a number or an ISO date.
///
/// Anything that parses as neither is treated like an empty cell and
/// excluded from comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Date(NaiveDate),
}

impl MetricValue {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        // NaN/inf literals carry no comparable value; treat them as null
        // like any other unparseable cell.
        if let Some(n) = raw.parse::<f64>().ok().filter(|n| n.is_finite()) {
            return Some(Self::Number(n));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Self::Date)
    }

    /// Natural subtraction `self - other`: numbers subtract exactly,
    /// dates subtract in whole days. Mixed types are incomparable.
    pub fn diff(&self, other: &Self) -> Option<f64> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Some(a - b),
            (Self::Date(a), Self::Date(b)) => Some((*a - *b).num_days() as f64),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

/// Status cell value for presence-only exceptions.
pub const STATUS_MISSING_POST: &str = "Missing Post";

/// One row of the exception report.
///
/// The two shapes are never mixed within a row; the exported report is the
/// union of both column sets, with absent fields left empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExceptionRow {
    /// Key present on both sides with a non-zero value difference.
    ValueDiff {
        player_id: String,
        metric: String,
        pre: MetricValue,
        post: MetricValue,
        diff: f64,
    },
    /// Key present in the pre reference set but absent from the post table.
    MissingPost { player_id: String, metric: String },
}

impl ExceptionRow {
    pub fn player_id(&self) -> &str {
        match self {
            Self::ValueDiff { player_id, .. } | Self::MissingPost { player_id, .. } => player_id,
        }
    }

    pub fn metric(&self) -> &str {
        match self {
            Self::ValueDiff { metric, .. } | Self::MissingPost { metric, .. } => metric,
        }
    }
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub run_name: String,
    pub preparer: String,
    pub reviewer: String,
    /// Timestamp of the run, `%Y%m%d_%H%M%S`.
    pub run_at: String,
    pub engine_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub summary: crate::summary::RunSummary,
    pub exceptions: crate::report::ExceptionReport,
}
