//! Reconciliation engine: aligns pre/post tables by PlayerID and emits
//! exception rows.
//!
//! Both operations are pure over their table inputs; the only side effect
//! is the injected diagnostics sink. Execution is single-threaded and
//! batches run sequentially — batching bounds peak memory for the
//! join/diff step and is invisible in the output.

use std::collections::{HashMap, HashSet};

use crate::config::RunConfig;
use crate::diag::DiagnosticsSink;
use crate::model::{
    ExceptionRow, MetricValue, RunInput, RunMeta, RunResult, Table, KEY_COLUMN,
    METRIC_INTERACTIVE, METRIC_LAST_LOGIN, METRIC_SUBSCRIPTION,
};
use crate::report::ExceptionReport;
use crate::summary::compute_summary;

/// A table projected down to {PlayerID, metric}, nulls dropped, indexed
/// by key with first-row-wins semantics. `keys` preserves row order.
struct Projection {
    keys: Vec<String>,
    values: HashMap<String, MetricValue>,
}

fn project(table: &Table, metric: &str, sink: &dyn DiagnosticsSink) -> Option<Projection> {
    let key_idx = table.column_index(KEY_COLUMN)?;
    let metric_idx = table.column_index(metric)?;

    let mut keys = Vec::new();
    let mut values = HashMap::new();
    let mut duplicates = 0usize;

    for row in 0..table.rows.len() {
        let Some(key) = table.cell(row, key_idx) else { continue };
        let Some(value) = table.cell(row, metric_idx).and_then(MetricValue::parse) else {
            continue;
        };
        if values.contains_key(key) {
            duplicates += 1;
            continue;
        }
        keys.push(key.to_string());
        values.insert(key.to_string(), value);
    }

    if duplicates > 0 {
        sink.record(&format!(
            "Duplicate PlayerID values in {}: {duplicates} row(s) ignored, first occurrence kept",
            table.name
        ));
    }

    Some(Projection { keys, values })
}

/// Compare one metric between a pre and a post table.
///
/// Emits a row per key present on both sides whose values differ (exact
/// non-zero difference, no tolerance). Keys on only one side and rows
/// with a null value on either side are invisible here. A metric absent
/// from either table is a logged no-op, not an error.
pub fn reconcile_metric(
    pre: &Table,
    post: &Table,
    metric: &str,
    batch_size: usize,
    sink: &dyn DiagnosticsSink,
) -> Vec<ExceptionRow> {
    let (Some(pre_proj), Some(post_proj)) =
        (project(pre, metric, sink), project(post, metric, sink))
    else {
        sink.record(&format!("Metric {metric} not found in one of the files"));
        return Vec::new();
    };

    // Intersection in pre-table order.
    let common: Vec<&String> = pre_proj
        .keys
        .iter()
        .filter(|k| post_proj.values.contains_key(*k))
        .collect();

    let mut exceptions = Vec::new();
    for batch in common.chunks(batch_size.max(1)) {
        for key in batch {
            let pre_value = pre_proj.values[*key];
            let post_value = post_proj.values[*key];
            let Some(diff) = pre_value.diff(&post_value) else { continue };
            if diff != 0.0 {
                exceptions.push(ExceptionRow::ValueDiff {
                    player_id: (*key).clone(),
                    metric: metric.to_string(),
                    pre: pre_value,
                    post: post_value,
                    diff,
                });
            }
        }
    }

    exceptions
}

/// Presence-only login check, used when no pre-side activity table was
/// supplied: every key in `pre_keys` with no non-null LastLoginDate in
/// the post table becomes a "Missing Post" row, in `pre_keys` order.
pub fn reconcile_login(
    pre_keys: &[String],
    post: &Table,
    sink: &dyn DiagnosticsSink,
) -> Vec<ExceptionRow> {
    let Some(post_proj) = project(post, METRIC_LAST_LOGIN, sink) else {
        sink.record(&format!("Metric {METRIC_LAST_LOGIN} not found in {}", post.name));
        return Vec::new();
    };

    let post_keys: HashSet<&String> = post_proj.values.keys().collect();

    pre_keys
        .iter()
        .filter(|key| !post_keys.contains(key))
        .map(|key| ExceptionRow::MissingPost {
            player_id: key.clone(),
            metric: METRIC_LAST_LOGIN.to_string(),
        })
        .collect()
}

/// Execute one full reconciliation run over the supplied tables.
///
/// Metrics run in fixed order — InteractiveBalance, SubscriptionBalance,
/// LastLoginDate — and each runs only when its post table is present.
/// The login metric uses the value comparison when a pre-activity table
/// was supplied and falls back to the presence-only check otherwise.
pub fn run(config: &RunConfig, input: &RunInput, sink: &dyn DiagnosticsSink) -> RunResult {
    let mut report = ExceptionReport::default();

    if let Some(post) = &input.post_interactive {
        report.extend(reconcile_metric(
            &input.pre_balances,
            post,
            METRIC_INTERACTIVE,
            config.batch_size,
            sink,
        ));
    }

    if let Some(post) = &input.post_subscription {
        report.extend(reconcile_metric(
            &input.pre_balances,
            post,
            METRIC_SUBSCRIPTION,
            config.batch_size,
            sink,
        ));
    }

    if let Some(post) = &input.post_activity {
        match &input.pre_activity {
            Some(pre) => report.extend(reconcile_metric(
                pre,
                post,
                METRIC_LAST_LOGIN,
                config.batch_size,
                sink,
            )),
            None => {
                report.extend(reconcile_login(&input.pre_balances.player_ids(), post, sink));
            }
        }
    }

    let summary = compute_summary(&report);

    RunResult {
        meta: RunMeta {
            run_name: config.name.clone(),
            preparer: config.preparer.clone(),
            reviewer: config.reviewer.clone(),
            run_at: chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary,
        exceptions: report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{MemorySink, NullSink};

    fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn diff_row(ex: &ExceptionRow) -> (&str, f64) {
        match ex {
            ExceptionRow::ValueDiff { player_id, diff, .. } => (player_id, *diff),
            ExceptionRow::MissingPost { .. } => panic!("expected value diff"),
        }
    }

    #[test]
    fn balance_example() {
        // pre {(1,100),(2,200),(3,null)} vs post {(1,100),(2,250)}:
        // key 1 excluded (zero diff), key 3 excluded (null).
        let pre = table(
            "pre",
            &["PlayerID", "Balance"],
            &[&["1", "100"], &["2", "200"], &["3", ""]],
        );
        let post = table("post", &["PlayerID", "Balance"], &[&["1", "100"], &["2", "250"]]);

        let out = reconcile_metric(&pre, &post, "Balance", 1000, &NullSink);
        assert_eq!(out.len(), 1);
        assert_eq!(diff_row(&out[0]), ("2", -50.0));
        match &out[0] {
            ExceptionRow::ValueDiff { metric, pre, post, .. } => {
                assert_eq!(metric, "Balance");
                assert_eq!(pre.to_string(), "200");
                assert_eq!(post.to_string(), "250");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn null_excluded_even_when_other_side_differs() {
        let pre = table("pre", &["PlayerID", "B"], &[&["1", ""]]);
        let post = table("post", &["PlayerID", "B"], &[&["1", "999"]]);
        assert!(reconcile_metric(&pre, &post, "B", 1000, &NullSink).is_empty());
    }

    #[test]
    fn nan_cells_are_excluded_like_nulls() {
        // A literal "NaN" cell is not a comparable value; it must never
        // surface as an exception with a NaN diff.
        let pre = table("pre", &["PlayerID", "B"], &[&["1", "NaN"], &["2", "100"]]);
        let post = table("post", &["PlayerID", "B"], &[&["1", "NaN"], &["2", "100"]]);
        assert!(reconcile_metric(&pre, &post, "B", 1000, &NullSink).is_empty());

        // Same when only one side is NaN.
        let post = table("post", &["PlayerID", "B"], &[&["1", "50"], &["2", "100"]]);
        assert!(reconcile_metric(&pre, &post, "B", 1000, &NullSink).is_empty());
    }

    #[test]
    fn intersection_only() {
        let pre = table("pre", &["PlayerID", "B"], &[&["1", "10"], &["2", "20"]]);
        let post = table("post", &["PlayerID", "B"], &[&["2", "25"], &["3", "30"]]);
        let out = reconcile_metric(&pre, &post, "B", 1000, &NullSink);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].player_id(), "2");
    }

    #[test]
    fn missing_metric_is_soft_noop() {
        let pre = table("pre", &["PlayerID", "B"], &[&["1", "10"]]);
        let post = table("post", &["PlayerID", "Other"], &[&["1", "10"]]);
        let sink = MemorySink::new();
        let out = reconcile_metric(&pre, &post, "B", 1000, &sink);
        assert!(out.is_empty());
        assert_eq!(sink.entries(), vec!["Metric B not found in one of the files"]);
    }

    #[test]
    fn output_order_follows_pre_table() {
        let pre = table(
            "pre",
            &["PlayerID", "B"],
            &[&["z", "1"], &["a", "2"], &["m", "3"]],
        );
        let post = table(
            "post",
            &["PlayerID", "B"],
            &[&["a", "9"], &["m", "9"], &["z", "9"]],
        );
        let out = reconcile_metric(&pre, &post, "B", 1000, &NullSink);
        let ids: Vec<&str> = out.iter().map(|e| e.player_id()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn batch_size_never_changes_output() {
        let rows: Vec<Vec<String>> = (0..37)
            .map(|i| vec![format!("p{i}"), format!("{}", i * 10)])
            .collect();
        let pre = Table::new(
            "pre",
            vec!["PlayerID".into(), "B".into()],
            rows.clone(),
        );
        // Shift every third value so some keys mismatch.
        let post_rows: Vec<Vec<String>> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let bump = if i % 3 == 0 { 5 } else { 0 };
                vec![r[0].clone(), format!("{}", i * 10 + bump)]
            })
            .collect();
        let post = Table::new("post", vec!["PlayerID".into(), "B".into()], post_rows);

        let reference = reconcile_metric(&pre, &post, "B", 1_000_000, &NullSink);
        assert!(!reference.is_empty());
        for batch_size in [1, 2, 3, 7, 36, 37, 38] {
            let out = reconcile_metric(&pre, &post, "B", batch_size, &NullSink);
            assert_eq!(out, reference, "batch_size {batch_size} changed the output");
        }
    }

    #[test]
    fn duplicate_keys_keep_first_and_log() {
        let pre = table(
            "pre",
            &["PlayerID", "B"],
            &[&["1", "100"], &["1", "500"], &["2", "200"]],
        );
        let post = table("post", &["PlayerID", "B"], &[&["1", "150"], &["2", "200"]]);
        let sink = MemorySink::new();
        let out = reconcile_metric(&pre, &post, "B", 1000, &sink);
        assert_eq!(out.len(), 1);
        assert_eq!(diff_row(&out[0]), ("1", -50.0));
        assert_eq!(
            sink.entries(),
            vec!["Duplicate PlayerID values in pre: 1 row(s) ignored, first occurrence kept"]
        );
    }

    #[test]
    fn date_metric_diffs_in_days() {
        let pre = table(
            "pre",
            &["PlayerID", "LastLoginDate"],
            &[&["1", "2025-07-10"], &["2", "2025-07-01"]],
        );
        let post = table(
            "post",
            &["PlayerID", "LastLoginDate"],
            &[&["1", "2025-07-10"], &["2", "2025-07-04"]],
        );
        let out = reconcile_metric(&pre, &post, METRIC_LAST_LOGIN, 1000, &NullSink);
        assert_eq!(out.len(), 1);
        assert_eq!(diff_row(&out[0]), ("2", -3.0));
    }

    #[test]
    fn login_example() {
        // pre_keys {1,2,3}, post activity {(1,date),(3,date)} → only key 2.
        let post = table(
            "post",
            &["PlayerID", "LastLoginDate"],
            &[&["1", "2025-07-01"], &["3", "2025-07-02"]],
        );
        let pre_keys = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let out = reconcile_login(&pre_keys, &post, &NullSink);
        assert_eq!(
            out,
            vec![ExceptionRow::MissingPost {
                player_id: "2".into(),
                metric: METRIC_LAST_LOGIN.into(),
            }]
        );
    }

    #[test]
    fn login_null_date_counts_as_missing() {
        let post = table(
            "post",
            &["PlayerID", "LastLoginDate"],
            &[&["1", ""], &["2", "2025-07-01"]],
        );
        let pre_keys = vec!["1".to_string(), "2".to_string()];
        let out = reconcile_login(&pre_keys, &post, &NullSink);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].player_id(), "1");
    }

    #[test]
    fn login_output_follows_pre_key_order() {
        let post = table("post", &["PlayerID", "LastLoginDate"], &[]);
        let pre_keys = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let out = reconcile_login(&pre_keys, &post, &NullSink);
        let ids: Vec<&str> = out.iter().map(|e| e.player_id()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn login_missing_column_is_soft_noop() {
        let post = table("post", &["PlayerID", "Other"], &[&["1", "x"]]);
        let sink = MemorySink::new();
        let out = reconcile_login(&["1".to_string()], &post, &sink);
        assert!(out.is_empty());
        assert_eq!(sink.entries(), vec!["Metric LastLoginDate not found in post"]);
    }

    // -----------------------------------------------------------------------
    // Orchestration
    // -----------------------------------------------------------------------

    fn run_config() -> RunConfig {
        RunConfig::from_toml(
            r#"
name = "test run"
preparer = "P"
reviewer = "R"

[sources]
pre_balances = "pre.csv"
"#,
        )
        .unwrap()
    }

    fn full_input() -> RunInput {
        RunInput {
            pre_balances: table(
                "pre_balances",
                &["PlayerID", "InteractiveBalance", "SubscriptionBalance"],
                &[&["1", "100", "10"], &["2", "200", "20"], &["3", "300", "30"]],
            ),
            pre_activity: None,
            post_interactive: Some(table(
                "post_interactive",
                &["PlayerID", "InteractiveBalance"],
                &[&["1", "100"], &["2", "250"], &["3", "300"]],
            )),
            post_subscription: Some(table(
                "post_subscription",
                &["PlayerID", "SubscriptionBalance"],
                &[&["1", "10"], &["2", "20"], &["3", "99"]],
            )),
            post_activity: Some(table(
                "post_activity",
                &["PlayerID", "LastLoginDate"],
                &[&["1", "2025-07-01"], &["3", "2025-07-02"]],
            )),
        }
    }

    #[test]
    fn run_fixed_metric_order() {
        let result = run(&run_config(), &full_input(), &NullSink);
        let rows = result.exceptions.rows();
        let metrics: Vec<&str> = rows.iter().map(|e| e.metric()).collect();
        assert_eq!(
            metrics,
            vec!["InteractiveBalance", "SubscriptionBalance", "LastLoginDate"]
        );
        // Login fallback was presence-only (no pre-activity supplied).
        assert!(matches!(rows[2], ExceptionRow::MissingPost { .. }));
        assert_eq!(rows[2].player_id(), "2");

        assert_eq!(result.summary.total_exceptions, 3);
        assert_eq!(
            result.summary.metrics,
            vec!["InteractiveBalance", "LastLoginDate", "SubscriptionBalance"]
        );
        assert_eq!(result.meta.preparer, "P");
        assert_eq!(result.meta.run_at.len(), "YYYYMMDD_HHMMSS".len());
    }

    #[test]
    fn run_value_login_path_when_pre_activity_present() {
        let mut input = full_input();
        input.pre_activity = Some(table(
            "pre_activity",
            &["PlayerID", "LastLoginDate"],
            &[&["1", "2025-07-01"], &["3", "2025-07-09"]],
        ));
        let result = run(&run_config(), &input, &NullSink);
        let login_rows: Vec<&ExceptionRow> = result
            .exceptions
            .rows()
            .iter()
            .filter(|e| e.metric() == METRIC_LAST_LOGIN)
            .collect();
        // Value comparison now: key 3 differs by 7 days, nobody is "missing".
        assert_eq!(login_rows.len(), 1);
        assert!(matches!(login_rows[0], ExceptionRow::ValueDiff { .. }));
        assert_eq!(login_rows[0].player_id(), "3");
    }

    #[test]
    fn run_skips_metrics_without_post_tables() {
        let mut input = full_input();
        input.post_subscription = None;
        input.post_activity = None;
        let result = run(&run_config(), &input, &NullSink);
        assert_eq!(result.summary.total_exceptions, 1);
        assert_eq!(result.summary.metrics, vec!["InteractiveBalance"]);
    }

    #[test]
    fn run_clean_when_everything_matches() {
        let mut input = full_input();
        input.post_interactive = Some(table(
            "post_interactive",
            &["PlayerID", "InteractiveBalance"],
            &[&["1", "100"], &["2", "200"], &["3", "300"]],
        ));
        input.post_subscription = None;
        input.post_activity = None;
        let result = run(&run_config(), &input, &NullSink);
        assert_eq!(result.summary.total_exceptions, 0);
        assert!(result.exceptions.is_empty());
    }
}
