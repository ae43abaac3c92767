//! `migrecon run` / `migrecon validate` — wire config and CSV files to the
//! engine and map outcomes to exit codes.
//!
//! Fatal vs degraded: an unusable pre-balances source aborts before any
//! reconciliation; an unusable optional source only disables the metrics
//! that depend on it.

use std::path::{Path, PathBuf};

use migrecon_engine::diag::{DiagnosticsSink, FileSink};
use migrecon_engine::{loader, render_summary, RunConfig, RunInput, SourceKind, Table};

use crate::exit_codes::{EXIT_EXCEPTIONS, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SOURCE_INVALID};
use crate::CliError;

fn cli_err(code: u8, message: impl Into<String>) -> CliError {
    CliError { code, message: message.into(), hint: None }
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_override: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    let config = RunConfig::from_toml(&config_str)
        .map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))?;

    // Source and log paths resolve relative to the config file's directory.
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let sink = FileSink::new(base_dir.join(&config.output.log));

    let pre_balances = load_source(SourceKind::PreBalances, &config, base_dir, &sink)
        .ok_or_else(|| {
            CliError {
                code: EXIT_SOURCE_INVALID,
                message: "pre-balances source failed validation".into(),
                hint: Some(format!("see {}", config.output.log)),
            }
        })?;

    let input = RunInput {
        pre_balances,
        pre_activity: load_source(SourceKind::PreActivity, &config, base_dir, &sink),
        post_interactive: load_source(SourceKind::PostInteractive, &config, base_dir, &sink),
        post_subscription: load_source(SourceKind::PostSubscription, &config, base_dir, &sink),
        post_activity: load_source(SourceKind::PostActivity, &config, base_dir, &sink),
    };

    let result = migrecon_engine::run(&config, &input, &sink);

    // Exception report CSV: explicit path (flag wins over config), or the
    // derived default name when exceptions exist.
    let report_path = output_override
        .or_else(|| config.output.exceptions.as_ref().map(|p| base_dir.join(p)))
        .or_else(|| {
            if result.exceptions.is_empty() {
                None
            } else {
                let preparer = result.meta.preparer.replace(' ', "_");
                Some(base_dir.join(format!(
                    "exceptions_{preparer}_{}.csv",
                    result.meta.run_at
                )))
            }
        });
    if let Some(path) = report_path {
        std::fs::write(&path, result.exceptions.to_csv())
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot write report: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    eprint!("{}", render_summary(&result.meta, &result.summary));

    if result.summary.total_exceptions > 0 {
        return Err(cli_err(
            EXIT_EXCEPTIONS,
            format!("{} exception(s) found", result.summary.total_exceptions),
        ));
    }

    Ok(())
}

/// Load one configured source, or None when it is not configured or
/// failed validation. Failures are already in the diagnostics log; a
/// stderr note keeps the operator informed without stopping the run.
fn load_source(
    kind: SourceKind,
    config: &RunConfig,
    base_dir: &Path,
    sink: &dyn DiagnosticsSink,
) -> Option<Table> {
    let path = base_dir.join(config.sources.path(kind)?);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) => {
            sink.record(&format!("Validation failed for {kind}: {e}"));
            eprintln!("note: skipping {kind}: cannot read {}", path.display());
            return None;
        }
    };
    match loader::validate(kind, &data, sink) {
        Ok(table) => Some(table),
        Err(e) => {
            eprintln!("note: skipping {kind}: {e}");
            None
        }
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;

    match RunConfig::from_toml(&config_str) {
        Ok(config) => {
            let configured = [
                SourceKind::PreBalances,
                SourceKind::PreActivity,
                SourceKind::PostInteractive,
                SourceKind::PostSubscription,
                SourceKind::PostActivity,
            ]
            .iter()
            .filter(|k| config.sources.path(**k).is_some())
            .count();
            eprintln!("valid: run '{}' with {} source(s)", config.name, configured);
            Ok(())
        }
        Err(e) => Err(cli_err(EXIT_INVALID_CONFIG, e.to_string())),
    }
}
