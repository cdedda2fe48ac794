//! `icspec analyze`: per-layer token counts and session cost simulation.

use std::path::PathBuf;

use icspec_config::AppConfig;
use icspec_core::LayerSchema;
use icspec_telemetry::{
    CostAnalyzer, CountingMethod, SessionSimulationParams, TelemetryError, counter_for,
    render_text,
};

use super::{CommandResult, EXIT_NON_COMPLIANT, exit_for, read_document};

const WIDTH: usize = 72;

/// Flags for `icspec analyze`; unset values fall back to the config file.
pub struct AnalyzeArgs {
    pub file: PathBuf,
    pub invocations: Option<u64>,
    pub session_changes: Option<u64>,
    pub method: Option<CountingMethod>,
    pub tokenizer: Option<PathBuf>,
    pub json: bool,
}

pub fn run(args: AnalyzeArgs) -> CommandResult {
    let config = AppConfig::load()?;
    let text = read_document(Some(args.file.as_path()), false)?;

    let method = match args.method {
        Some(method) => method,
        None => config.analysis.method.parse::<CountingMethod>()?,
    };
    let tokenizer = args.tokenizer.or_else(|| config.analysis.tokenizer_path.clone());
    let params = SessionSimulationParams::new(
        args.invocations.unwrap_or(config.analysis.invocations),
        args.session_changes.unwrap_or(config.analysis.session_changes),
    );
    let json = args.json || config.wants_json();
    tracing::debug!(
        %method,
        invocations = params.num_invocations,
        session_changes = params.session_state_changes,
        "Resolved analysis settings"
    );

    let analyzer = CostAnalyzer::new(
        LayerSchema::canonical(),
        counter_for(method, tokenizer.as_deref()),
    )
    .with_cache_min_tokens(config.analysis.cache_min_tokens);

    match analyzer.analyze_text(&text, params) {
        Ok(report) => {
            if json {
                println!("{}", report.to_json()?);
            } else {
                let rule = "=".repeat(WIDTH);
                println!("{rule}\n  {}\n{rule}\n", args.file.display());
                print!("{}", render_text(&report));
            }
            Ok(exit_for(true))
        }
        Err(TelemetryError::Malformed(details)) => {
            if json {
                let body = serde_json::json!({ "error": "parse_errors", "details": details });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("ERROR: parse_errors");
                for detail in &details {
                    println!("  {detail}");
                }
            }
            Ok(EXIT_NON_COMPLIANT.into())
        }
        Err(e) => Err(e.into()),
    }
}
