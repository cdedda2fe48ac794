//! `icspec validate`: check a document against the layer rules.

use std::path::PathBuf;

use icspec_config::AppConfig;
use icspec_contracts::Validator;

use super::{CommandResult, exit_for, read_document};

pub fn run(file: Option<PathBuf>, stdin: bool, json: bool) -> CommandResult {
    let config = AppConfig::load()?;
    let text = read_document(file.as_deref(), stdin)?;

    let verdict = Validator::default().validate(&text);

    if json || config.wants_json() {
        println!("{}", verdict.to_json()?);
    } else {
        println!("{}", verdict.report());
    }

    Ok(exit_for(verdict.compliant))
}
