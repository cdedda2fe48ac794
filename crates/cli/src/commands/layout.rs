//! `icspec layout`: dry-run rendering of both prompt layouts.

use std::path::PathBuf;

use icspec_config::AppConfig;
use icspec_contracts::parse_layers;
use icspec_core::LayerSchema;
use icspec_telemetry::{PromptLayout, TokenCounter, WordBoundaryCounter};

use super::{CommandResult, EXIT_NON_COMPLIANT, exit_for, read_document};

pub fn run(file: PathBuf, json: bool) -> CommandResult {
    let config = AppConfig::load()?;
    let text = read_document(Some(file.as_path()), false)?;

    let doc = parse_layers(&text);
    if !doc.is_well_formed() {
        eprintln!("Cannot lay out a malformed document:");
        for err in &doc.errors {
            eprintln!("  {err}");
        }
        return Ok(EXIT_NON_COMPLIANT.into());
    }

    let layout = PromptLayout::build(&LayerSchema::canonical(), &doc.layers);

    if json || config.wants_json() {
        println!("{}", serde_json::to_string_pretty(&layout.to_json())?);
        return Ok(exit_for(true));
    }

    // Cache eligibility uses the local word-boundary estimate
    let counter = WordBoundaryCounter;
    let min_tokens = config.analysis.cache_min_tokens;
    let sep = "-".repeat(72);

    println!(
        "Naive layout: one system prompt, resent every call (~{} tokens)",
        counter.count(layout.naive())
    );
    println!("{sep}\n{}\n{sep}\n", layout.naive());

    println!("Lifetime-aware layout: {} block(s)", layout.blocks().len());
    for (i, block) in layout.blocks().iter().enumerate() {
        let marker = if block.is_cacheable() {
            ", cache_control: ephemeral"
        } else {
            ""
        };
        println!(
            "\n[block {}] {}{marker} (~{} tokens)",
            i + 1,
            block.lifetime.label(),
            counter.count(&block.text)
        );
        println!("{sep}\n{}\n{sep}", block.text);
    }

    let cacheable = layout.cacheable_tokens(&counter);
    println!();
    if layout.cacheable().is_none() {
        println!("No permanent layers: nothing to cache.");
    } else if layout.cache_eligible(&counter, min_tokens) {
        println!("Cacheable prefix: ~{cacheable} tokens (>= {min_tokens}); prompt caching applies.");
    } else {
        println!(
            "Cacheable prefix: ~{cacheable} tokens (< {min_tokens}); below the prompt-cache minimum, \
             the permanent block will be billed at the full rate."
        );
    }

    Ok(exit_for(true))
}
