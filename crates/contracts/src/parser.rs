//! Layer boundary parser.
//!
//! Splits an ICS document into layers delimited by boundary lines:
//!
//! ```text
//! ###ICS:TASK_PAYLOAD###
//! Summarise the incident report.
//! ###END:TASK_PAYLOAD###
//! ```
//!
//! Grammar (informal):
//! ```text
//! open     = "###ICS:" TAG "###" WS*
//! close    = "###END:" TAG "###" WS*
//! TAG      = [A-Z_]+
//! ```
//!
//! The parser keeps a single open-layer slot. Structural problems are
//! collected as [`ParseError`]s rather than aborting, so a caller always
//! gets back every layer that did close cleanly. A line that only *looks*
//! like a boundary (lowercase tag, missing hashes) is ordinary content.

use std::sync::LazyLock;

use icspec_core::{Layer, LayerName};
use regex_lite::Regex;
use serde::Serialize;
use tracing::debug;

static OPEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^###ICS:([A-Z_]+)###\s*$").ok());
static CLOSE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^###END:([A-Z_]+)###\s*$").ok());

/// A structural problem found while scanning boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    /// An open boundary while another layer is still open.
    #[error("Line {line}: opened ###ICS:{name}### before ###END:{open}### was seen")]
    NestedOpen {
        line: usize,
        name: String,
        open: String,
    },

    /// A close boundary with no layer open.
    #[error("Line {line}: ###END:{name}### found without matching ###ICS:{name}###")]
    UnmatchedClose { line: usize, name: String },

    /// A close boundary whose tag differs from the open layer.
    #[error("Line {line}: ###END:{name}### does not match open layer {open}")]
    MismatchedClose {
        line: usize,
        name: String,
        open: String,
    },

    /// End of input with a layer still open.
    #[error("Layer {name} opened at line {start_line} but ###END:{name}### was never found")]
    Unterminated { name: String, start_line: usize },
}

/// Result of scanning a document.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// Layers that closed cleanly, in document order.
    pub layers: Vec<Layer>,
    /// Structural errors, in the order they were found.
    pub errors: Vec<ParseError>,
}

impl ParsedDocument {
    /// True when no structural error was found.
    pub fn is_well_formed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A recognised boundary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary<'a> {
    Open(&'a str),
    Close(&'a str),
}

/// The layer currently being collected.
struct OpenLayer<'a> {
    name: &'a str,
    start_line: usize,
    lines: Vec<&'a str>,
}

/// Parse `text` into layers plus structural errors.
pub fn parse_layers(text: &str) -> ParsedDocument {
    let mut doc = ParsedDocument::default();
    let mut open: Option<OpenLayer<'_>> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        match classify(line) {
            Some(Boundary::Open(tag)) => match open.as_ref().map(|current| current.name) {
                Some(open_name) => doc.errors.push(ParseError::NestedOpen {
                    line: line_no,
                    name: tag.to_string(),
                    open: open_name.to_string(),
                }),
                None => {
                    open = Some(OpenLayer {
                        name: tag,
                        start_line: line_no,
                        lines: Vec::new(),
                    });
                }
            },
            Some(Boundary::Close(tag)) => match open.take() {
                None => doc.errors.push(ParseError::UnmatchedClose {
                    line: line_no,
                    name: tag.to_string(),
                }),
                Some(current) if current.name != tag => {
                    doc.errors.push(ParseError::MismatchedClose {
                        line: line_no,
                        name: tag.to_string(),
                        open: current.name.to_string(),
                    });
                    open = Some(current);
                }
                Some(current) => {
                    let layer = Layer {
                        name: LayerName::from_tag(current.name),
                        content: current.lines.join("\n").trim().to_string(),
                        start_line: current.start_line,
                        end_line: line_no,
                    };
                    debug!(
                        layer = %layer.name,
                        start = layer.start_line,
                        end = layer.end_line,
                        "Closed layer"
                    );
                    doc.layers.push(layer);
                }
            },
            None => {
                if let Some(current) = open.as_mut() {
                    current.lines.push(line);
                }
            }
        }
    }

    if let Some(current) = open {
        doc.errors.push(ParseError::Unterminated {
            name: current.name.to_string(),
            start_line: current.start_line,
        });
    }

    doc
}

fn classify(line: &str) -> Option<Boundary<'_>> {
    boundary_tag(&OPEN, line)
        .map(Boundary::Open)
        .or_else(|| boundary_tag(&CLOSE, line).map(Boundary::Close))
}

fn boundary_tag<'a>(pattern: &Option<Regex>, line: &'a str) -> Option<&'a str> {
    pattern
        .as_ref()?
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|tag| tag.as_str())
}
