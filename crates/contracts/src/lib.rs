//! Instruction contracts: structural validation for ICS documents.
//!
//! An ICS document is checked in two phases. The boundary parser splits
//! the text into layers and reports structural breakage; the rule engine
//! then runs six ordered checks and produces a [`Verdict`].
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Document  │───▶│  Boundary    │───▶│  Rule        │
//! │  (text)    │    │  Parser      │    │  Engine      │
//! └────────────┘    └──────────────┘    └──────────────┘
//!                         │                    │
//!                   parse errors         ┌─────┴─────┐
//!                   (short-circuit) ───▶ │  Verdict  │
//!                                        │ violations│
//!                                        │ warnings  │
//!                                        └───────────┘
//! ```
//!
//! # Example
//!
//! ```
//! let verdict = icspec_contracts::validate(
//!     "###ICS:TASK_PAYLOAD###\nx\n###END:TASK_PAYLOAD###",
//! );
//! assert!(!verdict.compliant);
//! assert_eq!(verdict.violations.len(), 4);
//! ```

mod engine;
mod model;
mod parser;
mod syntax;

pub use engine::{Validator, validate};
pub use model::{RuleId, Verdict, Violation};
pub use parser::{ParseError, ParsedDocument, parse_layers};
pub use syntax::{CLEAR_SENTINEL, OUTPUT_CONTRACT_FIELDS, field_key, is_directive};
