//! # ICS Core
//!
//! Domain types and error definitions for Instruction Contract
//! Specification (ICS) documents. This crate has **no framework
//! dependencies**: it defines the layer model that the parser, the rule
//! engine and the cost simulator all work against.
//!
//! ## Layers
//!
//! An ICS document is split into five boundary-delimited layers, each with
//! its own reuse lifetime:
//!
//! | Layer                    | Lifetime     |
//! |--------------------------|--------------|
//! | `IMMUTABLE_CONTEXT`      | permanent    |
//! | `CAPABILITY_DECLARATION` | permanent    |
//! | `SESSION_STATE`          | session      |
//! | `TASK_PAYLOAD`           | invocation   |
//! | `OUTPUT_CONTRACT`        | invocation   |
//!
//! The required order and the lifetime assignments live in a single
//! [`LayerSchema`] value that callers construct once and hand to every
//! component that needs it.

pub mod error;
pub mod layer;
pub mod schema;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use layer::{Layer, LayerName, last_named};
pub use schema::{LayerSchema, Lifetime};
