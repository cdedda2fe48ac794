//! The canonical layer schema: required order plus lifetime per layer.

use crate::layer::{Layer, LayerName, last_named};
use serde::{Deserialize, Serialize};

/// How long a layer's content stays valid once sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// Sent once per session and eligible for prompt caching.
    Permanent,
    /// Resent only when the session state changes.
    Session,
    /// Resent on every invocation.
    Invocation,
    /// Not a canonical layer; excluded from cost simulation.
    Unknown,
}

impl Lifetime {
    /// Long-form label used in human-readable reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Permanent => "cacheable (permanent)",
            Self::Session => "session-scoped",
            Self::Invocation => "per-invocation",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permanent => write!(f, "permanent"),
            Self::Session => write!(f, "session"),
            Self::Invocation => write!(f, "invocation"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The ordered set of canonical layers and their lifetimes.
///
/// Constructed once and shared by the rule engine (order and completeness
/// checks) and the cost simulator (lifetime classification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSchema {
    entries: Vec<(LayerName, Lifetime)>,
}

impl LayerSchema {
    /// The ICS v0.1 schema.
    pub fn canonical() -> Self {
        Self {
            entries: vec![
                (LayerName::ImmutableContext, Lifetime::Permanent),
                (LayerName::CapabilityDeclaration, Lifetime::Permanent),
                (LayerName::SessionState, Lifetime::Session),
                (LayerName::TaskPayload, Lifetime::Invocation),
                (LayerName::OutputContract, Lifetime::Invocation),
            ],
        }
    }

    /// Canonical names in required order.
    pub fn order(&self) -> impl Iterator<Item = &LayerName> {
        self.entries.iter().map(|(name, _)| name)
    }

    /// Whether `name` is one of the schema's layers.
    pub fn contains(&self, name: &LayerName) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// The last occurrence of each canonical layer present in `layers`,
    /// in canonical order. Unknown layers are skipped.
    pub fn latest<'a>(&'a self, layers: &'a [Layer]) -> impl Iterator<Item = &'a Layer> + 'a {
        self.order().filter_map(move |name| last_named(layers, name))
    }

    /// Classify a layer name. Names outside the schema are [`Lifetime::Unknown`].
    pub fn lifetime_of(&self, name: &LayerName) -> Lifetime {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, lifetime)| *lifetime)
            .unwrap_or(Lifetime::Unknown)
    }

    /// Comma-separated canonical tags, for messages.
    pub fn describe(&self) -> String {
        self.order()
            .map(LayerName::as_tag)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LayerSchema {
    fn default() -> Self {
        Self::canonical()
    }
}
