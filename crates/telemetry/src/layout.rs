//! Prompt layouts: how a document would be sent under each strategy.
//!
//! The naive layout is one flat system prompt. The lifetime-aware layout
//! splits it into content blocks so that the permanent prefix can carry a
//! prompt-cache marker:
//!
//! ```text
//! [ permanent layers ]  cache_control: ephemeral
//! [ SESSION_STATE    ]
//! [ invocation layers]
//! ```
//!
//! Nothing here talks to a provider; the layouts are for inspection.

use icspec_core::{Layer, LayerSchema, Lifetime};
use serde_json::{Value, json};

use crate::counter::TokenCounter;

const BLOCK_SEPARATOR: &str = "\n\n";

/// One content block of the lifetime-aware layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBlock {
    pub lifetime: Lifetime,
    pub text: String,
}

impl PromptBlock {
    /// Only the permanent block is marked for caching.
    pub fn is_cacheable(&self) -> bool {
        self.lifetime == Lifetime::Permanent
    }

    /// Content-block JSON with a cache marker on the cacheable block.
    pub fn to_json(&self) -> Value {
        if self.is_cacheable() {
            json!({
                "type": "text",
                "text": self.text,
                "cache_control": { "type": "ephemeral" },
            })
        } else {
            json!({ "type": "text", "text": self.text })
        }
    }
}

/// Both layouts of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLayout {
    naive: String,
    blocks: Vec<PromptBlock>,
}

impl PromptLayout {
    /// Build both layouts from parsed layers.
    ///
    /// Canonical layers are taken in schema order, last occurrence winning.
    /// Unknown layers are left out of both layouts.
    pub fn build(schema: &LayerSchema, layers: &[Layer]) -> Self {
        let selected: Vec<(Lifetime, String)> = schema
            .latest(layers)
            .map(|layer| (schema.lifetime_of(&layer.name), layer.to_block()))
            .collect();

        let naive = selected
            .iter()
            .map(|(_, block)| block.as_str())
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR);

        let joined = |lifetime: Lifetime| {
            selected
                .iter()
                .filter(|(l, _)| *l == lifetime)
                .map(|(_, block)| block.as_str())
                .collect::<Vec<_>>()
                .join(BLOCK_SEPARATOR)
        };

        let mut blocks = Vec::new();
        let permanent = joined(Lifetime::Permanent);
        if !permanent.is_empty() {
            blocks.push(PromptBlock {
                lifetime: Lifetime::Permanent,
                text: permanent,
            });
        }
        blocks.extend(
            selected
                .iter()
                .filter(|(l, _)| *l == Lifetime::Session)
                .map(|(_, block)| PromptBlock {
                    lifetime: Lifetime::Session,
                    text: block.clone(),
                }),
        );
        let invocation = joined(Lifetime::Invocation);
        if !invocation.is_empty() {
            blocks.push(PromptBlock {
                lifetime: Lifetime::Invocation,
                text: invocation,
            });
        }

        Self { naive, blocks }
    }

    /// The flat system prompt resent on every call.
    pub fn naive(&self) -> &str {
        &self.naive
    }

    /// Content blocks in send order.
    pub fn blocks(&self) -> &[PromptBlock] {
        &self.blocks
    }

    /// The block carrying the cache marker, if the document has permanent layers.
    pub fn cacheable(&self) -> Option<&PromptBlock> {
        self.blocks.iter().find(|b| b.is_cacheable())
    }

    /// Tokens in the cacheable prefix according to `counter`.
    pub fn cacheable_tokens(&self, counter: &dyn TokenCounter) -> u64 {
        self.cacheable().map_or(0, |b| counter.count(&b.text))
    }

    /// Whether the cacheable prefix reaches the provider's caching minimum.
    pub fn cache_eligible(&self, counter: &dyn TokenCounter, min_tokens: u64) -> bool {
        self.cacheable_tokens(counter) >= min_tokens
    }

    /// Both layouts as JSON: `{"naive": "...", "lifetime_aware": [blocks]}`.
    pub fn to_json(&self) -> Value {
        json!({
            "naive": self.naive,
            "lifetime_aware": self.blocks.iter().map(PromptBlock::to_json).collect::<Vec<_>>(),
        })
    }
}
