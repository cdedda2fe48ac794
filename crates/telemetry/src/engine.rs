//! The cost analyzer: counts layer tokens and simulates a session.

use icspec_contracts::parse_layers;
use icspec_core::{Layer, LayerSchema};
use tracing::{debug, info};

use crate::TelemetryError;
use crate::counter::{ApproxCounter, TokenCounter};
use crate::model::{
    CostReport, LayerTokenCount, LifetimeBreakdown, SessionSimulation, SessionSimulationParams,
};

/// Minimum prompt prefix, in tokens, that providers will cache.
pub const DEFAULT_CACHE_MIN_TOKENS: u64 = 1024;

/// Counts layer tokens with an injected [`TokenCounter`] and simulates a
/// session under the naive and the lifetime-aware sending strategies.
pub struct CostAnalyzer {
    schema: LayerSchema,
    counter: Box<dyn TokenCounter>,
    cache_min_tokens: u64,
}

impl CostAnalyzer {
    /// Analyzer over `schema` using `counter`.
    pub fn new(schema: LayerSchema, counter: Box<dyn TokenCounter>) -> Self {
        Self {
            schema,
            counter,
            cache_min_tokens: DEFAULT_CACHE_MIN_TOKENS,
        }
    }

    /// Set the prompt-cache threshold used for the cacheability warning.
    /// Zero disables the warning.
    pub fn with_cache_min_tokens(mut self, tokens: u64) -> Self {
        self.cache_min_tokens = tokens;
        self
    }

    /// Count each canonical layer present, in canonical order.
    ///
    /// When a name occurs more than once the last occurrence is counted.
    /// Unknown layers are not counted.
    pub fn count_layers(&self, layers: &[Layer]) -> Vec<LayerTokenCount> {
        self.schema
            .latest(layers)
            .map(|layer| {
                let block = layer.to_block();
                let count = LayerTokenCount {
                    name: layer.name.clone(),
                    lifetime: self.schema.lifetime_of(&layer.name),
                    token_count: self.counter.count(&block),
                    char_count: block.chars().count() as u64,
                };
                debug!(
                    layer = %count.name,
                    lifetime = %count.lifetime,
                    tokens = count.token_count,
                    "Counted layer"
                );
                count
            })
            .collect()
    }

    /// Analyze already-parsed layers.
    pub fn analyze(
        &self,
        layers: &[Layer],
        params: SessionSimulationParams,
    ) -> Result<CostReport, TelemetryError> {
        params.validate()?;

        let counts = self.count_layers(layers);
        let breakdown = LifetimeBreakdown::from_counts(&counts);
        let simulation = SessionSimulation::run(params, &breakdown)?;
        let warnings = self.warnings(&breakdown, params);

        info!(
            naive = simulation.naive_total_tokens,
            ics = simulation.ics_total_tokens,
            saved = simulation.tokens_saved,
            "Session simulated"
        );

        Ok(CostReport {
            method: self.counter.label().to_string(),
            single_invocation_tokens: breakdown.total(),
            layers: counts,
            breakdown,
            simulation,
            warnings,
        })
    }

    /// Parse `text` and analyze it. Structural errors abort the analysis.
    pub fn analyze_text(
        &self,
        text: &str,
        params: SessionSimulationParams,
    ) -> Result<CostReport, TelemetryError> {
        let doc = parse_layers(text);
        if !doc.is_well_formed() {
            return Err(TelemetryError::Malformed(
                doc.errors.iter().map(ToString::to_string).collect(),
            ));
        }
        self.analyze(&doc.layers, params)
    }

    fn warnings(&self, breakdown: &LifetimeBreakdown, params: SessionSimulationParams) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.cache_min_tokens > 0 && breakdown.permanent < self.cache_min_tokens {
            warnings.push(format!(
                "Permanent layers total {} tokens, below the {}-token prompt-cache minimum; \
                 they will not be cached and the simulated savings will not materialize",
                breakdown.permanent, self.cache_min_tokens
            ));
        }
        if params.session_state_changes > params.num_invocations {
            warnings.push(format!(
                "SESSION_STATE changes ({}) exceed invocations ({})",
                params.session_state_changes, params.num_invocations
            ));
        }
        warnings
    }
}

impl Default for CostAnalyzer {
    fn default() -> Self {
        Self::new(LayerSchema::canonical(), Box::new(ApproxCounter))
    }
}

impl std::fmt::Debug for CostAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostAnalyzer")
            .field("schema", &self.schema)
            .field("counter", &self.counter.label())
            .field("cache_min_tokens", &self.cache_min_tokens)
            .finish()
    }
}
