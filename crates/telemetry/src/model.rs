//! Data model for per-layer token counts, session simulation and cost reports.

use icspec_core::{LayerName, Lifetime};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

use crate::TelemetryError;

// ── Layer counts ──────────────────────────────────────────────────────────

/// Token and character count of one boundary-wrapped layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTokenCount {
    pub name: LayerName,
    pub lifetime: Lifetime,
    #[serde(rename = "tokens")]
    pub token_count: u64,
    #[serde(rename = "chars")]
    pub char_count: u64,
}

/// Token subtotals per lifetime for a single invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeBreakdown {
    pub permanent: u64,
    pub session: u64,
    pub invocation: u64,
}

impl LifetimeBreakdown {
    /// Sum the counts by lifetime. Unknown lifetimes are skipped.
    pub fn from_counts(counts: &[LayerTokenCount]) -> Self {
        let mut breakdown = Self::default();
        for count in counts {
            match count.lifetime {
                Lifetime::Permanent => breakdown.permanent += count.token_count,
                Lifetime::Session => breakdown.session += count.token_count,
                Lifetime::Invocation => breakdown.invocation += count.token_count,
                Lifetime::Unknown => {}
            }
        }
        breakdown
    }

    /// Tokens sent by one naive invocation.
    pub fn total(&self) -> u64 {
        self.permanent + self.session + self.invocation
    }

    /// Share of `part` in a single invocation, as a percentage.
    pub fn share_pct(&self, part: u64) -> f64 {
        match self.total() {
            0 => 0.0,
            total => part as f64 / total as f64 * 100.0,
        }
    }
}

// ── Simulation ────────────────────────────────────────────────────────────

/// Shape of the simulated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSimulationParams {
    /// Calls made in the session (N).
    pub num_invocations: u64,
    /// Times the session layer is resent (C).
    pub session_state_changes: u64,
}

impl Default for SessionSimulationParams {
    fn default() -> Self {
        Self {
            num_invocations: 10,
            session_state_changes: 1,
        }
    }
}

impl SessionSimulationParams {
    pub fn new(num_invocations: u64, session_state_changes: u64) -> Self {
        Self {
            num_invocations,
            session_state_changes,
        }
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.num_invocations == 0 {
            return Err(TelemetryError::InvalidParams(
                "num_invocations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Session totals under the naive and the lifetime-aware strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSimulation {
    pub num_invocations: u64,
    pub session_state_changes: u64,
    /// Every layer resent on every call.
    pub naive_total_tokens: u64,
    /// Permanent layers once, session layer per change, invocation layers per call.
    pub ics_total_tokens: u64,
    /// May be zero or negative when the session layer changes often.
    pub tokens_saved: i64,
    #[serde(serialize_with = "one_decimal")]
    pub savings_pct: f64,
}

impl SessionSimulation {
    /// Simulate a session over per-lifetime subtotals.
    ///
    /// Fails with [`TelemetryError::InvalidParams`] when a total does not
    /// fit the report's integer types.
    pub fn run(
        params: SessionSimulationParams,
        breakdown: &LifetimeBreakdown,
    ) -> Result<Self, TelemetryError> {
        let n = params.num_invocations;
        let c = params.session_state_changes;
        let naive = breakdown
            .permanent
            .checked_add(breakdown.session)
            .and_then(|t| t.checked_add(breakdown.invocation))
            .and_then(|t| t.checked_mul(n))
            .ok_or_else(|| overflow(params))?;
        let ics = breakdown
            .session
            .checked_mul(c)
            .zip(breakdown.invocation.checked_mul(n))
            .and_then(|(session, invocation)| session.checked_add(invocation))
            .and_then(|t| t.checked_add(breakdown.permanent))
            .ok_or_else(|| overflow(params))?;
        let saved = i64::try_from(i128::from(naive) - i128::from(ics))
            .map_err(|_| overflow(params))?;
        let savings_pct = if naive == 0 {
            0.0
        } else {
            saved as f64 / naive as f64 * 100.0
        };
        Ok(Self {
            num_invocations: n,
            session_state_changes: c,
            naive_total_tokens: naive,
            ics_total_tokens: ics,
            tokens_saved: saved,
            savings_pct,
        })
    }
}

fn overflow(params: SessionSimulationParams) -> TelemetryError {
    TelemetryError::InvalidParams(format!(
        "simulation overflows with {} invocations and {} session changes",
        params.num_invocations, params.session_state_changes
    ))
}

/// Percentages go out with one decimal, ties to even.
fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let rounded: f64 = format!("{value:.1}").parse().map_err(S::Error::custom)?;
    serializer.serialize_f64(rounded)
}

// ── Report ────────────────────────────────────────────────────────────────

/// Full result of analysing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    /// Label of the counting method actually used.
    pub method: String,
    /// One entry per canonical layer present, in canonical order.
    pub layers: Vec<LayerTokenCount>,
    pub single_invocation_tokens: u64,
    pub breakdown: LifetimeBreakdown,
    pub simulation: SessionSimulation,
    /// Advisory notes; never change the totals.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl CostReport {
    pub fn naive_total(&self) -> u64 {
        self.simulation.naive_total_tokens
    }

    pub fn ics_total(&self) -> u64 {
        self.simulation.ics_total_tokens
    }

    pub fn tokens_saved(&self) -> i64 {
        self.simulation.tokens_saved
    }

    pub fn savings_pct(&self) -> f64 {
        self.simulation.savings_pct
    }

    /// Counts for the layers with `lifetime`.
    pub fn layers_with(&self, lifetime: Lifetime) -> impl Iterator<Item = &LayerTokenCount> {
        self.layers.iter().filter(move |l| l.lifetime == lifetime)
    }

    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(name: LayerName, lifetime: Lifetime, tokens: u64) -> LayerTokenCount {
        LayerTokenCount {
            name,
            lifetime,
            token_count: tokens,
            char_count: tokens * 4,
        }
    }

    fn sample() -> LifetimeBreakdown {
        LifetimeBreakdown {
            permanent: 300,
            session: 50,
            invocation: 100,
        }
    }

    #[test]
    fn breakdown_skips_unknown() {
        let counts = vec![
            count(LayerName::ImmutableContext, Lifetime::Permanent, 100),
            count(LayerName::CapabilityDeclaration, Lifetime::Permanent, 40),
            count(LayerName::SessionState, Lifetime::Session, 20),
            count(LayerName::TaskPayload, Lifetime::Invocation, 30),
            count(LayerName::Unknown("EXTRA".into()), Lifetime::Unknown, 999),
        ];
        let b = LifetimeBreakdown::from_counts(&counts);
        assert_eq!(b.permanent, 140);
        assert_eq!(b.session, 20);
        assert_eq!(b.invocation, 30);
        assert_eq!(b.total(), 190);
    }

    #[test]
    fn share_of_empty_breakdown_is_zero() {
        assert_eq!(LifetimeBreakdown::default().share_pct(0), 0.0);
        assert!((sample().share_pct(300) - 66.666).abs() < 0.01);
    }

    #[test]
    fn naive_is_single_times_n() {
        for n in [1, 2, 10, 50] {
            let sim = SessionSimulation::run(SessionSimulationParams::new(n, 1), &sample()).unwrap();
            assert_eq!(sim.naive_total_tokens, 450 * n);
        }
    }

    #[test]
    fn ics_formula() {
        let sim = SessionSimulation::run(SessionSimulationParams::new(10, 3), &sample()).unwrap();
        assert_eq!(sim.ics_total_tokens, 300 + 50 * 3 + 100 * 10);
        assert_eq!(sim.tokens_saved, 4500 - 1450);
        assert!((sim.savings_pct - 67.777).abs() < 0.01);
    }

    #[test]
    fn single_invocation_saves_nothing() {
        let sim = SessionSimulation::run(SessionSimulationParams::new(1, 1), &sample()).unwrap();
        assert_eq!(sim.tokens_saved, 0);
        assert_eq!(sim.savings_pct, 0.0);
    }

    #[test]
    fn frequent_session_changes_can_cost_more() {
        let sim = SessionSimulation::run(SessionSimulationParams::new(1, 5), &sample()).unwrap();
        assert!(sim.tokens_saved < 0);
        assert!(sim.savings_pct < 0.0);
    }

    #[test]
    fn empty_breakdown_has_zero_savings() {
        let sim = SessionSimulation::run(
            SessionSimulationParams::default(),
            &LifetimeBreakdown::default(),
        )
        .unwrap();
        assert_eq!(sim.naive_total_tokens, 0);
        assert_eq!(sim.savings_pct, 0.0);
    }

    #[test]
    fn savings_non_decreasing_in_n() {
        let mut last = i64::MIN;
        for n in 1..=30 {
            let sim = SessionSimulation::run(SessionSimulationParams::new(n, 1), &sample()).unwrap();
            assert!(sim.tokens_saved >= last);
            last = sim.tokens_saved;
        }
    }

    #[test]
    fn zero_invocations_rejected() {
        let err = SessionSimulationParams::new(0, 1).validate().unwrap_err();
        assert!(err.to_string().contains("num_invocations"));
        assert!(SessionSimulationParams::default().validate().is_ok());
    }

    #[test]
    fn json_rounds_savings_and_renames_counts() {
        let sim = SessionSimulation::run(SessionSimulationParams::new(10, 3), &sample()).unwrap();
        let report = CostReport {
            method: "approximate (chars/4)".into(),
            layers: vec![count(LayerName::TaskPayload, Lifetime::Invocation, 100)],
            single_invocation_tokens: 450,
            breakdown: sample(),
            simulation: sim,
            warnings: vec![],
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["simulation"]["savings_pct"], 67.8);
        assert_eq!(json["layers"][0]["name"], "TASK_PAYLOAD");
        assert_eq!(json["layers"][0]["lifetime"], "invocation");
        assert_eq!(json["layers"][0]["tokens"], 100);
        assert_eq!(json["layers"][0]["chars"], 400);
        assert_eq!(report.naive_total(), 4500);
        assert_eq!(report.layers_with(Lifetime::Invocation).count(), 1);
    }

    #[test]
    fn huge_session_is_rejected_not_wrapped() {
        let err = SessionSimulation::run(SessionSimulationParams::new(u64::MAX / 100, 1), &sample())
            .unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidParams(_)));
        assert!(err.to_string().contains("overflows"));

        let err = SessionSimulation::run(SessionSimulationParams::new(1, u64::MAX), &sample())
            .unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidParams(_)));
    }

    #[test]
    fn savings_beyond_i64_are_rejected() {
        let breakdown = LifetimeBreakdown {
            permanent: 0,
            session: 0,
            invocation: 1,
        };
        let sim = SessionSimulation::run(SessionSimulationParams::new(u64::MAX, 0), &breakdown)
            .unwrap();
        assert_eq!(sim.tokens_saved, 0);

        let breakdown = LifetimeBreakdown {
            permanent: 0,
            session: 1,
            invocation: 0,
        };
        // Both totals fit u64 but their difference does not fit i64.
        let err = SessionSimulation::run(SessionSimulationParams::new(u64::MAX, 0), &breakdown)
            .unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidParams(_)));
    }

    #[test]
    fn large_session_still_runs() {
        let sim = SessionSimulation::run(SessionSimulationParams::new(1 << 40, 1), &sample())
            .unwrap();
        assert_eq!(sim.naive_total_tokens, 450 << 40);
        assert!(sim.tokens_saved > 0);
    }

    #[test]
    fn savings_pct_rounds_ties_to_even() {
        let sim = |savings_pct| SessionSimulation {
            num_invocations: 2,
            session_state_changes: 1,
            naive_total_tokens: 400,
            ics_total_tokens: 399,
            tokens_saved: 1,
            savings_pct,
        };
        let pct = |s: SessionSimulation| serde_json::to_value(s).unwrap()["savings_pct"].clone();
        assert_eq!(pct(sim(0.25)), 0.2);
        assert_eq!(pct(sim(0.35)), 0.3);
        assert_eq!(pct(sim(0.75)), 0.8);
        assert_eq!(pct(sim(-12.25)), -12.2);
        assert_eq!(pct(sim(53.6881)), 53.7);
    }
}
