//! Plain-text rendering of a [`CostReport`].
//!
//! The table carries the same per-layer fields as the JSON report.

use std::fmt;

use crate::model::CostReport;

const WIDTH: usize = 72;

/// Render the per-layer table, lifetime breakdown and session simulation.
pub fn render_text(report: &CostReport) -> String {
    report.to_string()
}

impl fmt::Display for CostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = "-".repeat(WIDTH);
        let b = &self.breakdown;
        let sim = &self.simulation;
        let n = sim.num_invocations;
        let c = sim.session_state_changes;
        let total = self.single_invocation_tokens;
        let total_chars: u64 = self.layers.iter().map(|l| l.char_count).sum();

        writeln!(f, "Token counting method: {}\n", self.method)?;
        writeln!(f, "{sep}")?;
        writeln!(
            f,
            "  {:<24}  {:<22}  {:>8}  {:>8}",
            "Layer", "Lifetime", "Tokens", "Chars"
        )?;
        writeln!(f, "{sep}")?;
        for layer in &self.layers {
            writeln!(
                f,
                "  {:<24}  {:<22}  {:>8}  {:>8}",
                layer.name.as_tag(),
                layer.lifetime.label(),
                grouped(layer.token_count),
                grouped(layer.char_count)
            )?;
        }
        writeln!(f, "{sep}")?;
        writeln!(
            f,
            "  {:<48}  {:>8}  {:>8}",
            "TOTAL (single invocation)",
            grouped(total),
            grouped(total_chars)
        )?;
        writeln!(f)?;
        for (label, part) in [
            ("Cacheable (permanent):", b.permanent),
            ("Session-scoped:", b.session),
            ("Per-invocation:", b.invocation),
        ] {
            writeln!(
                f,
                "  {label:<24} {:>7} tokens  ({:.1}% of single invocation)",
                grouped(part),
                b.share_pct(part)
            )?;
        }

        writeln!(f, "\n{sep}")?;
        writeln!(
            f,
            "  Session simulation: {n} invocations, SESSION_STATE changes {c} time(s)"
        )?;
        writeln!(f, "{sep}")?;
        writeln!(
            f,
            "  {:<45}  {:>10} tokens",
            "Naive (resend all layers every call)",
            grouped(sim.naive_total_tokens)
        )?;
        writeln!(
            f,
            "  {:<45}  {:>10} tokens",
            "ICS (cache permanent, resend variable)",
            grouped(sim.ics_total_tokens)
        )?;
        writeln!(f, "{sep}")?;
        writeln!(
            f,
            "  {:<45}  {:>10} tokens",
            "Tokens saved",
            grouped_signed(sim.tokens_saved)
        )?;
        writeln!(f, "  {:<45}  {:>9.1}%", "Savings", sim.savings_pct)?;
        writeln!(f)?;

        // Both products are bounded by the ICS total the simulation produced.
        writeln!(f, "  Where the savings come from:")?;
        writeln!(
            f,
            "    - Cacheable layers sent once:       {:>6} tokens (1 x {})",
            grouped(b.permanent),
            grouped(b.permanent)
        )?;
        writeln!(
            f,
            "    - Session layer sent {c} time(s):    {:>6} tokens ({c} x {})",
            grouped(b.session.saturating_mul(c)),
            grouped(b.session)
        )?;
        writeln!(
            f,
            "    - Invocation layers sent {n:2} times:  {:>6} tokens ({n} x {})",
            grouped(b.invocation.saturating_mul(n)),
            grouped(b.invocation)
        )?;
        writeln!(
            f,
            "    - Total ICS cost:                   {:>6} tokens",
            grouped(sim.ics_total_tokens)
        )?;
        writeln!(
            f,
            "    - vs. naive cost:                   {:>6} tokens ({n} x {})",
            grouped(sim.naive_total_tokens),
            grouped(total)
        )?;

        if !self.warnings.is_empty() {
            writeln!(f)?;
            for warning in &self.warnings {
                writeln!(f, "  [WARN] {warning}")?;
            }
        }
        Ok(())
    }
}

/// `1234567` → `1,234,567`.
fn grouped(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn grouped_signed(value: i64) -> String {
    if value < 0 {
        format!("-{}", grouped(value.unsigned_abs()))
    } else {
        grouped(value.unsigned_abs())
    }
}
