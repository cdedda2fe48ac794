//! Verdict data model: rule identifiers, violations, and the verdict.

use serde::{Deserialize, Serialize};

/// Identifies which ICS rule a violation breaks.
///
/// Serialized as the section label of the ICS document (e.g. `§3.2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleId {
    /// Structural boundary error; validation stopped.
    ParseError,
    /// A canonical layer is absent.
    MissingLayer,
    /// A layer name outside the canonical five.
    UnknownLayer,
    /// Canonical layers appear out of order.
    CanonicalOrder,
    /// `CLEAR` shares the session layer with other content.
    SessionClear,
    /// The task payload carries a capability directive.
    PayloadDirective,
    /// The session layer restates an immutable-context line.
    SessionRestatement,
    /// A capability line is not a directive.
    CapabilitySyntax,
    /// The output contract lacks a required field.
    OutputContractField,
}

impl RuleId {
    pub const ALL: [RuleId; 9] = [
        RuleId::ParseError,
        RuleId::MissingLayer,
        RuleId::UnknownLayer,
        RuleId::CanonicalOrder,
        RuleId::SessionClear,
        RuleId::PayloadDirective,
        RuleId::SessionRestatement,
        RuleId::CapabilitySyntax,
        RuleId::OutputContractField,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ParseError => "§3.6 (parse error)",
            Self::MissingLayer => "§5.2 Step 1",
            Self::UnknownLayer => "§3.6",
            Self::CanonicalOrder => "§4.1",
            Self::SessionClear => "§3.3",
            Self::PayloadDirective => "§3.4 / §4.2",
            Self::SessionRestatement => "§3.3 / §4.2",
            Self::CapabilitySyntax => "§3.2",
            Self::OutputContractField => "§3.5",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.label() == label)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<String> for RuleId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_label(&s).ok_or_else(|| format!("unknown rule id: {s}"))
    }
}

impl From<RuleId> for String {
    fn from(rule: RuleId) -> Self {
        rule.label().to_string()
    }
}

/// One detected non-conformance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Validation step that found it (1 to 6).
    pub step: u8,
    /// The rule that was broken.
    pub rule: RuleId,
    /// Human-readable detail, quoting the offending line where there is one.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Step {}] {}: {}", self.step, self.rule, self.message)
    }
}

/// The outcome of validating one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// `false` iff `violations` is non-empty.
    pub compliant: bool,
    /// Violations in detection order.
    pub violations: Vec<Violation>,
    /// Advisory notices; never affect `compliant`.
    pub warnings: Vec<String>,
}

impl Verdict {
    /// Build a verdict, deriving `compliant` from the violations.
    pub fn new(violations: Vec<Violation>, warnings: Vec<String>) -> Self {
        Self {
            compliant: violations.is_empty(),
            violations,
            warnings,
        }
    }

    /// Whether any violation carries `rule`.
    pub fn has_rule(&self, rule: RuleId) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }

    /// Human-readable report.
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        if self.compliant {
            lines.push("COMPLIANT".to_string());
        } else {
            lines.push("NON-COMPLIANT".to_string());
            lines.push(format!("{} violation(s) found:", self.violations.len()));
            lines.extend(self.violations.iter().map(|v| format!("  {v}")));
        }
        if !self.warnings.is_empty() {
            lines.push(format!("{} warning(s):", self.warnings.len()));
            lines.extend(self.warnings.iter().map(|w| format!("  [WARN] {w}")));
        }
        lines.join("\n")
    }

    /// Machine-readable report (pretty JSON).
    pub fn to_json(&self) -> icspec_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Accumulates violations and warnings while the checks run.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    violations: Vec<Violation>,
    warnings: Vec<String>,
}

impl Findings {
    pub(crate) fn violation(&mut self, step: u8, rule: RuleId, message: impl Into<String>) {
        self.violations.push(Violation {
            step,
            rule,
            message: message.into(),
        });
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub(crate) fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub(crate) fn into_verdict(self) -> Verdict {
        Verdict::new(self.violations, self.warnings)
    }
}
