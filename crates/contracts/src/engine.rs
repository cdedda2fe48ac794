//! Validation rule engine.
//!
//! The engine turns a parsed document into a [`Verdict`]. Parse errors
//! short-circuit everything: a document whose boundaries cannot be trusted
//! is never partially validated. Otherwise the steps in [`STEPS`] run in
//! order. Step 1 (completeness) is a gate; steps 2 to 6 always all run.

use crate::model::{Findings, RuleId, Verdict};
use crate::parser::{ParsedDocument, parse_layers};
use crate::syntax::{CLEAR_SENTINEL, OUTPUT_CONTRACT_FIELDS, field_key, is_comment, is_directive};
use icspec_core::{Layer, LayerName, LayerSchema};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Uniform signature of a validation step.
type Check = fn(&RuleContext<'_>, &mut Findings);

/// One entry in the ordered step table.
struct Step {
    number: u8,
    name: &'static str,
    /// Stop the run if this step reports anything.
    gate: bool,
    check: Check,
}

const STEPS: &[Step] = &[
    Step {
        number: 1,
        name: "completeness",
        gate: true,
        check: check_completeness,
    },
    Step {
        number: 2,
        name: "canonical order",
        gate: false,
        check: check_canonical_order,
    },
    Step {
        number: 3,
        name: "session clear exclusivity",
        gate: false,
        check: check_session_clear,
    },
    Step {
        number: 4,
        name: "no cross-layer redefinition",
        gate: false,
        check: check_no_redefinition,
    },
    Step {
        number: 5,
        name: "capability syntax",
        gate: false,
        check: check_capability_syntax,
    },
    Step {
        number: 6,
        name: "output contract fields",
        gate: false,
        check: check_output_contract,
    },
];

/// Read-only view handed to each check.
struct RuleContext<'a> {
    schema: &'a LayerSchema,
    layers: &'a [Layer],
}

impl RuleContext<'_> {
    /// Every layer named `name`, in document order.
    fn named<'s>(&'s self, name: &'s LayerName) -> impl Iterator<Item = &'s Layer> + 's {
        self.layers.iter().filter(move |l| &l.name == name)
    }

    /// The last layer named `name`.
    fn last_named(&self, name: &LayerName) -> Option<&Layer> {
        icspec_core::last_named(self.layers, name)
    }
}

/// The ICS document validator.
///
/// Stateless apart from the schema it was built with, so one instance can
/// be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    schema: LayerSchema,
}

impl Validator {
    /// Create a validator for the given schema.
    pub fn new(schema: LayerSchema) -> Self {
        Self { schema }
    }

    /// Parse and validate raw document text.
    pub fn validate(&self, text: &str) -> Verdict {
        self.validate_parsed(&parse_layers(text))
    }

    /// Validate an already-parsed document.
    pub fn validate_parsed(&self, doc: &ParsedDocument) -> Verdict {
        let mut findings = Findings::default();

        if !doc.is_well_formed() {
            for err in &doc.errors {
                findings.violation(1, RuleId::ParseError, err.to_string());
            }
            info!(errors = doc.errors.len(), "Document is structurally malformed");
            return findings.into_verdict();
        }

        self.warn_duplicates(&doc.layers, &mut findings);

        let ctx = RuleContext {
            schema: &self.schema,
            layers: &doc.layers,
        };
        for step in STEPS {
            let before = findings.violation_count();
            (step.check)(&ctx, &mut findings);
            let found = findings.violation_count() - before;
            debug!(step = step.number, check = step.name, violations = found, "Step complete");
            if step.gate && found > 0 {
                debug!(step = step.number, "Gate step failed, skipping remaining steps");
                break;
            }
        }

        let verdict = findings.into_verdict();
        info!(
            compliant = verdict.compliant,
            violations = verdict.violations.len(),
            warnings = verdict.warnings.len(),
            "Validation complete"
        );
        verdict
    }

    /// Duplicated canonical layers are legal; flag them without failing.
    fn warn_duplicates(&self, layers: &[Layer], findings: &mut Findings) {
        for name in self.schema.order() {
            let count = layers.iter().filter(|l| &l.name == name).count();
            if count > 1 {
                findings.warning(format!(
                    "Layer {name} appears {count} times; the last occurrence is used for redefinition and cost checks"
                ));
            }
        }
    }
}

/// Validate `text` against the canonical schema.
pub fn validate(text: &str) -> Verdict {
    Validator::default().validate(text)
}

// ── Steps ──────────────────────────────────────────────────────────────

/// Step 1: every canonical layer present, no unknown layers.
fn check_completeness(ctx: &RuleContext<'_>, findings: &mut Findings) {
    let found: HashSet<&LayerName> = ctx.layers.iter().map(|l| &l.name).collect();
    for name in ctx.schema.order() {
        if !found.contains(name) {
            findings.violation(
                1,
                RuleId::MissingLayer,
                format!("Required layer {name} is missing"),
            );
        }
    }

    let mut reported = HashSet::new();
    for layer in ctx.layers {
        if !ctx.schema.contains(&layer.name) && reported.insert(&layer.name) {
            findings.violation(
                1,
                RuleId::UnknownLayer,
                format!(
                    "Unknown layer name: {}. Valid names are: {}",
                    layer.name,
                    ctx.schema.describe()
                ),
            );
        }
    }
}

/// Step 2: first occurrences of canonical layers follow canonical order.
fn check_canonical_order(ctx: &RuleContext<'_>, findings: &mut Findings) {
    let mut seen: Vec<&LayerName> = Vec::new();
    for layer in ctx.layers {
        if ctx.schema.contains(&layer.name) && !seen.contains(&&layer.name) {
            seen.push(&layer.name);
        }
    }
    let expected: Vec<&LayerName> = ctx
        .schema
        .order()
        .filter(|name| seen.contains(name))
        .collect();

    if seen != expected {
        findings.violation(
            2,
            RuleId::CanonicalOrder,
            format!(
                "Layers are out of order. Found: {}. Expected: {}",
                join_names(&seen),
                join_names(&expected)
            ),
        );
    }
}

/// Step 3: a session layer holding `CLEAR` holds nothing else.
fn check_session_clear(ctx: &RuleContext<'_>, findings: &mut Findings) {
    for layer in ctx.named(&LayerName::SessionState) {
        let lines: Vec<&str> = layer.non_blank_lines().collect();
        let has_clear = lines.iter().any(|l| *l == CLEAR_SENTINEL);
        if has_clear && lines.len() > 1 {
            findings.violation(
                3,
                RuleId::SessionClear,
                format!(
                    "SESSION_STATE (line {}) contains CLEAR alongside other content. \
                     A SESSION_STATE layer containing CLEAR must contain only CLEAR.",
                    layer.start_line
                ),
            );
        }
    }
}

/// Step 4: later layers must not redefine earlier ones.
///
/// Heuristic only: directives smuggled into the task payload, and session
/// lines that echo an immutable-context line verbatim. Both sides use the
/// last occurrence of each layer.
fn check_no_redefinition(ctx: &RuleContext<'_>, findings: &mut Findings) {
    if let Some(payload) = ctx.last_named(&LayerName::TaskPayload) {
        for line in payload.lines().filter(|l| is_directive(l)) {
            findings.violation(
                4,
                RuleId::PayloadDirective,
                format!(
                    "TASK_PAYLOAD contains a capability directive: '{}'. \
                     Directives belong in CAPABILITY_DECLARATION.",
                    line.trim()
                ),
            );
        }
    }

    let (Some(context), Some(session)) = (
        ctx.last_named(&LayerName::ImmutableContext),
        ctx.last_named(&LayerName::SessionState),
    ) else {
        return;
    };

    let context_lines: HashSet<String> = context
        .non_blank_lines()
        .filter(|l| l.contains(':'))
        .map(str::to_lowercase)
        .collect();

    for line in session
        .non_blank_lines()
        .filter(|l| l.contains(':') && *l != CLEAR_SENTINEL)
    {
        if context_lines.contains(&line.to_lowercase()) {
            findings.violation(
                4,
                RuleId::SessionRestatement,
                format!("SESSION_STATE appears to restate a line from IMMUTABLE_CONTEXT: '{line}'"),
            );
        }
    }
}

/// Step 5: capability lines are directives, comments, or blank.
fn check_capability_syntax(ctx: &RuleContext<'_>, findings: &mut Findings) {
    for layer in ctx.named(&LayerName::CapabilityDeclaration) {
        for line in layer.non_blank_lines() {
            if is_comment(line) || is_directive(line) {
                continue;
            }
            findings.violation(
                5,
                RuleId::CapabilitySyntax,
                format!(
                    "CAPABILITY_DECLARATION contains a line that is not a valid \
                     ALLOW, DENY, or REQUIRE directive: '{line}'"
                ),
            );
        }
    }
}

/// Step 6: the output contract declares every required field.
fn check_output_contract(ctx: &RuleContext<'_>, findings: &mut Findings) {
    for layer in ctx.named(&LayerName::OutputContract) {
        let declared: BTreeSet<String> = layer.lines().filter_map(field_key).collect();
        for field in OUTPUT_CONTRACT_FIELDS {
            if !declared.contains(field) {
                findings.violation(
                    6,
                    RuleId::OutputContractField,
                    format!("OUTPUT_CONTRACT is missing required field: '{field}'"),
                );
            }
        }
    }
}

fn join_names(names: &[&LayerName]) -> String {
    names
        .iter()
        .map(|n| n.as_tag())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLIANT: &str = r#"###ICS:IMMUTABLE_CONTEXT###
System: order management service
Language: Python 3.11
Repo structure:
  src/orders/       (business logic)
  src/orders/api/   (HTTP handlers)
  tests/            (pytest test suite)
Invariant: all monetary values stored as integer cents
###END:IMMUTABLE_CONTEXT###

###ICS:CAPABILITY_DECLARATION###
ALLOW   file modification WITHIN src/orders/
ALLOW   file creation WITHIN src/orders/ IF new file has corresponding test
DENY    modification of src/orders/api/
DENY    modification of any file WITHIN tests/
DENY    introduction of new external dependencies
REQUIRE type annotations ON all new functions
REQUIRE docstring ON all new public functions
###END:CAPABILITY_DECLARATION###

###ICS:SESSION_STATE###
[2024-01-15T09:30Z] Confirmed: discount logic lives in apply_discount() in src/orders/pricing.py
[2024-01-15T09:45Z] Decision: percentage and flat discounts to be handled by separate functions
###END:SESSION_STATE###

###ICS:TASK_PAYLOAD###
Split apply_discount() into two functions: apply_percentage_discount() and apply_flat_discount().
Preserve existing call sites by having apply_discount() delegate to the appropriate function
based on the discount type field.
###END:TASK_PAYLOAD###

###ICS:OUTPUT_CONTRACT###
format:     unified diff
schema:     standard unified diff against current HEAD; one diff block per modified file
variance:   diff header comments are permitted; no other variance allowed
on_failure: return plain text block with prefix "BLOCKED:" followed by a single-sentence description
###END:OUTPUT_CONTRACT###"#;

    const CLEARED: &str = r#"###ICS:IMMUTABLE_CONTEXT###
System: test system
###END:IMMUTABLE_CONTEXT###

###ICS:CAPABILITY_DECLARATION###
ALLOW read access
###END:CAPABILITY_DECLARATION###

###ICS:SESSION_STATE###
CLEAR
###END:SESSION_STATE###

###ICS:TASK_PAYLOAD###
Run the analysis.
###END:TASK_PAYLOAD###

###ICS:OUTPUT_CONTRACT###
format:     JSON
schema:     { "result": "string" }
variance:   none
on_failure: return error string
###END:OUTPUT_CONTRACT###"#;

    fn rules(verdict: &Verdict) -> Vec<RuleId> {
        verdict.violations.iter().map(|v| v.rule).collect()
    }

    fn block(tag: &str, body: &str) -> String {
        format!("###ICS:{tag}###\n{body}\n###END:{tag}###\n")
    }

    fn minimal(cap: &str, session: &str, payload: &str, contract: &str) -> String {
        [
            block("IMMUTABLE_CONTEXT", "System: test"),
            block("CAPABILITY_DECLARATION", cap),
            block("SESSION_STATE", session),
            block("TASK_PAYLOAD", payload),
            block("OUTPUT_CONTRACT", contract),
        ]
        .concat()
    }

    const FIELDS: &str = "format: JSON\nschema: {}\nvariance: none\non_failure: error";

    #[test]
    fn compliant_example_passes() {
        let verdict = validate(COMPLIANT);
        assert!(verdict.compliant, "{}", verdict.report());
        assert!(verdict.violations.is_empty());
        assert!(verdict.warnings.is_empty());
    }

    #[test]
    fn clear_alone_passes() {
        let verdict = validate(CLEARED);
        assert!(verdict.compliant, "{}", verdict.report());
    }

    #[test]
    fn missing_layer_short_circuits() {
        let text = COMPLIANT.replace(
            "###ICS:SESSION_STATE###\n\
             [2024-01-15T09:30Z] Confirmed: discount logic lives in apply_discount() in src/orders/pricing.py\n\
             [2024-01-15T09:45Z] Decision: percentage and flat discounts to be handled by separate functions\n\
             ###END:SESSION_STATE###",
            "",
        );
        // Also break capability syntax: must not be reported after the gate.
        let text = text.replace("ALLOW   file modification", "maybe file modification");
        let verdict = validate(&text);
        assert!(!verdict.compliant);
        assert_eq!(rules(&verdict), vec![RuleId::MissingLayer]);
        assert!(verdict.violations[0].message.contains("SESSION_STATE"));
    }

    #[test]
    fn lone_payload_reports_four_missing_layers() {
        let verdict = validate("###ICS:TASK_PAYLOAD###\nx\n###END:TASK_PAYLOAD###");
        assert!(!verdict.compliant);
        assert_eq!(rules(&verdict), vec![RuleId::MissingLayer; 4]);
        let missing: Vec<&str> = verdict
            .violations
            .iter()
            .map(|v| v.message.as_str())
            .collect();
        assert_eq!(
            missing,
            vec![
                "Required layer IMMUTABLE_CONTEXT is missing",
                "Required layer CAPABILITY_DECLARATION is missing",
                "Required layer SESSION_STATE is missing",
                "Required layer OUTPUT_CONTRACT is missing",
            ]
        );
    }

    #[test]
    fn out_of_order_is_rejected() {
        let text = [
            block("IMMUTABLE_CONTEXT", "System: test"),
            block("TASK_PAYLOAD", "Do something."),
            block("CAPABILITY_DECLARATION", "ALLOW read"),
            block("SESSION_STATE", "Some state."),
            block("OUTPUT_CONTRACT", FIELDS),
        ]
        .concat();
        let verdict = validate(&text);
        assert!(!verdict.compliant);
        assert_eq!(rules(&verdict), vec![RuleId::CanonicalOrder]);
        assert!(verdict.violations[0].message.contains(
            "Found: IMMUTABLE_CONTEXT, TASK_PAYLOAD, CAPABILITY_DECLARATION, SESSION_STATE, OUTPUT_CONTRACT"
        ));
    }

    #[test]
    fn order_uses_first_occurrence_only() {
        let text = [
            block("IMMUTABLE_CONTEXT", "System: test"),
            block("CAPABILITY_DECLARATION", "ALLOW read"),
            block("SESSION_STATE", "Some state."),
            block("TASK_PAYLOAD", "Do something."),
            block("OUTPUT_CONTRACT", FIELDS),
            block("IMMUTABLE_CONTEXT", "System: again"),
        ]
        .concat();
        let verdict = validate(&text);
        assert!(verdict.compliant, "{}", verdict.report());
        assert_eq!(verdict.warnings.len(), 1);
        assert!(verdict.warnings[0].contains("IMMUTABLE_CONTEXT appears 2 times"));
    }

    #[test]
    fn clear_with_other_content_is_rejected() {
        let text = CLEARED.replace("CLEAR", "CLEAR\n[2024-01-20T15:00Z] New window: past 30 days");
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::SessionClear]);
        assert_eq!(verdict.violations[0].step, 3);
    }

    #[test]
    fn clear_with_blank_lines_is_fine() {
        let text = minimal("ALLOW read", "\n  CLEAR  \n\n", "Go.", FIELDS);
        assert!(validate(&text).compliant);
    }

    #[test]
    fn every_session_layer_checked() {
        let text = [
            block("IMMUTABLE_CONTEXT", "System: test"),
            block("CAPABILITY_DECLARATION", "ALLOW read"),
            block("SESSION_STATE", "CLEAR\nextra"),
            block("SESSION_STATE", "CLEAR\nmore"),
            block("TASK_PAYLOAD", "Go."),
            block("OUTPUT_CONTRACT", FIELDS),
        ]
        .concat();
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::SessionClear, RuleId::SessionClear]);
    }

    #[test]
    fn invalid_capability_line_is_rejected() {
        let text = COMPLIANT.replace(
            "REQUIRE docstring ON all new public functions",
            "REQUIRE docstring ON all new public functions\nDon't touch the database.",
        );
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::CapabilitySyntax]);
        assert!(verdict.violations[0].message.contains("'Don't touch the database.'"));
    }

    #[test]
    fn single_non_directive_capability_line() {
        let text = minimal("NOT A DIRECTIVE", "Some state.", "Go.", FIELDS);
        let verdict = validate(&text);
        assert!(!verdict.compliant);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].rule, RuleId::CapabilitySyntax);
        assert_eq!(verdict.violations[0].step, 5);
    }

    #[test]
    fn capability_comments_and_blanks_allowed() {
        let text = minimal("# read-only\n\nALLOW read\n  # nested note", "s", "Go.", FIELDS);
        assert!(validate(&text).compliant);
    }

    #[test]
    fn missing_output_fields_each_reported() {
        let text = minimal("ALLOW read", "s", "Go.", "format: diff\nschema: unified");
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::OutputContractField; 2]);
        assert!(verdict.violations[0].message.contains("'on_failure'"));
        assert!(verdict.violations[1].message.contains("'variance'"));
    }

    #[test]
    fn output_field_keys_are_case_insensitive() {
        let text = minimal(
            "ALLOW read",
            "s",
            "Go.",
            "FORMAT: JSON\nSchema : {}\nVariance: none\nOn_Failure: error",
        );
        assert!(validate(&text).compliant);
    }

    #[test]
    fn directive_in_payload_is_rejected() {
        let text = COMPLIANT.replace(
            "Split apply_discount() into two functions",
            "DENY modification of tests/\nSplit apply_discount() into two functions",
        );
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::PayloadDirective]);
        assert!(verdict.violations[0].message.contains("'DENY modification of tests/'"));
    }

    #[test]
    fn session_restating_context_is_rejected() {
        let text = minimal("ALLOW read", "  SYSTEM: TEST  \nnote: fresh", "Go.", FIELDS);
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::SessionRestatement]);
        assert!(verdict.violations[0].message.contains("'SYSTEM: TEST'"));
    }

    #[test]
    fn unknown_layer_is_rejected() {
        let text = format!("{COMPLIANT}\n###ICS:CUSTOM_LAYER###\nsome content\n###END:CUSTOM_LAYER###");
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::UnknownLayer]);
        assert!(verdict.violations[0].message.starts_with("Unknown layer name: CUSTOM_LAYER."));
    }

    #[test]
    fn unknown_layer_reported_once() {
        let text = format!(
            "{COMPLIANT}\n{}{}",
            block("CUSTOM_LAYER", "a"),
            block("CUSTOM_LAYER", "b")
        );
        let verdict = validate(&text);
        assert_eq!(rules(&verdict), vec![RuleId::UnknownLayer]);
    }

    #[test]
    fn unclosed_layer_is_parse_error() {
        let text = COMPLIANT.replace("###END:TASK_PAYLOAD###", "");
        let verdict = validate(&text);
        assert!(!verdict.compliant);
        assert!(verdict.has_rule(RuleId::ParseError));
        assert!(verdict.violations.iter().all(|v| v.rule == RuleId::ParseError && v.step == 1));
    }

    #[test]
    fn nested_open_stops_validation() {
        let text = "###ICS:IMMUTABLE_CONTEXT###\na\n###ICS:SESSION_STATE###\n###END:IMMUTABLE_CONTEXT###";
        let verdict = validate(text);
        assert_eq!(rules(&verdict), vec![RuleId::ParseError]);
        assert!(verdict.violations[0].message.starts_with("Line 3: opened ###ICS:SESSION_STATE###"));
    }

    #[test]
    fn later_steps_all_run() {
        let text = [
            block("IMMUTABLE_CONTEXT", "System: test"),
            block("SESSION_STATE", "CLEAR\nstale"),
            block("CAPABILITY_DECLARATION", "whatever"),
            block("TASK_PAYLOAD", "ALLOW everything"),
            block("OUTPUT_CONTRACT", "format: JSON"),
        ]
        .concat();
        let verdict = validate(&text);
        let steps: Vec<u8> = verdict.violations.iter().map(|v| v.step).collect();
        assert_eq!(steps, vec![2, 3, 4, 5, 6, 6, 6]);
    }

    #[test]
    fn validator_is_reusable() {
        let validator = Validator::new(LayerSchema::canonical());
        assert!(validator.validate(COMPLIANT).compliant);
        assert!(!validator.validate("").compliant);
        assert!(validator.validate(CLEARED).compliant);
    }

    #[test]
    fn empty_document_reports_all_missing() {
        let verdict = validate("");
        assert_eq!(rules(&verdict), vec![RuleId::MissingLayer; 5]);
    }
}
