//! Layer names and parsed layer records.

use serde::{Deserialize, Serialize};

/// The name carried by a layer boundary tag.
///
/// The five canonical names are distinct variants; any other tag that is
/// syntactically valid (`[A-Z_]+`) is kept verbatim as [`LayerName::Unknown`]
/// so the rule engine can report it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayerName {
    ImmutableContext,
    CapabilityDeclaration,
    SessionState,
    TaskPayload,
    OutputContract,
    Unknown(String),
}

impl LayerName {
    /// The boundary tag for this name (e.g. `SESSION_STATE`).
    pub fn as_tag(&self) -> &str {
        match self {
            Self::ImmutableContext => "IMMUTABLE_CONTEXT",
            Self::CapabilityDeclaration => "CAPABILITY_DECLARATION",
            Self::SessionState => "SESSION_STATE",
            Self::TaskPayload => "TASK_PAYLOAD",
            Self::OutputContract => "OUTPUT_CONTRACT",
            Self::Unknown(tag) => tag,
        }
    }

    /// Resolve a boundary tag to a name. Never fails.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "IMMUTABLE_CONTEXT" => Self::ImmutableContext,
            "CAPABILITY_DECLARATION" => Self::CapabilityDeclaration,
            "SESSION_STATE" => Self::SessionState,
            "TASK_PAYLOAD" => Self::TaskPayload,
            "OUTPUT_CONTRACT" => Self::OutputContract,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for LayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl From<String> for LayerName {
    fn from(s: String) -> Self {
        Self::from_tag(&s)
    }
}

impl From<LayerName> for String {
    fn from(name: LayerName) -> Self {
        name.as_tag().to_string()
    }
}

/// One boundary-delimited block of an ICS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Tag name from the boundary lines.
    pub name: LayerName,
    /// Lines between the boundaries, joined by `\n` and trimmed.
    pub content: String,
    /// 1-based line of the opening boundary.
    pub start_line: usize,
    /// 1-based line of the closing boundary.
    pub end_line: usize,
}

impl Layer {
    /// The opening boundary line for `name`.
    pub fn open_tag(name: &LayerName) -> String {
        format!("###ICS:{}###", name.as_tag())
    }

    /// The closing boundary line for `name`.
    pub fn close_tag(name: &LayerName) -> String {
        format!("###END:{}###", name.as_tag())
    }

    /// Serialize this layer back into its boundary-wrapped form.
    ///
    /// This is also the text that token counters measure.
    pub fn to_block(&self) -> String {
        wrap_block(&self.name, &self.content)
    }

    /// Content lines, untrimmed, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines()
    }

    /// Trimmed content lines with blank lines removed.
    pub fn non_blank_lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// The last layer named `name`. Later occurrences redefine earlier ones.
pub fn last_named<'a>(layers: &'a [Layer], name: &LayerName) -> Option<&'a Layer> {
    layers.iter().rev().find(|l| &l.name == name)
}

/// Wrap `content` between the boundary lines of `name`.
pub fn wrap_block(name: &LayerName, content: &str) -> String {
    format!(
        "{}\n{}\n{}",
        Layer::open_tag(name),
        content,
        Layer::close_tag(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip_for_canonical_names() {
        for tag in [
            "IMMUTABLE_CONTEXT",
            "CAPABILITY_DECLARATION",
            "SESSION_STATE",
            "TASK_PAYLOAD",
            "OUTPUT_CONTRACT",
        ] {
            let name = LayerName::from_tag(tag);
            assert!(!matches!(name, LayerName::Unknown(_)), "{tag} should be canonical");
            assert_eq!(name.as_tag(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let name = LayerName::from_tag("CUSTOM_LAYER");
        assert_eq!(name, LayerName::Unknown("CUSTOM_LAYER".into()));
        assert_eq!(name.to_string(), "CUSTOM_LAYER");
    }

    #[test]
    fn to_block_wraps_content() {
        let layer = Layer {
            name: LayerName::TaskPayload,
            content: "x".into(),
            start_line: 1,
            end_line: 3,
        };
        assert_eq!(
            layer.to_block(),
            "###ICS:TASK_PAYLOAD###\nx\n###END:TASK_PAYLOAD###"
        );
    }

    #[test]
    fn last_named_picks_latest_occurrence() {
        let layer = |content: &str, start_line| Layer {
            name: LayerName::TaskPayload,
            content: content.into(),
            start_line,
            end_line: start_line + 2,
        };
        let layers = vec![layer("one", 1), layer("two", 4)];
        assert_eq!(last_named(&layers, &LayerName::TaskPayload).unwrap().content, "two");
        assert!(last_named(&layers, &LayerName::SessionState).is_none());
    }

    #[test]
    fn non_blank_lines_are_trimmed() {
        let layer = Layer {
            name: LayerName::SessionState,
            content: "CLEAR\n\n   \n  note: one  ".into(),
            start_line: 1,
            end_line: 6,
        };
        let lines: Vec<&str> = layer.non_blank_lines().collect();
        assert_eq!(lines, vec!["CLEAR", "note: one"]);
    }

    #[test]
    fn layer_name_serializes_as_tag() {
        let json = serde_json::to_string(&LayerName::OutputContract).unwrap();
        assert_eq!(json, "\"OUTPUT_CONTRACT\"");
        let back: LayerName = serde_json::from_str("\"CUSTOM\"").unwrap();
        assert_eq!(back, LayerName::Unknown("CUSTOM".into()));
    }
}
