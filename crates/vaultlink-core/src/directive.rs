//! Directive extraction from front matter.
//!
//! A handful of front-matter keys tell an assistant how to behave while it
//! works on a note. They are looked up case-insensitively through a fixed
//! table; all other keys are left alone.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::frontmatter::Document;

/// A recognized directive key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Mode,
    Instructions,
    /// `ai_instructions`, folded into instructions.
    AiInstructions,
    /// `behavior`, folded into instructions.
    Behavior,
    Stage,
    Status,
}

/// Front-matter key to directive kind.
pub const DIRECTIVE_KEYS: [(&str, DirectiveKind); 6] = [
    ("mode", DirectiveKind::Mode),
    ("instructions", DirectiveKind::Instructions),
    ("ai_instructions", DirectiveKind::AiInstructions),
    ("behavior", DirectiveKind::Behavior),
    ("stage", DirectiveKind::Stage),
    ("status", DirectiveKind::Status),
];

impl DirectiveKind {
    /// Look a front-matter key up in [`DIRECTIVE_KEYS`], ignoring case.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        DIRECTIVE_KEYS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, kind)| *kind)
    }

    /// Separator used when a sequence value is flattened.
    fn list_separator(self) -> &'static str {
        match self {
            Self::Instructions | Self::AiInstructions | Self::Behavior => "\n",
            Self::Mode | Self::Stage | Self::Status => ", ",
        }
    }
}

/// The behavioral directives carried by one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectiveRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DirectiveRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.instructions.is_none()
            && self.stage.is_none()
            && self.status.is_none()
    }

    /// Returns `true` if the record says how to behave, not just where the
    /// work stands.
    #[must_use]
    pub fn has_behavior(&self) -> bool {
        self.mode.is_some() || self.instructions.is_some()
    }
}

/// Extract directives from a front-matter mapping.
#[must_use]
pub fn extract(fields: &Mapping) -> DirectiveRecord {
    let mut record = DirectiveRecord::default();
    let mut ai_instructions = None;
    let mut behavior = None;

    for (key, value) in fields {
        let Some(kind) = key.as_str().and_then(DirectiveKind::from_key) else {
            continue;
        };
        let slot = match kind {
            DirectiveKind::Mode => &mut record.mode,
            DirectiveKind::Instructions => &mut record.instructions,
            DirectiveKind::AiInstructions => &mut ai_instructions,
            DirectiveKind::Behavior => &mut behavior,
            DirectiveKind::Stage => &mut record.stage,
            DirectiveKind::Status => &mut record.status,
        };
        if slot.is_none() {
            *slot = render_value(value, kind.list_separator());
        }
    }

    if record.instructions.is_none() {
        record.instructions = ai_instructions.or(behavior);
    }
    record
}

/// Extract directives from a parsed document; empty without front matter.
#[must_use]
pub fn extract_document(doc: &Document) -> DirectiveRecord {
    doc.fields().map(extract).unwrap_or_default()
}

fn render_value(value: &Value, separator: &str) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => items
            .iter()
            .filter_map(|item| render_value(item, separator))
            .collect::<Vec<_>>()
            .join(separator),
        Value::Tagged(tagged) => return render_value(&tagged.value, separator),
        Value::Mapping(_) => serde_yaml::to_string(value).ok()?.trim_end().to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn extracts_all_directives() {
        let record = extract(&fields(
            "mode: thinking\ninstructions: |\n  Ask questions only.\n  Never draft.\nstage: exploration\nstatus: active\ntitle: ignored\n",
        ));
        assert_eq!(record.mode.as_deref(), Some("thinking"));
        assert_eq!(
            record.instructions.as_deref(),
            Some("Ask questions only.\nNever draft.\n")
        );
        assert_eq!(record.stage.as_deref(), Some("exploration"));
        assert_eq!(record.status.as_deref(), Some("active"));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let record = extract(&fields("Mode: writing\nSTATUS: draft\n"));
        assert_eq!(record.mode.as_deref(), Some("writing"));
        assert_eq!(record.status.as_deref(), Some("draft"));
    }

    #[test]
    fn first_occurrence_wins() {
        let record = extract(&fields("mode: thinking\nMODE: writing\n"));
        assert_eq!(record.mode.as_deref(), Some("thinking"));
    }

    #[test]
    fn aliases_fold_only_when_instructions_absent() {
        let record = extract(&fields("behavior: be brief\nai_instructions: cite sources\n"));
        assert_eq!(record.instructions.as_deref(), Some("cite sources"));

        let record = extract(&fields("behavior: be brief\n"));
        assert_eq!(record.instructions.as_deref(), Some("be brief"));

        let record = extract(&fields("ai_instructions: x\ninstructions: y\n"));
        assert_eq!(record.instructions.as_deref(), Some("y"));
    }

    #[test]
    fn scalars_and_sequences_are_rendered() {
        let record = extract(&fields(
            "stage: 3\nstatus: true\ninstructions:\n  - Ask\n  - Listen\nmode: [a, b]\n",
        ));
        assert_eq!(record.stage.as_deref(), Some("3"));
        assert_eq!(record.status.as_deref(), Some("true"));
        assert_eq!(record.instructions.as_deref(), Some("Ask\nListen"));
        assert_eq!(record.mode.as_deref(), Some("a, b"));
    }

    #[test]
    fn null_and_blank_values_are_absent() {
        let record = extract(&fields("mode: ~\ninstructions: \"  \"\nstage:\n"));
        assert!(record.is_empty());
    }

    #[test]
    fn document_without_front_matter_has_no_directives() {
        let doc = Document::parse("# Just a body\n");
        assert!(extract_document(&doc).is_empty());
    }

    #[test]
    fn behavior_distinguishes_status_only_records() {
        let record = extract(&fields("stage: planning\n"));
        assert!(!record.is_empty());
        assert!(!record.has_behavior());
    }
}
