//! Instruction banner rendering.
//!
//! The banner is a fixed-layout block placed in front of a note's content
//! when its front matter carries directives. Rendering is pure: the same
//! record always produces the same bytes.

use crate::directive::DirectiveRecord;

const RULE_WIDTH: usize = 80;
const HEADER: &str = "⚠️  CRITICAL: FRONTMATTER INSTRUCTIONS DETECTED";
const FOOTER: &str = "END OF INSTRUCTIONS - FOLLOW THEM STRICTLY";

/// Canned warnings keyed by lowercase mode name.
const MODE_WARNINGS: [(&str, &str); 1] = [(
    "thinking",
    "⚠️  YOU ARE IN THINKING MODE - DO NOT CREATE CONTENT!\n\
     Your role: Ask questions, explore ideas, organize research.\n\
     NOT your role: Write drafts, create outlines, generate artifacts.",
)];

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BannerOptions {
    /// Render nothing unless the record carries a mode or instructions.
    pub require_behavior: bool,
}

/// The warning shown under a recognized mode. Lookup ignores case.
#[must_use]
pub fn mode_warning(mode: &str) -> Option<&'static str> {
    let mode = mode.trim();
    MODE_WARNINGS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(mode))
        .map(|(_, warning)| *warning)
}

/// Render the banner for `record` with default options.
#[must_use]
pub fn render(record: &DirectiveRecord) -> Option<String> {
    render_with(record, BannerOptions::default())
}

/// Render the banner for `record`; `None` when there is nothing to show.
#[must_use]
pub fn render_with(record: &DirectiveRecord, options: BannerOptions) -> Option<String> {
    if record.is_empty() || (options.require_behavior && !record.has_behavior()) {
        return None;
    }

    let rule = "=".repeat(RULE_WIDTH);
    let mut parts = vec![rule.clone(), HEADER.to_string(), rule.clone()];

    if let Some(mode) = &record.mode {
        parts.push(format!("\n🎯 MODE: {}", mode.to_uppercase()));
        if let Some(warning) = mode_warning(mode) {
            parts.push(format!("\n{warning}"));
        }
    }
    if let Some(instructions) = &record.instructions {
        parts.push(format!(
            "\n📋 INSTRUCTIONS:\n{}",
            instructions.trim_end_matches(['\n', '\r'])
        ));
    }
    if let Some(stage) = &record.stage {
        parts.push(format!("\n📊 STAGE: {stage}"));
    }
    if let Some(status) = &record.status {
        parts.push(format!("\n📌 STATUS: {status}"));
    }

    parts.push(format!("\n{rule}"));
    parts.push(FOOTER.to_string());
    parts.push(rule);
    Some(parts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thinking() -> DirectiveRecord {
        DirectiveRecord {
            mode: Some("thinking".to_string()),
            instructions: Some("Ask questions only.".to_string()),
            ..DirectiveRecord::default()
        }
    }

    #[test]
    fn empty_record_renders_nothing() {
        assert_eq!(render(&DirectiveRecord::default()), None);
    }

    #[test]
    fn thinking_banner_layout() {
        let banner = render(&thinking()).unwrap();
        let rule = "=".repeat(80);
        let expected = format!(
            "{rule}\n⚠️  CRITICAL: FRONTMATTER INSTRUCTIONS DETECTED\n{rule}\n\n\
             🎯 MODE: THINKING\n\n\
             ⚠️  YOU ARE IN THINKING MODE - DO NOT CREATE CONTENT!\n\
             Your role: Ask questions, explore ideas, organize research.\n\
             NOT your role: Write drafts, create outlines, generate artifacts.\n\n\
             📋 INSTRUCTIONS:\nAsk questions only.\n\n\
             {rule}\nEND OF INSTRUCTIONS - FOLLOW THEM STRICTLY\n{rule}"
        );
        assert_eq!(banner, expected);
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render(&thinking()), render(&thinking()));
    }

    #[test]
    fn unknown_mode_renders_label_only() {
        let record = DirectiveRecord {
            mode: Some("Drafting".to_string()),
            ..DirectiveRecord::default()
        };
        let banner = render(&record).unwrap();
        assert!(banner.contains("🎯 MODE: DRAFTING"));
        assert!(!banner.contains("DO NOT CREATE CONTENT"));
    }

    #[test]
    fn mode_lookup_ignores_case() {
        assert!(mode_warning("Thinking").is_some());
        assert!(mode_warning("writing").is_none());
    }

    #[test]
    fn stage_and_status_lines() {
        let record = DirectiveRecord {
            stage: Some("exploration".to_string()),
            status: Some("active".to_string()),
            ..DirectiveRecord::default()
        };
        let banner = render(&record).unwrap();
        assert!(banner.contains("\n\n📊 STAGE: exploration\n\n📌 STATUS: active\n\n"));
        assert!(!banner.contains("MODE"));
    }

    #[test]
    fn require_behavior_suppresses_status_only_banners() {
        let record = DirectiveRecord {
            status: Some("active".to_string()),
            ..DirectiveRecord::default()
        };
        let strict = BannerOptions {
            require_behavior: true,
        };
        assert_eq!(render_with(&record, strict), None);
        assert!(render_with(&thinking(), strict).is_some());
    }

    #[test]
    fn block_scalar_instructions_lose_trailing_newline_only() {
        let record = DirectiveRecord {
            instructions: Some("  Line one\nLine two\n".to_string()),
            ..DirectiveRecord::default()
        };
        let banner = render(&record).unwrap();
        assert!(banner.contains("📋 INSTRUCTIONS:\n  Line one\nLine two\n\n===="));
    }
}
