//! Pure read- and write-path transformations.
//!
//! These functions never touch storage. The storage-bound orchestrator in
//! `vaultlink-vault` feeds them raw text and an index snapshot.

use serde::Serialize;
use tracing::warn;

use crate::banner::{self, BannerOptions};
use crate::directive::{self, DirectiveRecord};
use crate::frontmatter::Document;
use crate::index::VaultIndex;
use crate::normalize::{self, LinkNormalizer, LinkRetargeter, LinkStatus, NormalizeReport};
use crate::scan::{self, LinkKind, ScanOptions};

/// Switches for the read and write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Rewrite backticked and quoted `*.md` path mentions in bodies.
    pub mentions: bool,
    /// Normalize the text shown on read. Stored bytes are never changed.
    pub normalize_on_read: bool,
    pub banner: BannerOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mentions: true,
            normalize_on_read: false,
            banner: BannerOptions::default(),
        }
    }
}

/// A document as handed to the directive consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presented {
    /// The document text, normalized if reads normalize.
    pub content: String,
    pub directives: DirectiveRecord,
    pub banner: Option<String>,
}

impl Presented {
    /// Banner, a blank line, then the document; or just the document.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.banner {
            Some(banner) => format!("{banner}\n\n{}", self.content),
            None => self.content.clone(),
        }
    }
}

/// Read path: extract directives and render the banner, if any.
#[must_use]
pub fn present(raw: &str, index: &VaultIndex, options: &PipelineOptions) -> Presented {
    let doc = Document::parse(raw);
    let directives = directive::extract_document(&doc);
    let banner = banner::render_with(&directives, options.banner);

    let content = if options.normalize_on_read {
        normalize_document(raw, index, options).text
    } else {
        raw.to_string()
    };
    Presented {
        content,
        directives,
        banner,
    }
}

/// Result of the write-path transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedDocument {
    #[serde(skip)]
    pub text: String,
    pub front_matter: NormalizeReport,
    pub body: NormalizeReport,
}

impl NormalizedDocument {
    /// Front-matter and body counts combined.
    #[must_use]
    pub fn report(&self) -> NormalizeReport {
        let mut total = self.front_matter;
        total += self.body;
        total
    }
}

/// Write path: normalize front-matter values and body separately, then
/// join them back together.
///
/// If the normalized front matter no longer parses as a mapping, the
/// original block is kept and its report is discarded.
#[must_use]
pub fn normalize_document(
    raw: &str,
    index: &VaultIndex,
    options: &PipelineOptions,
) -> NormalizedDocument {
    let normalizer = LinkNormalizer::new(index).with_mentions(options.mentions);
    let mut doc = Document::parse(raw);

    let mut front_matter_report = NormalizeReport::default();
    if let Some(fm) = &doc.front_matter {
        let normalized = normalizer.normalize_front_matter(fm.yaml());
        if normalized.report.changed() {
            match fm.with_yaml(normalized.text) {
                Some(updated) => {
                    doc.front_matter = Some(updated);
                    front_matter_report = normalized.report;
                }
                None => warn!("normalized front matter no longer parses; keeping original"),
            }
        } else {
            front_matter_report = normalized.report;
        }
    }

    let body = normalizer.normalize_body(&doc.body);
    doc.body = body.text;

    NormalizedDocument {
        text: doc.to_markdown(),
        front_matter: front_matter_report,
        body: body.report,
    }
}

/// Rename path: point links that resolve to `from` at `target`, in
/// front-matter values and body alike.
///
/// `index` must be a snapshot in which `from` still exists. Front matter
/// that stops parsing is kept as it was, as on the write path.
#[must_use]
pub fn retarget_document(
    raw: &str,
    index: &VaultIndex,
    from: &str,
    target: &str,
) -> NormalizedDocument {
    let retargeter = LinkRetargeter::new(index, from, target);
    let mut doc = Document::parse(raw);

    let mut front_matter_report = NormalizeReport::default();
    if let Some(fm) = &doc.front_matter {
        let retargeted = retargeter.retarget_front_matter(fm.yaml());
        if retargeted.report.changed() {
            match fm.with_yaml(retargeted.text) {
                Some(updated) => {
                    doc.front_matter = Some(updated);
                    front_matter_report = retargeted.report;
                }
                None => warn!("retargeted front matter no longer parses; keeping original"),
            }
        }
    }

    let body = retargeter.retarget_body(&doc.body);
    doc.body = body.text;

    NormalizedDocument {
        text: doc.to_markdown(),
        front_matter: front_matter_report,
        body: body.report,
    }
}

/// Where in a document a link was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkLocation {
    FrontMatter,
    Body,
}

/// One row of a link report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub location: LinkLocation,
    pub kind: LinkKind,
    pub raw: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_name: Option<String>,
    pub status: LinkStatus,
    /// The vault path the link resolves to, when it is unique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Every link in the front-matter values and the body, classified.
#[must_use]
pub fn link_report(raw: &str, index: &VaultIndex) -> Vec<LinkEntry> {
    let doc = Document::parse(raw);
    let mut entries = Vec::new();

    if let Some(fm) = &doc.front_matter {
        let yaml = fm.yaml();
        for span in crate::frontmatter::value_spans(yaml) {
            collect(&yaml[span], LinkLocation::FrontMatter, index, &mut entries);
        }
    }
    collect(&doc.body, LinkLocation::Body, index, &mut entries);
    entries
}

fn collect(text: &str, location: LinkLocation, index: &VaultIndex, out: &mut Vec<LinkEntry>) {
    for link in scan::links(text, ScanOptions::front_matter()) {
        out.push(LinkEntry {
            location,
            kind: link.kind,
            raw: link.raw.to_string(),
            target: link.raw_target.to_string(),
            anchor: link.anchor.map(str::to_string),
            display: link.display_text.map(str::to_string),
            resolved_name: link.resolved_name.as_deref().map(str::to_string),
            status: normalize::classify(&link, index),
            path: normalize::resolved_path(&link, index).map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> VaultIndex {
        VaultIndex::from_paths([
            "Research/article.md",
            "Clippings/Shane Parrish - Article.md",
            "Projects/Alpha/index.md",
            "Archive/index.md",
        ])
    }

    #[test]
    fn document_without_front_matter_is_returned_unchanged() {
        let raw = "# Title\n\nSee [[../Research/article.md]].\n";
        let out = present(raw, &vault(), &PipelineOptions::default());
        assert_eq!(out.text(), raw);
        assert!(out.banner.is_none());
        assert!(out.directives.is_empty());
    }

    #[test]
    fn banner_precedes_original_content() {
        let raw = "---\nmode: thinking\ninstructions: \"Ask questions only.\"\n---\n# Notes\n";
        let out = present(raw, &vault(), &PipelineOptions::default());
        let banner = out.banner.clone().unwrap();
        assert!(banner.contains("THINKING"));
        assert!(banner.contains("Ask questions only."));
        assert_eq!(out.text(), format!("{banner}\n\n{raw}"));
        assert_eq!(out.text(), present(raw, &vault(), &PipelineOptions::default()).text());
    }

    #[test]
    fn read_normalization_is_presentation_only() {
        let raw = "See [[Research/article.md]]";
        let options = PipelineOptions {
            normalize_on_read: true,
            ..PipelineOptions::default()
        };
        assert_eq!(present(raw, &vault(), &options).text(), "See [[article]]");
    }

    #[test]
    fn regions_are_normalized_independently() {
        let raw = "---\nsource: \"[[Research/article.md]]\"\nnote: \"Research/article.md\"\n---\nBody `Clippings/Shane Parrish - Article.md` and [[../Research/article.md|A]]\n";
        let out = normalize_document(raw, &vault(), &PipelineOptions::default());
        assert_eq!(
            out.text,
            "---\nsource: \"[[article]]\"\nnote: \"Research/article.md\"\n---\nBody [[Shane Parrish - Article]] and [[article|A]]\n"
        );
        assert_eq!(out.front_matter.rewritten, 1);
        assert_eq!(out.body.rewritten, 2);
        assert_eq!(out.report().rewritten, 3);
    }

    #[test]
    fn body_never_leaks_into_front_matter() {
        let raw = "---\ntitle: Research/article.md\n---\n[[Research/article.md]]";
        let out = normalize_document(raw, &vault(), &PipelineOptions::default());
        assert_eq!(out.text, "---\ntitle: Research/article.md\n---\n[[article]]");
    }

    #[test]
    fn write_path_is_idempotent() {
        let raw = "---\nrelated:\n  - \"[[../Research/article.md]]\"\n---\n[x](Research/article.md) [[index]]\n";
        let options = PipelineOptions::default();
        let once = normalize_document(raw, &vault(), &options);
        let twice = normalize_document(&once.text, &vault(), &options);
        assert_eq!(once.text, twice.text);
        assert!(!twice.report().changed());
    }

    #[test]
    fn crlf_front_matter_survives_normalization() {
        let raw = "---\r\nsource: \"[[Research/article.md]]\"\r\n---\r\nbody\r\n";
        let out = normalize_document(raw, &vault(), &PipelineOptions::default());
        assert_eq!(out.text, "---\r\nsource: \"[[article]]\"\r\n---\r\nbody\r\n");
    }

    #[test]
    fn retarget_document_rewrites_both_regions() {
        let raw = "---\nsource: \"[[Research/article.md]]\"\n---\nSee [a](../Research/article.md#x) and [[Clippings/Shane Parrish - Article.md]]\n";
        let out = retarget_document(raw, &vault(), "Research/article.md", "paper");
        assert_eq!(
            out.text,
            "---\nsource: \"[[paper]]\"\n---\nSee [a](paper#x) and [[Clippings/Shane Parrish - Article.md]]\n"
        );
        assert_eq!(out.report().rewritten, 2);
    }

    #[test]
    fn link_report_classifies_each_link() {
        let raw = "---\nup: \"[[Projects/Alpha/index.md]]\"\n---\n[[article#Intro|A]] [[Missing]] [w](https://x.io)\n";
        let entries = link_report(raw, &vault());
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].location, LinkLocation::FrontMatter);
        assert_eq!(entries[0].status, LinkStatus::Ambiguous);
        assert_eq!(entries[1].status, LinkStatus::Resolved);
        assert_eq!(entries[1].path.as_deref(), Some("Research/article.md"));
        assert_eq!(entries[1].anchor.as_deref(), Some("#Intro"));
        assert_eq!(entries[2].status, LinkStatus::Unresolved);
        assert_eq!(entries[3].status, LinkStatus::External);

        let json = serde_json::to_value(&entries[1]).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["location"], "body");
        assert_eq!(json["kind"], "wiki");
    }
}
