//! Link normalization.
//!
//! Rewrites path-qualified links into the short form Obsidian resolves by
//! name: `[[../../Research/article.md|My Article]]` becomes
//! `[[article|My Article]]` when exactly one `article` exists in the vault.
//! Anything that does not resolve to exactly one file is emitted byte for
//! byte. Running the normalizer over its own output changes nothing.

use std::ops::AddAssign;

use serde::Serialize;
use tracing::debug;

use crate::frontmatter;
use crate::index::{Resolution, VaultIndex};
use crate::paths;
use crate::scan::{self, LinkReference, PathMention, ScanOptions, Segment};

/// Counts of what a normalization pass saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Links and path mentions replaced by their canonical form.
    pub rewritten: usize,
    /// Links already in canonical form.
    pub canonical: usize,
    pub unresolved: usize,
    pub ambiguous: usize,
    pub external: usize,
    pub malformed: usize,
}

impl NormalizeReport {
    /// Returns `true` if the pass rewrote anything.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.rewritten > 0
    }
}

impl AddAssign for NormalizeReport {
    fn add_assign(&mut self, other: Self) {
        self.rewritten += other.rewritten;
        self.canonical += other.canonical;
        self.unresolved += other.unresolved;
        self.ambiguous += other.ambiguous;
        self.external += other.external;
        self.malformed += other.malformed;
    }
}

/// Normalized text with its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub report: NormalizeReport,
}

/// How a link's target resolves against the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Exactly one file carries the target name.
    Resolved,
    Unresolved,
    /// Several files share the target name.
    Ambiguous,
    /// URL, mail address or in-page anchor.
    External,
}

enum Lookup<'i> {
    External,
    Unresolved,
    Ambiguous(Vec<&'i str>),
    Resolved(&'i str),
}

fn lookup<'i>(link: &LinkReference<'_>, index: &'i VaultIndex) -> Lookup<'i> {
    if link.is_external() {
        return Lookup::External;
    }
    let Some(name) = link
        .resolved_name
        .as_deref()
        .filter(|name| paths::is_linkable_name(name))
    else {
        return Lookup::Unresolved;
    };
    match index.resolve(name) {
        Resolution::Missing => Lookup::Unresolved,
        Resolution::Unique(path) => Lookup::Resolved(path),
        Resolution::Ambiguous(paths) => Lookup::Ambiguous(paths),
    }
}

/// Classify a link against the index.
#[must_use]
pub fn classify(link: &LinkReference<'_>, index: &VaultIndex) -> LinkStatus {
    match lookup(link, index) {
        Lookup::External => LinkStatus::External,
        Lookup::Unresolved => LinkStatus::Unresolved,
        Lookup::Ambiguous(_) => LinkStatus::Ambiguous,
        Lookup::Resolved(_) => LinkStatus::Resolved,
    }
}

/// The vault path a link resolves to, if it resolves to exactly one file.
#[must_use]
pub fn resolved_path<'i>(link: &LinkReference<'_>, index: &'i VaultIndex) -> Option<&'i str> {
    match lookup(link, index) {
        Lookup::Resolved(path) => Some(path),
        _ => None,
    }
}

/// Rewrites links against one index snapshot.
#[derive(Debug, Clone, Copy)]
pub struct LinkNormalizer<'i> {
    index: &'i VaultIndex,
    mentions: bool,
}

impl<'i> LinkNormalizer<'i> {
    /// A normalizer with path mentions enabled.
    #[must_use]
    pub fn new(index: &'i VaultIndex) -> Self {
        Self {
            index,
            mentions: true,
        }
    }

    /// Enable or disable rewriting of backticked and quoted `*.md` paths.
    #[must_use]
    pub fn with_mentions(mut self, mentions: bool) -> Self {
        self.mentions = mentions;
        self
    }

    /// Normalize a document body.
    #[must_use]
    pub fn normalize_body(&self, body: &str) -> Normalized {
        self.rewrite(body, ScanOptions::body(self.mentions))
    }

    /// Normalize the value positions of a front-matter YAML text.
    ///
    /// Keys, comments and line structure are left as they are. The result
    /// is not validated here; callers re-parse it before using it.
    #[must_use]
    pub fn normalize_front_matter(&self, yaml: &str) -> Normalized {
        rewrite_values(yaml, |value| self.rewrite(value, ScanOptions::front_matter()))
    }

    fn rewrite(&self, text: &str, options: ScanOptions) -> Normalized {
        let mut out = String::with_capacity(text.len());
        let mut report = NormalizeReport::default();
        for segment in scan::scan(text, options) {
            match segment {
                Segment::Text(s) | Segment::Code(s) => out.push_str(s),
                Segment::Malformed(s) => {
                    report.malformed += 1;
                    out.push_str(s);
                }
                Segment::Link(link) => match lookup(&link, self.index) {
                    Lookup::External => {
                        report.external += 1;
                        out.push_str(link.raw);
                    }
                    Lookup::Unresolved => {
                        report.unresolved += 1;
                        out.push_str(link.raw);
                    }
                    Lookup::Ambiguous(candidates) => {
                        debug!(link = link.raw, ?candidates, "ambiguous link target left unchanged");
                        report.ambiguous += 1;
                        out.push_str(link.raw);
                    }
                    Lookup::Resolved(_) => {
                        let name = link.resolved_name.as_deref().unwrap_or_default();
                        let canonical = link.canonical(name);
                        if canonical == link.raw {
                            report.canonical += 1;
                        } else {
                            report.rewritten += 1;
                        }
                        out.push_str(&canonical);
                    }
                },
                Segment::Mention(mention) => match self.mention_name(&mention) {
                    Some(name) => {
                        report.rewritten += 1;
                        out.push_str(&mention.canonical(name));
                    }
                    None => out.push_str(mention.raw),
                },
            }
        }
        Normalized { text: out, report }
    }

    /// The name a mention is rewritten to: its path must match exactly one
    /// vault file, and that file's name must be unique.
    fn mention_name(&self, mention: &PathMention<'_>) -> Option<&'i str> {
        let Resolution::Unique(path) = self.index.resolve_path(mention.path) else {
            return None;
        };
        let name = paths::index_key(path)?;
        match self.index.resolve(name) {
            Resolution::Unique(unique) if unique == path => Some(name),
            _ => {
                debug!(mention = mention.raw, path, "mention name is not unique; left unchanged");
                None
            }
        }
    }
}

/// Apply `rewrite` to each value position of a front-matter YAML text.
fn rewrite_values(yaml: &str, rewrite: impl Fn(&str) -> Normalized) -> Normalized {
    let mut text = String::with_capacity(yaml.len());
    let mut report = NormalizeReport::default();
    let mut last = 0;
    for span in frontmatter::value_spans(yaml) {
        text.push_str(&yaml[last..span.start]);
        let value = rewrite(&yaml[span.clone()]);
        text.push_str(&value.text);
        report += value.report;
        last = span.end;
    }
    text.push_str(&yaml[last..]);
    Normalized { text, report }
}

/// Points every link that resolves to one file at a new target.
///
/// Used when a file moves: links are resolved against a snapshot that
/// still holds the old path, and each match is rewritten with `target`
/// while anchors, display text and markup style are kept. Path mentions
/// are not touched. `report.rewritten` counts retargeted links.
#[derive(Debug, Clone, Copy)]
pub struct LinkRetargeter<'a> {
    index: &'a VaultIndex,
    from: &'a str,
    target: &'a str,
}

impl<'a> LinkRetargeter<'a> {
    #[must_use]
    pub fn new(index: &'a VaultIndex, from: &'a str, target: &'a str) -> Self {
        Self {
            index,
            from,
            target,
        }
    }

    #[must_use]
    pub fn retarget_body(&self, body: &str) -> Normalized {
        self.rewrite(body)
    }

    #[must_use]
    pub fn retarget_front_matter(&self, yaml: &str) -> Normalized {
        rewrite_values(yaml, |value| self.rewrite(value))
    }

    fn rewrite(&self, text: &str) -> Normalized {
        let mut out = String::with_capacity(text.len());
        let mut report = NormalizeReport::default();
        for segment in scan::scan(text, ScanOptions::front_matter()) {
            match segment {
                Segment::Link(link) if resolved_path(&link, self.index) == Some(self.from) => {
                    report.rewritten += 1;
                    out.push_str(&link.canonical(self.target));
                }
                other => out.push_str(other.as_str()),
            }
        }
        Normalized { text: out, report }
    }
}

/// Normalize a body with default settings.
#[must_use]
pub fn normalize(text: &str, index: &VaultIndex) -> String {
    LinkNormalizer::new(index).normalize_body(text).text
}
