//! Tokenizing scan of markdown text into non-overlapping segments.
//!
//! Code blocks and inline code spans are located with `pulldown-cmark`, so
//! fences nested in blockquotes and list items are found the way a
//! CommonMark renderer finds them. Everything outside code is then walked
//! once, left to right, and cut into [`Segment`]s: plain text, literal
//! code, wiki links, markdown links, path mentions and malformed link
//! markup. Concatenating the `as_str()` of every segment yields the input
//! unchanged. Each span is consumed exactly once, so a rewrite of one
//! segment can never be re-entered by another.

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;

use pulldown_cmark::{Event, Options, Parser, Tag};
use serde::Serialize;

use crate::paths;

/// Link syntax family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// `[[target]]`, `[[target|display]]`
    Wiki,
    /// `[display](target)`
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Markup<'a> {
    Wiki {
        separator: &'a str,
    },
    Markdown {
        lead: &'a str,
        angle: bool,
        trail: &'a str,
    },
}

/// A link found in scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference<'a> {
    pub kind: LinkKind,
    /// Byte range of the whole markup in the scanned text.
    pub span: Range<usize>,
    /// The whole markup as written.
    pub raw: &'a str,
    /// The target as written, including any anchor.
    pub raw_target: &'a str,
    /// `#heading` or `#^block` suffix of the target.
    pub anchor: Option<&'a str>,
    pub display_text: Option<&'a str>,
    /// Leaf name the target resolves to; `None` for external or empty targets.
    pub resolved_name: Option<Cow<'a, str>>,
    external: bool,
    markup: Markup<'a>,
}

impl<'a> LinkReference<'a> {
    fn wiki(span: Range<usize>, raw: &'a str, inner: &'a str) -> Self {
        let (raw_target, separator, display_text) = match inner.find('|') {
            Some(pipe) if pipe > 0 && inner.as_bytes()[pipe - 1] == b'\\' => (
                &inner[..pipe - 1],
                &inner[pipe - 1..=pipe],
                Some(&inner[pipe + 1..]),
            ),
            Some(pipe) => (&inner[..pipe], &inner[pipe..=pipe], Some(&inner[pipe + 1..])),
            None => (inner, "", None),
        };
        let (path, anchor) = paths::split_anchor(raw_target);
        let external = paths::is_external(raw_target);
        let resolved_name = if external {
            None
        } else {
            paths::link_name(path).map(Cow::Borrowed)
        };
        Self {
            kind: LinkKind::Wiki,
            span,
            raw,
            raw_target,
            anchor,
            display_text,
            resolved_name,
            external,
            markup: Markup::Wiki { separator },
        }
    }

    fn markdown(
        span: Range<usize>,
        raw: &'a str,
        display: &'a str,
        destination: &'a str,
    ) -> Self {
        let after_lead = destination.trim_start();
        let lead = &destination[..destination.len() - after_lead.len()];
        let (raw_target, angle, trail) = match after_lead
            .strip_prefix('<')
            .and_then(|rest| rest.find('>').map(|gt| (rest, gt)))
        {
            Some((rest, gt)) => (&rest[..gt], true, &rest[gt + 1..]),
            None => {
                let end = after_lead
                    .find(char::is_whitespace)
                    .unwrap_or(after_lead.len());
                (&after_lead[..end], false, &after_lead[end..])
            }
        };
        let (path, anchor) = paths::split_anchor(raw_target);
        let external = paths::is_external(raw_target);
        let resolved_name = if external {
            None
        } else {
            decoded_link_name(path)
        };
        Self {
            kind: LinkKind::Markdown,
            span,
            raw,
            raw_target,
            anchor,
            display_text: Some(display),
            resolved_name,
            external,
            markup: Markup::Markdown { lead, angle, trail },
        }
    }

    /// Returns `true` if the target points outside the vault.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Render this link with its target replaced by `name`.
    ///
    /// Anchors, display text, separators and link titles are kept.
    #[must_use]
    pub fn canonical(&self, name: &str) -> String {
        let anchor = self.anchor.unwrap_or("");
        match &self.markup {
            Markup::Wiki { separator } => match self.display_text {
                Some(display) => format!("[[{name}{anchor}{separator}{display}]]"),
                None => format!("[[{name}{anchor}]]"),
            },
            Markup::Markdown { lead, angle, trail } => {
                let display = self.display_text.unwrap_or("");
                let destination = if *angle {
                    format!("<{name}{anchor}>")
                } else if paths::needs_destination_escape(name) {
                    format!("{}{anchor}", urlencoding::encode(name))
                } else {
                    format!("{name}{anchor}")
                };
                format!("[{display}]({lead}{destination}{trail})")
            }
        }
    }
}

fn decoded_link_name(path: &str) -> Option<Cow<'_, str>> {
    match urlencoding::decode(path) {
        Ok(Cow::Owned(decoded)) => paths::link_name(&decoded).map(|n| Cow::Owned(n.to_string())),
        _ => paths::link_name(path).map(Cow::Borrowed),
    }
}

/// A backticked or double-quoted mention of a markdown file path.
///
/// The scanner only recognizes the shape; whether the path names a vault
/// file is decided against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMention<'a> {
    pub span: Range<usize>,
    /// The mention including its backticks or quotes.
    pub raw: &'a str,
    /// The path between the delimiters, trimmed.
    pub path: &'a str,
}

impl PathMention<'_> {
    /// The wiki link that replaces this mention.
    #[must_use]
    pub fn canonical(&self, name: &str) -> String {
        format!("[[{name}]]")
    }
}

/// One piece of scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// Code block or inline code span; never rewritten.
    Code(&'a str),
    Link(LinkReference<'a>),
    Mention(PathMention<'a>),
    /// Link-shaped markup that could not be parsed; kept literally.
    Malformed(&'a str),
}

impl<'a> Segment<'a> {
    /// The original text of this segment.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Text(s) | Segment::Code(s) | Segment::Malformed(s) => *s,
            Segment::Link(link) => link.raw,
            Segment::Mention(mention) => mention.raw,
        }
    }
}

/// What the scanner recognizes beyond links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Recognize backticked or quoted `*.md` paths as [`PathMention`]s.
    pub mentions: bool,
}

impl ScanOptions {
    /// Options for document bodies.
    #[must_use]
    pub fn body(mentions: bool) -> Self {
        Self { mentions }
    }

    /// Options for front-matter values: links only.
    #[must_use]
    pub fn front_matter() -> Self {
        Self { mentions: false }
    }
}

/// Longest markdown link destination searched for a closing `)`.
const MAX_DESTINATION: usize = 2048;

/// Scan `text` into segments.
#[must_use]
pub fn scan(text: &str, options: ScanOptions) -> Vec<Segment<'_>> {
    let code = code_ranges(text);
    let brackets = bracket_pairs(text.as_bytes(), &code);
    let mut scanner = Scanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        text_start: 0,
        options,
        segments: Vec::new(),
        newlines: positions(text.as_bytes(), |b, i| b[i] == b'\n'),
        wiki_opens: positions(text.as_bytes(), |b, i| b[i] == b'[' && b.get(i + 1) == Some(&b'[')),
        wiki_closes: positions(text.as_bytes(), |b, i| b[i] == b']' && b.get(i + 1) == Some(&b']')),
        brackets,
        code,
        next_code: 0,
        paired_quote: None,
    };
    scanner.run();
    scanner.segments
}

/// Every link in `text`, in order.
#[must_use]
pub fn links(text: &str, options: ScanOptions) -> Vec<LinkReference<'_>> {
    scan(text, options)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Link(link) => Some(link),
            _ => None,
        })
        .collect()
}

/// A code block or inline code span located by the markdown parser.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CodeRange {
    span: Range<usize>,
    inline: bool,
}

impl CodeRange {
    /// Inline code confined to one line; link text may contain it.
    fn is_single_line_span(&self, bytes: &[u8]) -> bool {
        self.inline && !bytes[self.span.clone()].contains(&b'\n')
    }
}

/// Code blocks and inline code spans, sorted and non-overlapping.
fn code_ranges(text: &str) -> Vec<CodeRange> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let mut found: Vec<CodeRange> = Parser::new_ext(text, options)
        .into_offset_iter()
        .filter_map(|(event, span)| match event {
            Event::Start(Tag::CodeBlock(_)) => Some(CodeRange {
                span,
                inline: false,
            }),
            Event::Code(_) => Some(CodeRange { span, inline: true }),
            _ => None,
        })
        .filter(|range| range.span.start < range.span.end && range.span.end <= text.len())
        .collect();
    found.sort_by_key(|range| range.span.start);

    let mut ranges: Vec<CodeRange> = Vec::with_capacity(found.len());
    for range in found {
        if ranges.last().map_or(true, |last| range.span.start >= last.span.end) {
            ranges.push(range);
        }
    }
    ranges
}

/// Offsets `i` where `hit(bytes, i)` holds, ascending.
fn positions(bytes: &[u8], hit: impl Fn(&[u8], usize) -> bool) -> Vec<usize> {
    (0..bytes.len()).filter(|&i| hit(bytes, i)).collect()
}

/// Map each `[` to the `]` balancing it on the same line.
///
/// Escaped brackets and brackets inside code are skipped. Single-line
/// inline code is stepped over; any other code ends the line.
fn bracket_pairs(bytes: &[u8], code: &[CodeRange]) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut open: Vec<usize> = Vec::new();
    let mut next_code = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(range) = code.get(next_code) {
            if range.span.start <= i {
                if !range.is_single_line_span(bytes) {
                    open.clear();
                }
                i = i.max(range.span.end);
                next_code += 1;
                continue;
            }
        }
        match bytes[i] {
            b'\n' => open.clear(),
            b'\\' if bytes.get(i + 1).is_some_and(|b| *b != b'\n') => i += 1,
            b'[' => open.push(i),
            b']' => {
                if let Some(start) = open.pop() {
                    pairs.insert(start, i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    pairs
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    text_start: usize,
    options: ScanOptions,
    segments: Vec<Segment<'a>>,
    newlines: Vec<usize>,
    wiki_opens: Vec<usize>,
    wiki_closes: Vec<usize>,
    brackets: HashMap<usize, usize>,
    code: Vec<CodeRange>,
    /// First code range not yet behind the cursor.
    next_code: usize,
    /// Closing quote of a pair that was not a mention; never an opener.
    paired_quote: Option<usize>,
}

impl<'a> Scanner<'a> {
    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            if let Some(range) = self.code_at(self.pos) {
                self.code(range);
                continue;
            }
            match self.bytes[self.pos] {
                b'\\' => self.escape(),
                b'[' if self.bytes.get(self.pos + 1) == Some(&b'[') => self.wiki_link(),
                b'[' => self.markdown_link(),
                b'"' if self.options.mentions => self.quoted_mention(),
                _ => self.pos += 1,
            }
        }
        self.flush_text(self.bytes.len());
    }

    fn emit(&mut self, start: usize, end: usize, segment: Segment<'a>) {
        self.flush_text(start);
        self.segments.push(segment);
        self.pos = end;
        self.text_start = end;
    }

    fn malformed(&mut self, start: usize, end: usize) {
        let raw = &self.text[start..end];
        tracing::debug!(offset = start, markup = raw, "skipping malformed link markup");
        self.emit(start, end, Segment::Malformed(raw));
    }

    fn flush_text(&mut self, upto: usize) {
        if upto > self.text_start {
            self.segments
                .push(Segment::Text(&self.text[self.text_start..upto]));
            self.text_start = upto;
        }
    }

    /// The code range covering `pos`, if any.
    fn code_at(&mut self, pos: usize) -> Option<CodeRange> {
        while self
            .code
            .get(self.next_code)
            .is_some_and(|range| range.span.end <= pos)
        {
            self.next_code += 1;
        }
        self.code
            .get(self.next_code)
            .filter(|range| range.span.start <= pos)
            .cloned()
    }

    /// Where link markup starting at `from` has to end: the end of the
    /// line or the next code range, whichever comes first.
    fn boundary(&self, from: usize) -> usize {
        let line = self.line_stop(from);
        self.code[self.next_code..]
            .iter()
            .find(|range| range.span.start >= from)
            .map_or(line, |range| line.min(range.span.start))
    }

    /// End of the current line, excluding the newline.
    fn line_stop(&self, from: usize) -> usize {
        let next = self.newlines.partition_point(|&n| n < from);
        self.newlines.get(next).copied().unwrap_or(self.text.len())
    }

    fn escape(&mut self) {
        let escapes_punctuation = self
            .bytes
            .get(self.pos + 1)
            .is_some_and(u8::is_ascii_punctuation);
        self.pos += if escapes_punctuation { 2 } else { 1 };
    }

    fn code(&mut self, range: CodeRange) {
        let start = self.pos.max(range.span.start);
        let end = range.span.end;
        let raw = &self.text[start..end];
        let mention = if range.inline && start == range.span.start {
            let run = count_run(raw.as_bytes(), b'`');
            raw.get(run..raw.len().saturating_sub(run))
                .filter(|_| run > 0 && raw.len() >= 2 * run)
                .and_then(|content| self.mention(start..end, raw, content))
        } else {
            None
        };
        let segment = match mention {
            Some(mention) => Segment::Mention(mention),
            None => Segment::Code(raw),
        };
        self.emit(start, end, segment);
    }

    fn quoted_mention(&mut self) {
        let start = self.pos;
        if self.paired_quote == Some(start) {
            self.pos += 1;
            return;
        }
        let Some(close) = self.closing_quote(start + 1) else {
            self.pos += 1;
            return;
        };
        let end = close + 1;
        let raw = &self.text[start..end];
        let content = &self.text[start + 1..close];
        match self.mention(start..end, raw, content) {
            Some(mention) => self.emit(start, end, Segment::Mention(mention)),
            None => {
                self.paired_quote = Some(close);
                self.pos += 1;
            }
        }
    }

    /// The next `"` on the line, stepping over single-line inline code.
    fn closing_quote(&self, from: usize) -> Option<usize> {
        let stop = self.line_stop(from);
        let mut code = self.code[self.next_code..]
            .iter()
            .skip_while(|range| range.span.start < from)
            .peekable();
        let mut i = from;
        while i < stop {
            if let Some(range) = code.next_if(|range| range.span.start <= i) {
                if !range.is_single_line_span(self.bytes) {
                    return None;
                }
                i = i.max(range.span.end);
                continue;
            }
            if self.bytes[i] == b'"' {
                return Some(i);
            }
            i += 1;
        }
        None
    }

    fn mention(&self, span: Range<usize>, raw: &'a str, content: &'a str) -> Option<PathMention<'a>> {
        if !self.options.mentions {
            return None;
        }
        let path = content.trim();
        if !paths::is_linkable_name(path)
            || !paths::is_markdown_path(path)
            || paths::is_external(path)
            || paths::link_name(path).is_none()
        {
            return None;
        }
        Some(PathMention { span, raw, path })
    }

    fn wiki_link(&mut self) {
        let start = self.pos;
        let inner_start = start + 2;
        let stop = self.boundary(inner_start);
        let close = self
            .wiki_closes
            .get(self.wiki_closes.partition_point(|&c| c < inner_start))
            .copied()
            .filter(|&c| c + 2 <= stop);
        match close {
            None => self.malformed(start, inner_start),
            Some(close) if close == inner_start => self.malformed(start, inner_start + 2),
            Some(close) => {
                let nested = self
                    .wiki_opens
                    .get(self.wiki_opens.partition_point(|&o| o < inner_start))
                    .is_some_and(|&o| o + 2 <= close);
                if nested {
                    self.malformed(start, inner_start);
                    return;
                }
                let end = close + 2;
                let inner = &self.text[inner_start..close];
                let link = LinkReference::wiki(start..end, &self.text[start..end], inner);
                self.emit(start, end, Segment::Link(link));
            }
        }
    }

    fn markdown_link(&mut self) {
        let start = self.pos;
        let Some(close) = self.brackets.get(&start).copied() else {
            self.pos += 1;
            return;
        };
        if self.bytes.get(close + 1) != Some(&b'(') {
            self.pos += 1;
            return;
        }
        let dest_start = close + 2;
        let Some(dest_end) = self.destination_end(dest_start) else {
            self.malformed(start, start + 1);
            return;
        };
        let end = dest_end + 1;
        let link = LinkReference::markdown(
            start..end,
            &self.text[start..end],
            &self.text[start + 1..close],
            &self.text[dest_start..dest_end],
        );
        self.emit(start, end, Segment::Link(link));
    }

    /// Offset of the `)` closing a link destination that starts at `from`.
    fn destination_end(&self, from: usize) -> Option<usize> {
        let limit = self
            .boundary(from)
            .min(from.saturating_add(MAX_DESTINATION));
        let mut depth = 0usize;
        let mut in_angle = false;
        let mut i = from;
        while i < limit {
            match self.bytes[i] {
                b'\\' if i + 1 < limit => i += 1,
                b'<' if !in_angle && self.text[from..i].trim().is_empty() => in_angle = true,
                b'>' if in_angle => in_angle = false,
                b'(' if !in_angle => depth += 1,
                b')' if !in_angle => {
                    if depth == 0 {
                        return Some(i);
                    }
                    depth -= 1;
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

fn count_run(bytes: &[u8], byte: u8) -> usize {
    bytes.iter().take_while(|b| **b == byte).count()
}
