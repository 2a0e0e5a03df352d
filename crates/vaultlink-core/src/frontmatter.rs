//! YAML front-matter splitting and joining.
//!
//! Handles the `---` delimited YAML block at the start of a markdown file:
//! ```markdown
//! ---
//! mode: thinking
//! instructions: |
//!   Ask questions only.
//! ---
//!
//! # Body content here
//! ```
//!
//! The split is lossless: the delimiter lines and the YAML text are kept
//! verbatim, so [`Document::to_markdown`] reproduces the input byte for
//! byte. A block that does not parse as a mapping is not front matter; the
//! whole text is then treated as body.

use std::ops::Range;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::VaultlinkError;

const DELIMITER: &str = "---";

/// A parsed front-matter block together with its exact source text.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    opening: String,
    yaml: String,
    closing: String,
    fields: Mapping,
}

impl FrontMatter {
    /// Build a block from a mapping, serialized with standard delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`VaultlinkError::Serialization`] if the mapping cannot be
    /// rendered as YAML.
    pub fn from_fields(fields: Mapping) -> Result<Self, VaultlinkError> {
        let yaml = serialize_fields(&fields)?;
        Ok(Self {
            opening: format!("{DELIMITER}\n"),
            yaml,
            closing: format!("{DELIMITER}\n"),
            fields,
        })
    }

    /// The raw YAML between the delimiter lines.
    #[must_use]
    pub fn yaml(&self) -> &str {
        &self.yaml
    }

    /// The parsed mapping, in document order.
    #[must_use]
    pub fn fields(&self) -> &Mapping {
        &self.fields
    }

    /// Look up a field by its exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Replace the YAML text, keeping the delimiters.
    ///
    /// Returns `None` if the new text does not parse as a mapping.
    #[must_use]
    pub fn with_yaml(&self, yaml: String) -> Option<Self> {
        let fields = parse_mapping(&yaml)?;
        Some(Self {
            opening: self.opening.clone(),
            yaml,
            closing: self.closing.clone(),
            fields,
        })
    }

    fn set_fields(&mut self, fields: Mapping) -> Result<(), VaultlinkError> {
        let mut yaml = serialize_fields(&fields)?;
        if self.opening.ends_with("\r\n") {
            yaml = yaml.replace('\n', "\r\n");
        }
        self.yaml = yaml;
        self.fields = fields;
        Ok(())
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.opening);
        out.push_str(&self.yaml);
        out.push_str(&self.closing);
    }
}

/// A markdown document split into optional front matter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub front_matter: Option<FrontMatter>,
    pub body: String,
}

impl Document {
    /// Split raw text into front matter and body. Never fails: malformed
    /// front matter degrades to a document without front matter.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let Some((opening_end, yaml_end, closing_end)) = locate_block(raw) else {
            return Self::body_only(raw);
        };

        let yaml = &raw[opening_end..yaml_end];
        let Some(fields) = parse_mapping(yaml) else {
            debug!("front matter does not parse as a mapping; treating document as body");
            return Self::body_only(raw);
        };

        Self {
            front_matter: Some(FrontMatter {
                opening: raw[..opening_end].to_string(),
                yaml: yaml.to_string(),
                closing: raw[yaml_end..closing_end].to_string(),
                fields,
            }),
            body: raw[closing_end..].to_string(),
        }
    }

    fn body_only(raw: &str) -> Self {
        Self {
            front_matter: None,
            body: raw.to_string(),
        }
    }

    /// Join front matter and body back into markdown text.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::with_capacity(
            self.body.len() + self.front_matter.as_ref().map_or(0, |fm| fm.yaml.len() + 8),
        );
        if let Some(fm) = &self.front_matter {
            fm.write_to(&mut out);
        }
        out.push_str(&self.body);
        out
    }

    /// The front-matter mapping, if the document has one.
    #[must_use]
    pub fn fields(&self) -> Option<&Mapping> {
        self.front_matter.as_ref().map(FrontMatter::fields)
    }

    /// Merge `updates` into the front matter, creating a block if needed.
    ///
    /// Existing keys keep their position; new keys are appended. The YAML
    /// is re-serialized, so comments in the block are not kept.
    ///
    /// # Errors
    ///
    /// Returns [`VaultlinkError::Serialization`] if the merged mapping
    /// cannot be rendered as YAML.
    pub fn update_fields(&mut self, updates: Mapping) -> Result<(), VaultlinkError> {
        match &mut self.front_matter {
            Some(fm) => {
                let mut fields = fm.fields.clone();
                for (key, value) in updates {
                    fields.insert(key, value);
                }
                fm.set_fields(fields)
            }
            None => {
                self.front_matter = Some(FrontMatter::from_fields(updates)?);
                Ok(())
            }
        }
    }

    /// Remove a front-matter key. Drops the block once it is empty.
    ///
    /// Returns whether the key was present.
    ///
    /// # Errors
    ///
    /// Returns [`VaultlinkError::Serialization`] if the remaining mapping
    /// cannot be rendered as YAML.
    pub fn remove_field(&mut self, key: &str) -> Result<bool, VaultlinkError> {
        let Some(fm) = &mut self.front_matter else {
            return Ok(false);
        };
        let mut fields = fm.fields.clone();
        if fields.shift_remove(key).is_none() {
            return Ok(false);
        }
        if fields.is_empty() {
            self.front_matter = None;
        } else {
            fm.set_fields(fields)?;
        }
        Ok(true)
    }
}

/// Split raw text into front matter and body. Alias of [`Document::parse`].
#[must_use]
pub fn split(raw: &str) -> Document {
    Document::parse(raw)
}

/// Join a split document back into text. Alias of [`Document::to_markdown`].
#[must_use]
pub fn join(doc: &Document) -> String {
    doc.to_markdown()
}

/// Byte ranges of the value positions in a front-matter YAML text.
///
/// Values are the text after `key:`, the text after `- ` sequence markers,
/// continuation lines of `|` / `>` block scalars and continuation lines of
/// plain multi-line scalars. Keys, comment lines and blank lines are not
/// values. Ranges never include line terminators.
#[must_use]
pub fn value_spans(yaml: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut block_indent: Option<usize> = None;
    let mut offset = 0;
    for line in yaml.split_inclusive('\n') {
        let span = line_value(line, &mut block_indent);
        if !span.is_empty() {
            spans.push(offset + span.start..offset + span.end);
        }
        offset += line.len();
    }
    spans
}

fn line_value(line: &str, block_indent: &mut Option<usize>) -> Range<usize> {
    let content_end = line.trim_end_matches(['\n', '\r']).len();
    let content = &line[..content_end];
    let indent = content.len() - content.trim_start_matches(' ').len();
    let trimmed = content[indent..].trim_end();

    if let Some(key_indent) = *block_indent {
        if trimmed.is_empty() || indent > key_indent {
            return indent..content_end;
        }
        *block_indent = None;
    }
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return content_end..content_end;
    }

    let mut start = indent;
    while let Some(rest) = content[start..].strip_prefix("- ") {
        start += 2 + (rest.len() - rest.trim_start_matches(' ').len());
    }
    if content[start..].trim_end() == "-" {
        return content_end..content_end;
    }

    match key_colon(&content[start..]) {
        Some(colon) => {
            let value_start = start + colon + 1;
            let value = content[value_start..].trim();
            if value.starts_with('|') || value.starts_with('>') {
                *block_indent = Some(indent);
            }
            value_start..content_end
        }
        None => start..content_end,
    }
}

/// Offset of the `:` ending a mapping key at the start of `text`.
fn key_colon(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    match bytes.first()? {
        quote @ (b'"' | b'\'') => {
            let close = text[1..].find(char::from(*quote))? + 1;
            let after = &text[close + 1..];
            let colon = close + 1 + (after.len() - after.trim_start_matches(' ').len());
            (bytes.get(colon) == Some(&b':') && ends_key(bytes, colon)).then_some(colon)
        }
        b'[' | b'{' | b'#' | b'|' | b'>' | b'&' | b'*' | b'!' => None,
        _ => (0..bytes.len())
            .find(|&i| bytes[i] == b':' && ends_key(bytes, i))
            .filter(|&i| !text[..i].contains(['[', '{', '"', '\'', '#'])),
    }
}

fn ends_key(bytes: &[u8], colon: usize) -> bool {
    bytes
        .get(colon + 1)
        .map_or(true, |b| *b == b' ' || *b == b'\t')
}

/// Find `(opening_end, yaml_end, closing_end)` byte offsets of a delimited
/// block at the very start of `raw`.
fn locate_block(raw: &str) -> Option<(usize, usize, usize)> {
    let opening_end = line_end(raw, 0);
    let opening = &raw[..opening_end];
    let opening = opening.strip_prefix('\u{feff}').unwrap_or(opening);
    if !opening.ends_with('\n') || !is_delimiter(opening) {
        return None;
    }

    let mut pos = opening_end;
    while pos < raw.len() {
        let end = line_end(raw, pos);
        if is_delimiter(&raw[pos..end]) {
            return Some((opening_end, pos, end));
        }
        pos = end;
    }
    debug!("front matter opened but never closed; treating document as body");
    None
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map_or(text.len(), |offset| from + offset + 1)
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn parse_mapping(yaml: &str) -> Option<Mapping> {
    if yaml.trim().is_empty() {
        return Some(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(fields)) => Some(fields),
        Ok(Value::Null) => Some(Mapping::new()),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "front matter is not valid YAML");
            None
        }
    }
}

fn serialize_fields(fields: &Mapping) -> Result<String, VaultlinkError> {
    if fields.is_empty() {
        return Ok(String::new());
    }
    serde_yaml::to_string(fields).map_err(|e| VaultlinkError::Serialization(e.to_string()))
}
