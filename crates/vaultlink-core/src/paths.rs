//! Filename and vault path helpers shared by the index and the normalizer.
//!
//! Vault paths are always `/`-separated and relative to the vault root.
//! A note's *name* is its leaf filename with the markdown extension
//! removed; attachments keep their extension (`diagram.png`), which is how
//! wiki links refer to them.

/// File extensions treated as markdown documents (compared case-insensitively).
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Strip a trailing markdown extension, if present.
///
/// `"article.md"` becomes `"article"`, `"diagram.png"` and `".md"` are
/// returned unchanged.
#[must_use]
pub fn strip_markdown_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && MARKDOWN_EXTENSIONS
                    .iter()
                    .any(|md| ext.eq_ignore_ascii_case(md)) =>
        {
            stem
        }
        _ => name,
    }
}

/// Returns `true` if the path ends in a markdown extension.
#[must_use]
pub fn is_markdown_path(path: &str) -> bool {
    let leaf = leaf_name(path);
    strip_markdown_extension(leaf).len() != leaf.len()
}

/// The final component of a `/` or `\` separated path.
#[must_use]
pub fn leaf_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Canonicalize a path reported by a storage backend.
///
/// Backslashes become `/`, leading `./` and `/` are dropped. Returns `None`
/// for directory entries (trailing `/`) and empty paths.
#[must_use]
pub fn normalize_vault_path(path: &str) -> Option<String> {
    let path = path.trim().replace('\\', "/");
    if path.ends_with('/') {
        return None;
    }
    let mut rest = path.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else {
            break;
        }
    }
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// A path as written in prose, reduced to its vault-relative tail.
///
/// Leading `./`, `../` and `/` segments are dropped; `None` when nothing
/// remains.
#[must_use]
pub fn prose_path(path: &str) -> Option<String> {
    let path = normalize_vault_path(path)?;
    let mut rest = path.as_str();
    while let Some(stripped) = rest
        .strip_prefix("../")
        .or_else(|| rest.strip_prefix("./"))
        .or_else(|| rest.strip_prefix('/'))
    {
        rest = stripped;
    }
    (!rest.is_empty()).then(|| rest.to_string())
}

/// The index key for a vault path: leaf name, minus a markdown extension.
#[must_use]
pub fn index_key(path: &str) -> Option<&str> {
    link_name(path)
}

/// The name a link target resolves to.
///
/// Relative prefixes (`../`, `./`), folders and a markdown extension are
/// stripped, leaving only the leaf: `"../../Research/article.md"` resolves to
/// `"article"`. Returns `None` when nothing nameable remains.
#[must_use]
pub fn link_name(target: &str) -> Option<&str> {
    let leaf = strip_markdown_extension(leaf_name(target.trim())).trim();
    if leaf.is_empty() || leaf == "." || leaf == ".." {
        None
    } else {
        Some(leaf)
    }
}

/// Split a link target into its path and `#heading` / `#^block` anchor.
#[must_use]
pub fn split_anchor(target: &str) -> (&str, Option<&str>) {
    match target.find('#') {
        Some(pos) => (&target[..pos], Some(&target[pos..])),
        None => (target, None),
    }
}

/// Returns `true` for targets that point outside the vault (URLs, mail
/// addresses, in-page anchors).
#[must_use]
pub fn is_external(target: &str) -> bool {
    let target = target.trim();
    if target.starts_with('#') || target.contains("://") {
        return true;
    }
    ["mailto:", "tel:", "data:"].iter().any(|scheme| {
        target
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Returns `true` if a name cannot appear bare inside a markdown link
/// destination and has to be escaped.
#[must_use]
pub fn needs_destination_escape(name: &str) -> bool {
    name.chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>' | '%'))
}

/// Returns `true` if `name` can be written as a link target and read back
/// as the same name.
///
/// Link markup characters, quotes, backticks and control characters rule a
/// name out.
#[must_use]
pub fn is_linkable_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_control() || matches!(c, '[' | ']' | '|' | '#' | '^' | '`' | '"'))
}
