//! Splitting a markdown reference document into titled sections.
//!
//! A section is the unit of indexing and retrieval: the text between two
//! heading lines, including its own heading. Sections that grow past
//! [`OVERSIZE_LINES`] are re-split once along their sub-headings so no
//! stored fragment exceeds the threshold.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{keywords, priority};

/// Title assigned to content appearing before the first heading.
pub const PREAMBLE_TITLE: &str = "(preamble)";

/// Sections whose trimmed body is at or below this many characters are
/// dropped rather than indexed.
pub const MIN_BODY_CHARS: usize = 10;

/// Line count above which a section is re-split along its sub-headings.
pub const OVERSIZE_LINES: usize = 300;

/// A sub-heading only closes the running fragment once this many lines
/// have accumulated; earlier sub-headings merge into the head fragment.
const SUBSPLIT_MIN_LINES: usize = 5;

/// Separator between a parent title and a sub-heading after a re-split.
const TITLE_SEPARATOR: &str = " > ";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,4}\s+(.+)").expect("heading pattern"));

static SUB_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#{2,5}\s+(.+)").expect("sub-heading pattern")
});

/// One indexed fragment of a reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Key of the owning document.
    pub doc_key: String,
    /// Nearest enclosing heading text, or [`PREAMBLE_TITLE`].
    pub title: String,
    /// Raw section text including its own heading line.
    pub body: String,
    /// Search keywords, capped at [`keywords::MAX_KEYWORDS`].
    pub keywords: Vec<String>,
    /// 1 = critical (always retrieved for pinned documents), 2 = normal.
    pub priority: u8,
}

/// A titled fragment before keyword extraction and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub title: String,
    pub body: String,
}

/// Split a document into titled fragments along `#` to `####` headings.
///
/// Content before the first heading is titled [`PREAMBLE_TITLE`]. Each
/// fragment's body keeps its heading line; fragments whose trimmed body is
/// [`MIN_BODY_CHARS`] characters or fewer are discarded silently. A document
/// with no headings yields exactly one fragment.
pub fn split_headings(text: &str) -> Vec<RawSection> {
    let mut out = Vec::new();
    let mut title = PREAMBLE_TITLE.to_string();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = HEADING.captures(line) {
            flush(&mut out, &title, &lines);
            title = caps[1].trim().to_string();
            lines = vec![line];
        } else {
            lines.push(line);
        }
    }
    flush(&mut out, &title, &lines);

    out
}

fn flush(out: &mut Vec<RawSection>, title: &str, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    let body = lines.join("\n").trim().to_string();
    if body.chars().count() > MIN_BODY_CHARS {
        out.push(RawSection {
            title: title.to_string(),
            body,
        });
    }
}

/// Re-split an oversized fragment along level-2..5 sub-headings.
///
/// Sub-fragment titles are joined as `parent > child` to keep provenance.
/// Runs once; sub-fragments are not split further.
fn split_large(section: &RawSection) -> Vec<RawSection> {
    let mut out = Vec::new();
    let mut title = section.title.clone();
    let mut lines: Vec<&str> = Vec::new();

    for line in section.body.lines() {
        if let Some(caps) = SUB_HEADING.captures(line)
            && lines.len() > SUBSPLIT_MIN_LINES
        {
            flush(&mut out, &title, &lines);
            title = format!(
                "{}{}{}",
                section.title,
                TITLE_SEPARATOR,
                caps[1].trim()
            );
            lines = vec![line];
        } else {
            lines.push(line);
        }
    }
    flush(&mut out, &title, &lines);

    out
}

/// Sectionize a document: heading split, oversize re-split, keyword
/// extraction and priority classification per emitted section.
///
/// `always_critical` comes from the document's registration entry and
/// forces priority 1 on every section regardless of content.
pub fn sectionize(
    text: &str,
    doc_key: &str,
    default_priority: u8,
    always_critical: bool,
) -> Vec<Section> {
    let mut sections = Vec::new();

    for raw in split_headings(text) {
        let priority = priority::classify(
            always_critical,
            &raw.title,
            &raw.body,
            default_priority,
        );

        let parts = if raw.body.lines().count() > OVERSIZE_LINES {
            // The oversized wrapper is replaced by its parts; sub-sections
            // inherit the parent's priority.
            split_large(&raw)
        } else {
            vec![raw]
        };

        for part in parts {
            let keywords = keywords::extract(&part.title, &part.body);
            sections.push(Section {
                doc_key: doc_key.to_string(),
                title: part.title,
                body: part.body,
                keywords,
                priority,
            });
        }
    }

    sections
}
