//! Priority classification for indexed sections.
//!
//! A section is critical (tier 1) when its omission from retrieval could
//! produce contract-violating prose downstream: transmission-policy limits,
//! exclusivity rules, persona invariants, forbidden-term lists. The rules
//! are an ordered, auditable pattern table, not scattered conditionals.

use std::sync::LazyLock;

use regex::Regex;

use crate::registry::PRIORITY_CRITICAL;

/// How many body characters the classifier inspects.
const CLASSIFY_SCAN_CHARS: usize = 300;

/// Shapes of content that must always survive retrieval, in match order.
static CRITICAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Transmission policy: what may be taught, to whom, and its limits.
        r"전수.*정책|전수.*범위|전수.*한계",
        // Protagonist-exclusive domains.
        r"위소운.*독점|독점.*영역",
        // The three-persona voice engine.
        r"3인격|삼인격",
        // Immutable speech-pattern rules.
        r"말투.*절대|말투.*불변",
        // Forbidden terms and phrases.
        r"금지어|금지.*문구",
        // Per-character speech patterns.
        r"캐릭터.*말투|말투.*패턴",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("critical pattern"))
    .collect()
});

/// Titles naming martial techniques or their transmission are critical.
static TECHNIQUE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"심법|검법|무공|전수|수련").expect("technique-title pattern")
});

/// Classify a section's priority tier.
///
/// `always_critical` (from the document's registration entry) wins
/// unconditionally; otherwise the pattern table is tested against the title
/// and the opening of the body, then the technique-title rule, then the
/// registered default.
pub fn classify(
    always_critical: bool,
    title: &str,
    body: &str,
    default_priority: u8,
) -> u8 {
    if always_critical {
        return PRIORITY_CRITICAL;
    }

    let head: String = body.chars().take(CLASSIFY_SCAN_CHARS).collect();
    for pattern in CRITICAL_PATTERNS.iter() {
        if pattern.is_match(title) || pattern.is_match(&head) {
            return PRIORITY_CRITICAL;
        }
    }

    if TECHNIQUE_TITLE.is_match(title) {
        return PRIORITY_CRITICAL;
    }

    default_priority
}
