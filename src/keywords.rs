//! Keyword extraction for indexed sections.
//!
//! Derives a bounded set of search terms from a section's title and body:
//! title word runs, emphasized spans, hanja-gloss terms, particle-suffixed
//! proper nouns and technique-suffixed names, minus a stopword list. The
//! character classes are tuned to the Hangul corpus the engine serves.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

/// Hard cap on keywords per section.
pub const MAX_KEYWORDS: usize = 30;

/// How many body characters the proper-noun heuristic scans.
const NAME_SCAN_CHARS: usize = 500;

/// Longest mixed-script emphasized term kept verbatim (e.g. "M&A 실사").
const MAX_VERBATIM_TERM_CHARS: usize = 20;

static WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[가-힣]{2,}").expect("word-run pattern"));

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern"));

/// Hangul term glossed with its hanja (or romanized) origin, e.g.
/// `귀원검법(歸元劍法)`.
static HANJA_GLOSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[가-힣]+\([一-龥a-zA-Z]+\)").expect("gloss pattern")
});

static HANGUL_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[가-힣]+").expect("head pattern"));

/// 2–4 character word run directly followed by a grammatical particle or
/// an opening paren; recovers names mentioned mid-sentence.
static NAME_BEFORE_PARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([가-힣]{2,4})(?:\(|은|는|이|가|의|를|을|에게|과|와|도)")
        .expect("particle pattern")
});

/// Technique and discipline names: word runs ending in one of the
/// art-name suffixes (검법, 심공, 초식, 진법...).
static TECHNIQUE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[가-힣]{2,}(?:법|공|식|진|결|경|장)\b")
        .expect("technique pattern")
});

/// Generic connective and referential words that carry no search value.
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "이것", "그것", "저것", "이런", "그런", "때문", "하지만", "그리고",
        "또한", "아래", "위에", "다음", "이전", "기본", "핵심", "설정",
        "내용", "항목", "참조", "참고",
    ]
    .into_iter()
    .collect()
});

/// Extract up to [`MAX_KEYWORDS`] keywords from a section.
///
/// Insertion order follows the rule sequence (title terms first), so
/// truncation at the cap keeps the highest-signal terms. Given identical
/// input the returned list is identical across runs.
pub fn extract(title: &str, body: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();

    // 1. Title word runs.
    for m in WORD_RUN.find_iter(title) {
        add(&mut out, &mut seen, m.as_str());
    }

    // 2. Emphasized spans; usually important terms. Mixed-Latin terms are
    //    also kept verbatim so acronyms survive word-splitting.
    for caps in BOLD_SPAN.captures_iter(body) {
        let term = caps[1].trim();
        for m in WORD_RUN.find_iter(term) {
            add(&mut out, &mut seen, m.as_str());
        }
        if term.chars().any(|c| c.is_ascii_alphabetic())
            && term.chars().count() <= MAX_VERBATIM_TERM_CHARS
        {
            add(&mut out, &mut seen, term);
        }
    }

    // 3. Hanja-glossed terms: keep the leading Hangul word.
    for m in HANJA_GLOSS.find_iter(body) {
        if let Some(head) = HANGUL_HEAD.find(m.as_str()) {
            add(&mut out, &mut seen, head.as_str());
        }
    }

    // 4. Proper nouns before particles, in the title and the opening body.
    let head: String = body.chars().take(NAME_SCAN_CHARS).collect();
    let name_area = format!("{title} {head}");
    for caps in NAME_BEFORE_PARTICLE.captures_iter(&name_area) {
        add(&mut out, &mut seen, &caps[1]);
    }

    // 5. Technique names kept whole, suffix included.
    for m in TECHNIQUE_NAME.find_iter(body) {
        add(&mut out, &mut seen, m.as_str());
    }

    out.truncate(MAX_KEYWORDS);
    out
}

fn add(out: &mut Vec<String>, seen: &mut HashSet<String>, term: &str) {
    if STOPWORDS.contains(term) {
        return;
    }
    if seen.insert(term.to_string()) {
        out.push(term.to_string());
    }
}
