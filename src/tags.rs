//! Tag resolution and document category inference.
//!
//! Both tables are fixed data: a topic tag expands into a multi-term query
//! plus filename hints, and a document's category is inferred from
//! substrings of its filename. First match wins in both tables.

/// Category assigned when no filename substring matches.
pub const DEFAULT_CATEGORY: &str = "기타";

/// `(tag, expanded query, filename hints)`.
const TAG_TABLE: &[(&str, &str, &[&str])] = &[
    ("요리", "요리 음식 메뉴 가격", &["음식", "건축"]),
    ("음식", "요리 음식 메뉴 가격", &["음식", "건축"]),
    ("건축", "건축 객잔 구조 기둥", &["음식", "건축"]),
    ("객잔", "객잔 주막 여관", &["객잔"]),
    ("무공", "무공 심법 초식 내공", &["무공_시스템"]),
    ("무기", "무기 병기 검 도 창", &["무기", "병기"]),
    ("병기", "무기 병기 검 도 창", &["무기", "병기"]),
    ("의복", "의복 복식 의상 옷", &["의복", "복식"]),
    ("지리", "지역 도시 산 강", &["지리"]),
    ("이동", "이동 경로 거리 리", &["이동", "동선"]),
    ("세력", "세력 문파 조직 파", &["세력도", "조직도"]),
    ("조직", "세력 문파 조직", &["조직도"]),
    ("인물", "캐릭터 인물 이름", &["캐릭터", "인명록"]),
    ("캐릭터", "캐릭터 인물", &["캐릭터", "인명록"]),
    ("경영", "경영 M&A 재무 ROI", &["경영"]),
    ("무협", "무협 용어 강호", &["무협_용어"]),
    ("로드맵", "로드맵 300화 일정", &["로드맵"]),
];

/// `(filename substring, category)`.
const CATEGORY_TABLE: &[(&str, &str)] = &[
    ("지리", "지리/지역"),
    ("객잔", "지리/객잔"),
    ("이동", "지리/이동"),
    ("음식", "생활/음식·건축"),
    ("건축", "생활/음식·건축"),
    ("의복", "생활/의복"),
    ("복식", "생활/의복"),
    ("무공", "무공/전투"),
    ("무기", "무공/병기"),
    ("병기", "무공/병기"),
    ("캐릭터", "인물"),
    ("인명록", "인물"),
    ("성장표", "인물/성장"),
    ("세력도", "세력/조직"),
    ("조직도", "세력/조직"),
    ("경영", "경영/용어"),
    ("무협", "무협/용어"),
    ("로드맵", "스토리/로드맵"),
    ("출연자", "스토리/출연자"),
    ("루트맵", "스토리/루트맵"),
    ("6하원칙", "템플릿/설계"),
    ("스켈레톤", "템플릿/뼈대"),
];

/// A tag resolved to a runnable query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery {
    pub query: String,
    pub doc_hints: Vec<String>,
}

/// Expand a topic tag into a query plus filename hints.
///
/// A leading `@` is stripped; an unrecognized tag is used verbatim as the
/// query with no hints.
pub fn resolve_tag(tag: &str) -> TagQuery {
    let tag = tag.trim().trim_start_matches('@').trim();

    for (name, query, hints) in TAG_TABLE {
        if *name == tag {
            return TagQuery {
                query: (*query).to_string(),
                doc_hints: hints.iter().map(|h| (*h).to_string()).collect(),
            };
        }
    }

    TagQuery {
        query: tag.to_string(),
        doc_hints: Vec::new(),
    }
}

/// Infer a document's category from its filename (extension stripped).
pub fn guess_category(doc_name: &str) -> &'static str {
    for (needle, category) in CATEGORY_TABLE {
        if doc_name.contains(needle) {
            return category;
        }
    }
    DEFAULT_CATEGORY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tag_expands() {
        let q = resolve_tag("@무공");
        assert_eq!(q.query, "무공 심법 초식 내공");
        assert_eq!(q.doc_hints, vec!["무공_시스템"]);
    }

    #[test]
    fn at_prefix_optional() {
        assert_eq!(resolve_tag("객잔"), resolve_tag("@객잔"));
    }

    #[test]
    fn unknown_tag_passes_through() {
        let q = resolve_tag("화산파");
        assert_eq!(q.query, "화산파");
        assert!(q.doc_hints.is_empty());
    }

    #[test]
    fn category_from_filename() {
        assert_eq!(guess_category("지리_상세"), "지리/지역");
        assert_eq!(guess_category("무공_기법_대전"), "무공/전투");
        assert_eq!(guess_category("경영_용어집"), "경영/용어");
    }

    #[test]
    fn first_match_wins() {
        // "지리_이동_DB" contains both 지리 and 이동; 지리 is listed first.
        assert_eq!(guess_category("지리_이동_DB"), "지리/지역");
    }

    #[test]
    fn unmatched_filename_is_other() {
        assert_eq!(guess_category("테마_주제의식"), DEFAULT_CATEGORY);
    }
}
