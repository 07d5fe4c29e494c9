//! Best-effort extraction of structured predictions from raw model text.
//!
//! Models were asked for fenced JSON, but in practice answer in whatever
//! shape they like: bare JSON, prose with a marker line, a plain yes/no. The
//! pipeline tries formats from most to least explicit and stops at the first
//! that yields an answer. Point-shaped tokens that do not resolve against the
//! query's scan metadata are kept as unresolved rather than dropped, so the
//! scorer can penalize hallucinated points distinctly from missing ones.

use crate::domain::point::ProgramPoint;
use crate::domain::prediction::{
    Extraction, SourcePrediction, StructuredPrediction, TracePrediction,
};
use crate::domain::query::{QueryInstance, QueryMode};
use crate::domain::scan::ScanRecord;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fence regex"))
}

/// Flat JSON object or array embedded in prose. Nested payloads arrive inside
/// fences and are handled by the fenced path.
fn bare_json_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{[^{}]*\}|\[[^\[\]]*\]").expect("bare json regex"))
}

/// Marker line introducing an enumerable answer.
fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?im)^\s*(?:final\s+answer|answer|sources|dependency\s+sources|dependencies|depends\s+on|chain|trace|path)\s*[:\-]\s*(.*)$",
        )
        .expect("marker regex")
    })
}

fn bullet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*]\s*(.+)$").expect("bullet regex"))
}

/// A single program-point reference: `12`, `L12`, `line 12`, `#12`.
fn point_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:l(?:ine)?\s*)?#?(\d+)\s*\.?\s*$").expect("point token regex")
    })
}

fn none_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:none|empty|no\s+(?:dependency\s+)?sources?)\b").expect("none regex")
    })
}

fn negation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:not\s+\w*\s*dependent|no\s+dependence|independent|false|no)\b")
            .expect("negation regex")
    })
}

fn affirmation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:dependent|yes|true)\b").expect("affirmation regex"))
}

/// Extract a structured prediction for `query` from `raw_text`. Never panics
/// and never returns an error: a response with no recognizable answer becomes
/// an `Extraction::Failure` carrying the raw text.
pub fn extract(raw_text: &str, query: &QueryInstance, scan: &ScanRecord) -> Extraction {
    match query.mode {
        QueryMode::Source => extract_sources(raw_text, scan),
        QueryMode::Trace => extract_trace(raw_text, scan),
    }
}

fn extract_sources(raw_text: &str, scan: &ScanRecord) -> Extraction {
    for value in json_candidates(raw_text) {
        if let Some(tokens) = sources_from_json(&value) {
            return Extraction::Prediction(StructuredPrediction::Sources(resolve_tokens(
                tokens, scan,
            )));
        }
    }

    if let Some(content) = marker_content(raw_text) {
        if none_regex().is_match(&content) {
            return Extraction::Prediction(StructuredPrediction::Sources(
                SourcePrediction::default(),
            ));
        }
        let tokens = lex_point_tokens(&content);
        if !tokens.is_empty() {
            return Extraction::Prediction(StructuredPrediction::Sources(resolve_tokens(
                tokens, scan,
            )));
        }
    }

    Extraction::failed(raw_text)
}

fn extract_trace(raw_text: &str, scan: &ScanRecord) -> Extraction {
    for value in json_candidates(raw_text) {
        if let Some((dependent, chain_tokens)) = trace_from_json(&value) {
            let (chain, chain_unresolved) = resolve_chain(chain_tokens, scan);
            return Extraction::Prediction(StructuredPrediction::Trace(TracePrediction {
                dependent,
                chain,
                chain_unresolved,
            }));
        }
    }

    // Plain-text classification; negations first, since "not dependent"
    // contains "dependent".
    let dependent = if negation_regex().is_match(raw_text) {
        Some(false)
    } else if affirmation_regex().is_match(raw_text) {
        Some(true)
    } else {
        None
    };

    if let Some(dependent) = dependent {
        let chain_tokens = marker_content(raw_text)
            .map(|content| lex_point_tokens(&content))
            .unwrap_or_default();
        let (chain, chain_unresolved) = resolve_chain(chain_tokens, scan);
        return Extraction::Prediction(StructuredPrediction::Trace(TracePrediction {
            dependent,
            chain,
            chain_unresolved,
        }));
    }

    Extraction::failed(raw_text)
}

/// Candidate JSON payloads, most explicit first: fenced blocks, then flat
/// bare objects/arrays. Within each class the last occurrence wins - models
/// restate their final answer last.
fn json_candidates(raw_text: &str) -> Vec<Value> {
    let mut candidates = Vec::new();
    let mut fenced: Vec<Value> = fence_regex()
        .captures_iter(raw_text)
        .filter_map(|cap| serde_json::from_str(cap.get(1)?.as_str().trim()).ok())
        .collect();
    fenced.reverse();
    candidates.extend(fenced);

    let mut bare: Vec<Value> = bare_json_regex()
        .find_iter(raw_text)
        .filter_map(|m| serde_json::from_str(m.as_str()).ok())
        .collect();
    bare.reverse();
    candidates.extend(bare);
    candidates
}

const SOURCE_KEYS: [&str; 6] = [
    "sources",
    "dependency_sources",
    "dependencies",
    "points",
    "lines",
    "answer",
];

fn sources_from_json(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items.iter().map(token_of_json).collect(),
        Value::Object(map) => {
            for key in SOURCE_KEYS {
                match map.get(key) {
                    Some(Value::Array(items)) => {
                        return items.iter().map(token_of_json).collect();
                    }
                    Some(Value::String(s)) => {
                        if none_regex().is_match(s) {
                            return Some(Vec::new());
                        }
                        let tokens = lex_point_tokens(s);
                        if !tokens.is_empty() {
                            return Some(tokens);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

const CLASSIFICATION_KEYS: [&str; 5] = ["dependent", "is_dependent", "dependency", "answer", "result"];
const CHAIN_KEYS: [&str; 4] = ["chain", "trace", "path", "justification"];

fn trace_from_json(value: &Value) -> Option<(bool, Vec<String>)> {
    match value {
        Value::Bool(b) => Some((*b, Vec::new())),
        Value::Object(map) => {
            let dependent = CLASSIFICATION_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(bool_of_json))?;
            let chain = CHAIN_KEYS
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(|v| match v {
                    Value::Array(items) => items.iter().map(token_of_json).collect(),
                    _ => None,
                })
                .unwrap_or_default();
            Some((dependent, chain))
        }
        _ => None,
    }
}

fn token_of_json(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => map.get("line").and_then(token_of_json),
        _ => None,
    }
}

fn bool_of_json(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => {
            if negation_regex().is_match(s) {
                Some(false)
            } else if affirmation_regex().is_match(s) {
                Some(true)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Content introduced by the last marker line: the remainder of that line,
/// or the bullet items directly following it when the line itself is empty.
fn marker_content(raw_text: &str) -> Option<String> {
    let cap = marker_regex().captures_iter(raw_text).last()?;
    let inline = cap.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    if !inline.is_empty() {
        return Some(inline.to_string());
    }
    let after = &raw_text[cap.get(0)?.end()..];
    let items: Vec<&str> = bullet_regex()
        .captures_iter(after)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}

/// Lex an enumerated answer into point tokens, stopping at the first item
/// that is not point-shaped (trailing commentary). A partial list is kept
/// rather than the whole answer discarded.
fn lex_point_tokens(content: &str) -> Vec<String> {
    static SEP: OnceLock<Regex> = OnceLock::new();
    let sep = SEP.get_or_init(|| Regex::new(r"(?i)\s*(?:,|;|\band\b)\s*").expect("separator regex"));

    let mut tokens = Vec::new();
    for item in sep.split(content) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if point_token_regex().is_match(item) {
            tokens.push(item.to_string());
        } else {
            break;
        }
    }
    tokens
}

fn parse_line_ref(token: &str) -> Option<u32> {
    point_token_regex()
        .captures(token)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Resolve tokens against the scan record: canonical points into the set,
/// hallucinated references into the unresolved list.
fn resolve_tokens(tokens: Vec<String>, scan: &ScanRecord) -> SourcePrediction {
    let mut points = BTreeSet::new();
    let mut unresolved = Vec::new();
    for token in tokens {
        match parse_line_ref(&token).and_then(|line| scan.resolve(line)) {
            Some(point) => {
                points.insert(point);
            }
            None => {
                if !unresolved.contains(&token) {
                    unresolved.push(token);
                }
            }
        }
    }
    SourcePrediction { points, unresolved }
}

fn resolve_chain(tokens: Vec<String>, scan: &ScanRecord) -> (Vec<ProgramPoint>, Vec<String>) {
    let mut chain = Vec::new();
    let mut unresolved = Vec::new();
    for token in tokens {
        match parse_line_ref(&token).and_then(|line| scan.resolve(line)) {
            Some(point) => chain.push(point),
            None => unresolved.push(token),
        }
    }
    (chain, unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge::DepKind;
    use crate::domain::point::ProgramPoint;
    use crate::domain::query::GoldAnswer;
    use crate::domain::scan::ScanPoint;
    use std::collections::BTreeSet;

    fn scan() -> ScanRecord {
        ScanRecord {
            file: "main.c".into(),
            function_name: "f".into(),
            function_start_line: 1,
            function_end_line: 50,
            statements: (1..=30).map(|line| ScanPoint { line, symbol: None }).collect(),
            definitions: vec![],
            uses: vec![],
            branches: vec![],
        }
    }

    fn query(mode: QueryMode) -> QueryInstance {
        QueryInstance {
            task: DepKind::Data,
            mode,
            language: "c".into(),
            program_id: "p1".into(),
            target: ProgramPoint::new("main.c", 20),
            candidate_source: (mode == QueryMode::Trace).then(|| ProgramPoint::new("main.c", 3)),
            gold: match mode {
                QueryMode::Source => GoldAnswer::Sources(BTreeSet::new()),
                QueryMode::Trace => GoldAnswer::Trace {
                    dependent: true,
                    chain: None,
                },
            },
        }
    }

    fn expect_sources(extraction: Extraction) -> SourcePrediction {
        match extraction {
            Extraction::Prediction(StructuredPrediction::Sources(p)) => p,
            other => panic!("expected source prediction, got {other:?}"),
        }
    }

    fn expect_trace(extraction: Extraction) -> TracePrediction {
        match extraction {
            Extraction::Prediction(StructuredPrediction::Trace(p)) => p,
            other => panic!("expected trace prediction, got {other:?}"),
        }
    }

    fn lines(pred: &SourcePrediction) -> Vec<u32> {
        pred.points.iter().map(|p| p.line).collect()
    }

    #[test]
    fn test_fenced_json_sources() {
        let raw = "Reasoning first.\n```json\n{\"sources\": [3, 7]}\n```\n";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3, 7]);
        assert!(pred.unresolved.is_empty());
    }

    #[test]
    fn test_fenced_json_without_tag_and_string_items() {
        let raw = "```\n{\"dependency_sources\": [\"L3\", \"line 7\"]}\n```";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3, 7]);
    }

    #[test]
    fn test_bare_json_array() {
        let raw = "The dependency sources are [3, 7] as shown above.";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3, 7]);
    }

    #[test]
    fn test_last_json_payload_wins() {
        let raw = "First guess: {\"sources\": [1]}\nOn reflection: {\"sources\": [3, 7]}";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3, 7]);
    }

    #[test]
    fn test_marker_list_with_trailing_commentary() {
        let raw = "Sources: L3, L7, and that is because of the loop carried flow.";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3, 7]);
    }

    #[test]
    fn test_marker_bullet_list() {
        let raw = "Answer:\n- L3\n- line 7\nThose are all.";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3, 7]);
    }

    #[test]
    fn test_marker_none_is_empty_prediction() {
        let raw = "Sources: none.";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert!(pred.points.is_empty());
        assert!(pred.unresolved.is_empty());
    }

    #[test]
    fn test_hallucinated_point_kept_unresolved() {
        // line 99 is outside the scan record
        let raw = "```json\n{\"sources\": [3, 99]}\n```";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3]);
        assert_eq!(pred.unresolved, vec!["99".to_string()]);
    }

    #[test]
    fn test_object_line_items() {
        let raw = "```json\n{\"sources\": [{\"line\": 3}, {\"line\": 7}]}\n```";
        let pred = expect_sources(extract(raw, &query(QueryMode::Source), &scan()));
        assert_eq!(lines(&pred), vec![3, 7]);
    }

    #[test]
    fn test_no_answer_is_extraction_failure() {
        let raw = "I am not sure how to approach this problem.";
        match extract(raw, &query(QueryMode::Source), &scan()) {
            Extraction::Failure(f) => assert_eq!(f.raw_text, raw),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_trace_fenced_json() {
        let raw = "```json\n{\"dependent\": true, \"chain\": [2, 5, 9]}\n```";
        let pred = expect_trace(extract(raw, &query(QueryMode::Trace), &scan()));
        assert!(pred.dependent);
        assert_eq!(pred.chain.iter().map(|p| p.line).collect::<Vec<_>>(), vec![2, 5, 9]);
    }

    #[test]
    fn test_trace_json_string_answer() {
        let raw = "{\"answer\": \"yes\", \"trace\": [\"L2\", \"L9\"]}";
        let pred = expect_trace(extract(raw, &query(QueryMode::Trace), &scan()));
        assert!(pred.dependent);
        assert_eq!(pred.chain.len(), 2);
    }

    #[test]
    fn test_trace_boolean_phrasing() {
        for raw in ["Yes, the target is dependent on the source.", "TRUE"] {
            let pred = expect_trace(extract(raw, &query(QueryMode::Trace), &scan()));
            assert!(pred.dependent, "{raw}");
        }
        for raw in [
            "No.",
            "The pair is not dependent.",
            "These statements are independent.",
            "false",
            "It is not control dependent on line 3.",
        ] {
            let pred = expect_trace(extract(raw, &query(QueryMode::Trace), &scan()));
            assert!(!pred.dependent, "{raw}");
        }
    }

    #[test]
    fn test_trace_chain_from_marker() {
        let raw = "Yes, it is dependent.\nChain: L2, L5, L9";
        let pred = expect_trace(extract(raw, &query(QueryMode::Trace), &scan()));
        assert!(pred.dependent);
        assert_eq!(pred.chain.iter().map(|p| p.line).collect::<Vec<_>>(), vec![2, 5, 9]);
    }

    #[test]
    fn test_trace_no_answer_fails() {
        match extract("Unclear.", &query(QueryMode::Trace), &scan()) {
            Extraction::Failure(_) => {}
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
