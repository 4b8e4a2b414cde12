//! Turning raw bibliography records into cleaned [`BibEntry`] values

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::RecordError;
use crate::parser::{self, RawField, RawRecord};
use crate::types::{BibEntry, Paper, UNTITLED};

/// A record the normalizer refused, by position in the input
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub index: usize,
    pub error: RecordError,
}

/// Result of normalizing a batch: the kept entries plus diagnostics for
/// every skipped record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub entries: Vec<BibEntry>,
    pub rejected: Vec<RejectedRecord>,
}

/// Read `.bib` text and normalize every entry
///
/// A syntax error anywhere in the input yields an empty list.
pub fn parse_bibtex_file(content: &str) -> Vec<BibEntry> {
    tracing::info!(bytes = content.len(), "parsing BibTeX");

    match parser::parse_records(content) {
        Ok(records) => {
            tracing::info!(count = records.len(), "read bibliography records");
            normalize_records(records)
        }
        Err(err) => {
            tracing::error!(error = %err, "error parsing BibTeX");
            Vec::new()
        }
    }
}

/// Normalize typed records
pub fn normalize_records(records: Vec<RawRecord>) -> Vec<BibEntry> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| normalize_record(index, record))
        .collect()
}

/// Normalize loosely typed records as handed over by an external parser
///
/// Records that are not objects or lack a field array are skipped and
/// reported in [`NormalizedBatch::rejected`].
pub fn normalize_json_records(records: &[JsonValue]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for (index, value) in records.iter().enumerate() {
        match raw_record_from_json(value) {
            Ok(record) => batch.entries.push(normalize_record(index, record)),
            Err(error) => {
                tracing::warn!(index, %error, "skipping invalid bibliography record");
                batch.rejected.push(RejectedRecord { index, error });
            }
        }
    }

    batch
}

/// Structural check of one loosely typed record
///
/// Field entries without a non-empty string name or without a value are
/// dropped; `null` values are kept.
pub fn raw_record_from_json(value: &JsonValue) -> Result<RawRecord, RecordError> {
    let object = value.as_object().ok_or(RecordError::NotAnObject)?;

    let fields = match object.get("fields") {
        None | Some(JsonValue::Null) => return Err(RecordError::MissingFields),
        Some(JsonValue::Array(fields)) => fields,
        Some(other) => return Err(RecordError::FieldsNotAList(json_kind(other))),
    };

    let fields = fields
        .iter()
        .filter_map(|field| {
            let field = field.as_object()?;
            let name = field.get("name")?.as_str().filter(|name| !name.is_empty())?;
            let value = field.get("value")?;
            Some(RawField {
                name: name.to_string(),
                value: value.clone(),
            })
        })
        .collect();

    Ok(RawRecord {
        key: object.get("key").and_then(JsonValue::as_str).map(str::to_string),
        entry_type: object
            .get("type")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
        fields,
    })
}

fn normalize_record(index: usize, record: RawRecord) -> BibEntry {
    // Later duplicates overwrite earlier ones
    let mut raw: BTreeMap<String, JsonValue> = BTreeMap::new();
    for field in record.fields {
        raw.insert(field.name.to_lowercase(), field.value);
    }

    let fields: BTreeMap<String, JsonValue> = raw
        .into_iter()
        .filter_map(|(name, value)| match value {
            JsonValue::String(text) => {
                clean_bibtex_string(&text).map(|cleaned| (name, JsonValue::String(cleaned)))
            }
            other => Some((name, other)),
        })
        .collect();

    let text = |name: &str| fields.get(name).and_then(JsonValue::as_str).map(str::to_string);
    let title = text("title")
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let mut entry = BibEntry {
        id: record
            .key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(generate_id),
        entry_type: Some(record.entry_type).filter(|ty| !ty.is_empty()),
        title,
        author: text("author"),
        year: text("year"),
        journal: text("journal"),
        booktitle: text("booktitle"),
        url: text("url"),
        doi: text("doi"),
        fields,
    };

    // Keep `fields` in the shape the flat JSON form reads back
    entry.fields.remove("id");
    entry
        .fields
        .insert("title".to_string(), JsonValue::String(entry.title.clone()));

    tracing::debug!(
        index,
        id = %entry.id,
        entry_type = entry.entry_type.as_deref().unwrap_or(""),
        fields = entry.fields.len(),
        "normalized bibliography entry"
    );
    entry
}

/// Strip enclosing brace groups and collapse whitespace
///
/// Outer braces are removed only while the whole string is one balanced
/// group, so `{{Nested}}` becomes `Nested` but `{Foo} {Bar}` is kept.
/// Escaped braces count like any other brace. Returns `None` for an empty
/// input.
pub fn clean_bibtex_string(raw: &str) -> Option<String> {
    static RE_WHITESPACE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

    if raw.is_empty() {
        return None;
    }

    let mut cleaned = raw.trim();
    while cleaned.len() > 2
        && cleaned.starts_with('{')
        && cleaned.ends_with('}')
        && is_single_group(cleaned)
    {
        cleaned = cleaned[1..cleaned.len() - 1].trim();
    }

    Some(RE_WHITESPACE.replace_all(cleaned, " ").trim().to_string())
}

/// True when the brace depth first returns to zero at the final byte
fn is_single_group(s: &str) -> bool {
    let last = s.len() - 1;
    let mut depth: i64 = 0;

    for (i, b) in s.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
        if depth == 0 && i < last {
            return false;
        }
    }

    depth == 0
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short display identifier: random base-36 fragment plus base-36 timestamp
///
/// Unlikely to collide within a session; not a persistent identity.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let mut id: String = (0..7)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();

    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    id.push_str(&to_base36(millis));
    id
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&d| d as char).collect()
}

/// Wrap an entry as a paper, generating an id if it has none
pub fn bib_entry_to_paper(mut entry: BibEntry) -> Paper {
    if entry.id.is_empty() {
        entry.id = generate_id();
    }
    Paper {
        entry,
        teaser_image: None,
        annotation: None,
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clean(s: &str) -> String {
        clean_bibtex_string(s).unwrap()
    }

    #[test]
    fn test_strips_single_enclosing_group() {
        assert_eq!(clean("{Hello World}"), "Hello World");
        assert_eq!(clean("  {  Hello   World }  "), "Hello World");
    }

    #[test]
    fn test_keeps_sibling_groups() {
        assert_eq!(clean("{Foo} {Bar}"), "{Foo} {Bar}");
        assert_eq!(clean("{Foo} and {Bar}"), "{Foo} and {Bar}");
    }

    #[test]
    fn test_strips_nested_groups() {
        assert_eq!(clean("{{Nested}}"), "Nested");
        assert_eq!(clean("{ { {Deep} } }"), "Deep");
        // Stops once the remainder is no longer a single group
        assert_eq!(clean("{{A} {B}}"), "{A} {B}");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(clean("a   b\tc"), "a b c");
        assert_eq!(clean("line\n  break"), "line break");
    }

    #[test]
    fn test_short_and_unbalanced_inputs() {
        assert_eq!(clean("{}"), "{}");
        assert_eq!(clean("{x}"), "x");
        assert_eq!(clean("{unbalanced"), "{unbalanced");
        assert_eq!(clean("{a}}"), "{a}}");
        assert_eq!(clean("   "), "");
        assert_eq!(clean_bibtex_string(""), None);
    }

    #[test]
    fn test_escaped_braces_are_counted() {
        assert_eq!(clean(r"{\{x}"), r"{\{x}");
        assert_eq!(clean(r"{\{x\}}"), r"\{x\}");
    }

    #[test]
    fn test_end_to_end_record() {
        let records = vec![json!({
            "key": "a1",
            "type": "article",
            "fields": [
                {"name": "title", "value": "{My Paper}"},
                {"name": "year", "value": "2023"}
            ]
        })];

        let batch = normalize_json_records(&records);
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.entries.len(), 1);

        let entry = &batch.entries[0];
        assert_eq!(entry.id, "a1");
        assert_eq!(entry.title, "My Paper");
        assert_eq!(entry.year.as_deref(), Some("2023"));
        assert_eq!(entry.entry_type.as_deref(), Some("article"));

        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["id"], "a1");
        assert_eq!(json["title"], "My Paper");
        assert_eq!(json["year"], "2023");
        assert!(json.get("author").is_none());
    }

    #[test]
    fn test_missing_title_defaults() {
        let entries = normalize_records(vec![RawRecord::new("k", "misc").with_field("year", "2020")]);
        assert_eq!(entries[0].title, "Untitled");

        let entries = normalize_records(vec![RawRecord::new("k", "misc").with_field("title", "{ }")]);
        assert_eq!(entries[0].title, "Untitled");
    }

    #[test]
    fn test_duplicate_field_keeps_last() {
        let record = RawRecord::new("dup", "article")
            .with_field("author", "First Author")
            .with_field("AUTHOR", "Second Author");

        let entries = normalize_records(vec![record]);
        assert_eq!(entries[0].author.as_deref(), Some("Second Author"));
        assert_eq!(entries[0].field_str("author"), Some("Second Author"));
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let records = vec![
            json!({"key": "bad", "type": "article", "fields": {"title": "not a list"}}),
            json!("just a string"),
            json!({"key": "nofields", "type": "misc"}),
            json!({"key": "good", "type": "misc", "fields": [{"name": "title", "value": "Kept"}]}),
        ];

        let batch = normalize_json_records(&records);
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].id, "good");
        assert_eq!(
            batch.rejected,
            vec![
                RejectedRecord { index: 0, error: RecordError::FieldsNotAList("object") },
                RejectedRecord { index: 1, error: RecordError::NotAnObject },
                RejectedRecord { index: 2, error: RecordError::MissingFields },
            ]
        );
    }

    #[test]
    fn test_generic_fields_survive() {
        let record = RawRecord::new("n", "book")
            .with_field("Note", "  {Reprinted   in 2001}  ")
            .with_field("Series", "  {ACM}  Press ")
            .with_field("doi", "10.1145/1234");

        let entry = &normalize_records(vec![record])[0];
        assert_eq!(entry.field_str("note"), Some("Reprinted in 2001"));
        assert_eq!(entry.field_str("series"), Some("{ACM} Press"));
        assert_eq!(entry.doi.as_deref(), Some("10.1145/1234"));

        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["note"], "Reprinted in 2001");
        assert_eq!(json["series"], "{ACM} Press");
        assert_eq!(json["doi"], "10.1145/1234");
    }

    #[test]
    fn test_normalized_entry_survives_json_round_trip() {
        let records = vec![json!({
            "key": "k",
            "type": "misc",
            "fields": [
                {"name": "year", "value": "2020"},
                {"name": "id", "value": "shadow"},
                {"name": "pages", "value": 12}
            ]
        })];
        let entry = normalize_json_records(&records).entries.remove(0);
        assert_eq!(entry.title, "Untitled");
        assert_eq!(entry.field_str("title"), Some("Untitled"));
        assert!(entry.field("id").is_none());

        let json = serde_json::to_value(&entry).unwrap();
        let back: BibEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_non_string_values_pass_through() {
        let records = vec![json!({
            "key": "x",
            "type": "misc",
            "fields": [
                {"name": "year", "value": 2023},
                {"name": "tags", "value": ["hci", "llm"]},
                {"name": "extra", "value": null},
                {"name": "empty", "value": ""},
                {"name": "novalue"},
                {"name": "", "value": "nameless"}
            ]
        })];

        let entry = &normalize_json_records(&records).entries[0];
        assert_eq!(entry.year, None);
        assert_eq!(entry.field("year"), Some(&json!(2023)));
        assert_eq!(entry.field("tags"), Some(&json!(["hci", "llm"])));
        assert_eq!(entry.field("extra"), Some(&JsonValue::Null));
        assert!(entry.field("empty").is_none());
        assert!(entry.field("novalue").is_none());
        assert_eq!(entry.field_str("title"), Some("Untitled"));
        assert_eq!(entry.fields.len(), 4);

        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["year"], 2023);
    }

    #[test]
    fn test_missing_key_generates_id() {
        let mut record = RawRecord::new("", "misc").with_field("title", "Anonymous");
        let entry = &normalize_records(vec![record.clone()])[0];
        assert!(!entry.id.is_empty());

        record.key = None;
        let entry = &normalize_records(vec![record])[0];
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_generate_id_shape() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(a.len() > 7);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn test_parse_bibtex_file() {
        let input = r#"
            @inproceedings{lee2024,
              title     = {{DirectGPT}: A Direct Manipulation Interface},
              author    = {Masson, Damien and   Malacria, Sylvain},
              booktitle = {Proceedings of the {CHI} Conference},
              year      = {2024},
              note      = {Best paper}
            }
        "#;

        let entries = parse_bibtex_file(input);
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.id, "lee2024");
        assert_eq!(entry.title, "{DirectGPT}: A Direct Manipulation Interface");
        assert_eq!(entry.author.as_deref(), Some("Masson, Damien and Malacria, Sylvain"));
        assert_eq!(entry.booktitle.as_deref(), Some("Proceedings of the {CHI} Conference"));
        assert_eq!(entry.field_str("note"), Some("Best paper"));
    }

    #[test]
    fn test_parse_bibtex_file_syntax_error_is_empty() {
        let input = "@article{ok, title = {Fine}}\n@article{broken, title = {oops";
        assert!(parse_bibtex_file(input).is_empty());
    }

    #[test]
    fn test_bib_entry_to_paper_keeps_id() {
        let entry = normalize_records(vec![RawRecord::new("p1", "article")]).remove(0);
        let paper = bib_entry_to_paper(entry);
        assert_eq!(paper.id(), "p1");
        assert!(paper.annotation.is_none());
    }
}
