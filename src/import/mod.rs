//! # Canonical Normalizer
//!
//! Turns whatever JSON a user drops into the editor into canonical
//! [`Card`]s. Three payload shapes are recognised:
//!
//! ```text
//! [ {...}, {...} ]            → array
//! { "cards": [ ... ] }        → cards   (also our own export format)
//! { "verbs": [ ... ] }        → verbs
//! { "data":  [ ... ] }        → verbs
//! ```
//!
//! Anything else is rejected with a diagnostic naming the root type and its
//! keys. Inside an entry nothing is ever rejected: values of the wrong type
//! fall back to defaults, so one sloppy field never loses a whole import.
//!
//! Normalization is pure. Ids that are not supplied are derived from a hash
//! of the entry, and generated boxes have deterministic ids, so importing the
//! same file twice yields identical cards.

mod coerce;

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::layout::generate_layout;
use crate::model::field::{EXAMPLE_SLOTS, TRANSLATION_SLOTS};
use crate::model::{
    Card, CardBox, Example, ImportSchema, PageSize, Provenance, Translation, VerbForms, WordPair,
};
use crate::CardError;

use coerce::{coerce_box, coerce_freq, coerce_string, coerce_tags, first_string};

/// Classify the root of an import payload.
pub fn detect_schema(root: &Value) -> ImportSchema {
    match root {
        Value::Array(_) => ImportSchema::Array,
        Value::Object(map) => {
            if map.get("cards").is_some_and(Value::is_array) {
                ImportSchema::Cards
            } else if map.get("verbs").is_some_and(Value::is_array)
                || map.get("data").is_some_and(Value::is_array)
            {
                ImportSchema::Verbs
            } else {
                ImportSchema::Unknown
            }
        }
        _ => ImportSchema::Unknown,
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn entries<'a>(root: &'a Value, schema: ImportSchema) -> &'a [Value] {
    let list = match schema {
        ImportSchema::Array => Some(root),
        ImportSchema::Cards => root.get("cards"),
        ImportSchema::Verbs => root
            .get("verbs")
            .filter(|v| v.is_array())
            .or_else(|| root.get("data")),
        ImportSchema::Unknown => None,
    };
    list.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// Parse JSON text and normalize it.
pub fn import_json(text: &str, page: &PageSize) -> Result<Vec<Card>, CardError> {
    let root: Value = serde_json::from_str(text)?;
    normalize_import(&root, page)
}

/// Normalize a parsed import payload into canonical cards.
pub fn normalize_import(root: &Value, page: &PageSize) -> Result<Vec<Card>, CardError> {
    let schema = detect_schema(root);
    if schema == ImportSchema::Unknown {
        let keys = root
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        return Err(CardError::UnrecognizedImport {
            root_type: json_type_name(root).to_string(),
            keys,
        });
    }

    let mut seen = HashSet::new();
    let cards: Vec<Card> = entries(root, schema)
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let mut card = normalize_entry(raw, schema, index, page);
            card.id = unique_id(&card.id, &mut seen);
            card
        })
        .collect();

    tracing::info!("Imported {} cards ({} schema)", cards.len(), schema.as_str());
    Ok(cards)
}

/// Suffix `_2`, `_3`, ... until the id is unused in this import.
fn unique_id(id: &str, seen: &mut HashSet<String>) -> String {
    if seen.insert(id.to_string()) {
        return id.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", id, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// FNV-1a over the compact JSON text, rendered in base 36.
pub fn entry_hash(raw: &Value) -> String {
    let text = serde_json::to_string(raw).unwrap_or_default();
    let mut hash: u32 = 0x811c_9dc5;
    for byte in text.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    to_base36(hash)
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Normalize a single raw entry.
pub fn normalize_entry(raw: &Value, schema: ImportSchema, index: usize, page: &PageSize) -> Card {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => format!("import_{}_{}_{}", schema.as_str(), index + 1, entry_hash(raw)),
    };

    let mut card = Card::empty(id);
    card.inf = first_string(obj, &["inf", "infinitive", "verb", "word"]);
    card.title = coerce_string(obj.get("title"));
    if card.title.trim().is_empty() && !card.inf.trim().is_empty() {
        card.title = card.inf.clone();
    }
    card.freq = coerce_freq(obj.get("freq").or_else(|| obj.get("frequency")));
    card.tags = coerce_tags(obj.get("tags"));
    card.translations = read_translations(obj);
    card.forms = read_forms(obj);
    card.synonyms = read_pairs(obj, &["synonyms", "syn"], "syn");
    card.examples = read_examples(obj);
    card.recommendations = read_pairs(obj, &["recommendations", "rek"], "rek");

    let boxes = read_boxes(obj.get("boxes"));
    card.boxes = if boxes.is_empty() {
        generate_layout(&card, page)
    } else {
        boxes
    };

    // Re-imported exports keep the provenance of their first import.
    let carried = obj
        .get("_import")
        .and_then(|p| serde_json::from_value::<Provenance>(p.clone()).ok());
    card.provenance = Some(carried.unwrap_or_else(|| Provenance {
        raw: raw.clone(),
        schema,
        index,
    }));
    card
}

/// The list under any of `keys`, if it is an array.
fn list<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn read_translations(obj: &Map<String, Value>) -> [Translation; TRANSLATION_SLOTS] {
    let items = list(obj, &["translations", "tr"]);
    std::array::from_fn(|i| {
        let slot = i + 1;
        let (mut ru, mut ctx) = match items.get(i) {
            Some(Value::Object(item)) => (
                first_string(item, &["ru", "value", "text", "translation"]),
                first_string(item, &["ctx", "context"]),
            ),
            Some(other) => (coerce_string(Some(other)), String::new()),
            None => (String::new(), String::new()),
        };
        if ru.is_empty() {
            ru = coerce_string(obj.get(&format!("tr_{}_ru", slot)));
        }
        if ctx.is_empty() {
            ctx = coerce_string(obj.get(&format!("tr_{}_ctx", slot)));
        }
        Translation { ru, ctx }
    })
}

fn read_forms(obj: &Map<String, Value>) -> VerbForms {
    let empty = Map::new();
    let nested = obj.get("forms").and_then(Value::as_object).unwrap_or(&empty);
    let pick = |nested_keys: &[&str], flat_key: &str| {
        let value = first_string(nested, nested_keys);
        if value.is_empty() {
            coerce_string(obj.get(flat_key))
        } else {
            value
        }
    };
    VerbForms {
        p3: pick(&["p3"], "forms_p3"),
        prat: {
            let v = pick(&["prat", "praet", "preterite"], "forms_prat");
            if v.is_empty() {
                coerce_string(obj.get("forms_praet"))
            } else {
                v
            }
        },
        p2: pick(&["p2", "partizip2"], "forms_p2"),
        aux: canonical_aux(&pick(&["aux"], "forms_aux")),
    }
}

/// Map auxiliary spellings onto the infinitives `haben` / `sein`.
pub fn canonical_aux(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();
    let haben = words.iter().any(|w| matches!(*w, "hat" | "haben"));
    let sein = words.iter().any(|w| matches!(*w, "ist" | "sein"));
    match (haben, sein) {
        (true, true) => "haben/sein".to_string(),
        (true, false) => "haben".to_string(),
        (false, true) => "sein".to_string(),
        (false, false) => raw.trim().to_string(),
    }
}

fn read_pairs<const N: usize>(
    obj: &Map<String, Value>,
    list_keys: &[&str],
    flat_prefix: &str,
) -> [WordPair; N] {
    let items = list(obj, list_keys);
    std::array::from_fn(|i| {
        let slot = i + 1;
        let (mut de, mut ru) = match items.get(i) {
            Some(Value::Object(item)) => (
                first_string(item, &["de", "word", "value"]),
                first_string(item, &["ru", "translation"]),
            ),
            Some(other) => (coerce_string(Some(other)), String::new()),
            None => (String::new(), String::new()),
        };
        if de.is_empty() {
            de = coerce_string(obj.get(&format!("{}_{}_de", flat_prefix, slot)));
        }
        if ru.is_empty() {
            ru = coerce_string(obj.get(&format!("{}_{}_ru", flat_prefix, slot)));
        }
        WordPair { de, ru }
    })
}

fn read_examples(obj: &Map<String, Value>) -> [Example; EXAMPLE_SLOTS] {
    let items = list(obj, &["examples", "ex"]);
    std::array::from_fn(|i| {
        let slot = i + 1;
        let (mut de, mut ru, mut tag) = match items.get(i) {
            Some(Value::Object(item)) => (
                first_string(item, &["de", "text", "sentence"]),
                first_string(item, &["ru", "translation"]),
                first_string(item, &["tag", "level"]),
            ),
            Some(other) => (coerce_string(Some(other)), String::new(), String::new()),
            None => (String::new(), String::new(), String::new()),
        };
        if de.is_empty() {
            de = coerce_string(obj.get(&format!("ex_{}_de", slot)));
        }
        if ru.is_empty() {
            ru = coerce_string(obj.get(&format!("ex_{}_ru", slot)));
        }
        if tag.is_empty() {
            tag = coerce_string(obj.get(&format!("ex_{}_tag", slot)));
        }
        Example { de, ru, tag }
    })
}

fn read_boxes(raw: Option<&Value>) -> Vec<CardBox> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| coerce_box(item, i))
        .map(|mut b| {
            b.id = unique_id(&b.id, &mut seen);
            b
        })
        .collect()
}

/// Wrap cards in the `{cards: [...]}` export envelope.
pub fn export_cards(cards: &[Card]) -> Result<Value, CardError> {
    let list = serde_json::to_value(cards).map_err(CardError::Serialize)?;
    let mut root = Map::new();
    root.insert("cards".to_string(), list);
    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldId, FormKind};
    use serde_json::json;

    fn import(v: Value) -> Vec<Card> {
        normalize_import(&v, &PageSize::default()).unwrap()
    }

    #[test]
    fn detects_schemas() {
        assert_eq!(detect_schema(&json!([])), ImportSchema::Array);
        assert_eq!(detect_schema(&json!({"cards": []})), ImportSchema::Cards);
        assert_eq!(detect_schema(&json!({"verbs": []})), ImportSchema::Verbs);
        assert_eq!(detect_schema(&json!({"data": []})), ImportSchema::Verbs);
        assert_eq!(detect_schema(&json!({"cards": {}})), ImportSchema::Unknown);
        assert_eq!(detect_schema(&json!("x")), ImportSchema::Unknown);
    }

    #[test]
    fn unknown_root_fails_with_keys() {
        let err = normalize_import(&json!({"foo": 1, "bar": []}), &PageSize::default()).unwrap_err();
        match err {
            CardError::UnrecognizedImport { root_type, keys } => {
                assert_eq!(root_type, "object");
                assert_eq!(keys, vec!["bar".to_string(), "foo".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        let err = normalize_import(&json!(42), &PageSize::default()).unwrap_err();
        assert!(err.to_string().contains("root is number"));
    }

    #[test]
    fn machen_scenario() {
        let cards = import(json!([{"id": "a1", "inf": "machen", "translations": [{"value": "to do"}]}]));
        assert_eq!(cards.len(), 1);
        let card = &cards[0];
        assert_eq!(card.id, "a1");
        assert_eq!(card.inf, "machen");
        assert_eq!(card.title, "machen");
        assert_eq!(card.translations[0].ru, "to do");
        assert!(!card.boxes.is_empty());
        assert!((1..=5).contains(&card.freq));
    }

    #[test]
    fn gehen_scenario() {
        let cards = import(json!({"verbs": [{
            "infinitive": "gehen",
            "translations": [{"ru": "to go"}],
            "forms": {"p3": "geht"}
        }]}));
        let card = &cards[0];
        assert_eq!(card.inf, "gehen");
        assert!(card.id.starts_with("import_verbs_1_"));
        let forms_box = card
            .boxes
            .iter()
            .find(|b| b.field_id == FieldId::Form(FormKind::P3))
            .expect("forms box");
        assert_eq!(forms_box.resolve_text(card), "geht");
    }

    #[test]
    fn aux_is_canonicalized() {
        let cards = import(json!([{"forms_aux": "hat"}, {"forms": {"aux": "ist"}}, {"forms_aux": "hat/ist"}]));
        assert_eq!(cards[0].forms.aux, "haben");
        assert_eq!(cards[1].forms.aux, "sein");
        assert_eq!(cards[2].forms.aux, "haben/sein");
        assert_eq!(canonical_aux("  wird "), "wird");
    }

    #[test]
    fn derived_ids_are_stable() {
        let raw = json!([{"inf": "lesen", "freq": 4}]);
        let a = import(raw.clone());
        let b = import(raw);
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn coerces_bad_values() {
        let cards = import(json!([{
            "id": "",
            "inf": 42,
            "freq": "9",
            "tags": "a, b; a",
            "translations": ["eins", null, {"ru": ["x"]}],
            "title": null
        }]));
        let card = &cards[0];
        assert!(card.id.starts_with("import_array_1_"));
        assert_eq!(card.inf, "42");
        assert_eq!(card.freq, 5);
        assert_eq!(card.tags, vec!["a", "b"]);
        assert_eq!(card.translations[0].ru, "eins");
        assert_eq!(card.translations[1].ru, "");
        assert_eq!(card.translations[2].ru, "");
        assert_eq!(card.title, "42");
    }

    #[test]
    fn flat_keys_are_read() {
        let cards = import(json!([{
            "inf": "kommen",
            "tr_2_ru": "приходить",
            "tr_2_ctx": "сюда",
            "syn_1_de": "ankommen",
            "ex_3_de": "Komm her!",
            "ex_3_tag": "A1",
            "rek_5_ru": "совет",
            "forms_praet": "kam"
        }]));
        let card = &cards[0];
        assert_eq!(card.translations[1].ru, "приходить");
        assert_eq!(card.translations[1].ctx, "сюда");
        assert_eq!(card.synonyms[0].de, "ankommen");
        assert_eq!(card.examples[2].de, "Komm her!");
        assert_eq!(card.examples[2].tag, "A1");
        assert_eq!(card.recommendations[4].ru, "совет");
        assert_eq!(card.forms.prat, "kam");
    }

    #[test]
    fn duplicate_ids_are_suffixed() {
        let cards = import(json!([{"id": "x"}, {"id": "x"}, {"id": "x"}]));
        let ids: Vec<_> = cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "x_2", "x_3"]);
    }

    #[test]
    fn existing_boxes_are_kept() {
        let cards = import(json!({"cards": [{
            "id": "c",
            "inf": "sehen",
            "boxes": [
                {"id": "b1", "fieldId": "inf", "xMm": 5, "yMm": 5, "wMm": 50, "hMm": 10},
                "garbage",
                {"fieldId": "tr_1", "xMm": 5, "yMm": 20, "wMm": -3, "hMm": 0}
            ]
        }]}));
        let boxes = &cards[0].boxes;
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].id, "b1");
        assert_eq!(boxes[1].field_id, FieldId::Translation(1));
        assert!(boxes[1].w_mm > 0.0 && boxes[1].h_mm > 0.0);
    }

    #[test]
    fn provenance_is_attached() {
        let raw = json!({"id": "p", "inf": "tun", "extra": true});
        let cards = import(json!([raw.clone()]));
        let prov = cards[0].provenance.as_ref().unwrap();
        assert_eq!(prov.raw, raw);
        assert_eq!(prov.schema, ImportSchema::Array);
        assert_eq!(prov.index, 0);
    }

    #[test]
    fn export_reimports_to_equal_cards() {
        let cards = import(json!([{"id": "e", "inf": "essen", "tags": ["food"],
            "examples": [{"de": "Ich esse.", "ru": "Я ем.", "tag": "A1"}]}]));
        let exported = export_cards(&cards).unwrap();
        let again = normalize_import(&exported, &PageSize::default()).unwrap();
        assert_eq!(again[0], cards[0]);
        assert_eq!(again[0].provenance.as_ref().unwrap().schema, ImportSchema::Array);
    }

    #[test]
    fn base36_hash() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(entry_hash(&json!({"a": 1})), entry_hash(&json!({"a": 1})));
        assert_ne!(entry_hash(&json!({"a": 1})), entry_hash(&json!({"a": 2})));
    }
}
