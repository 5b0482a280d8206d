//! Integration tests for the cardlayout pipeline.
//!
//! These tests exercise the public API end to end. They verify:
//! - Imports are deterministic and tolerate every supported shape
//! - Autosizing settles after one pass
//! - Templates replay geometry and keep card content
//! - Chunked persistence round-trips and fails closed
//! - Undo history is bounded and exact

use std::time::{Duration, Instant};

use cardlayout::autosize::autosize_card;
use cardlayout::config::Settings;
use cardlayout::font::FontContext;
use cardlayout::model::*;
use cardlayout::store::persist::{load_app_state, KeyValueStorage, MemoryStorage, Persister};
use cardlayout::store::{Action, AppState, ListId, Store};
use cardlayout::template::{apply_template, extract_template};
use cardlayout::text::MonoMeasure;
use cardlayout::CardError;
use serde_json::json;

// ─── Helpers ────────────────────────────────────────────────────

fn page() -> PageSize {
    PageSize::default()
}

fn import(value: serde_json::Value) -> Vec<Card> {
    cardlayout::normalize_json(&value.to_string(), &page()).unwrap()
}

fn sample_deck() -> serde_json::Value {
    json!({"verbs": [
        {
            "infinitive": "gehen",
            "tags": ["A1"],
            "translations": [{"ru": "идти", "ctx": "пешком"}, {"ru": "ходить"}],
            "forms": {"p3": "geht", "praet": "ging", "p2": "gegangen", "aux": "ist"},
            "examples": [{"de": "Ich gehe nach Hause.", "ru": "Я иду домой.", "tag": "A1"}]
        },
        {
            "infinitive": "machen",
            "translations": [{"value": "делать"}],
            "forms_aux": "hat",
            "synonyms": [{"de": "tun", "ru": "делать"}]
        },
        {
            "infinitive": "sehen",
            "freq": 4,
            "recommendations": [{"de": "fernsehen", "ru": "смотреть телевизор"}]
        }
    ]})
}

fn store_with(settings: Settings) -> Store {
    Store::new(AppState::with_settings(settings), Box::new(MonoMeasure::default()))
}

fn chunk_keys(storage: &MemoryStorage, list: &str) -> usize {
    let prefix = format!("cardlayout.cards.{}.", list);
    storage
        .keys()
        .filter(|k| k.starts_with(&prefix) && !k.ends_with(".meta"))
        .count()
}

// ─── Import Tests ───────────────────────────────────────────────

#[test]
fn test_minimal_array_import() {
    let cards = import(json!([{"id": "a1", "inf": "machen", "translations": [{"value": "to do"}]}]));
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].inf, "machen");
    assert!(!cards[0].boxes.is_empty());
    assert!((1..=5).contains(&cards[0].freq));
}

#[test]
fn test_verbs_import_resolves_forms_box() {
    let cards = import(json!({"verbs": [{
        "infinitive": "gehen",
        "translations": [{"ru": "to go"}],
        "forms": {"p3": "geht"}
    }]}));
    let card = &cards[0];
    assert_eq!(card.inf, "gehen");
    let texts: Vec<String> = card.boxes.iter().map(|b| b.resolve_text(card)).collect();
    assert!(texts.iter().any(|t| t == "geht"));
}

#[test]
fn test_aux_spelling_is_canonical() {
    let cards = import(json!([{"inf": "haben", "forms_aux": "hat"}]));
    assert_eq!(cards[0].forms.aux, "haben");
}

#[test]
fn test_import_is_deterministic() {
    let a = cardlayout::export_json(&import(sample_deck())).unwrap();
    let b = cardlayout::export_json(&import(sample_deck())).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_export_reimports_unchanged() {
    let cards = import(sample_deck());
    let exported = cardlayout::export_json(&cards).unwrap();
    let again = cardlayout::normalize_json(&exported, &page()).unwrap();
    assert_eq!(again, cards);
}

#[test]
fn test_unrecognized_payload_is_an_error() {
    let err = cardlayout::normalize_json(r#"{"words": {}}"#, &page()).unwrap_err();
    assert!(err.to_string().contains("Unrecognized import format"));
    let err = cardlayout::normalize_json("[1, 2,", &page()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse input"));
}

// ─── Autosize Tests ─────────────────────────────────────────────

#[test]
fn test_autosize_is_idempotent() {
    let fonts = FontContext::new();
    for card in import(sample_deck()) {
        let once = autosize_card(&card, &fonts).into_owned();
        let twice = autosize_card(&once, &fonts).into_owned();
        assert_eq!(once, twice);
    }
}

// ─── Template Tests ─────────────────────────────────────────────

#[test]
fn test_template_roundtrip_keeps_geometry() {
    for card in import(sample_deck()) {
        let template = extract_template(&card, &page());
        let applied = apply_template(&card, &template);
        assert_eq!(applied.boxes.len(), card.boxes.len());
        for (a, b) in applied.boxes.iter().zip(&card.boxes) {
            assert_eq!((a.x_mm, a.y_mm, a.w_mm, a.h_mm), (b.x_mm, b.y_mm, b.w_mm, b.h_mm));
        }
    }
}

#[test]
fn test_template_box_count_and_static_text() {
    let cards = import(sample_deck());
    let (source, mut target) = (cards[0].clone(), cards[2].clone());
    let mut note = CardBox::new("note", FieldId::Custom("note".into()), 80.0, 90.0, 30.0, 5.0);
    note.text_mode = Some(TextMode::Static);
    note.text = Some("Lernen!".into());
    target.boxes.push(note);

    let template = extract_template(&source, &page());
    let applied = apply_template(&target, &template);

    let consumed = target
        .boxes
        .iter()
        .filter(|b| applied.boxes[..template.boxes.len()].iter().any(|a| a.id == b.id))
        .count();
    assert_eq!(
        applied.boxes.len(),
        template.boxes.len() + target.boxes.len() - consumed
    );
    let kept = applied.boxes.iter().find(|b| b.id == "note").unwrap();
    assert_eq!(kept.text.as_deref(), Some("Lernen!"));
}

#[test]
fn test_template_apply_is_idempotent() {
    let cards = import(sample_deck());
    let mut target = cards[2].clone();
    let mut note = CardBox::new("note", FieldId::Custom("note".into()), 80.0, 90.0, 30.0, 5.0);
    note.text_mode = Some(TextMode::Static);
    note.text = Some("Lernen!".into());
    target.boxes.push(note);

    let template = extract_template(&cards[0], &page());
    let once = apply_template(&target, &template);
    let twice = apply_template(&once, &template);

    assert_eq!(twice.boxes.len(), once.boxes.len());
    for (a, b) in twice.boxes.iter().zip(&once.boxes) {
        assert_eq!(a.field_id, b.field_id);
        assert_eq!((a.x_mm, a.y_mm, a.w_mm, a.h_mm, a.z), (b.x_mm, b.y_mm, b.w_mm, b.h_mm, b.z));
    }
    assert_eq!(twice, once);
}

#[test]
fn test_template_json_through_public_api() {
    let deck = cardlayout::export_json(&import(sample_deck())).unwrap();
    let first_id = import(sample_deck())[0].id.clone();
    let template = cardlayout::extract_template_json(&deck, &first_id, &page()).unwrap();
    let out = cardlayout::apply_template_json(&deck, &template, Some(first_id.as_str())).unwrap();
    let cards = cardlayout::normalize_json(&out, &page()).unwrap();
    assert_eq!(cards.len(), 3);
    assert!(cardlayout::extract_template_json(&deck, "missing", &page()).is_err());
}

// ─── Persistence Tests ──────────────────────────────────────────

#[test]
fn test_multi_chunk_persistence_roundtrip() {
    let settings = Settings {
        chunk_chars: 512,
        ..Default::default()
    };
    let mut store = store_with(settings.clone());
    store
        .dispatch(Action::Import {
            list: ListId::Main,
            payload: sample_deck(),
            replace: false,
        })
        .unwrap();
    store
        .dispatch(Action::SetPageSize(PageSize::A5_LANDSCAPE))
        .unwrap();

    let mut storage = MemoryStorage::new();
    let mut persister = Persister::new(&settings);
    let t0 = Instant::now();
    persister.observe(&store, t0);
    assert!(!persister.tick(t0 + Duration::from_millis(100), store.state(), &mut storage));
    assert!(persister.tick(t0 + Duration::from_millis(450), store.state(), &mut storage));
    assert!(chunk_keys(&storage, "main") > 1);

    let loaded = load_app_state(&storage);
    assert_eq!(loaded.main, store.state().main);
    assert_eq!(loaded.page_size, PageSize::A5_LANDSCAPE);
    assert_eq!(loaded.settings, settings);

    storage.remove("cardlayout.cards.main.g0.1");
    let loaded = load_app_state(&storage);
    assert!(loaded.main.is_empty());
    assert_eq!(loaded.page_size, PageSize::A5_LANDSCAPE);
}

#[test]
fn test_failed_write_sets_sticky_warning() {
    let settings = Settings::default();
    let mut store = store_with(settings.clone());
    store
        .dispatch(Action::Import {
            list: ListId::Main,
            payload: sample_deck(),
            replace: false,
        })
        .unwrap();

    let mut persister = Persister::new(&settings);
    let mut tiny = MemoryStorage::with_quota(64);
    let err = persister.flush_now(store.state(), &mut tiny).unwrap_err();
    assert!(matches!(err, CardError::Storage(_)));
    assert!(persister.warning().is_some());

    let mut roomy = MemoryStorage::new();
    assert!(persister.flush_now(store.state(), &mut roomy).is_ok());
    assert!(persister.warning().is_some());
    assert!(roomy.get("cardlayout.state").is_some());
}

// ─── History Tests ──────────────────────────────────────────────

#[test]
fn test_undo_restores_each_snapshot() {
    let mut store = store_with(Settings::default());
    let mut before = Vec::new();
    for i in 0..10 {
        before.push(store.state().snapshot());
        store
            .dispatch(Action::AddCard {
                list: ListId::Main,
                card: Card::empty(format!("c{}", i)),
            })
            .unwrap();
    }
    for expected in before.iter().rev() {
        assert!(store.undo());
        assert_eq!(&store.state().snapshot(), expected);
    }
    assert!(!store.undo());
}

#[test]
fn test_history_evicts_oldest_after_limit() {
    let mut store = store_with(Settings::default());
    let mut before = Vec::new();
    for i in 0..51 {
        before.push(store.state().snapshot());
        store
            .dispatch(Action::AddCard {
                list: ListId::Buffer,
                card: Card::empty(format!("c{}", i)),
            })
            .unwrap();
    }
    assert_eq!(store.undo_depth(), 50);
    for _ in 0..50 {
        assert!(store.undo());
    }
    assert!(!store.undo());
    // The snapshot taken before the first mutation was evicted.
    assert_eq!(store.state().snapshot(), before[1]);
    assert_ne!(store.state().snapshot(), before[0]);
}
