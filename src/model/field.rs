//! Field identifiers.
//!
//! Every box on a card is bound to a [`FieldId`]. The identifier is a closed
//! enum rather than a string so that lookups into the card's fixed slot
//! arrays are checked once, at parse time. On the wire (boxes, templates,
//! persisted state) a field id is its string key, e.g. `tr_2_ru`.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const TRANSLATION_SLOTS: usize = 4;
pub const SYNONYM_SLOTS: usize = 3;
pub const EXAMPLE_SLOTS: usize = 5;
pub const RECOMMENDATION_SLOTS: usize = 5;

/// Which half of a translation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrPart {
    Ru,
    Ctx,
}

/// Which half of a German/Russian word pair (synonyms, recommendations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairPart {
    De,
    Ru,
}

/// Which part of an example triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExPart {
    De,
    Ru,
    Tag,
}

/// The verb forms a card carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// 3rd person singular present.
    P3,
    /// Präteritum.
    Prat,
    /// Partizip II.
    P2,
    /// Perfect auxiliary (`haben` / `sein`).
    Aux,
}

impl FormKind {
    pub const ALL: [FormKind; 4] = [FormKind::P3, FormKind::Prat, FormKind::P2, FormKind::Aux];

    fn key(self) -> &'static str {
        match self {
            FormKind::P3 => "forms_p3",
            FormKind::Prat => "forms_prat",
            FormKind::P2 => "forms_p2",
            FormKind::Aux => "forms_aux",
        }
    }
}

/// Canonical identifier of a card field or a synthetic aggregate.
///
/// Slot indices are 1-based, matching the wire keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldId {
    Inf,
    Title,
    Freq,
    Tags,
    /// Frequency dots plus tags on one line.
    Meta,
    Tr(u8, TrPart),
    /// One translation slot rendered as `ru (ctx)`.
    Translation(u8),
    Form(FormKind),
    /// All verb forms on one line.
    Forms,
    Syn(u8, PairPart),
    Synonym(u8),
    Ex(u8, ExPart),
    Example(u8),
    Rek(u8, PairPart),
    Recommendation(u8),
    Translations,
    Synonyms,
    Examples,
    Recommendations,
    /// Anything else: free text boxes, decorations, host-specific keys.
    Custom(String),
}

const CUSTOM_PREFIX: &str = "custom:";

impl FieldId {
    /// Parse a key. Known keys match case-insensitively. Never fails: unknown
    /// keys become [`FieldId::Custom`] with their original case, and a
    /// `custom:` prefix always yields one.
    pub fn parse(raw: &str) -> FieldId {
        let trimmed = raw.trim();
        let prefixed = trimmed
            .get(..CUSTOM_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(CUSTOM_PREFIX));
        if prefixed {
            return FieldId::Custom(trimmed[CUSTOM_PREFIX.len()..].to_string());
        }
        let key = trimmed.to_lowercase();
        match key.as_str() {
            "inf" | "infinitive" => return FieldId::Inf,
            "title" => return FieldId::Title,
            "freq" | "frequency" => return FieldId::Freq,
            "tags" => return FieldId::Tags,
            "meta" => return FieldId::Meta,
            "forms" => return FieldId::Forms,
            "forms_p3" => return FieldId::Form(FormKind::P3),
            "forms_prat" | "forms_praet" => return FieldId::Form(FormKind::Prat),
            "forms_p2" => return FieldId::Form(FormKind::P2),
            "forms_aux" => return FieldId::Form(FormKind::Aux),
            "translations" => return FieldId::Translations,
            "synonyms" => return FieldId::Synonyms,
            "examples" => return FieldId::Examples,
            "recommendations" => return FieldId::Recommendations,
            _ => {}
        }
        parse_slotted(&key).unwrap_or_else(|| FieldId::Custom(trimmed.to_string()))
    }

    /// The canonical string key.
    pub fn key(&self) -> String {
        match self {
            FieldId::Inf => "inf".to_string(),
            FieldId::Title => "title".to_string(),
            FieldId::Freq => "freq".to_string(),
            FieldId::Tags => "tags".to_string(),
            FieldId::Meta => "meta".to_string(),
            FieldId::Tr(i, TrPart::Ru) => format!("tr_{}_ru", i),
            FieldId::Tr(i, TrPart::Ctx) => format!("tr_{}_ctx", i),
            FieldId::Translation(i) => format!("tr_{}", i),
            FieldId::Form(kind) => kind.key().to_string(),
            FieldId::Forms => "forms".to_string(),
            FieldId::Syn(i, PairPart::De) => format!("syn_{}_de", i),
            FieldId::Syn(i, PairPart::Ru) => format!("syn_{}_ru", i),
            FieldId::Synonym(i) => format!("syn_{}", i),
            FieldId::Ex(i, ExPart::De) => format!("ex_{}_de", i),
            FieldId::Ex(i, ExPart::Ru) => format!("ex_{}_ru", i),
            FieldId::Ex(i, ExPart::Tag) => format!("ex_{}_tag", i),
            FieldId::Example(i) => format!("ex_{}", i),
            FieldId::Rek(i, PairPart::De) => format!("rek_{}_de", i),
            FieldId::Rek(i, PairPart::Ru) => format!("rek_{}_ru", i),
            FieldId::Recommendation(i) => format!("rek_{}", i),
            FieldId::Translations => "translations".to_string(),
            FieldId::Synonyms => "synonyms".to_string(),
            FieldId::Examples => "examples".to_string(),
            FieldId::Recommendations => "recommendations".to_string(),
            FieldId::Custom(key) => format!("{}{}", CUSTOM_PREFIX, key),
        }
    }

    /// Whether the field reads live card content. Section aggregates and
    /// custom keys are synthetic: their boxes show literal text.
    pub fn is_card_field(&self) -> bool {
        !matches!(
            self,
            FieldId::Meta
                | FieldId::Translations
                | FieldId::Synonyms
                | FieldId::Examples
                | FieldId::Recommendations
                | FieldId::Custom(_)
        )
    }

    /// Fields whose content naturally spans several lines.
    pub fn is_multiline(&self) -> bool {
        matches!(
            self,
            FieldId::Meta
                | FieldId::Tr(..)
                | FieldId::Translation(_)
                | FieldId::Forms
                | FieldId::Syn(..)
                | FieldId::Synonym(_)
                | FieldId::Ex(..)
                | FieldId::Example(_)
                | FieldId::Rek(..)
                | FieldId::Recommendation(_)
                | FieldId::Translations
                | FieldId::Synonyms
                | FieldId::Examples
                | FieldId::Recommendations
        )
    }

    /// Caption used when a static box for this field has to be created
    /// without any text to carry over.
    pub fn default_caption(&self) -> &'static str {
        match self {
            FieldId::Translations => "Translations",
            FieldId::Forms => "Forms",
            FieldId::Synonyms => "Synonyms",
            FieldId::Examples => "Examples",
            FieldId::Recommendations => "Recommendations",
            _ => "",
        }
    }
}

fn parse_slotted(key: &str) -> Option<FieldId> {
    let mut parts = key.split('_');
    let prefix = parts.next()?;
    let slot: u8 = parts.next()?.parse().ok()?;
    let part = parts.next();
    if parts.next().is_some() || slot == 0 {
        return None;
    }
    let max = match prefix {
        "tr" => TRANSLATION_SLOTS,
        "syn" => SYNONYM_SLOTS,
        "ex" => EXAMPLE_SLOTS,
        "rek" => RECOMMENDATION_SLOTS,
        _ => return None,
    };
    if slot as usize > max {
        return None;
    }
    let pair = |p: &str| match p {
        "de" => Some(PairPart::De),
        "ru" => Some(PairPart::Ru),
        _ => None,
    };
    match (prefix, part) {
        ("tr", None) => Some(FieldId::Translation(slot)),
        ("tr", Some("ru")) => Some(FieldId::Tr(slot, TrPart::Ru)),
        ("tr", Some("ctx")) => Some(FieldId::Tr(slot, TrPart::Ctx)),
        ("syn", None) => Some(FieldId::Synonym(slot)),
        ("syn", Some(p)) => pair(p).map(|p| FieldId::Syn(slot, p)),
        ("ex", None) => Some(FieldId::Example(slot)),
        ("ex", Some("de")) => Some(FieldId::Ex(slot, ExPart::De)),
        ("ex", Some("ru")) => Some(FieldId::Ex(slot, ExPart::Ru)),
        ("ex", Some("tag")) => Some(FieldId::Ex(slot, ExPart::Tag)),
        ("rek", None) => Some(FieldId::Recommendation(slot)),
        ("rek", Some(p)) => pair(p).map(|p| FieldId::Rek(slot, p)),
        _ => None,
    }
}

impl From<String> for FieldId {
    fn from(s: String) -> Self {
        FieldId::parse(&s)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        FieldId::parse(s)
    }
}

impl From<FieldId> for String {
    fn from(f: FieldId) -> Self {
        f.key()
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
