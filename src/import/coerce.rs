//! Lenient conversions from raw JSON values to canonical field types.
//!
//! None of these fail. A value of the wrong type becomes the field's default.

use serde_json::{Map, Value};

use crate::model::{BoxStyle, CardBox, FieldId, TextAlign, TextMode, DEFAULT_FREQ};

const DEFAULT_BOX_W_MM: f64 = 40.0;
const DEFAULT_BOX_H_MM: f64 = 6.0;

/// Strings pass through, numbers and booleans are stringified, everything
/// else is "".
pub fn coerce_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// The first non-empty string among `keys`.
pub fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| coerce_string(obj.get(*k)))
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

/// A finite number, from a JSON number or a numeric string.
pub fn coerce_number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn coerce_bool(v: Option<&Value>) -> Option<bool> {
    match v? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Frequency rating rounded and clamped into `1..=5`.
pub fn coerce_freq(v: Option<&Value>) -> u8 {
    match coerce_number(v) {
        Some(n) => n.round().clamp(1.0, 5.0) as u8,
        None => DEFAULT_FREQ,
    }
}

/// Tags from an array or a comma/semicolon separated string. Trimmed,
/// empties dropped, first occurrence wins.
pub fn coerce_tags(v: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match v {
        Some(Value::Array(items)) => items.iter().map(|i| coerce_string(Some(i))).collect(),
        Some(Value::String(s)) => s.split([',', ';']).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn optional_string(v: Option<&Value>) -> Option<String> {
    match v {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn positive(v: Option<&Value>) -> Option<f64> {
    coerce_number(v).filter(|n| *n > 0.0)
}

fn coerce_style(v: Option<&Value>) -> BoxStyle {
    let defaults = BoxStyle::default();
    let Some(obj) = v.and_then(Value::as_object) else {
        return defaults;
    };
    let align = match obj.get("align").and_then(Value::as_str) {
        Some("center") => TextAlign::Center,
        Some("right") => TextAlign::Right,
        _ => TextAlign::Left,
    };
    let font_weight = match obj.get("fontWeight") {
        Some(Value::String(s)) if s.eq_ignore_ascii_case("bold") => 700,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("normal") => 400,
        other => coerce_number(other)
            .map(|n| n.round() as u32)
            .unwrap_or(defaults.font_weight),
    };
    BoxStyle {
        font_family: optional_string(obj.get("fontFamily"))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.font_family),
        font_size: positive(obj.get("fontSize")).unwrap_or(defaults.font_size),
        font_weight,
        italic: coerce_bool(obj.get("italic")).unwrap_or(false),
        align,
        line_height: positive(obj.get("lineHeight")).unwrap_or(defaults.line_height),
        padding_mm: coerce_number(obj.get("paddingMm"))
            .filter(|n| *n >= 0.0)
            .unwrap_or(defaults.padding_mm),
        border: coerce_bool(obj.get("border")).unwrap_or(false),
        visible: coerce_bool(obj.get("visible")).unwrap_or(true),
    }
    .sanitized()
}

/// Coerce one raw box. Non-objects and boxes without a field binding are
/// dropped.
pub fn coerce_box(v: &Value, index: usize) -> Option<CardBox> {
    let obj = v.as_object()?;
    let field_raw = first_string(obj, &["fieldId", "field"]);
    if field_raw.trim().is_empty() {
        return None;
    }
    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => format!("box_{}", index + 1),
    };

    let mut b = CardBox::new(
        id,
        FieldId::parse(&field_raw),
        coerce_number(obj.get("xMm")).unwrap_or(0.0),
        coerce_number(obj.get("yMm")).unwrap_or(0.0),
        positive(obj.get("wMm")).unwrap_or(DEFAULT_BOX_W_MM),
        positive(obj.get("hMm")).unwrap_or(DEFAULT_BOX_H_MM),
    );
    b.z = coerce_number(obj.get("z")).map(|n| n as i32).unwrap_or(index as i32);
    b.rotate_deg = coerce_number(obj.get("rotateDeg")).unwrap_or(0.0);
    b.locked = coerce_bool(obj.get("locked")).unwrap_or(false);
    b.style = coerce_style(obj.get("style"));
    b.text_mode = match obj.get("textMode").and_then(Value::as_str) {
        Some("static") => Some(TextMode::Static),
        Some("dynamic") => Some(TextMode::Dynamic),
        _ => None,
    };
    b.text = optional_string(obj.get("text"));
    b.label = optional_string(obj.get("label"));
    b.kind = optional_string(obj.get("type"));
    b.auto_h = coerce_bool(obj.get("autoH"));
    b.min_h = positive(obj.get("minH"));
    b.max_h = positive(obj.get("maxH"));
    b.reserve_right_mm = coerce_number(obj.get("reserveRightMm")).filter(|n| *n >= 0.0);
    Some(b)
}
