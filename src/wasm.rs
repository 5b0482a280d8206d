use wasm_bindgen::prelude::*;

use crate::model::PageSize;

fn js_error(e: crate::CardError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Normalize an import payload. `page` is `WxH` in millimetres or a preset
/// name; anything unparseable means A6 landscape.
#[wasm_bindgen]
pub fn normalize_json(json: &str, page: &str) -> Result<String, JsValue> {
    let page = PageSize::parse(page).unwrap_or_default();
    let cards = crate::normalize_json(json, &page).map_err(js_error)?;
    crate::export_json(&cards).map_err(js_error)
}

#[wasm_bindgen]
pub fn autosize_json(json: &str) -> Result<String, JsValue> {
    crate::autosize_json(json).map_err(js_error)
}

#[wasm_bindgen]
pub fn extract_template_json(json: &str, card_id: &str, page: &str) -> Result<String, JsValue> {
    let page = PageSize::parse(page).unwrap_or_default();
    crate::extract_template_json(json, card_id, &page).map_err(js_error)
}

#[wasm_bindgen]
pub fn apply_template_json(json: &str, template: &str, exclude: Option<String>) -> Result<String, JsValue> {
    crate::apply_template_json(json, template, exclude.as_deref()).map_err(js_error)
}
