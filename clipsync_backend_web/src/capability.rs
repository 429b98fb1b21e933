// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser capability probing and the fallback for browsers without
//! `clip-path` support.

use wasm_bindgen::JsCast as _;
use wasm_bindgen::prelude::*;
use web_sys::{CssStyleSheet, Document};

/// Rules inserted at the top of the first stylesheet when clip paths are
/// unsupported, so documents can offer alternative content.
pub const FALLBACK_RULES: [&str; 2] = [
    ".hideIfClipPathNotSupported {display:none!important;}",
    ".showIfClipPathNotSupported {display:block!important;}",
];

/// Path fragment identifying the authoring tool's live preview page.
const PREVIEW_URL_MARKER: &str = "/Hype/Scratch/HypeScratch.";

#[wasm_bindgen]
extern "C" {
    // Throws a ReferenceError where `CSS` is missing; `catch` turns that into
    // `Err`.
    #[wasm_bindgen(catch, js_namespace = CSS, js_name = "supports")]
    fn css_supports(property: &str, value: &str) -> Result<bool, JsValue>;
}

/// Whether the browser can clip HTML content with an SVG `url()` reference.
#[must_use]
pub fn supports_clip_path() -> bool {
    css_supports("clip-path", "url(#test)").unwrap_or(false)
}

/// Whether this page is the authoring tool's live preview.
#[must_use]
pub fn is_preview_host() -> bool {
    web_sys::window()
        .and_then(|w| w.location().href().ok())
        .is_some_and(|href| href.contains(PREVIEW_URL_MARKER))
}

/// Inserts [`FALLBACK_RULES`] into the document's first stylesheet.
///
/// Returns `false` if the document has no usable stylesheet.
pub fn insert_fallback_rules(document: &Document) -> bool {
    let Some(sheet) = document
        .style_sheets()
        .item(0)
        .and_then(|s| s.dyn_into::<CssStyleSheet>().ok())
    else {
        return false;
    };
    FALLBACK_RULES
        .iter()
        .zip(0_u32..)
        .all(|(rule, index)| sheet.insert_rule_with_index(rule, index).is_ok())
}
