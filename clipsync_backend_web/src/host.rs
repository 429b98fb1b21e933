// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bindings to the host runtime's per-document API object.
//!
//! The host passes this object to every lifecycle listener. Only the two
//! accessors the engine relies on are bound.

use alloc::string::String;

use wasm_bindgen::prelude::*;
use web_sys::Element;

/// Global array the host runtime reads lifecycle listeners from.
pub(crate) const EVENT_LISTENERS: &str = "HYPE_eventListeners";

/// Lifecycle event names understood by the host runtime.
pub(crate) mod event {
    pub(crate) const DOCUMENT_LOAD: &str = "HypeDocumentLoad";
    pub(crate) const SCENE_LOAD: &str = "HypeSceneLoad";
    pub(crate) const SCENE_UNLOAD: &str = "HypeSceneUnload";
}

#[wasm_bindgen]
extern "C" {
    /// The host runtime's document object.
    #[derive(Clone, Debug)]
    pub type HostDocument;

    /// Stable identity of the document; also the id of its container element.
    #[wasm_bindgen(method, js_name = "documentId")]
    pub fn document_id(this: &HostDocument) -> String;

    /// The host's animated value for `property` on `element` (`left`, `top`,
    /// `width`, `height`, `scaleX`, `scaleY`, `rotateZ`).
    #[wasm_bindgen(method, js_name = "getElementProperty")]
    pub fn get_element_property(this: &HostDocument, element: &Element, property: &str) -> JsValue;
}
