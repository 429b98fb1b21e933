// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The JavaScript-facing runtime.
//!
//! [`ClipPathRuntime`] owns one engine per host document. The host's
//! lifecycle listeners call [`document_load`](ClipPathRuntime::document_load),
//! [`scene_load`](ClipPathRuntime::scene_load) and
//! [`scene_unload`](ClipPathRuntime::scene_unload);
//! [`register_event_listeners`](ClipPathRuntime::register_event_listeners)
//! wires those up and handles the preview page and the fallback styles once
//! the page content has loaded.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use core::cell::RefCell;

use clipsync_core::config::{EngineConfig, Pacing};
use clipsync_core::engine::ClipEngine;
use clipsync_core::preview::parse_leading_number;
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::capability;
use crate::dom::{MutationInbox, WebDom};
use crate::host::{EVENT_LISTENERS, HostDocument, event};
use crate::preview::PreviewSession;
use crate::session::{DocumentHandle, Session};

#[derive(Debug)]
struct RuntimeState {
    config: EngineConfig,
    documents: BTreeMap<String, DocumentHandle<WebDom>>,
    preview: Option<PreviewSession>,
}

impl RuntimeState {
    fn document_load(&mut self, host: HostDocument) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let inbox = MutationInbox::new();
        let Some(mut dom) = WebDom::new(document, Some(host), inbox.clone()) else {
            return;
        };
        let mut engine = ClipEngine::new(self.config);
        engine.on_document_load(&mut dom);
        let id = engine.document_id().unwrap_or_default().to_string();
        self.documents
            .insert(id, DocumentHandle::new(Session { engine, dom, inbox }));
    }

    fn handle(&self, host: &HostDocument) -> Option<&DocumentHandle<WebDom>> {
        self.documents.get(&host.document_id())
    }
}

/// Clip-path synchronization for the documents on a page.
#[wasm_bindgen]
#[derive(Debug)]
pub struct ClipPathRuntime {
    state: Rc<RefCell<RuntimeState>>,
}

#[wasm_bindgen]
impl ClipPathRuntime {
    /// Creates a runtime. It stays inert if the browser cannot clip with
    /// SVG references.
    #[wasm_bindgen(constructor)]
    #[must_use]
    pub fn new() -> Self {
        let config = EngineConfig {
            enabled: capability::supports_clip_path(),
            ..EngineConfig::runtime()
        };
        Self {
            state: Rc::new(RefCell::new(RuntimeState {
                config,
                documents: BTreeMap::new(),
                preview: None,
            })),
        }
    }

    /// Crate version.
    #[wasm_bindgen(getter)]
    #[must_use]
    pub fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    /// Whether the browser supports `clip-path: url(...)` on HTML content.
    #[wasm_bindgen(js_name = "supportsClipPath")]
    #[must_use]
    pub fn supports_clip_path(&self) -> bool {
        self.state.borrow().config.enabled
    }

    /// Caps update flushes at `fps` per second for every document.
    ///
    /// Numbers and numeric strings are accepted; the value is truncated to
    /// an integer. Anything outside `1..=59` removes the cap. Returns the
    /// applied rate, or `undefined` when uncapped.
    #[wasm_bindgen(js_name = "setFramesPerSecond")]
    pub fn set_frames_per_second(&self, fps: &JsValue) -> Option<u32> {
        let fps = fps_from(fps.as_f64(), fps.as_string().as_deref());
        let mut state = self.state.borrow_mut();
        state.config.pacing = Pacing::from_fps(fps);
        for handle in state.documents.values() {
            let _ = handle.with(|s| s.engine.set_frames_per_second(fps));
        }
        match state.config.pacing {
            Pacing::Fixed(rate) => Some(rate.get()),
            Pacing::Uncapped => None,
        }
    }

    /// Starts tracking a host document.
    #[wasm_bindgen(js_name = "documentLoad")]
    pub fn document_load(&self, host: HostDocument) {
        self.state.borrow_mut().document_load(host);
    }

    /// Sets up clip paths for the scene the host just displayed.
    ///
    /// Returns the number of consumers in the scene.
    #[wasm_bindgen(js_name = "sceneLoad")]
    pub fn scene_load(&self, host: &HostDocument) -> usize {
        let state = self.state.borrow();
        state.handle(host).map_or(0, |h| h.scene_load().consumers)
    }

    /// Releases the observers of the scene the host is leaving.
    #[wasm_bindgen(js_name = "sceneUnload")]
    pub fn scene_unload(&self, host: &HostDocument) {
        if let Some(handle) = self.state.borrow().handle(host) {
            handle.scene_unload();
        }
    }

    /// Queues an update for every consumer in the current scene.
    #[wasm_bindgen(js_name = "applyClipPaths")]
    pub fn apply_clip_paths(&self, host: &HostDocument) {
        if let Some(handle) = self.state.borrow().handle(host) {
            handle.with(|s| s.engine.apply_clip_paths(&mut s.dom));
        }
    }

    /// Queues an update for one consumer, or removes its clip when it no
    /// longer names a source. Returns whether an update was queued.
    #[wasm_bindgen(js_name = "applyClipPathToElement")]
    pub fn apply_clip_path_to_element(&self, host: &HostDocument, consumer: &Element) -> bool {
        self.state
            .borrow()
            .handle(host)
            .and_then(|h| h.with(|s| s.engine.apply_clip_path_to_element(&mut s.dom, consumer)))
            .unwrap_or(false)
    }

    /// Generates `consumer`'s clip from `source` right away. Returns the
    /// new clip-path id.
    #[wasm_bindgen(js_name = "generateClipPathForElement")]
    pub fn generate_clip_path_for_element(
        &self,
        host: &HostDocument,
        source: &Element,
        consumer: &Element,
    ) -> Option<String> {
        self.state
            .borrow()
            .handle(host)?
            .with(|s| {
                s.engine
                    .generate_clip_path_for_element(&mut s.dom, source, consumer)
            })?
            .map(|definition| definition.id)
    }

    /// Records `source`'s geometry and returns the SVG transform that
    /// places its path.
    #[wasm_bindgen(js_name = "calculateAndStoreTransformForElement")]
    pub fn calculate_and_store_transform_for_element(
        &self,
        host: &HostDocument,
        source: &Element,
    ) -> Option<String> {
        self.state
            .borrow()
            .handle(host)?
            .with(|s| {
                s.engine
                    .calculate_and_store_transform_for_element(&s.dom, source)
            })?
            .map(|transform| transform.to_string())
    }

    /// Reloads the authoring preview's scene, if the preview is active.
    #[wasm_bindgen(js_name = "reloadPreview")]
    pub fn reload_preview(&self) {
        if let Some(preview) = &self.state.borrow().preview {
            preview.reload();
        }
    }

    /// Adds this runtime's lifecycle listeners to the host's global listener
    /// list and arranges the preview or fallback setup for when the page
    /// content has loaded.
    ///
    /// Lifecycle listeners are only added when clip paths are supported.
    #[wasm_bindgen(js_name = "registerEventListeners")]
    pub fn register_event_listeners(&self) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        if self.supports_clip_path() {
            let listeners = match Reflect::get(&window, &EVENT_LISTENERS.into())?.dyn_into::<Array>() {
                Ok(list) => list,
                Err(_) => {
                    let list = Array::new();
                    Reflect::set(&window, &EVENT_LISTENERS.into(), &list)?;
                    list
                }
            };

            let state = Rc::clone(&self.state);
            listeners.push(&listener(event::DOCUMENT_LOAD, move |host| {
                state.borrow_mut().document_load(host);
            })?);
            let state = Rc::clone(&self.state);
            listeners.push(&listener(event::SCENE_LOAD, move |host| {
                if let Some(handle) = state.borrow().handle(&host) {
                    handle.scene_load();
                }
            })?);
            let state = Rc::clone(&self.state);
            listeners.push(&listener(event::SCENE_UNLOAD, move |host| {
                if let Some(handle) = state.borrow().handle(&host) {
                    handle.scene_unload();
                }
            })?);
        }

        let state = Rc::clone(&self.state);
        let on_ready = move || content_loaded(&state);
        if document.ready_state() == "loading" {
            let callback = Closure::once_into_js(on_ready);
            document.add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref())?;
        } else {
            on_ready();
        }
        Ok(())
    }
}

impl Default for ClipPathRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets up the preview when running inside the authoring tool, or the
/// fallback styles when clip paths are unsupported.
fn content_loaded(state: &RefCell<RuntimeState>) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let config = state.borrow().config;
    if capability::is_preview_host() && config.enabled {
        let session = PreviewSession::install(&document, config);
        state.borrow_mut().preview = session;
    } else if !config.enabled {
        capability::insert_fallback_rules(&document);
    }
}

/// Builds a `{ type, callback }` listener entry.
fn listener(kind: &str, callback: impl FnMut(HostDocument) + 'static) -> Result<JsValue, JsValue> {
    let entry = Object::new();
    let callback = Closure::<dyn FnMut(HostDocument)>::new(callback).into_js_value();
    Reflect::set(&entry, &"type".into(), &kind.into())?;
    Reflect::set(&entry, &"callback".into(), &callback)?;
    Ok(entry.into())
}

/// Integer frame rate from a script value, truncating like `parseInt`.
/// Unparseable input yields `0`, which means uncapped.
#[expect(
    clippy::cast_possible_truncation,
    reason = "out-of-range values saturate and are then rejected as frame rates"
)]
fn fps_from(number: Option<f64>, text: Option<&str>) -> i64 {
    number
        .or_else(|| text.and_then(parse_leading_number))
        .filter(|v| v.is_finite())
        .map_or(0, |v| v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_from_numbers_and_strings() {
        assert_eq!(fps_from(Some(30.0), None), 30);
        assert_eq!(fps_from(Some(29.9), None), 29);
        assert_eq!(fps_from(None, Some("24")), 24);
        assert_eq!(fps_from(None, Some("12.5fps")), 12);
        assert_eq!(fps_from(None, Some("fast")), 0);
        assert_eq!(fps_from(Some(f64::NAN), None), 0);
        assert_eq!(fps_from(None, None), 0);
    }

    #[test]
    fn listener_entries_are_array_values() {
        // `Array::push` takes a `&JsValue`.
        let entry: fn(&str, fn(HostDocument)) -> Result<JsValue, JsValue> = listener;
        let _ = entry;
    }

    #[test]
    fn fps_from_feeds_pacing() {
        assert_eq!(Pacing::from_fps(fps_from(None, Some("60"))), Pacing::Uncapped);
        assert!(matches!(
            Pacing::from_fps(fps_from(Some(59.0), None)),
            Pacing::Fixed(rate) if rate.get() == 59
        ));
    }
}
