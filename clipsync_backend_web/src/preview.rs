// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live preview inside the authoring tool.
//!
//! The preview page has no host runtime: there are no lifecycle events and
//! no geometry accessor. [`PreviewSession::install`] stands in for both. It
//! loads the preview scene through a
//! [`PreviewDom`](clipsync_core::preview::PreviewDom), keeps the editor's
//! zoom expressed as a transform, and reloads the scene whenever a
//! `data-clip-path` attribute changes anywhere in it.

use alloc::rc::Rc;
use core::cell::Cell;

use clipsync_core::config::{EngineConfig, attr};
use clipsync_core::engine::ClipEngine;
use clipsync_core::preview::{self, PreviewDom};
use wasm_bindgen::closure::Closure;
use web_sys::{Document, Element};

use crate::dom::{MutationInbox, WebDom, WebSubscription, attribute_mutation};
use crate::raf::request_animation_frame;
use crate::session::{DocumentHandle, Session};

type PreviewHandle = DocumentHandle<PreviewDom<WebDom>>;

/// Engine state and observers for the authoring preview.
#[derive(Debug)]
pub struct PreviewSession {
    handle: Rc<PreviewHandle>,
    _zoom: Option<WebSubscription>,
    _changes: Option<WebSubscription>,
}

impl PreviewSession {
    /// Loads the preview scene and starts observing the editor.
    ///
    /// Returns `None` if the document has no root element.
    pub fn install(document: &Document, config: EngineConfig) -> Option<Self> {
        let inbox = MutationInbox::new();
        let mut dom = PreviewDom::new(WebDom::new(document.clone(), None, inbox.clone())?);
        let mut engine = ClipEngine::new(EngineConfig {
            preview: true,
            ..config
        });
        engine.on_document_load(&mut dom);
        let handle = Rc::new(DocumentHandle::new(Session { engine, dom, inbox }));
        handle.scene_load();

        let zoom = document
            .get_element_by_id(preview::EDITOR_ID)
            .and_then(|editor| watch_zoom(document, &editor));
        let changes = document
            .get_element_by_id(preview::SCENE_ID)
            .and_then(|scene| watch_changes(&scene, &handle));

        Some(Self {
            handle,
            _zoom: zoom,
            _changes: changes,
        })
    }

    /// Reloads the preview scene now.
    pub fn reload(&self) {
        self.handle.reload();
    }
}

/// Corrects the editor zoom once, then on every style change.
fn watch_zoom(document: &Document, editor: &Element) -> Option<WebSubscription> {
    let mut dom = WebDom::new(document.clone(), None, MutationInbox::new())?;
    preview::correct_zoom(&mut dom, editor);
    WebSubscription::observe(editor, &["style"], false, move |record| {
        if let Some(mutation) = attribute_mutation(&record) {
            preview::correct_zoom(&mut dom, &mutation.target);
        }
    })
}

/// Removes clips whose `data-clip-path` disappeared and schedules one scene
/// reload per batch of changes.
///
/// The reload waits for the next animation frame so subscriptions that saw
/// the same change are handled first.
fn watch_changes(scene: &Element, handle: &Rc<PreviewHandle>) -> Option<WebSubscription> {
    let handle = Rc::clone(handle);
    let reload_pending = Rc::new(Cell::new(false));
    WebSubscription::observe(scene, &[attr::CLIP_PATH], true, move |record| {
        let Some(mutation) = attribute_mutation(&record) else {
            return;
        };
        handle.with(|s| s.engine.handle_preview_change(&mut s.dom, &mutation));
        if reload_pending.replace(true) {
            return;
        }
        let handle = Rc::clone(&handle);
        let reload_pending = Rc::clone(&reload_pending);
        let reload = Closure::once_into_js(move || {
            reload_pending.set(false);
            handle.reload();
        });
        request_animation_frame(&reload);
    })
}
