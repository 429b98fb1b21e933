// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-document engine state and its frame loop.

use alloc::rc::Rc;
use core::cell::RefCell;

use clipsync_core::dom::Dom;
use clipsync_core::engine::{ClipEngine, SceneLoad};
use clipsync_core::timing::Tick;
use web_sys::Element;

use crate::dom::MutationInbox;
use crate::raf::RafLoop;

/// An engine, the document it drives, and the inbox its subscriptions
/// deliver to.
#[derive(Debug)]
pub(crate) struct Session<D: Dom<Node = Element>> {
    pub(crate) engine: ClipEngine<D>,
    pub(crate) dom: D,
    pub(crate) inbox: MutationInbox,
}

impl<D: Dom<Node = Element>> Session<D> {
    /// Handles the records gathered since the last frame, then ticks.
    pub(crate) fn frame(&mut self, tick: &Tick) -> usize {
        let records = self.inbox.take();
        self.engine.run_frame(&mut self.dom, records, tick)
    }
}

/// A [`Session`] together with the loop that ticks it.
#[derive(Debug)]
pub(crate) struct DocumentHandle<D: Dom<Node = Element> + 'static> {
    session: Rc<RefCell<Session<D>>>,
    raf: RafLoop,
}

impl<D: Dom<Node = Element> + 'static> DocumentHandle<D> {
    pub(crate) fn new(session: Session<D>) -> Self {
        let session = Rc::new(RefCell::new(session));
        let ticked = Rc::clone(&session);
        let raf = RafLoop::new(move |tick| {
            if let Ok(mut session) = ticked.try_borrow_mut() {
                session.frame(&tick);
            }
        });
        Self { session, raf }
    }

    /// Runs `f` on the session, or returns `None` if it is busy.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut Session<D>) -> R) -> Option<R> {
        let mut session = self.session.try_borrow_mut().ok()?;
        Some(f(&mut session))
    }

    /// Loads the displayed scene and (re)starts the loop as the engine asks.
    pub(crate) fn scene_load(&self) -> SceneLoad {
        self.raf.stop();
        let load = self
            .with(|s| s.engine.on_scene_load(&mut s.dom))
            .unwrap_or(SceneLoad {
                consumers: 0,
                start: None,
            });
        if let Some(start) = load.start {
            self.raf.start(start);
        }
        load
    }

    /// Releases the scene's subscriptions. The loop keeps running so work
    /// already queued still flushes.
    pub(crate) fn scene_unload(&self) {
        self.with(|s| s.engine.on_scene_unload(&mut s.dom));
    }

    /// Unloads and reloads the displayed scene.
    pub(crate) fn reload(&self) -> SceneLoad {
        self.scene_unload();
        self.scene_load()
    }
}
