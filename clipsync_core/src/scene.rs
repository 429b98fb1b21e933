// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-scene state.
//!
//! A [`SceneContext`] exists from scene load to scene unload. It owns
//! everything scoped to the visible scene: the scene node used as lookup
//! scope, the observer registry and the transform snapshots. Dropping it is
//! the only way scene state goes away, so nothing leaks into the next scene.

use alloc::collections::BTreeMap;
use core::fmt;

use crate::dom::Dom;
use crate::geometry::TransformSnapshot;
use crate::id::{ElementId, SceneId};
use crate::observer::ObserverRegistry;

/// Last generated geometry per source id.
#[derive(Clone, Debug, Default)]
pub struct SnapshotCache {
    entries: BTreeMap<ElementId, TransformSnapshot>,
}

impl SnapshotCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Records `snapshot` for `source`, replacing any previous one.
    pub fn insert(&mut self, source: ElementId, snapshot: TransformSnapshot) {
        self.entries.insert(source, snapshot);
    }

    /// The snapshot recorded for `source`.
    #[must_use]
    pub fn get(&self, source: &ElementId) -> Option<&TransformSnapshot> {
        self.entries.get(source)
    }

    /// Number of cached sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State of the currently loaded scene.
pub struct SceneContext<D: Dom + ?Sized> {
    /// The scene container node.
    pub node: D::Node,
    /// The scene container id, if it has one.
    pub id: Option<SceneId>,
    /// Subscriptions made for this scene.
    pub observers: ObserverRegistry<D::Subscription>,
    /// Geometry baselines for this scene's sources.
    pub snapshots: SnapshotCache,
}

impl<D: Dom + ?Sized> fmt::Debug for SceneContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneContext")
            .field("node", &self.node)
            .field("id", &self.id)
            .field("observers", &self.observers)
            .field("snapshots", &self.snapshots.len())
            .finish()
    }
}

impl<D: Dom + ?Sized> SceneContext<D> {
    /// Creates an empty context for `node`.
    #[must_use]
    pub fn new(dom: &D, node: D::Node) -> Self {
        let id = dom.id(&node).map(|id| SceneId::new(id.as_str()));
        Self {
            node,
            id,
            observers: ObserverRegistry::new(),
            snapshots: SnapshotCache::new(),
        }
    }

    /// Releases every subscription of the scene through `dom`.
    pub fn release(mut self, dom: &mut D) {
        for (_, subscription) in self.observers.drain() {
            dom.unsubscribe(subscription);
        }
    }
}
