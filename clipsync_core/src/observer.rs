// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Watch identities and the per-scene observer registry.
//!
//! Every subscription the engine makes is registered under a [`WatchKey`]:
//! the observed element's id plus a [`WatchPurpose`] that says which handler
//! its mutations route to. [`ObserverRegistry::watch`] is idempotent per key:
//! only the first registration subscribes. A later registration under the
//! same key is ignored even if it names a different node (for example an
//! element recreated with the same id); the original subscription stays in
//! place.

use alloc::collections::BTreeMap;
use alloc::collections::btree_map;
use alloc::vec::Vec;
use core::fmt;

use crate::config::attr;
use crate::id::ElementId;

/// Attribute names a subscription reports changes for.
pub type AttributeFilter = &'static [&'static str];

/// Which handler an observed element's mutations route to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WatchPurpose {
    /// A consumer's declarative attributes (mask selector, clip rule).
    Consumer,
    /// A source element's inline style (its placement and transform).
    Source,
    /// The path inside a source (its `d` data).
    SourcePath,
}

impl WatchPurpose {
    /// The attributes observed for this purpose.
    #[must_use]
    pub const fn filter(self) -> AttributeFilter {
        match self {
            Self::Consumer => &[attr::CLIP_PATH, attr::CLIP_RULE],
            Self::Source => &["style"],
            Self::SourcePath => &["d"],
        }
    }
}

/// Identity of one subscription within a scene.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchKey {
    /// Id of the element that owns the watched node. For
    /// [`WatchPurpose::SourcePath`] this is the source's id.
    pub element: ElementId,
    /// Handler selector.
    pub purpose: WatchPurpose,
}

impl WatchKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(element: ElementId, purpose: WatchPurpose) -> Self {
        Self { element, purpose }
    }
}

impl fmt::Debug for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.purpose {
            WatchPurpose::Consumer => write!(f, "WatchKey({}:consumer)", self.element),
            WatchPurpose::Source => write!(f, "WatchKey({}:source)", self.element),
            WatchPurpose::SourcePath => write!(f, "WatchKey({}_path)", self.element),
        }
    }
}

/// Active subscriptions of one scene, keyed by [`WatchKey`].
pub struct ObserverRegistry<S> {
    entries: BTreeMap<WatchKey, S>,
}

impl<S> fmt::Debug for ObserverRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S> Default for ObserverRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ObserverRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers a subscription under `key` unless one already exists.
    ///
    /// `start` is only called for the first registration; it returns `None`
    /// when the host could not subscribe, in which case nothing is recorded
    /// and a later call may try again. Returns `true` if a new subscription
    /// was recorded.
    pub fn watch(&mut self, key: WatchKey, start: impl FnOnce(&WatchKey) -> Option<S>) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        match start(&key) {
            Some(subscription) => {
                self.entries.insert(key, subscription);
                true
            }
            None => false,
        }
    }

    /// Whether a subscription exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &WatchKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns every subscription, in key order.
    pub fn drain(&mut self) -> btree_map::IntoIter<WatchKey, S> {
        core::mem::take(&mut self.entries).into_iter()
    }
}
