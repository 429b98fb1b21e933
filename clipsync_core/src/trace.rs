// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the engine.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! engine calls as scenes load, mutations route and flushes run. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! [`Tracer`] owns an optional boxed [`TraceSink`]. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;

use crate::id::{ElementId, SceneId};
use crate::observer::WatchKey;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why an update did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The consumer or source has no `id`.
    MissingId,
    /// The source has no `svg` with a `path` child.
    NoVectorContent,
    /// The engine was called without a loaded scene.
    NoScene,
    /// The engine is disabled (clip paths unsupported).
    Disabled,
}

impl SkipReason {
    /// Short lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingId => "missing-id",
            Self::NoVectorContent => "no-vector-content",
            Self::NoScene => "no-scene",
            Self::Disabled => "disabled",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a scene has been set up.
#[derive(Clone, Copy, Debug)]
pub struct SceneLoadEvent<'a> {
    /// Scene container id.
    pub scene: Option<&'a SceneId>,
    /// Consumers found in the scene.
    pub consumers: usize,
    /// Subscriptions created.
    pub watches: usize,
}

/// Emitted when a scene is torn down.
#[derive(Clone, Copy, Debug)]
pub struct SceneUnloadEvent<'a> {
    /// Scene container id.
    pub scene: Option<&'a SceneId>,
    /// Subscriptions released.
    pub released: usize,
}

/// Emitted for every routed mutation record.
#[derive(Clone, Copy, Debug)]
pub struct MutationEvent<'a> {
    /// Subscription the record arrived on.
    pub key: &'a WatchKey,
    /// Changed attribute.
    pub attribute: &'a str,
    /// Consumers the record enqueued.
    pub enqueued: usize,
}

/// Emitted when work is queued for a consumer.
#[derive(Clone, Copy, Debug)]
pub struct EnqueueEvent<'a> {
    /// Consumer id.
    pub consumer: &'a ElementId,
    /// Whether pending work was replaced.
    pub replaced: bool,
}

/// Emitted when the scheduler flushes.
#[derive(Clone, Copy, Debug)]
pub struct FlushEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Host time of the tick.
    pub now: HostTime,
    /// Updates in the flush.
    pub updates: usize,
}

/// Emitted when a clip path is (re)generated.
#[derive(Clone, Copy, Debug)]
pub struct ClipAppliedEvent<'a> {
    /// Consumer id.
    pub consumer: &'a ElementId,
    /// Source id.
    pub source: &'a ElementId,
    /// Id of the definition now referenced.
    pub clip_id: &'a str,
    /// SVG transform attribute written.
    pub transform: &'a str,
}

/// Emitted when a consumer's clip is removed.
#[derive(Clone, Copy, Debug)]
pub struct ClipRemovedEvent<'a> {
    /// Consumer id, if it has one.
    pub consumer: Option<&'a ElementId>,
}

/// Emitted when an update is dropped.
#[derive(Clone, Copy, Debug)]
pub struct SkipEvent<'a> {
    /// Consumer id, if known.
    pub consumer: Option<&'a ElementId>,
    /// Reason.
    pub reason: SkipReason,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a scene load.
    fn on_scene_load(&mut self, e: &SceneLoadEvent<'_>) {
        _ = e;
    }

    /// Called after a scene unload.
    fn on_scene_unload(&mut self, e: &SceneUnloadEvent<'_>) {
        _ = e;
    }

    /// Called when a new subscription is made.
    fn on_watch(&mut self, key: &WatchKey) {
        _ = key;
    }

    /// Called for each routed mutation record.
    fn on_mutation(&mut self, e: &MutationEvent<'_>) {
        _ = e;
    }

    /// Called when work is queued.
    fn on_enqueue(&mut self, e: &EnqueueEvent<'_>) {
        _ = e;
    }

    /// Called when a flush starts.
    fn on_flush(&mut self, e: &FlushEvent) {
        _ = e;
    }

    /// Called when a clip path is generated.
    fn on_clip_applied(&mut self, e: &ClipAppliedEvent<'_>) {
        _ = e;
    }

    /// Called when a clip is removed.
    fn on_clip_removed(&mut self, e: &ClipRemovedEvent<'_>) {
        _ = e;
    }

    /// Called when an update is dropped.
    fn on_skip(&mut self, e: &SkipEvent<'_>) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owner of an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing and
/// a sink passed to [`Tracer::new`] is dropped immediately.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

/// Expands to a `Tracer` method that forwards to one sink method.
macro_rules! dispatch {
    ($(#[$doc:meta])* $name:ident => $sink_method:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: $ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$sink_method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub const fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    dispatch!(
        /// Emits a [`SceneLoadEvent`].
        scene_load => on_scene_load(&SceneLoadEvent<'_>)
    );
    dispatch!(
        /// Emits a [`SceneUnloadEvent`].
        scene_unload => on_scene_unload(&SceneUnloadEvent<'_>)
    );
    dispatch!(
        /// Reports a new subscription.
        watch => on_watch(&WatchKey)
    );
    dispatch!(
        /// Emits a [`MutationEvent`].
        mutation => on_mutation(&MutationEvent<'_>)
    );
    dispatch!(
        /// Emits an [`EnqueueEvent`].
        enqueue => on_enqueue(&EnqueueEvent<'_>)
    );
    dispatch!(
        /// Emits a [`FlushEvent`].
        flush => on_flush(&FlushEvent)
    );
    dispatch!(
        /// Emits a [`ClipAppliedEvent`].
        clip_applied => on_clip_applied(&ClipAppliedEvent<'_>)
    );
    dispatch!(
        /// Emits a [`ClipRemovedEvent`].
        clip_removed => on_clip_removed(&ClipRemovedEvent<'_>)
    );
    dispatch!(
        /// Emits a [`SkipEvent`].
        skip => on_skip(&SkipEvent<'_>)
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
