// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types that flow between a backend's frame loop and the engine.
//!
//! - [`Tick`]: one rendering-loop callback, the unit of update coalescing.
//! - [`LoopStart`]: how a backend should (re)start its loop after a scene
//!   load.

use crate::time::HostTime;

/// A frame opportunity delivered by the backend's loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tick {
    /// Host time of the callback.
    pub now: HostTime,
    /// Monotonically increasing callback counter.
    pub frame_index: u64,
}

impl Tick {
    /// Creates a tick.
    #[inline]
    #[must_use]
    pub const fn new(now: HostTime, frame_index: u64) -> Self {
        Self { now, frame_index }
    }
}

/// How a backend should start its frame loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopStart {
    /// Run one tick synchronously, then continue on animation frames.
    ///
    /// Used at runtime so clips exist before the first paint.
    Immediate,
    /// Wait for the next animation frame before the first tick.
    ///
    /// Used by the authoring preview, whose host finishes building its view
    /// after the scene-load callback returns.
    NextFrame,
}
