// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative clip paths driven by live vector mask sources.
//!
//! `clipsync_core` keeps SVG `clipPath` definitions in sync with the
//! elements they are derived from. A *consumer* names a *source* through a
//! `data-clip-path` selector; the engine copies the source's vector path
//! into a clip definition, places it with the source's current geometry and
//! points the consumer at it. It is `no_std` compatible (with `alloc`) and
//! talks to the host document only through the [`Dom`](dom::Dom) trait.
//!
//! # Architecture
//!
//! ```text
//!   Host document (mutation records, frame callbacks)
//!       │
//!       ▼
//!   ClipEngine::handle_mutation() ──► FrameScheduler::enqueue()
//!                                           │
//!                 ┌─────────────────────────┘
//!                 ▼
//!   ClipEngine::tick() ──► clip::synthesize() ──► Dom writes
//! ```
//!
//! **[`engine`]**: Scene lifecycle, mutation routing and flushing.
//!
//! **[`scheduler`]**: Per-consumer pending queue, drained at most once per
//! admitted frame, with optional frame-rate pacing.
//!
//! **[`clip`]**: Clip definition synthesis and removal.
//!
//! **[`transform`]** / **[`geometry`]**: Source geometry and its SVG
//! transform equivalent.
//!
//! **[`observer`]** / **[`scene`]**: Per-scene subscriptions and geometry
//! snapshots.
//!
//! **[`dom`]**: The host abstraction. [`memory`] provides an in-memory
//! implementation for tests and simulations; [`preview`] adapts any host to
//! the authoring preview.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `memory` (enabled by default): The in-memory [`MemoryDom`](memory::MemoryDom)
//!   host. Its selector matching uses `cssparser` and `selectors`, so it
//!   implies `std`.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod clip;
pub mod config;
pub mod dom;
pub mod engine;
pub mod geometry;
pub mod id;
#[cfg(feature = "memory")]
pub mod memory;
pub mod observer;
pub mod predicate;
pub mod preview;
pub mod scene;
pub mod scheduler;
pub mod time;
pub mod timing;
pub mod trace;
pub mod transform;
