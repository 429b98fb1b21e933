// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for clipsync.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`WebDom`]: the page's DOM as a [`Dom`](clipsync_core::dom::Dom), with
//!   `MutationObserver` subscriptions buffered in a [`MutationInbox`]
//! - [`RafLoop`]: `requestAnimationFrame` tick source
//! - [`ClipPathRuntime`]: the object host scripts talk to; one engine per
//!   host document
//! - [`PreviewSession`]: setup for the authoring tool's live preview
//! - [`capability`]: `clip-path` support probing and fallback styles
//!
//! Build with: `wasm-pack build --target web clipsync_backend_web`

#![no_std]
#![cfg_attr(
    not(target_arch = "wasm32"),
    allow(dead_code, reason = "this crate only runs in the browser")
)]

extern crate alloc;

pub mod capability;
mod dom;
mod host;
mod preview;
mod raf;
mod runtime;
mod session;

pub use dom::{MutationInbox, WebDom, WebSubscription};
pub use host::HostDocument;
pub use preview::PreviewSession;
pub use raf::RafLoop;
pub use runtime::ClipPathRuntime;

use clipsync_core::time::HostTime;

/// Returns the current host time from `performance.now()`.
#[must_use]
pub fn now() -> HostTime {
    HostTime::from_millis_f64(raf::performance_now())
}
