// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON-lines trace output.
//!
//! [`JsonLinesSink`] writes each event as one JSON object followed by a
//! newline. Every object has an `"event"` field naming the event; the other
//! fields mirror the event struct. Absent ids are written as `null`.

use std::io::Write;

use serde_json::{Value, json};

use clipsync_core::observer::WatchKey;
use clipsync_core::trace::{
    ClipAppliedEvent, ClipRemovedEvent, EnqueueEvent, FlushEvent, MutationEvent, SceneLoadEvent,
    SceneUnloadEvent, SkipEvent, TraceSink,
};

/// Writes one JSON object per event to a [`Write`](std::io::Write)
/// destination.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of lines written successfully.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Consumes the sink and returns its destination.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, value: &Value) {
        if serde_json::to_writer(&mut self.writer, value).is_ok()
            && self.writer.write_all(b"\n").is_ok()
        {
            self.written += 1;
        }
    }
}

fn watch_key(k: &WatchKey) -> Value {
    json!({
        "element": k.element.as_str(),
        "purpose": format!("{:?}", k.purpose),
    })
}

impl<W: Write> TraceSink for JsonLinesSink<W> {
    fn on_scene_load(&mut self, e: &SceneLoadEvent<'_>) {
        self.emit(&json!({
            "event": "scene_load",
            "scene": e.scene.map(|s| s.as_str()),
            "consumers": e.consumers,
            "watches": e.watches,
        }));
    }

    fn on_scene_unload(&mut self, e: &SceneUnloadEvent<'_>) {
        self.emit(&json!({
            "event": "scene_unload",
            "scene": e.scene.map(|s| s.as_str()),
            "released": e.released,
        }));
    }

    fn on_watch(&mut self, k: &WatchKey) {
        self.emit(&json!({
            "event": "watch",
            "key": watch_key(k),
        }));
    }

    fn on_mutation(&mut self, e: &MutationEvent<'_>) {
        self.emit(&json!({
            "event": "mutation",
            "key": watch_key(e.key),
            "attribute": e.attribute,
            "enqueued": e.enqueued,
        }));
    }

    fn on_enqueue(&mut self, e: &EnqueueEvent<'_>) {
        self.emit(&json!({
            "event": "enqueue",
            "consumer": e.consumer.as_str(),
            "replaced": e.replaced,
        }));
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        self.emit(&json!({
            "event": "flush",
            "frame_index": e.frame_index,
            "now_us": e.now.micros(),
            "updates": e.updates,
        }));
    }

    fn on_clip_applied(&mut self, e: &ClipAppliedEvent<'_>) {
        self.emit(&json!({
            "event": "clip_applied",
            "consumer": e.consumer.as_str(),
            "source": e.source.as_str(),
            "clip_id": e.clip_id,
            "transform": e.transform,
        }));
    }

    fn on_clip_removed(&mut self, e: &ClipRemovedEvent<'_>) {
        self.emit(&json!({
            "event": "clip_removed",
            "consumer": e.consumer.map(|c| c.as_str()),
        }));
    }

    fn on_skip(&mut self, e: &SkipEvent<'_>) {
        self.emit(&json!({
            "event": "skip",
            "consumer": e.consumer.map(|c| c.as_str()),
            "reason": e.reason.as_str(),
        }));
    }
}
