// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use clipsync_core::id::{ElementId, SceneId};
use clipsync_core::observer::WatchKey;
use clipsync_core::trace::{
    ClipAppliedEvent, ClipRemovedEvent, EnqueueEvent, FlushEvent, MutationEvent, SceneLoadEvent,
    SceneUnloadEvent, SkipEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn scene(id: Option<&SceneId>) -> &str {
    id.map_or("-", SceneId::as_str)
}

fn element(id: Option<&ElementId>) -> &str {
    id.map_or("-", ElementId::as_str)
}

fn key(k: &WatchKey) -> String {
    format!("{}/{:?}", k.element, k.purpose)
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_scene_load(&mut self, e: &SceneLoadEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[scene:load] scene={} consumers={} watches={}",
            scene(e.scene),
            e.consumers,
            e.watches,
        );
    }

    fn on_scene_unload(&mut self, e: &SceneUnloadEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[scene:unload] scene={} released={}",
            scene(e.scene),
            e.released,
        );
    }

    fn on_watch(&mut self, k: &WatchKey) {
        let _ = writeln!(self.writer, "[watch] {}", key(k));
    }

    fn on_mutation(&mut self, e: &MutationEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[mutation] {} attr={} enqueued={}",
            key(e.key),
            e.attribute,
            e.enqueued,
        );
    }

    fn on_enqueue(&mut self, e: &EnqueueEvent<'_>) {
        let replaced = if e.replaced { " (replaced)" } else { "" };
        let _ = writeln!(self.writer, "[enqueue] consumer={}{replaced}", e.consumer);
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        let _ = writeln!(
            self.writer,
            "[flush] frame={} now={}µs updates={}",
            e.frame_index,
            e.now.micros(),
            e.updates,
        );
    }

    fn on_clip_applied(&mut self, e: &ClipAppliedEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[clip] consumer={} source={} id={} transform=\"{}\"",
            e.consumer, e.source, e.clip_id, e.transform,
        );
    }

    fn on_clip_removed(&mut self, e: &ClipRemovedEvent<'_>) {
        let _ = writeln!(self.writer, "[unclip] consumer={}", element(e.consumer));
    }

    fn on_skip(&mut self, e: &SkipEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[skip] consumer={} reason={}",
            element(e.consumer),
            e.reason.as_str(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_core::observer::WatchPurpose;
    use clipsync_core::time::HostTime;
    use clipsync_core::trace::SkipReason;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_flush() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_flush(&FlushEvent {
            frame_index: 7,
            now: HostTime(16_000),
            updates: 2,
        });
        let output = output(sink);
        assert!(output.contains("[flush]"), "got: {output}");
        assert!(output.contains("frame=7"), "got: {output}");
        assert!(output.contains("updates=2"), "got: {output}");
    }

    #[test]
    fn pretty_print_watch_and_skip() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let k = WatchKey::new(ElementId::from("mask"), WatchPurpose::SourcePath);
        sink.on_watch(&k);
        sink.on_skip(&SkipEvent {
            consumer: None,
            reason: SkipReason::MissingId,
        });
        let output = output(sink);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, ["[watch] mask/SourcePath", "[skip] consumer=- reason=missing-id"]);
    }

    #[test]
    fn pretty_print_clip() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let consumer = ElementId::from("photo");
        let source = ElementId::from("mask");
        sink.on_clip_applied(&ClipAppliedEvent {
            consumer: &consumer,
            source: &source,
            clip_id: "clip_path_photo_mask_100001",
            transform: "translate(5 0)",
        });
        sink.on_enqueue(&EnqueueEvent {
            consumer: &consumer,
            replaced: true,
        });
        let output = output(sink);
        assert!(
            output.contains("id=clip_path_photo_mask_100001 transform=\"translate(5 0)\""),
            "got: {output}"
        );
        assert!(output.contains("[enqueue] consumer=photo (replaced)"), "got: {output}");
    }
}
