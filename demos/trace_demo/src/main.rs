// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated scene that exercises the engine and its diagnostics.
//!
//! Builds a small document in a [`MemoryDom`], loads its scene, then animates
//! the mask source for a number of 60 Hz frames with a 30 fps cap. Events go
//! to a [`PrettyPrintSink`] on stdout and a [`JsonLinesSink`] written to
//! `clipsync-trace.jsonl`.
//!
//! [`PrettyPrintSink`]: clipsync_debug::pretty::PrettyPrintSink
//! [`JsonLinesSink`]: clipsync_debug::json::JsonLinesSink

use std::fs::File;
use std::io::BufWriter;

use clipsync_core::config::{EngineConfig, attr};
use clipsync_core::dom::Dom as _;
use clipsync_core::engine::ClipEngine;
use clipsync_core::geometry::GeometryProperty;
use clipsync_core::memory::{MemoryDom, NodeId};
use clipsync_core::observer::WatchKey;
use clipsync_core::time::{Duration, HostTime};
use clipsync_core::timing::Tick;
use clipsync_core::trace::{
    ClipAppliedEvent, ClipRemovedEvent, EnqueueEvent, FlushEvent, MutationEvent, SceneLoadEvent,
    SceneUnloadEvent, SkipEvent, TraceSink, Tracer,
};
use clipsync_debug::json::JsonLinesSink;
use clipsync_debug::pretty::PrettyPrintSink;

const FRAME_COUNT: u64 = 12;
/// 60 Hz frame interval.
const FRAME_INTERVAL: Duration = Duration(16_667);
const TRACE_PATH: &str = "clipsync-trace.jsonl";

/// Forwards every event to two sinks.
struct Tee<A, B>(A, B);

impl<A: TraceSink, B: TraceSink> TraceSink for Tee<A, B> {
    fn on_scene_load(&mut self, e: &SceneLoadEvent<'_>) {
        self.0.on_scene_load(e);
        self.1.on_scene_load(e);
    }
    fn on_scene_unload(&mut self, e: &SceneUnloadEvent<'_>) {
        self.0.on_scene_unload(e);
        self.1.on_scene_unload(e);
    }
    fn on_watch(&mut self, key: &WatchKey) {
        self.0.on_watch(key);
        self.1.on_watch(key);
    }
    fn on_mutation(&mut self, e: &MutationEvent<'_>) {
        self.0.on_mutation(e);
        self.1.on_mutation(e);
    }
    fn on_enqueue(&mut self, e: &EnqueueEvent<'_>) {
        self.0.on_enqueue(e);
        self.1.on_enqueue(e);
    }
    fn on_flush(&mut self, e: &FlushEvent) {
        self.0.on_flush(e);
        self.1.on_flush(e);
    }
    fn on_clip_applied(&mut self, e: &ClipAppliedEvent<'_>) {
        self.0.on_clip_applied(e);
        self.1.on_clip_applied(e);
    }
    fn on_clip_removed(&mut self, e: &ClipRemovedEvent<'_>) {
        self.0.on_clip_removed(e);
        self.1.on_clip_removed(e);
    }
    fn on_skip(&mut self, e: &SkipEvent<'_>) {
        self.0.on_skip(e);
        self.1.on_skip(e);
    }
}

struct Scene {
    consumer: NodeId,
    wrapper: NodeId,
    source: NodeId,
    path: NodeId,
}

/// A scene with one photo clipped by a star-shaped vector group.
fn build(dom: &mut MemoryDom) -> Scene {
    let scene = dom.scene("intro");

    let wrapper = dom.element(scene, "div");
    let consumer = dom.element(wrapper, "div");
    dom.set_attr(consumer, "id", "photo");
    dom.set_attr(consumer, attr::CLIP_PATH, "#star");
    dom.set_attr(consumer, attr::CLIP_RULE, "evenodd");

    let source = dom.element(scene, "div");
    dom.set_attr(source, "id", "star");
    let svg = dom.element(source, "svg");
    let path = dom.element(svg, "path");
    dom.set_attr(path, "d", "M50 0 L61 35 L98 35 L68 57 L79 91 L50 70 L21 91 L32 57 L2 35 L39 35 Z");
    dom.set_geometry(source, GeometryProperty::Width, 100.0);
    dom.set_geometry(source, GeometryProperty::Height, 100.0);

    Scene {
        consumer,
        wrapper,
        source,
        path,
    }
}

fn main() -> std::io::Result<()> {
    let pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let json = JsonLinesSink::new(BufWriter::new(File::create(TRACE_PATH)?));

    let mut dom = MemoryDom::new("demo");
    let scene = build(&mut dom);

    let mut engine = ClipEngine::with_seed(EngineConfig::runtime(), 7)
        .with_tracer(Tracer::new(Box::new(Tee(pretty, json))));
    if let Err(err) = engine.set_frames_per_second(30) {
        eprintln!("frame rate rejected: {err}");
    }
    engine.on_document_load(&mut dom);
    engine.on_scene_load(&mut dom);

    let mut now = HostTime(1_000_000);
    for frame_index in 0..FRAME_COUNT {
        // Slide and spin the mask; every third frame also reshapes it.
        let t = frame_index as f64;
        dom.set_geometry(scene.source, GeometryProperty::Left, 10.0 * t);
        dom.set_geometry(scene.source, GeometryProperty::RotateZ, 15.0 * t);
        if frame_index % 3 == 2 {
            let d = format!("M0 0 H{0} V{0} H0 Z", 60 + frame_index * 5);
            dom.set_attr(scene.path, "d", &d);
        }
        if frame_index == FRAME_COUNT - 2 {
            dom.remove_attr(scene.consumer, attr::CLIP_PATH);
        }

        let records = dom.take_mutations();
        engine.run_frame(&mut dom, records, &Tick::new(now, frame_index));
        now = now + FRAME_INTERVAL;
    }

    println!(
        "final clip-path on wrapper: {:?}",
        dom.style_property(&scene.wrapper, "clip-path")
    );
    println!("source hidden: {:?}", dom.style_property(&scene.source, "opacity"));

    engine.on_scene_unload(&mut dom);
    println!("active subscriptions after unload: {}", dom.active_subscriptions());
    println!("JSON trace written to {TRACE_PATH}");
    Ok(())
}
