// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The clip-path synchronization engine.
//!
//! [`ClipEngine`] ties the pieces together for one document:
//!
//! - scene lifecycle ([`on_scene_load`](ClipEngine::on_scene_load) /
//!   [`on_scene_unload`](ClipEngine::on_scene_unload)) creates and drops the
//!   [`SceneContext`] and its subscriptions;
//! - [`handle_mutation`](ClipEngine::handle_mutation) routes buffered
//!   mutation records by [`WatchPurpose`] and enqueues affected consumers;
//! - [`tick`](ClipEngine::tick) flushes the queue through the
//!   [`FrameScheduler`], re-resolving each consumer's source and generating
//!   or removing its clip.
//!
//! # Frame order
//!
//! A backend's frame callback calls [`run_frame`](ClipEngine::run_frame),
//! which handles every mutation record gathered since the previous frame and
//! then ticks. Records from one burst therefore collapse into a single
//! update per consumer.
//!
//! # Example
//!
//! ```rust
//! use clipsync_core::config::EngineConfig;
//! use clipsync_core::engine::ClipEngine;
//! use clipsync_core::memory::MemoryDom;
//! use clipsync_core::time::HostTime;
//! use clipsync_core::timing::{LoopStart, Tick};
//!
//! let mut dom = MemoryDom::new("doc");
//! let scene = dom.scene("intro");
//! let photo = dom.element(scene, "div");
//! dom.set_attr(photo, "id", "photo");
//! dom.set_attr(photo, "data-clip-path", "#mask");
//!
//! let mut engine = ClipEngine::new(EngineConfig::runtime());
//! engine.on_document_load(&mut dom);
//! let load = engine.on_scene_load(&mut dom);
//! assert_eq!(load.start, Some(LoopStart::Immediate));
//! engine.run_frame(&mut dom, [], &Tick::new(HostTime(0), 0));
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::clip::{self, ClipPathDefinition, SUFFIX_RANGE, SynthesisOptions};
use crate::config::{ConsumerConfig, EngineConfig, FrameRate, FrameRateError, Pacing, attr};
use crate::dom::{Dom, Mutation, attribute_equals_selector};
use crate::geometry::TransformSnapshot;
use crate::observer::{WatchKey, WatchPurpose};
use crate::predicate::{consumer_attribute_changed, source_geometry_changed};
use crate::scene::SceneContext;
use crate::scheduler::FrameScheduler;
use crate::timing::{LoopStart, Tick};
use crate::trace::{
    ClipAppliedEvent, ClipRemovedEvent, EnqueueEvent, FlushEvent, MutationEvent, SceneLoadEvent,
    SceneUnloadEvent, SkipEvent, SkipReason, Tracer,
};
use crate::transform::{SvgTransform, calculate_and_store};

/// Seed used by [`ClipEngine::new`].
const DEFAULT_SEED: u64 = 0x5eed_c11b_9a7e_0001;

/// Outcome of a scene load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneLoad {
    /// Consumers found in the scene.
    pub consumers: usize,
    /// How the backend should (re)start its frame loop; `None` means no
    /// loop is needed.
    pub start: Option<LoopStart>,
}

impl SceneLoad {
    const IDLE: Self = Self {
        consumers: 0,
        start: None,
    };
}

/// Clip-path synchronization for one document.
pub struct ClipEngine<D: Dom> {
    config: EngineConfig,
    scheduler: FrameScheduler<D::Node>,
    scene: Option<SceneContext<D>>,
    document_id: Option<String>,
    rng: fastrand::Rng,
    tracer: Tracer,
}

impl<D: Dom> fmt::Debug for ClipEngine<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipEngine")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .field("scene", &self.scene)
            .field("document_id", &self.document_id)
            .finish_non_exhaustive()
    }
}

impl<D: Dom> ClipEngine<D> {
    /// Creates an engine with a fixed id seed.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_seed(config, DEFAULT_SEED)
    }

    /// Creates an engine whose clip ids are drawn from a generator seeded
    /// with `seed`.
    #[must_use]
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self {
            config,
            scheduler: FrameScheduler::new(config.pacing),
            scene: None,
            document_id: None,
            rng: fastrand::Rng::with_seed(seed),
            tracer: Tracer::none(),
        }
    }

    /// Replaces the tracer.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether the engine does anything at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// The loaded scene.
    #[must_use]
    pub fn scene(&self) -> Option<&SceneContext<D>> {
        self.scene.as_ref()
    }

    /// Id of the loaded document.
    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// The update scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler<D::Node> {
        &self.scheduler
    }

    /// Caps flushes at `fps` per second.
    ///
    /// # Errors
    ///
    /// Rates outside `1..=59` are rejected and switch pacing to uncapped.
    pub fn set_frames_per_second(&mut self, fps: i64) -> Result<FrameRate, FrameRateError> {
        let rate = FrameRate::new(fps);
        self.config.pacing = rate.map_or(Pacing::Uncapped, Pacing::Fixed);
        self.scheduler.set_pacing(self.config.pacing);
        rate
    }

    /// Starts a document. A scene still loaded from a previous document is
    /// released and pending work is dropped.
    pub fn on_document_load(&mut self, dom: &mut D) {
        if let Some(previous) = self.scene.take() {
            previous.release(dom);
        }
        self.document_id = Some(dom.document_id());
        self.scheduler.reset();
    }

    /// Sets up the displayed scene: queues every consumer and subscribes to
    /// consumers, their sources and the sources' paths.
    ///
    /// Consumers flagged static are not observed, except in preview mode.
    pub fn on_scene_load(&mut self, dom: &mut D) -> SceneLoad {
        if !self.config.enabled {
            self.tracer.skip(&SkipEvent {
                consumer: None,
                reason: SkipReason::Disabled,
            });
            return SceneLoad::IDLE;
        }
        if let Some(previous) = self.scene.take() {
            previous.release(dom);
        }
        let Some(node) = dom.locate_scene() else {
            self.tracer.skip(&SkipEvent {
                consumer: None,
                reason: SkipReason::NoScene,
            });
            return SceneLoad::IDLE;
        };
        self.scene = Some(SceneContext::new(dom, node.clone()));
        self.scheduler.set_pacing(self.config.pacing);

        let consumers = dom.query_all(&node, attr::CONSUMER_SELECTOR);
        let mut watches = 0;
        for consumer in &consumers {
            self.apply_clip_path_to_element(dom, consumer);
            watches += self.watch_consumer(dom, &node, consumer);
        }

        let start = (!consumers.is_empty()).then_some(if self.config.preview {
            LoopStart::NextFrame
        } else {
            LoopStart::Immediate
        });
        let scene_id = self.scene.as_ref().and_then(|s| s.id.as_ref());
        self.tracer.scene_load(&SceneLoadEvent {
            scene: scene_id,
            consumers: consumers.len(),
            watches,
        });
        SceneLoad {
            consumers: consumers.len(),
            start,
        }
    }

    /// Tears down the loaded scene and releases its subscriptions. Work
    /// already queued stays queued.
    pub fn on_scene_unload(&mut self, dom: &mut D) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        let released = scene.observers.len();
        self.tracer.scene_unload(&SceneUnloadEvent {
            scene: scene.id.as_ref(),
            released,
        });
        scene.release(dom);
    }

    /// Unloads and reloads the displayed scene.
    pub fn reload_scene(&mut self, dom: &mut D) -> SceneLoad {
        self.on_scene_unload(dom);
        self.on_scene_load(dom)
    }

    /// Queues an update for every consumer in the scene.
    pub fn apply_clip_paths(&mut self, dom: &mut D) {
        let Some(scene) = &self.scene else {
            return;
        };
        let consumers = dom.query_all(&scene.node, attr::CONSUMER_SELECTOR);
        for consumer in &consumers {
            self.apply_clip_path_to_element(dom, consumer);
        }
    }

    /// Queues an update for `consumer`, or removes its clip right away when
    /// it no longer names a source.
    ///
    /// Returns `true` if an update was queued.
    pub fn apply_clip_path_to_element(&mut self, dom: &mut D, consumer: &D::Node) -> bool {
        if ConsumerConfig::read(dom, consumer).selector.is_none() {
            self.remove(dom, consumer);
            return false;
        }
        let Some(id) = dom.id(consumer) else {
            self.tracer.skip(&SkipEvent {
                consumer: None,
                reason: SkipReason::MissingId,
            });
            return false;
        };
        let replaced = self.scheduler.enqueue(id.clone(), consumer.clone());
        self.tracer.enqueue(&EnqueueEvent {
            consumer: &id,
            replaced,
        });
        true
    }

    /// Generates `consumer`'s clip from `source` immediately.
    pub fn generate_clip_path_for_element(
        &mut self,
        dom: &mut D,
        source: &D::Node,
        consumer: &D::Node,
    ) -> Option<ClipPathDefinition> {
        let Some(scene) = self.scene.as_mut() else {
            self.tracer.skip(&SkipEvent {
                consumer: None,
                reason: SkipReason::NoScene,
            });
            return None;
        };
        let consumer_id = dom.id(consumer);
        let source_id = dom.id(source);
        let (Some(consumer_id), Some(source_id)) = (consumer_id, source_id) else {
            self.tracer.skip(&SkipEvent {
                consumer: None,
                reason: SkipReason::MissingId,
            });
            return None;
        };
        let options = SynthesisOptions {
            preview: self.config.preview,
        };
        let suffix = self.rng.u32(SUFFIX_RANGE);
        let definition =
            clip::synthesize(dom, &mut scene.snapshots, source, consumer, options, suffix);
        match &definition {
            Some(def) => self.tracer.clip_applied(&ClipAppliedEvent {
                consumer: &consumer_id,
                source: &source_id,
                clip_id: &def.id,
                transform: &def.transform.to_string(),
            }),
            None => self.tracer.skip(&SkipEvent {
                consumer: Some(&consumer_id),
                reason: SkipReason::NoVectorContent,
            }),
        }
        definition
    }

    /// Reads `source`'s geometry, records its snapshot in the scene and
    /// returns the matching SVG transform.
    pub fn calculate_and_store_transform_for_element(
        &mut self,
        dom: &D,
        source: &D::Node,
    ) -> Option<SvgTransform> {
        let scene = self.scene.as_mut()?;
        let id = dom.id(source)?;
        Some(calculate_and_store(dom, &mut scene.snapshots, source, &id))
    }

    /// Routes one mutation record delivered on the subscription `key`.
    ///
    /// Returns the number of consumers queued.
    pub fn handle_mutation(
        &mut self,
        dom: &mut D,
        key: &WatchKey,
        mutation: &Mutation<D::Node>,
    ) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let target = &mutation.target;
        let enqueued = match (key.purpose, mutation.attribute.as_str()) {
            (WatchPurpose::Consumer, attr::CLIP_PATH) => {
                let new = dom.attribute(target, attr::CLIP_PATH);
                let old = mutation.old_value.as_deref();
                if consumer_attribute_changed(old, new.as_deref()) {
                    usize::from(self.apply_clip_path_to_element(dom, target))
                } else {
                    if new.as_deref().unwrap_or("").is_empty() && old != new.as_deref() {
                        self.remove(dom, target);
                    }
                    0
                }
            }
            (WatchPurpose::Consumer, attr::CLIP_RULE) => {
                usize::from(self.apply_clip_path_to_element(dom, target))
            }
            (WatchPurpose::Source, "style") => {
                if self.source_moved(dom, target) {
                    self.fan_out(dom, target)
                } else {
                    0
                }
            }
            (WatchPurpose::SourcePath, "d") => {
                match self.owning_source(dom, target) {
                    Some(source) => self.fan_out(dom, &source),
                    None => 0,
                }
            }
            _ => 0,
        };
        self.tracer.mutation(&MutationEvent {
            key,
            attribute: &mutation.attribute,
            enqueued,
        });
        enqueued
    }

    /// Handles an attribute change seen by the preview's scene-wide
    /// observer: a consumer that lost its `data-clip-path` has its clip
    /// removed right away.
    ///
    /// Always returns `true`; the caller is expected to
    /// [`reload_scene`](Self::reload_scene) on the next frame so existing
    /// subscriptions see the change first.
    pub fn handle_preview_change(&mut self, dom: &mut D, mutation: &Mutation<D::Node>) -> bool {
        if !dom.has_attribute(&mutation.target, attr::CLIP_PATH) {
            self.remove(dom, &mutation.target);
        }
        true
    }

    /// Flushes queued updates if the scheduler admits `tick`.
    ///
    /// Returns the number of updates run.
    pub fn tick(&mut self, dom: &mut D, tick: &Tick) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let Some(flush) = self.scheduler.begin_flush(tick) else {
            return 0;
        };
        self.tracer.flush(&FlushEvent {
            frame_index: flush.tick.frame_index,
            now: flush.tick.now,
            updates: flush.items.len(),
        });
        let count = flush.items.len();
        for (_, consumer) in flush.items {
            self.run_update(dom, &consumer);
        }
        self.scheduler.finish_flush();
        count
    }

    /// One frame: routes `records`, then ticks.
    ///
    /// Returns the number of updates run.
    pub fn run_frame(
        &mut self,
        dom: &mut D,
        records: impl IntoIterator<Item = (WatchKey, Mutation<D::Node>)>,
        tick: &Tick,
    ) -> usize {
        for (key, mutation) in records {
            self.handle_mutation(dom, &key, &mutation);
        }
        self.tick(dom, tick)
    }

    /// Re-resolves `consumer`'s source and generates or removes its clip.
    fn run_update(&mut self, dom: &mut D, consumer: &D::Node) {
        let Some(selector) = ConsumerConfig::read(dom, consumer).selector else {
            self.remove(dom, consumer);
            return;
        };
        let Some(scene) = &self.scene else {
            self.tracer.skip(&SkipEvent {
                consumer: dom.id(consumer).as_ref(),
                reason: SkipReason::NoScene,
            });
            return;
        };
        match dom.query(&scene.node, &selector) {
            Some(source) => {
                self.generate_clip_path_for_element(dom, &source, consumer);
            }
            None => self.remove(dom, consumer),
        }
    }

    fn remove(&mut self, dom: &mut D, consumer: &D::Node) {
        clip::remove_clip(dom, consumer);
        self.tracer.clip_removed(&ClipRemovedEvent {
            consumer: dom.id(consumer).as_ref(),
        });
    }

    /// Subscribes to a consumer, its source and the source's path. Returns
    /// the number of new subscriptions.
    fn watch_consumer(&mut self, dom: &mut D, scene_node: &D::Node, consumer: &D::Node) -> usize {
        let config = ConsumerConfig::read(dom, consumer);
        if config.is_static && !self.config.preview {
            return 0;
        }
        let Some(consumer_id) = dom.id(consumer) else {
            self.tracer.skip(&SkipEvent {
                consumer: None,
                reason: SkipReason::MissingId,
            });
            return 0;
        };

        let mut targets: Vec<(WatchKey, D::Node)> = Vec::with_capacity(3);
        targets.push((
            WatchKey::new(consumer_id, WatchPurpose::Consumer),
            consumer.clone(),
        ));
        if let Some(source) = config
            .selector
            .as_deref()
            .and_then(|s| dom.query(scene_node, s))
            && let Some(source_id) = dom.id(&source)
        {
            if let Some(path) = dom.source_path(&source) {
                targets.push((
                    WatchKey::new(source_id.clone(), WatchPurpose::SourcePath),
                    path,
                ));
            }
            targets.push((WatchKey::new(source_id, WatchPurpose::Source), source));
        }

        let Some(scene) = self.scene.as_mut() else {
            return 0;
        };
        let mut created = 0;
        for (key, node) in targets {
            let new = scene.observers.watch(key.clone(), |key| {
                dom.subscribe(&node, key.purpose.filter(), key.clone())
            });
            if new {
                created += 1;
                self.tracer.watch(&key);
            }
        }
        created
    }

    /// Whether the source's live geometry differs from its snapshot.
    fn source_moved(&self, dom: &D, source: &D::Node) -> bool {
        let (Some(scene), Some(id)) = (&self.scene, dom.id(source)) else {
            return false;
        };
        let live = TransformSnapshot::read(dom, source);
        source_geometry_changed(&scene.snapshots, &id, &live)
    }

    /// The closest ancestor of a source path that carries the consumer
    /// back-reference.
    fn owning_source(&self, dom: &D, path: &D::Node) -> Option<D::Node> {
        let mut cursor = dom.parent(path);
        while let Some(node) = cursor {
            if dom.has_attribute(&node, attr::SELECTOR) {
                return Some(node);
            }
            cursor = dom.parent(&node);
        }
        None
    }

    /// Queues every consumer referencing `source` through its back-reference.
    fn fan_out(&mut self, dom: &mut D, source: &D::Node) -> usize {
        let Some(selector) = dom
            .attribute(source, attr::SELECTOR)
            .filter(|s| !s.is_empty())
        else {
            return 0;
        };
        let scope = if self.config.preview {
            dom.document_root()
        } else if let Some(scene) = &self.scene {
            scene.node.clone()
        } else {
            return 0;
        };
        let consumers = dom.query_all(&scope, &attribute_equals_selector(attr::CLIP_PATH, &selector));
        consumers
            .iter()
            .filter(|consumer| self.apply_clip_path_to_element(dom, consumer))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    use crate::geometry::GeometryProperty;
    use crate::id::ElementId;
    use crate::memory::{MemoryDom, NodeId};
    use crate::time::{Duration, HostTime};

    struct Doc {
        dom: MemoryDom,
        scene: NodeId,
        wrapper: NodeId,
        consumer: NodeId,
        source: NodeId,
        path: NodeId,
    }

    fn doc() -> Doc {
        let mut dom = MemoryDom::new("doc");
        let scene = dom.scene("intro");
        let wrapper = dom.element(scene, "div");
        let consumer = dom.element(wrapper, "div");
        dom.set_attr(consumer, "id", "photo");
        dom.set_attr(consumer, attr::CLIP_PATH, "#mask");

        let source = dom.element(scene, "div");
        dom.set_attr(source, "id", "mask");
        let svg = dom.element(source, "svg");
        let path = dom.element(svg, "path");
        dom.set_attr(path, "d", "M0 0 H10 V10 Z");
        dom.set_geometry(source, GeometryProperty::Left, 5.0);
        Doc {
            dom,
            scene,
            wrapper,
            consumer,
            source,
            path,
        }
    }

    fn tick_at(ms: u64, index: u64) -> Tick {
        Tick::new(HostTime(0) + Duration::from_millis(ms), index)
    }

    fn loaded(config: EngineConfig) -> (Doc, ClipEngine<MemoryDom>) {
        let mut d = doc();
        let mut engine = ClipEngine::new(config);
        engine.on_document_load(&mut d.dom);
        engine.on_scene_load(&mut d.dom);
        (d, engine)
    }

    fn frame(d: &mut Doc, engine: &mut ClipEngine<MemoryDom>, ms: u64, index: u64) -> usize {
        let records = d.dom.take_mutations();
        engine.run_frame(&mut d.dom, records, &tick_at(ms, index))
    }

    fn clip_of(d: &Doc) -> Option<String> {
        d.dom.style_property(&d.wrapper, "clip-path")
    }

    #[test]
    fn scene_load_subscribes_and_first_frame_applies() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        let scene = engine.scene().unwrap();
        assert_eq!(scene.node, d.scene);
        assert_eq!(scene.observers.len(), 3);
        assert_eq!(d.dom.active_subscriptions(), 3);

        assert_eq!(frame(&mut d, &mut engine, 0, 0), 1);
        let clip = clip_of(&d).unwrap();
        assert!(clip.starts_with("url(\"#clip_path_photo_mask_"), "{clip}");
        assert_eq!(
            d.dom.attribute(&d.source, attr::SELECTOR).as_deref(),
            Some("#mask")
        );
    }

    #[test]
    fn load_reports_loop_start() {
        let mut d = doc();
        let mut engine: ClipEngine<MemoryDom> = ClipEngine::new(EngineConfig::runtime());
        let load = engine.on_scene_load(&mut d.dom);
        assert_eq!(load.consumers, 1);
        assert_eq!(load.start, Some(LoopStart::Immediate));

        let mut empty = MemoryDom::new("doc");
        empty.scene("blank");
        let mut engine: ClipEngine<MemoryDom> = ClipEngine::new(EngineConfig::runtime());
        assert_eq!(engine.on_scene_load(&mut empty).start, None);

        let mut d = doc();
        let mut engine: ClipEngine<MemoryDom> = ClipEngine::new(EngineConfig::preview());
        assert_eq!(
            engine.on_scene_load(&mut d.dom).start,
            Some(LoopStart::NextFrame)
        );
    }

    #[test]
    fn disabled_engine_is_inert() {
        let mut d = doc();
        let config = EngineConfig {
            enabled: false,
            ..EngineConfig::runtime()
        };
        let mut engine = ClipEngine::new(config);
        assert_eq!(engine.on_scene_load(&mut d.dom), SceneLoad::IDLE);
        assert_eq!(frame(&mut d, &mut engine, 0, 0), 0);
        assert_eq!(d.dom.active_subscriptions(), 0);
        assert!(clip_of(&d).is_none());
    }

    #[test]
    fn static_consumers_are_not_observed_at_runtime() {
        let mut d = doc();
        d.dom.set_attr(d.consumer, attr::STATIC, "");
        let mut engine = ClipEngine::new(EngineConfig::runtime());
        engine.on_scene_load(&mut d.dom);
        assert_eq!(d.dom.active_subscriptions(), 0);
        // Still applied once.
        assert_eq!(frame(&mut d, &mut engine, 0, 0), 1);
        assert!(clip_of(&d).is_some());

        let mut d = doc();
        d.dom.set_attr(d.consumer, attr::STATIC, "");
        let mut engine = ClipEngine::new(EngineConfig::preview());
        engine.on_scene_load(&mut d.dom);
        assert_eq!(d.dom.active_subscriptions(), 3);
    }

    #[test]
    fn burst_of_mutations_coalesces_to_one_update() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        frame(&mut d, &mut engine, 0, 0);

        d.dom.set_attr(d.consumer, attr::CLIP_RULE, "evenodd");
        d.dom.set_attr(d.consumer, attr::CLIP_RULE, "nonzero");
        d.dom.set_geometry(d.source, GeometryProperty::Left, 6.0);
        d.dom.set_geometry(d.source, GeometryProperty::Top, 7.0);
        d.dom.set_attr(d.path, "d", "M0 0 H20 V20 Z");
        assert_eq!(frame(&mut d, &mut engine, 16, 1), 1);

        let defs = d.dom.query(&d.source, "defs").unwrap();
        let clip_path = d.dom.query(&defs, "clipPath > path").unwrap();
        assert_eq!(
            d.dom.attribute(&clip_path, "transform").as_deref(),
            Some("translate(6 7)")
        );
        assert_eq!(
            d.dom.attribute(&clip_path, "d").as_deref(),
            Some("M0 0 H20 V20 Z")
        );
        assert_eq!(
            d.dom.attribute(&clip_path, "clip-rule").as_deref(),
            Some("nonzero")
        );
    }

    #[test]
    fn source_move_alone_regenerates_consumer() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        frame(&mut d, &mut engine, 0, 0);

        d.dom.set_geometry(d.source, GeometryProperty::Left, 42.0);
        let records = d.dom.take_mutations();
        assert!(
            records.iter().all(|(key, _)| key.purpose == WatchPurpose::Source),
            "only the source reported changes"
        );
        assert_eq!(engine.run_frame(&mut d.dom, records, &tick_at(16, 1)), 1);

        let clip_path = d.dom.query(&d.source, "defs > clipPath > path").unwrap();
        assert_eq!(
            d.dom.attribute(&clip_path, "transform").as_deref(),
            Some("translate(42 0)")
        );
        let clip = clip_of(&d).unwrap();
        let id = d.dom.query(&d.source, "defs > clipPath").unwrap();
        let id = d.dom.attribute(&id, "id").unwrap();
        assert_eq!(clip, format!("url(\"#{id}\")"));
    }

    #[test]
    fn preview_source_move_reaches_consumers_outside_the_scene() {
        for (config, expected) in [(EngineConfig::runtime(), 1), (EngineConfig::preview(), 2)] {
            let mut d = doc();
            let elsewhere = d.dom.scene("outro");
            let other_wrapper = d.dom.element(elsewhere, "div");
            let other = d.dom.element(other_wrapper, "div");
            d.dom.set_attr(other, "id", "badge");
            d.dom.set_attr(other, attr::CLIP_PATH, "#mask");

            let mut engine = ClipEngine::new(config);
            engine.on_document_load(&mut d.dom);
            engine.on_scene_load(&mut d.dom);
            assert_eq!(frame(&mut d, &mut engine, 0, 0), 1, "{config:?}");

            d.dom.set_geometry(d.source, GeometryProperty::Left, 42.0);
            assert_eq!(frame(&mut d, &mut engine, 16, 1), expected, "{config:?}");
            assert_eq!(
                d.dom.style_property(&other_wrapper, "clip-path").is_some(),
                config.preview,
                "{config:?}"
            );
        }
    }

    #[test]
    fn document_load_releases_previous_scene() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        assert_eq!(d.dom.active_subscriptions(), 3);
        assert_eq!(engine.scheduler().pending().len(), 1);

        engine.on_document_load(&mut d.dom);
        assert!(engine.scene().is_none());
        assert_eq!(d.dom.active_subscriptions(), 0);
        assert!(engine.scheduler().pending().is_empty());

        d.dom.set_attr(d.consumer, attr::CLIP_RULE, "evenodd");
        assert!(d.dom.take_mutations().is_empty());
    }

    #[test]
    fn engine_writes_do_not_feed_back() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        frame(&mut d, &mut engine, 0, 0);
        // The flush hid the source (a style write) and set the back-reference.
        // Neither changes geometry, so nothing is queued.
        assert_eq!(frame(&mut d, &mut engine, 16, 1), 0);
        assert!(engine.scheduler().pending().is_empty());
    }

    #[test]
    fn clearing_selector_removes_clip_immediately() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        frame(&mut d, &mut engine, 0, 0);
        assert!(clip_of(&d).is_some());

        d.dom.remove_attr(d.consumer, attr::CLIP_PATH);
        for (key, m) in d.dom.take_mutations() {
            engine.handle_mutation(&mut d.dom, &key, &m);
        }
        // Removed before any tick.
        assert!(clip_of(&d).is_none());
        assert!(d.dom.style_property(&d.wrapper, "-webkit-clip-path").is_none());
    }

    #[test]
    fn unresolvable_selector_removes_clip_on_flush() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        frame(&mut d, &mut engine, 0, 0);
        d.dom.set_attr(d.consumer, attr::CLIP_PATH, "#nowhere");
        assert_eq!(frame(&mut d, &mut engine, 16, 1), 1);
        assert!(clip_of(&d).is_none());
    }

    #[test]
    fn geometry_change_without_snapshot_is_ignored() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        // Drop the initial work so no snapshot exists yet.
        let _ = d.dom.take_mutations();
        let key = WatchKey::new(ElementId::from("mask"), WatchPurpose::Source);
        let m = Mutation {
            target: d.source,
            attribute: "style".into(),
            old_value: None,
        };
        assert_eq!(engine.handle_mutation(&mut d.dom, &key, &m), 0);
    }

    #[test]
    fn path_change_fans_out_to_all_consumers_of_source() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        let other_wrapper = d.dom.element(d.scene, "div");
        let other = d.dom.element(other_wrapper, "div");
        d.dom.set_attr(other, "id", "badge");
        d.dom.set_attr(other, attr::CLIP_PATH, "#mask");
        frame(&mut d, &mut engine, 0, 0);

        d.dom.set_attr(d.path, "d", "M1 1 Z");
        assert_eq!(frame(&mut d, &mut engine, 16, 1), 2);
        assert!(d.dom.style_property(&other_wrapper, "clip-path").is_some());
    }

    #[test]
    fn fps_cap_gates_flushes() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        assert_eq!(engine.set_frames_per_second(30).map(FrameRate::get), Ok(30));
        assert_eq!(frame(&mut d, &mut engine, 0, 0), 1);

        d.dom.set_attr(d.consumer, attr::CLIP_RULE, "evenodd");
        assert_eq!(frame(&mut d, &mut engine, 10, 1), 0);
        assert_eq!(frame(&mut d, &mut engine, 40, 2), 1);

        assert!(engine.set_frames_per_second(60).is_err());
        assert_eq!(engine.config().pacing, Pacing::Uncapped);
    }

    #[test]
    fn unload_releases_and_isolates_scenes() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        frame(&mut d, &mut engine, 0, 0);
        engine.on_scene_unload(&mut d.dom);
        assert!(engine.scene().is_none());
        assert_eq!(d.dom.active_subscriptions(), 0);

        // Changes after unload are not observed.
        let _ = d.dom.take_mutations();
        d.dom.set_geometry(d.source, GeometryProperty::Left, 50.0);
        assert!(d.dom.take_mutations().is_empty());

        // A new scene starts with an empty snapshot cache.
        let second = d.dom.scene("outro");
        d.dom.show_scene(second);
        engine.on_scene_load(&mut d.dom);
        let scene = engine.scene().unwrap();
        assert_eq!(scene.node, second);
        assert!(scene.snapshots.is_empty());
    }

    #[test]
    fn unload_keeps_queued_work() {
        let (mut d, mut engine) = loaded(EngineConfig::runtime());
        engine.on_scene_unload(&mut d.dom);
        assert_eq!(engine.scheduler().pending().len(), 1);

        // Drained on the next frame; without a scene nothing is applied.
        assert_eq!(frame(&mut d, &mut engine, 0, 0), 1);
        assert!(engine.scheduler().pending().is_empty());
        assert!(clip_of(&d).is_none());
    }

    #[test]
    fn consumer_without_id_is_skipped() {
        let mut d = doc();
        let anon = d.dom.element(d.scene, "div");
        d.dom.set_attr(anon, attr::CLIP_PATH, "#mask");
        let mut engine = ClipEngine::new(EngineConfig::runtime());
        let load = engine.on_scene_load(&mut d.dom);
        assert_eq!(load.consumers, 2);
        assert_eq!(engine.scheduler().pending().len(), 1);
    }

    #[test]
    fn preview_change_removes_and_requests_reload() {
        let (mut d, mut engine) = loaded(EngineConfig::preview());
        frame(&mut d, &mut engine, 0, 0);
        assert!(clip_of(&d).is_some());
        // Preview never hides the source.
        assert!(d.dom.style_property(&d.source, "opacity").is_none());

        d.dom.remove_attr(d.consumer, attr::CLIP_PATH);
        let m = Mutation {
            target: d.consumer,
            attribute: attr::CLIP_PATH.into(),
            old_value: Some("#mask".into()),
        };
        assert!(engine.handle_preview_change(&mut d.dom, &m));
        assert!(clip_of(&d).is_none());
        let load = engine.reload_scene(&mut d.dom);
        assert_eq!(load.consumers, 0);
    }
}
