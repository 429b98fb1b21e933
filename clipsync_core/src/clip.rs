// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip-path synthesis and removal.
//!
//! [`synthesize`] turns a source's vector path into a `clipPath` definition
//! stored under the source's own `svg > defs` and points the consumer at it
//! through the `clip-path` style property. [`remove_clip`] undoes the style
//! side; definitions themselves are never deleted.
//!
//! Each generation writes a fresh id. A definition is located for reuse by
//! its `(consumer, source)` prefix, updated in place and renamed, so the
//! old reference simply stops resolving once the style is rewritten.

use alloc::format;
use alloc::string::{String, ToString};

use crate::config::{ClipStyle, ConsumerConfig, FillRule, SourceConfig, attr};
use crate::dom::Dom;
use crate::scene::SnapshotCache;
use crate::transform::{SvgTransform, calculate_and_store};

/// Inclusive range of the random id disambiguator.
pub const SUFFIX_RANGE: core::ops::RangeInclusive<u32> = 100_001..=200_000;

const CLIP_PROPERTIES: [&str; 2] = ["-webkit-clip-path", "clip-path"];

/// Options that depend on the hosting environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Running in the authoring preview: keep `defs` last in the `svg` and
    /// never hide the source.
    pub preview: bool,
}

/// A generated clip-path definition.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPathDefinition {
    /// Unique id, referenced as `url("#id")`.
    pub id: String,
    /// Path data copied from the source.
    pub path_data: Option<String>,
    /// Consumer `clip-rule` override.
    pub clip_rule: Option<FillRule>,
    /// Transform placing the path in the consumer's space.
    pub transform: SvgTransform,
}

impl ClipPathDefinition {
    /// The style value referencing this definition.
    #[must_use]
    pub fn url(&self) -> String {
        format!("url(\"#{}\")", self.id)
    }
}

/// Id prefix shared by every generation for a `(consumer, source)` pair.
#[must_use]
pub fn id_prefix(consumer: &str, source: &str) -> String {
    format!("clip_path_{consumer}_{source}")
}

/// Whether `id` was generated for the pair behind `prefix`: the prefix, an
/// underscore, then a decimal suffix within [`SUFFIX_RANGE`].
///
/// Consumer and source ids may themselves contain underscores, so a plain
/// prefix test would also accept the ids of other pairs.
#[must_use]
pub fn is_generated_id(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|suffix| suffix.parse::<u32>().ok())
        .is_some_and(|n| SUFFIX_RANGE.contains(&n))
}

/// The node clip styles are applied to: the consumer itself when it is a
/// host element container, otherwise its parent.
#[must_use]
pub fn apply_target<D: Dom + ?Sized>(dom: &D, consumer: &D::Node) -> D::Node {
    if dom.has_class(consumer, attr::CONTAINER_CLASS) {
        return consumer.clone();
    }
    dom.parent(consumer).unwrap_or_else(|| consumer.clone())
}

/// Generates or refreshes the clip path of `consumer` from `source`.
///
/// `suffix` is the per-generation disambiguator appended to the id prefix
/// (see [`SUFFIX_RANGE`]). Returns `None` and touches nothing when the
/// source has no `svg` with a direct `path` child, or when either element
/// lacks an id.
pub fn synthesize<D: Dom + ?Sized>(
    dom: &mut D,
    snapshots: &mut SnapshotCache,
    source: &D::Node,
    consumer: &D::Node,
    options: SynthesisOptions,
    suffix: u32,
) -> Option<ClipPathDefinition> {
    let svg = dom.query(source, "svg")?;
    let path = dom.child_by_tag(&svg, "path")?;
    let consumer_id = dom.id(consumer)?;
    let source_id = dom.id(source)?;

    let source_config = SourceConfig::read(dom, source);
    let consumer_config = ConsumerConfig::read(dom, consumer);
    match source_config.style {
        ClipStyle::UrlReference => {}
    }

    let prefix = id_prefix(consumer_id.as_str(), source_id.as_str());
    let id = format!("{prefix}_{suffix}");

    let defs = match dom.child_by_tag(&svg, "defs") {
        Some(defs) => {
            if options.preview {
                dom.move_to_end(&defs);
            }
            defs
        }
        None => dom.create_svg_child(&svg, "defs")?,
    };

    let generated = |candidate: &str| is_generated_id(candidate, &prefix);
    let clip = match dom.child_by_id(&defs, &generated) {
        Some(clip) => clip,
        None => dom.create_svg_child(&defs, "clipPath")?,
    };
    let clip_path = match dom.child_by_tag(&clip, "path") {
        Some(p) => p,
        None => dom.create_svg_child(&clip, "path")?,
    };

    let definition = ClipPathDefinition {
        id,
        path_data: dom.attribute(&path, "d").filter(|d| !d.is_empty()),
        clip_rule: consumer_config.clip_rule,
        transform: calculate_and_store(dom, snapshots, source, &source_id),
    };

    if let Some(d) = &definition.path_data {
        dom.set_attribute(&clip_path, "d", d);
    }
    if let Some(rule) = definition.clip_rule {
        dom.set_attribute(&clip_path, "clip-rule", rule.as_str());
    }
    let transform = definition.transform.to_string();
    if !transform.is_empty() {
        dom.set_attribute(&clip_path, "transform", &transform);
    }
    dom.set_attribute(&clip_path, "shape-rendering", "optimizeSpeed");
    dom.set_attribute(&clip, "id", &definition.id);
    dom.set_attribute(&clip, "shape-rendering", "optimizeSpeed");

    let target = apply_target(dom, consumer);
    let url = definition.url();
    for property in CLIP_PROPERTIES {
        dom.set_style_property(&target, property, &url);
    }
    if let Some(selector) = &consumer_config.selector {
        dom.set_attribute(source, attr::SELECTOR, selector);
    }
    dom.force_reflow(&target);
    dom.set_style_property(&target, "overflow", "hidden");

    if !(options.preview || consumer_config.source_visible || source_config.visible) {
        dom.set_style_property(source, "opacity", "0");
        dom.set_style_property(source, "pointer-events", "none");
    }

    Some(definition)
}

/// Clears the clip style properties of `consumer`'s apply-to node.
pub fn remove_clip<D: Dom + ?Sized>(dom: &mut D, consumer: &D::Node) {
    let target = apply_target(dom, consumer);
    for property in CLIP_PROPERTIES {
        dom.remove_style_property(&target, property);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    use crate::geometry::GeometryProperty;
    use crate::id::ElementId;
    use crate::memory::{MemoryDom, NodeId};

    struct Fixture {
        dom: MemoryDom,
        wrapper: NodeId,
        consumer: NodeId,
        source: NodeId,
        svg: NodeId,
    }

    fn fixture() -> Fixture {
        let mut dom = MemoryDom::new("doc");
        let scene = dom.scene("scene1");
        let wrapper = dom.element(scene, "div");
        let consumer = dom.element(wrapper, "div");
        dom.set_attr(consumer, "id", "photo");
        dom.set_attr(consumer, attr::CLIP_PATH, "#mask");

        let source = dom.element(scene, "div");
        dom.set_attr(source, "id", "mask");
        let svg = dom.element(source, "svg");
        let path = dom.element(svg, "path");
        dom.set_attr(path, "d", "M0 0 L10 0 L10 10 Z");
        dom.set_geometry(source, GeometryProperty::Left, 10.0);
        dom.set_geometry(source, GeometryProperty::Top, 20.0);
        Fixture {
            dom,
            wrapper,
            consumer,
            source,
            svg,
        }
    }

    #[test]
    fn generates_definition_and_styles() {
        let mut f = fixture();
        let mut snapshots = SnapshotCache::new();
        let def = synthesize(
            &mut f.dom,
            &mut snapshots,
            &f.source,
            &f.consumer,
            SynthesisOptions::default(),
            123_456,
        )
        .unwrap();

        assert_eq!(def.id, "clip_path_photo_mask_123456");
        assert_eq!(def.path_data.as_deref(), Some("M0 0 L10 0 L10 10 Z"));
        assert_eq!(def.transform.to_string(), "translate(10 20)");

        // Styles land on the wrapper, not on the consumer.
        let url = "url(\"#clip_path_photo_mask_123456\")";
        assert_eq!(f.dom.style_property(&f.wrapper, "clip-path").as_deref(), Some(url));
        assert_eq!(
            f.dom.style_property(&f.wrapper, "-webkit-clip-path").as_deref(),
            Some(url)
        );
        assert_eq!(f.dom.style_property(&f.wrapper, "overflow").as_deref(), Some("hidden"));
        assert_eq!(f.dom.style_property(&f.consumer, "clip-path"), None);
        assert_eq!(f.dom.reflow_count(f.wrapper), 1);

        // Back-reference and hidden source.
        assert_eq!(f.dom.attribute(&f.source, attr::SELECTOR).as_deref(), Some("#mask"));
        assert_eq!(f.dom.style_property(&f.source, "opacity").as_deref(), Some("0"));
        assert_eq!(
            f.dom.style_property(&f.source, "pointer-events").as_deref(),
            Some("none")
        );

        // Definition structure: svg > defs > clipPath > path.
        let defs = f.dom.child_by_tag(&f.svg, "defs").unwrap();
        let clip = f.dom.child_by_tag(&defs, "clipPath").unwrap();
        assert_eq!(f.dom.attribute(&clip, "id").as_deref(), Some(def.id.as_str()));
        let clip_path = f.dom.child_by_tag(&clip, "path").unwrap();
        assert_eq!(
            f.dom.attribute(&clip_path, "transform").as_deref(),
            Some("translate(10 20)")
        );
        assert_eq!(
            f.dom.attribute(&clip_path, "shape-rendering").as_deref(),
            Some("optimizeSpeed")
        );
        assert_eq!(f.dom.attribute(&clip_path, "clip-rule"), None);

        assert!(snapshots.get(&ElementId::from("mask")).is_some());
    }

    #[test]
    fn regeneration_reuses_node_with_fresh_id() {
        let mut f = fixture();
        let mut snapshots = SnapshotCache::new();
        let opts = SynthesisOptions::default();
        let a = synthesize(&mut f.dom, &mut snapshots, &f.source, &f.consumer, opts, 100_001)
            .unwrap();
        let b = synthesize(&mut f.dom, &mut snapshots, &f.source, &f.consumer, opts, 200_000)
            .unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.path_data, b.path_data);
        assert_eq!(a.transform.to_string(), b.transform.to_string());

        let defs = f.dom.child_by_tag(&f.svg, "defs").unwrap();
        assert_eq!(f.dom.children(defs).len(), 1, "clipPath updated in place");
        assert_eq!(
            f.dom.style_property(&f.wrapper, "clip-path"),
            Some(b.url())
        );
    }

    #[test]
    fn clip_rule_override_and_malformed_value() {
        let mut f = fixture();
        let mut snapshots = SnapshotCache::new();
        f.dom.set_attr(f.consumer, attr::CLIP_RULE, "evenodd");
        let def = synthesize(
            &mut f.dom,
            &mut snapshots,
            &f.source,
            &f.consumer,
            SynthesisOptions::default(),
            150_000,
        )
        .unwrap();
        assert_eq!(def.clip_rule, Some(FillRule::EvenOdd));

        let mut g = fixture();
        g.dom.set_attr(g.consumer, attr::CLIP_RULE, "sideways");
        let def = synthesize(
            &mut g.dom,
            &mut snapshots,
            &g.source,
            &g.consumer,
            SynthesisOptions::default(),
            150_000,
        )
        .unwrap();
        assert_eq!(def.clip_rule, None);
    }

    #[test]
    fn visible_flag_on_either_side_keeps_source_shown() {
        for on_consumer in [true, false] {
            let mut f = fixture();
            let flagged = if on_consumer { f.consumer } else { f.source };
            f.dom.set_attr(flagged, attr::VISIBLE, "true");
            synthesize(
                &mut f.dom,
                &mut SnapshotCache::new(),
                &f.source,
                &f.consumer,
                SynthesisOptions::default(),
                100_001,
            )
            .unwrap();
            assert_eq!(f.dom.style_property(&f.source, "opacity"), None);
        }
    }

    #[test]
    fn preview_moves_defs_last_and_never_hides() {
        let mut f = fixture();
        let defs = f.dom.element(f.svg, "defs");
        // Put a path after defs; preview must move defs behind it.
        let extra = f.dom.element(f.svg, "path");
        synthesize(
            &mut f.dom,
            &mut SnapshotCache::new(),
            &f.source,
            &f.consumer,
            SynthesisOptions { preview: true },
            100_001,
        )
        .unwrap();
        let children = f.dom.children(f.svg);
        assert_eq!(children.last(), Some(&defs));
        assert!(children.contains(&extra));
        assert_eq!(f.dom.style_property(&f.source, "opacity"), None);
    }

    #[test]
    fn container_consumer_is_its_own_target() {
        let mut f = fixture();
        f.dom.set_attr(f.consumer, "class", attr::CONTAINER_CLASS);
        synthesize(
            &mut f.dom,
            &mut SnapshotCache::new(),
            &f.source,
            &f.consumer,
            SynthesisOptions::default(),
            100_001,
        )
        .unwrap();
        assert!(f.dom.style_property(&f.consumer, "clip-path").is_some());
        assert!(f.dom.style_property(&f.wrapper, "clip-path").is_none());
    }

    #[test]
    fn source_without_vector_content_is_a_no_op() {
        let mut dom = MemoryDom::new("doc");
        let scene = dom.scene("scene1");
        let wrapper = dom.element(scene, "div");
        let consumer = dom.element(wrapper, "div");
        dom.set_attr(consumer, "id", "photo");
        let source = dom.element(scene, "div");
        dom.set_attr(source, "id", "mask");
        dom.element(source, "img");

        dom.set_style(wrapper, "clip-path", "url(\"#old\")");
        let result = synthesize(
            &mut dom,
            &mut SnapshotCache::new(),
            &source,
            &consumer,
            SynthesisOptions::default(),
            100_001,
        );
        assert!(result.is_none());
        assert_eq!(
            dom.style_property(&wrapper, "clip-path").as_deref(),
            Some("url(\"#old\")")
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let mut f = fixture();
        synthesize(
            &mut f.dom,
            &mut SnapshotCache::new(),
            &f.source,
            &f.consumer,
            SynthesisOptions::default(),
            100_001,
        )
        .unwrap();
        remove_clip(&mut f.dom, &f.consumer);
        let once = (
            f.dom.style_property(&f.wrapper, "clip-path"),
            f.dom.style_property(&f.wrapper, "-webkit-clip-path"),
        );
        remove_clip(&mut f.dom, &f.consumer);
        let twice = (
            f.dom.style_property(&f.wrapper, "clip-path"),
            f.dom.style_property(&f.wrapper, "-webkit-clip-path"),
        );
        assert_eq!(once, (None, None));
        assert_eq!(once, twice);
    }

    #[test]
    fn underscored_consumer_ids_keep_their_own_definitions() {
        let mut f = fixture();
        let mut snapshots = SnapshotCache::new();
        let opts = SynthesisOptions::default();
        f.dom.set_attr(f.consumer, "id", "x_mask");
        f.dom.set_attr(f.consumer, attr::CLIP_RULE, "evenodd");
        let scene = f.dom.parent(&f.wrapper).unwrap();
        let other_wrapper = f.dom.element(scene, "div");
        let other = f.dom.element(other_wrapper, "div");
        f.dom.set_attr(other, "id", "x");
        f.dom.set_attr(other, attr::CLIP_PATH, "#mask");

        let long = synthesize(&mut f.dom, &mut snapshots, &f.source, &f.consumer, opts, 100_705)
            .unwrap();
        let short = synthesize(&mut f.dom, &mut snapshots, &f.source, &other, opts, 186_835)
            .unwrap();
        assert_eq!(long.id, "clip_path_x_mask_mask_100705");
        assert_eq!(short.id, "clip_path_x_mask_186835");

        let defs = f.dom.child_by_tag(&f.svg, "defs").unwrap();
        let ids: Vec<_> = f
            .dom
            .children(defs)
            .iter()
            .filter_map(|c| f.dom.attribute(c, "id"))
            .collect();
        assert_eq!(ids, [long.id.clone(), short.id.clone()]);
        assert_eq!(f.dom.style_property(&f.wrapper, "clip-path"), Some(long.url()));
        assert_eq!(f.dom.style_property(&other_wrapper, "clip-path"), Some(short.url()));

        let long_path = f.dom.query(&defs, "#clip_path_x_mask_mask_100705 > path").unwrap();
        assert_eq!(f.dom.attribute(&long_path, "clip-rule").as_deref(), Some("evenodd"));
        let short_path = f.dom.query(&defs, "#clip_path_x_mask_186835 > path").unwrap();
        assert_eq!(f.dom.attribute(&short_path, "clip-rule"), None);
    }

    #[test]
    fn generated_ids_need_an_in_range_suffix() {
        assert!(is_generated_id("clip_path_x_mask_186835", "clip_path_x_mask"));
        assert!(!is_generated_id("clip_path_x_mask_mask_100705", "clip_path_x_mask"));
        assert!(!is_generated_id("clip_path_x_mask_7", "clip_path_x_mask"));
        assert!(!is_generated_id("clip_path_x_mask_+150000", "clip_path_x_mask"));
        assert!(!is_generated_id("clip_path_x_mask", "clip_path_x_mask"));
    }

    #[test]
    fn suffix_range_bounds() {
        assert_eq!(*SUFFIX_RANGE.start(), 100_001);
        assert_eq!(*SUFFIX_RANGE.end(), 200_000);
        assert_eq!(id_prefix("a", "b"), "clip_path_a_b");
    }
}
