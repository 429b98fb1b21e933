// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Support for the authoring tool's live preview.
//!
//! The preview renders the same document structure as an export, but without
//! the runtime's property accessor and with a different scene container. The
//! [`PreviewDom`] adapter wraps any [`Dom`] and substitutes those parts:
//!
//! - geometry comes from the preview's `hypeattribute*` attributes, the
//!   inline `width`/`height` and the scale functions of the inline
//!   `transform`;
//! - the scene is the `#HypeMainContentDiv` element;
//! - the document id is fixed.
//!
//! [`correct_zoom`] rewrites the preview's `zoom` style into an equivalent
//! transform, which clip paths follow correctly.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::dom::{Dom, attribute_equals_selector};
use crate::geometry::GeometryProperty;
use crate::id::ElementId;
use crate::observer::{AttributeFilter, WatchKey};

/// Preview-only attribute names.
pub mod attr {
    /// Horizontal offset in pixels.
    pub const LEFT: &str = "hypeattributeleft";
    /// Vertical offset in pixels.
    pub const TOP: &str = "hypeattributetop";
    /// Rotation in degrees.
    pub const ROTATION: &str = "hypeattributerotationanglez";
    /// Stable object id; element ids are not stable in the preview.
    pub const OBJECT_ID: &str = "hypeobjectid";
}

/// Document id reported in the preview.
pub const DOCUMENT_ID: &str = "hypeDocument";
/// Id of the preview's scene container.
pub const SCENE_ID: &str = "HypeMainContentDiv";
/// Id of the element whose `zoom` is corrected.
pub const EDITOR_ID: &str = "HypeSceneEditor";

/// Parses the leading number of a CSS value (`"12.5px"` → `12.5`), like
/// `parseFloat`.
#[must_use]
pub fn parse_leading_number(value: &str) -> Option<f64> {
    let value = value.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in value.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    value[..end].parse().ok()
}

/// A parsed CSS transform function: its name and numeric arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformFunction {
    /// Function name, e.g. `scaleX`.
    pub name: String,
    /// Leading numbers of each argument.
    pub args: Vec<f64>,
}

/// Splits an inline `transform` value into its functions.
///
/// Functions whose arguments are not numeric are skipped.
#[must_use]
pub fn parse_transform_functions(value: &str) -> Vec<TransformFunction> {
    let mut out = Vec::new();
    let mut rest = value;
    while let Some(open) = rest.find('(') {
        let Some(close) = rest[open..].find(')').map(|c| open + c) else {
            break;
        };
        let name = rest[..open].trim().trim_start_matches(',').trim();
        let args: Option<Vec<f64>> = rest[open + 1..close]
            .split(',')
            .map(parse_leading_number)
            .collect();
        if let Some(args) = args
            && !name.is_empty()
        {
            out.push(TransformFunction {
                name: name.into(),
                args,
            });
        }
        rest = &rest[close + 1..];
    }
    out
}

/// Scale factors of an inline `transform` value, `1` for missing axes.
#[must_use]
pub fn transform_scale(value: &str) -> (f64, f64) {
    let (mut sx, mut sy) = (1.0, 1.0);
    for f in parse_transform_functions(value) {
        match (f.name.as_str(), f.args.as_slice()) {
            ("scaleX", [x, ..]) => sx = *x,
            ("scaleY", [y, ..]) => sy = *y,
            ("scale", [x]) => (sx, sy) = (*x, *x),
            ("scale", [x, y, ..]) => (sx, sy) = (*x, *y),
            _ => {}
        }
    }
    (sx, sy)
}

/// Reads a geometry property the way the preview exposes it.
#[must_use]
pub fn preview_geometry<D: Dom + ?Sized>(
    dom: &D,
    node: &D::Node,
    property: GeometryProperty,
) -> Option<f64> {
    let number = |v: Option<String>| v.as_deref().and_then(parse_leading_number);
    match property {
        GeometryProperty::Left => number(dom.attribute(node, attr::LEFT)),
        GeometryProperty::Top => number(dom.attribute(node, attr::TOP)),
        GeometryProperty::RotateZ => number(dom.attribute(node, attr::ROTATION)),
        GeometryProperty::Width => number(dom.style_property(node, "width")),
        GeometryProperty::Height => number(dom.style_property(node, "height")),
        GeometryProperty::ScaleX | GeometryProperty::ScaleY => {
            let (sx, sy) = dom
                .style_property(node, "transform")
                .map_or((1.0, 1.0), |t| transform_scale(&t));
            Some(if property == GeometryProperty::ScaleX {
                sx
            } else {
                sy
            })
        }
    }
}

/// Replaces an inline `zoom` on `node` by `scale(z, z)` anchored top-left.
///
/// Returns `true` if a zoom was corrected.
pub fn correct_zoom<D: Dom + ?Sized>(dom: &mut D, node: &D::Node) -> bool {
    let Some(zoom) = dom.style_property(node, "zoom") else {
        return false;
    };
    dom.remove_style_property(node, "zoom");
    dom.set_style_property(node, "transform", &format!("scale({zoom}, {zoom})"));
    dom.set_style_property(node, "transform-origin", "left top");
    true
}

/// A [`Dom`] as seen from inside the authoring preview.
#[derive(Debug)]
pub struct PreviewDom<D> {
    inner: D,
}

impl<D: Dom> PreviewDom<D> {
    /// Wraps `inner`.
    #[must_use]
    pub const fn new(inner: D) -> Self {
        Self { inner }
    }

    /// The wrapped document.
    #[must_use]
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// The wrapped document, mutably.
    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    /// Unwraps the adapter.
    #[must_use]
    pub fn into_inner(self) -> D {
        self.inner
    }

    /// The `svg > path` of `source`, located through its object id so the
    /// lookup survives the preview rebuilding element ids.
    #[must_use]
    pub fn object_path(&self, source: &D::Node) -> Option<D::Node> {
        let object_id = self.inner.attribute(source, attr::OBJECT_ID)?;
        let selector = format!(
            "{} > svg > path",
            attribute_equals_selector(attr::OBJECT_ID, &object_id)
        );
        self.inner.query(&self.inner.document_root(), &selector)
    }
}

impl<D: Dom> Dom for PreviewDom<D> {
    type Node = D::Node;
    type Subscription = D::Subscription;

    fn document_id(&self) -> String {
        DOCUMENT_ID.into()
    }

    fn document_root(&self) -> D::Node {
        self.inner.document_root()
    }

    fn locate_scene(&self) -> Option<D::Node> {
        self.inner
            .query(&self.inner.document_root(), &format!("#{SCENE_ID}"))
    }

    fn id(&self, node: &D::Node) -> Option<ElementId> {
        self.inner.id(node)
    }

    fn query(&self, scope: &D::Node, selector: &str) -> Option<D::Node> {
        self.inner.query(scope, selector)
    }

    fn query_all(&self, scope: &D::Node, selector: &str) -> Vec<D::Node> {
        self.inner.query_all(scope, selector)
    }

    fn parent(&self, node: &D::Node) -> Option<D::Node> {
        self.inner.parent(node)
    }

    fn child_by_tag(&self, parent: &D::Node, tag: &str) -> Option<D::Node> {
        self.inner.child_by_tag(parent, tag)
    }

    fn child_by_id(&self, parent: &D::Node, accept: &dyn Fn(&str) -> bool) -> Option<D::Node> {
        self.inner.child_by_id(parent, accept)
    }

    fn has_class(&self, node: &D::Node, class: &str) -> bool {
        self.inner.has_class(node, class)
    }

    fn attribute(&self, node: &D::Node, name: &str) -> Option<String> {
        self.inner.attribute(node, name)
    }

    fn set_attribute(&mut self, node: &D::Node, name: &str, value: &str) {
        self.inner.set_attribute(node, name, value);
    }

    fn style_property(&self, node: &D::Node, name: &str) -> Option<String> {
        self.inner.style_property(node, name)
    }

    fn set_style_property(&mut self, node: &D::Node, name: &str, value: &str) {
        self.inner.set_style_property(node, name, value);
    }

    fn remove_style_property(&mut self, node: &D::Node, name: &str) {
        self.inner.remove_style_property(node, name);
    }

    fn geometry(&self, node: &D::Node, property: GeometryProperty) -> Option<f64> {
        preview_geometry(&self.inner, node, property)
    }

    fn source_path(&self, source: &D::Node) -> Option<D::Node> {
        self.object_path(source)
            .or_else(|| self.inner.source_path(source))
    }

    fn create_svg_child(&mut self, parent: &D::Node, tag: &str) -> Option<D::Node> {
        self.inner.create_svg_child(parent, tag)
    }

    fn move_to_end(&mut self, node: &D::Node) {
        self.inner.move_to_end(node);
    }

    fn force_reflow(&mut self, node: &D::Node) {
        self.inner.force_reflow(node);
    }

    fn subscribe(
        &mut self,
        target: &D::Node,
        filter: AttributeFilter,
        key: WatchKey,
    ) -> Option<D::Subscription> {
        self.inner.subscribe(target, filter, key)
    }

    fn unsubscribe(&mut self, subscription: D::Subscription) {
        self.inner.unsubscribe(subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDom;

    #[test]
    fn leading_numbers() {
        assert_eq!(parse_leading_number("12.5px"), Some(12.5));
        assert_eq!(parse_leading_number(" -3"), Some(-3.0));
        assert_eq!(parse_leading_number("0.75"), Some(0.75));
        assert_eq!(parse_leading_number("px"), None);
        assert_eq!(parse_leading_number(""), None);
        assert_eq!(parse_leading_number("-"), None);
    }

    #[test]
    fn transform_functions() {
        let fns = parse_transform_functions("translateX(10px) scaleX(2) scaleY(0.5) rotateZ(45deg)");
        let names: Vec<_> = fns.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["translateX", "scaleX", "scaleY", "rotateZ"]);
        assert_eq!(transform_scale("translateX(10px) scaleX(2) scaleY(0.5)"), (2.0, 0.5));
        assert_eq!(transform_scale("scale(3)"), (3.0, 3.0));
        assert_eq!(transform_scale("scale(1.5, 2)"), (1.5, 2.0));
        assert_eq!(transform_scale(""), (1.0, 1.0));
        assert_eq!(transform_scale("rotate(10deg)"), (1.0, 1.0));
    }

    #[test]
    fn geometry_from_preview_attributes() {
        let mut dom = MemoryDom::new("ignored");
        let root = dom.document_root();
        let scene = dom.element(root, "div");
        dom.set_attr(scene, "id", SCENE_ID);
        let el = dom.element(scene, "div");
        dom.set_attr(el, attr::LEFT, "12");
        dom.set_attr(el, attr::TOP, "-4.5");
        dom.set_attr(el, attr::ROTATION, "30");
        dom.set_style(el, "width", "200px");
        dom.set_style(el, "height", "100px");
        dom.set_style(el, "transform", "translateX(12px) scaleX(2)");

        let preview = PreviewDom::new(dom);
        assert_eq!(preview.document_id(), DOCUMENT_ID);
        assert_eq!(preview.locate_scene(), Some(scene));
        let g = |p| preview.geometry(&el, p);
        assert_eq!(g(GeometryProperty::Left), Some(12.0));
        assert_eq!(g(GeometryProperty::Top), Some(-4.5));
        assert_eq!(g(GeometryProperty::RotateZ), Some(30.0));
        assert_eq!(g(GeometryProperty::Width), Some(200.0));
        assert_eq!(g(GeometryProperty::Height), Some(100.0));
        assert_eq!(g(GeometryProperty::ScaleX), Some(2.0));
        assert_eq!(g(GeometryProperty::ScaleY), Some(1.0));
    }

    #[test]
    fn source_path_by_object_id() {
        let mut dom = MemoryDom::new("ignored");
        let root = dom.document_root();
        let source = dom.element(root, "div");
        dom.set_attr(source, attr::OBJECT_ID, "7");
        let svg = dom.element(source, "svg");
        let path = dom.element(svg, "path");
        let preview = PreviewDom::new(dom);
        assert_eq!(preview.source_path(&source), Some(path));
    }

    #[test]
    fn zoom_becomes_transform() {
        let mut dom = MemoryDom::new("doc");
        let root = dom.document_root();
        let editor = dom.element(root, "div");
        dom.set_style(editor, "zoom", "1.5");
        assert!(correct_zoom(&mut dom, &editor));
        assert_eq!(dom.style_property(&editor, "zoom"), None);
        assert_eq!(
            dom.style_property(&editor, "transform").as_deref(),
            Some("scale(1.5, 1.5)")
        );
        assert_eq!(
            dom.style_property(&editor, "transform-origin").as_deref(),
            Some("left top")
        );
        assert!(!correct_zoom(&mut dom, &editor));
    }
}
