// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host document contract.
//!
//! The engine never touches a concrete DOM. Everything it needs from the host
//! (element lookup, attributes, inline style, the host's geometry accessor,
//! SVG node creation and mutation subscriptions) goes through the [`Dom`]
//! trait. Two implementations exist:
//!
//! - `clipsync_backend_web::WebDom`: the browser DOM via `web-sys`.
//! - [`MemoryDom`](crate::memory::MemoryDom): an in-memory tree used for
//!   headless runs and tests.
//!
//! # Subscriptions
//!
//! Mutation observation is expressed as
//! [`subscribe`](Dom::subscribe)/[`unsubscribe`](Dom::unsubscribe). A
//! subscription does not carry a callback: implementations buffer the
//! resulting [`Mutation`] records together with the [`WatchKey`] they were
//! registered under, and the owner hands them to
//! [`ClipEngine::handle_mutation`](crate::engine::ClipEngine::handle_mutation).
//! The key's [`WatchPurpose`](crate::observer::WatchPurpose) selects the
//! handler, so routing stays typed.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::geometry::GeometryProperty;
use crate::id::ElementId;
use crate::observer::{AttributeFilter, WatchKey};

/// An observed attribute change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation<N> {
    /// The node whose attribute changed.
    pub target: N,
    /// Name of the changed attribute.
    pub attribute: String,
    /// Value before the change, if the attribute was present.
    pub old_value: Option<String>,
}

/// Read/write access to the host document.
///
/// Methods that can fail on the host side (selector syntax errors, detached
/// nodes) degrade to `None` or do nothing; the engine treats every such case
/// as "not there yet".
pub trait Dom {
    /// Handle to a node. Cheap to clone.
    type Node: Clone + PartialEq + fmt::Debug;
    /// Handle returned by [`subscribe`](Self::subscribe).
    type Subscription;

    /// Stable per-document identity.
    fn document_id(&self) -> String;

    /// The whole-document scope, used for lookups in preview mode.
    fn document_root(&self) -> Self::Node;

    /// Resolves the currently visible scene from the live document.
    fn locate_scene(&self) -> Option<Self::Node>;

    /// The node's non-empty `id` attribute.
    fn id(&self, node: &Self::Node) -> Option<ElementId>;

    /// First descendant of `scope` matching `selector`.
    fn query(&self, scope: &Self::Node, selector: &str) -> Option<Self::Node>;

    /// All descendants of `scope` matching `selector`, in document order.
    fn query_all(&self, scope: &Self::Node, selector: &str) -> Vec<Self::Node>;

    /// The node's parent element.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// First direct child of `parent` with the given tag name.
    fn child_by_tag(&self, parent: &Self::Node, tag: &str) -> Option<Self::Node>;

    /// First direct child of `parent` whose id is accepted by `accept`.
    fn child_by_id(
        &self,
        parent: &Self::Node,
        accept: &dyn Fn(&str) -> bool,
    ) -> Option<Self::Node>;

    /// Whether the node's class list contains `class`.
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    /// Attribute value, `None` when absent.
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Whether the attribute is present (even if empty).
    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Sets an attribute.
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    /// Inline style property value, `None` when unset or empty.
    fn style_property(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Sets an inline style property.
    fn set_style_property(&mut self, node: &Self::Node, name: &str, value: &str);

    /// Removes an inline style property.
    fn remove_style_property(&mut self, node: &Self::Node, name: &str);

    /// Reads a geometry property through the host's accessor.
    fn geometry(&self, node: &Self::Node, property: GeometryProperty) -> Option<f64>;

    /// The direct `path` child of `source`'s `svg`.
    fn source_path(&self, source: &Self::Node) -> Option<Self::Node> {
        let svg = self.query(source, "svg")?;
        self.child_by_tag(&svg, "path")
    }

    /// Creates an SVG-namespace element and appends it to `parent`.
    fn create_svg_child(&mut self, parent: &Self::Node, tag: &str) -> Option<Self::Node>;

    /// Moves `node` to the end of its parent's child list.
    fn move_to_end(&mut self, node: &Self::Node);

    /// Forces a synchronous layout of `node` by toggling its display.
    fn force_reflow(&mut self, node: &Self::Node);

    /// Starts observing attribute changes on `target`.
    ///
    /// Returns `None` if the host cannot observe the node.
    fn subscribe(
        &mut self,
        target: &Self::Node,
        filter: AttributeFilter,
        key: WatchKey,
    ) -> Option<Self::Subscription>;

    /// Stops a subscription. Records already delivered are unaffected.
    fn unsubscribe(&mut self, subscription: Self::Subscription);
}

/// Builds a `[name="value"]` attribute selector with `value` escaped.
#[must_use]
pub fn attribute_equals_selector(name: &str, value: &str) -> String {
    let mut out = String::with_capacity(name.len() + value.len() + 5);
    out.push('[');
    out.push_str(name);
    out.push_str("=\"");
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str("\"]");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_selector_escapes_quotes() {
        assert_eq!(
            attribute_equals_selector("data-clip-path", "#mask"),
            r##"[data-clip-path="#mask"]"##
        );
        assert_eq!(
            attribute_equals_selector("data-clip-path", r#"[title="a"]"#),
            r#"[data-clip-path="[title=\"a\"]"]"#
        );
    }
}
