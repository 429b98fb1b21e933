// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory host document.
//!
//! [`MemoryDom`] implements [`Dom`] over a flat node arena. It mirrors the
//! parts of the browser the engine relies on: attributes, an ordered inline
//! style, per-node geometry values, selector queries and attribute
//! mutation records. It backs the crate's tests and headless simulations.
//!
//! The document is laid out like an exported one: a document container whose
//! id is the document id, with scene containers (class `HYPE_scene`) as
//! direct children. The first scene created is displayed.
//!
//! # Selectors
//!
//! Supported: type selectors, `*`, `#id`, `.class`, `[attr]` and every
//! attribute operator, compounds of those, and the descendant, child (`>`),
//! next-sibling (`+`) and later-sibling (`~`) combinators. Anything else
//! fails to parse and matches nothing.
//!
//! # Mutations
//!
//! Attribute writes (from either side), style writes and geometry writes are
//! reported to matching subscriptions. Style and geometry writes report the
//! `style` attribute, as the host's inline style is where geometry lives.
//! Records accumulate until [`MemoryDom::take_mutations`].

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::dom::{Dom, Mutation};
use crate::geometry::GeometryProperty;
use crate::id::ElementId;
use crate::observer::{AttributeFilter, WatchKey};
use selector::Compound;
use selectors::parser::Combinator;

mod selector;

/// Index of a node in a [`MemoryDom`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Handle of a [`MemoryDom`] subscription.
#[derive(Debug, PartialEq, Eq)]
pub struct MemorySubscription(usize);

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, String)>,
    style: Vec<(String, String)>,
    geometry: BTreeMap<GeometryProperty, f64>,
    reflows: usize,
}

impl NodeData {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn style_text(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.style {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push(';');
        }
        out
    }
}

#[derive(Debug)]
struct SubscriptionEntry {
    target: NodeId,
    filter: AttributeFilter,
    key: WatchKey,
    active: bool,
}

/// An in-memory document.
#[derive(Debug)]
pub struct MemoryDom {
    document_id: String,
    nodes: Vec<NodeData>,
    subscriptions: Vec<SubscriptionEntry>,
    mutations: Vec<(WatchKey, Mutation<NodeId>)>,
}

const ROOT: NodeId = NodeId(0);
const CONTAINER: NodeId = NodeId(1);

impl MemoryDom {
    /// Creates a document with an empty container whose id is `document_id`.
    #[must_use]
    pub fn new(document_id: &str) -> Self {
        let mut dom = Self {
            document_id: document_id.to_string(),
            nodes: Vec::new(),
            subscriptions: Vec::new(),
            mutations: Vec::new(),
        };
        dom.nodes.push(NodeData {
            tag: "#document".to_string(),
            ..NodeData::default()
        });
        let container = dom.element(ROOT, "div");
        dom.write_attribute(container, "id", Some(document_id));
        dom
    }

    /// Appends a scene container with the given id. The first scene of the
    /// document is displayed, later ones are hidden.
    pub fn scene(&mut self, id: &str) -> NodeId {
        let shown = self.node(CONTAINER).is_some_and(|c| c.children.is_empty());
        let scene = self.element(CONTAINER, "div");
        self.write_attribute(scene, "id", Some(id));
        self.write_attribute(scene, "class", Some("HYPE_scene"));
        self.write_style(scene, "display", Some(if shown { "block" } else { "none" }));
        scene
    }

    /// Displays `scene` and hides every other scene.
    pub fn show_scene(&mut self, scene: NodeId) {
        let scenes = self.children(CONTAINER).to_vec();
        for s in scenes {
            let display = if s == scene { "block" } else { "none" };
            self.write_style(s, "display", Some(display));
        }
    }

    /// Appends a new element to `parent` and returns it.
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        let has_parent = self.nodes.get(parent.0).is_some();
        self.nodes.push(NodeData {
            tag: tag.to_string(),
            parent: has_parent.then_some(parent),
            ..NodeData::default()
        });
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    /// Sets an attribute, as the host would.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.write_attribute(node, name, Some(value));
    }

    /// Removes an attribute, as the host would.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        self.write_attribute(node, name, None);
    }

    /// Sets an inline style property, as the host would.
    pub fn set_style(&mut self, node: NodeId, name: &str, value: &str) {
        self.write_style(node, name, Some(value));
    }

    /// Sets a geometry value, as the host's animation engine would.
    pub fn set_geometry(&mut self, node: NodeId, property: GeometryProperty, value: f64) {
        let old = self.node(node).map(NodeData::style_text);
        let Some(data) = self.nodes.get_mut(node.0) else {
            return;
        };
        data.geometry.insert(property, value);
        self.record(node, "style", old);
    }

    /// Direct children of `node`.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Tag name of `node`.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    /// Number of forced layouts on `node`.
    #[must_use]
    pub fn reflow_count(&self, node: NodeId) -> usize {
        self.node(node).map_or(0, |n| n.reflows)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.iter().filter(|s| s.active).count()
    }

    /// Removes and returns the buffered mutation records.
    pub fn take_mutations(&mut self) -> Vec<(WatchKey, Mutation<NodeId>)> {
        core::mem::take(&mut self.mutations)
    }

    fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0)
    }

    fn write_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        if name == "style" {
            self.write_style_text(node, value.unwrap_or(""));
            return;
        }
        let Some(data) = self.nodes.get_mut(node.0) else {
            return;
        };
        let pos = data.attributes.iter().position(|(n, _)| n == name);
        let old = match (pos, value) {
            (Some(i), Some(v)) => Some(core::mem::replace(&mut data.attributes[i].1, v.to_string())),
            (Some(i), None) => Some(data.attributes.remove(i).1),
            (None, Some(v)) => {
                data.attributes.push((name.to_string(), v.to_string()));
                None
            }
            (None, None) => return,
        };
        self.record(node, name, old);
    }

    fn write_style(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        let Some(data) = self.nodes.get_mut(node.0) else {
            return;
        };
        let old = data.style_text();
        let pos = data.style.iter().position(|(n, _)| n == name);
        match (pos, value) {
            (Some(i), Some(v)) => data.style[i].1 = v.to_string(),
            (Some(i), None) => {
                data.style.remove(i);
            }
            (None, Some(v)) => data.style.push((name.to_string(), v.to_string())),
            (None, None) => return,
        }
        let old = (!old.is_empty()).then_some(old);
        self.record(node, "style", old);
    }

    fn write_style_text(&mut self, node: NodeId, text: &str) {
        let Some(data) = self.nodes.get_mut(node.0) else {
            return;
        };
        let old = data.style_text();
        data.style = text
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let (name, value) = (name.trim(), value.trim());
                (!name.is_empty() && !value.is_empty())
                    .then(|| (name.to_string(), value.to_string()))
            })
            .collect();
        let old = (!old.is_empty()).then_some(old);
        self.record(node, "style", old);
    }

    fn record(&mut self, node: NodeId, attribute: &str, old_value: Option<String>) {
        for sub in &self.subscriptions {
            if sub.active && sub.target == node && sub.filter.iter().any(|f| *f == attribute) {
                self.mutations.push((
                    sub.key.clone(),
                    Mutation {
                        target: node,
                        attribute: attribute.to_string(),
                        old_value: old_value.clone(),
                    },
                ));
            }
        }
    }

    fn descendants(&self, scope: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(scope) {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn select(&self, scope: NodeId, selector: &str, first_only: bool) -> Vec<NodeId> {
        let Some(selector) = selector::parse(selector) else {
            return Vec::new();
        };
        let mut all = Vec::new();
        self.descendants(scope, &mut all);
        let mut found = Vec::new();
        for node in all {
            if self.matches(node, &selector.parts, selector.parts.len() - 1) {
                found.push(node);
                if first_only {
                    break;
                }
            }
        }
        found
    }

    fn matches(&self, node: NodeId, parts: &[(Combinator, Compound)], index: usize) -> bool {
        let Some(data) = self.node(node) else {
            return false;
        };
        let (combinator, compound) = &parts[index];
        if !self.matches_compound(node, data, compound) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => data
                .parent
                .is_some_and(|p| self.matches(p, parts, index - 1)),
            Combinator::Descendant => {
                let mut cursor = data.parent;
                while let Some(ancestor) = cursor {
                    if self.matches(ancestor, parts, index - 1) {
                        return true;
                    }
                    cursor = self.node(ancestor).and_then(|a| a.parent);
                }
                false
            }
            Combinator::NextSibling => self
                .preceding_siblings(node)
                .last()
                .is_some_and(|&s| self.matches(s, parts, index - 1)),
            Combinator::LaterSibling => self
                .preceding_siblings(node)
                .iter()
                .any(|&s| self.matches(s, parts, index - 1)),
            _ => false,
        }
    }

    fn preceding_siblings(&self, node: NodeId) -> &[NodeId] {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return &[];
        };
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&s| s == node).unwrap_or(0);
        &siblings[..position]
    }

    fn matches_compound(&self, node: NodeId, data: &NodeData, compound: &Compound) -> bool {
        if compound.tag.as_ref().is_some_and(|t| *t != data.tag) {
            return false;
        }
        if compound
            .id
            .as_ref()
            .is_some_and(|id| data.attribute("id") != Some(id.as_str()))
        {
            return false;
        }
        if !compound.classes.iter().all(|c| self.has_class(&node, c)) {
            return false;
        }
        compound.attributes.iter().all(|sel| {
            if sel.name == "style" {
                let text = data.style_text();
                sel.matches(Some(text.as_str()).filter(|s| !s.is_empty()))
            } else {
                sel.matches(data.attribute(&sel.name))
            }
        })
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;
    type Subscription = MemorySubscription;

    fn document_id(&self) -> String {
        self.document_id.clone()
    }

    fn document_root(&self) -> NodeId {
        ROOT
    }

    fn locate_scene(&self) -> Option<NodeId> {
        let selector = format!("#{} > .HYPE_scene[style*=\"block\"]", self.document_id);
        self.query(&ROOT, &selector)
    }

    fn id(&self, node: &NodeId) -> Option<ElementId> {
        self.node(*node)?
            .attribute("id")
            .filter(|id| !id.is_empty())
            .map(ElementId::from)
    }

    fn query(&self, scope: &NodeId, selector: &str) -> Option<NodeId> {
        self.select(*scope, selector, true).into_iter().next()
    }

    fn query_all(&self, scope: &NodeId, selector: &str) -> Vec<NodeId> {
        self.select(*scope, selector, false)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node)?.parent
    }

    fn child_by_tag(&self, parent: &NodeId, tag: &str) -> Option<NodeId> {
        self.children(*parent)
            .iter()
            .copied()
            .find(|&c| self.tag(c) == Some(tag))
    }

    fn child_by_id(&self, parent: &NodeId, accept: &dyn Fn(&str) -> bool) -> Option<NodeId> {
        self.children(*parent)
            .iter()
            .copied()
            .find(|&c| self.node(c).and_then(|n| n.attribute("id")).is_some_and(accept))
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.node(*node)
            .and_then(|n| n.attribute("class"))
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        let data = self.node(*node)?;
        if name == "style" {
            return Some(data.style_text()).filter(|s| !s.is_empty());
        }
        data.attribute(name).map(ToString::to_string)
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        self.write_attribute(*node, name, Some(value));
    }

    fn style_property(&self, node: &NodeId, name: &str) -> Option<String> {
        self.node(*node)?
            .style
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn set_style_property(&mut self, node: &NodeId, name: &str, value: &str) {
        self.write_style(*node, name, Some(value));
    }

    fn remove_style_property(&mut self, node: &NodeId, name: &str) {
        self.write_style(*node, name, None);
    }

    fn geometry(&self, node: &NodeId, property: GeometryProperty) -> Option<f64> {
        self.node(*node)?.geometry.get(&property).copied()
    }

    fn create_svg_child(&mut self, parent: &NodeId, tag: &str) -> Option<NodeId> {
        self.node(*parent)?;
        Some(self.element(*parent, tag))
    }

    fn move_to_end(&mut self, node: &NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.retain(|c| c != node);
            p.children.push(*node);
        }
    }

    fn force_reflow(&mut self, node: &NodeId) {
        if let Some(data) = self.nodes.get_mut(node.0) {
            data.reflows += 1;
        }
    }

    fn subscribe(
        &mut self,
        target: &NodeId,
        filter: AttributeFilter,
        key: WatchKey,
    ) -> Option<MemorySubscription> {
        self.node(*target)?;
        self.subscriptions.push(SubscriptionEntry {
            target: *target,
            filter,
            key,
            active: true,
        });
        Some(MemorySubscription(self.subscriptions.len() - 1))
    }

    fn unsubscribe(&mut self, subscription: MemorySubscription) {
        if let Some(entry) = self.subscriptions.get_mut(subscription.0) {
            entry.active = false;
        }
    }
}
