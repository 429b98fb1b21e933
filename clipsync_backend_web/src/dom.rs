// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The browser DOM as a [`Dom`].
//!
//! [`WebDom`] maps every host operation onto `web-sys` calls. Failing calls
//! (bad selectors, detached nodes) are ignored or read as "absent".
//!
//! Subscriptions are `MutationObserver`s. Their callbacks run as microtasks
//! and only append to a shared [`MutationInbox`]; the frame callback drains
//! the inbox and hands the records to the engine.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use clipsync_core::dom::{Dom, Mutation};
use clipsync_core::geometry::GeometryProperty;
use clipsync_core::id::ElementId;
use clipsync_core::observer::{AttributeFilter, WatchKey};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{
    CssStyleDeclaration, Document, Element, HtmlElement, MutationObserver, MutationObserverInit,
    MutationRecord, SvgElement,
};

use crate::host::HostDocument;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

type RecordCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

/// Mutation records waiting for the next frame.
#[derive(Clone, Debug, Default)]
pub struct MutationInbox {
    records: Rc<RefCell<Vec<(WatchKey, Mutation<Element>)>>>,
}

impl MutationInbox {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, key: WatchKey, mutation: Mutation<Element>) {
        self.records.borrow_mut().push((key, mutation));
    }

    /// Removes and returns every buffered record in arrival order.
    #[must_use]
    pub fn take(&self) -> Vec<(WatchKey, Mutation<Element>)> {
        core::mem::take(&mut *self.records.borrow_mut())
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether no records are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

/// A live `MutationObserver` and the closure it calls.
///
/// Dropping the subscription disconnects the observer.
pub struct WebSubscription {
    observer: MutationObserver,
    _callback: RecordCallback,
}

impl core::fmt::Debug for WebSubscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebSubscription")
            .field("observer", &"MutationObserver")
            .finish_non_exhaustive()
    }
}

impl WebSubscription {
    /// Observes attribute changes on `target` and calls `on_record` for each
    /// record. `filter` limits the observed attribute names; `subtree`
    /// extends observation to descendants.
    pub(crate) fn observe(
        target: &Element,
        filter: &[&str],
        subtree: bool,
        mut on_record: impl FnMut(MutationRecord) + 'static,
    ) -> Option<Self> {
        let callback: RecordCallback = Closure::wrap(Box::new(
            move |records: js_sys::Array, _: MutationObserver| {
                for record in records.iter() {
                    if let Ok(record) = record.dyn_into::<MutationRecord>() {
                        on_record(record);
                    }
                }
            },
        ) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).ok()?;

        let names = js_sys::Array::new();
        for name in filter {
            names.push(&JsValue::from(*name));
        }
        let init = MutationObserverInit::new();
        init.set_attributes(true);
        init.set_attribute_old_value(true);
        init.set_attribute_filter(&names);
        init.set_subtree(subtree);
        observer.observe_with_options(target, &init).ok()?;

        Some(Self {
            observer,
            _callback: callback,
        })
    }

    /// Stops delivering records.
    pub fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for WebSubscription {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

/// Converts an attribute record into a [`Mutation`].
pub(crate) fn attribute_mutation(record: &MutationRecord) -> Option<Mutation<Element>> {
    let target = record.target()?.dyn_into::<Element>().ok()?;
    Some(Mutation {
        target,
        attribute: record.attribute_name()?,
        old_value: record.old_value(),
    })
}

/// The browser document behind the engine.
pub struct WebDom {
    document: Document,
    root: Element,
    host: Option<HostDocument>,
    inbox: MutationInbox,
}

impl core::fmt::Debug for WebDom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebDom")
            .field("document", &"Document")
            .field("host", &self.host.is_some())
            .field("pending_records", &self.inbox.len())
            .finish()
    }
}

impl WebDom {
    /// Wraps `document`.
    ///
    /// `host` supplies the document id and animated geometry; without it
    /// geometry reads as absent (the preview adapter supplies its own).
    /// Subscription records are delivered to `inbox`. Returns `None` if the
    /// document has no root element.
    #[must_use]
    pub fn new(document: Document, host: Option<HostDocument>, inbox: MutationInbox) -> Option<Self> {
        let root = document.document_element()?;
        Some(Self {
            document,
            root,
            host,
            inbox,
        })
    }

    /// The wrapped document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The inbox subscriptions deliver to.
    #[must_use]
    pub fn inbox(&self) -> &MutationInbox {
        &self.inbox
    }
}

/// Inline style of an HTML or SVG element.
fn inline_style(element: &Element) -> Option<CssStyleDeclaration> {
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        Some(html.style())
    } else {
        element.dyn_ref::<SvgElement>().map(SvgElement::style)
    }
}

fn children(parent: &Element) -> impl Iterator<Item = Element> {
    let list = parent.children();
    (0..list.length()).filter_map(move |i| list.item(i))
}

impl Dom for WebDom {
    type Node = Element;
    type Subscription = WebSubscription;

    fn document_id(&self) -> String {
        self.host
            .as_ref()
            .map(HostDocument::document_id)
            .unwrap_or_default()
    }

    fn document_root(&self) -> Element {
        self.root.clone()
    }

    fn locate_scene(&self) -> Option<Element> {
        let selector = format!("#{} > .HYPE_scene[style*=\"block\"]", self.document_id());
        self.document.query_selector(&selector).ok().flatten()
    }

    fn id(&self, node: &Element) -> Option<ElementId> {
        let id = node.id();
        (!id.is_empty()).then(|| ElementId::new(id))
    }

    fn query(&self, scope: &Element, selector: &str) -> Option<Element> {
        scope.query_selector(selector).ok().flatten()
    }

    fn query_all(&self, scope: &Element, selector: &str) -> Vec<Element> {
        let Ok(list) = scope.query_selector_all(selector) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn child_by_tag(&self, parent: &Element, tag: &str) -> Option<Element> {
        children(parent).find(|child| child.local_name() == tag)
    }

    fn child_by_id(&self, parent: &Element, accept: &dyn Fn(&str) -> bool) -> Option<Element> {
        children(parent).find(|child| accept(&child.id()))
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn has_attribute(&self, node: &Element, name: &str) -> bool {
        node.has_attribute(name)
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) {
        let _ = node.set_attribute(name, value);
    }

    fn style_property(&self, node: &Element, name: &str) -> Option<String> {
        inline_style(node)?
            .get_property_value(name)
            .ok()
            .filter(|v| !v.is_empty())
    }

    fn set_style_property(&mut self, node: &Element, name: &str, value: &str) {
        if let Some(style) = inline_style(node) {
            let _ = style.set_property(name, value);
        }
    }

    fn remove_style_property(&mut self, node: &Element, name: &str) {
        if let Some(style) = inline_style(node) {
            let _ = style.remove_property(name);
        }
    }

    fn geometry(&self, node: &Element, property: GeometryProperty) -> Option<f64> {
        self.host
            .as_ref()?
            .get_element_property(node, property.as_str())
            .as_f64()
    }

    fn create_svg_child(&mut self, parent: &Element, tag: &str) -> Option<Element> {
        let child = self.document.create_element_ns(Some(SVG_NS), tag).ok()?;
        parent.append_child(&child).ok()?;
        Some(child)
    }

    fn move_to_end(&mut self, node: &Element) {
        if let Some(parent) = node.parent_node() {
            // Appending an existing child moves it.
            let _ = parent.append_child(node);
        }
    }

    fn force_reflow(&mut self, node: &Element) {
        let Some(html) = node.dyn_ref::<HtmlElement>() else {
            return;
        };
        let style = html.style();
        let display = style.get_property_value("display").unwrap_or_default();
        let _ = style.set_property("display", "none");
        let _ = html.offset_height();
        if display.is_empty() {
            let _ = style.remove_property("display");
        } else {
            let _ = style.set_property("display", &display);
        }
    }

    fn subscribe(
        &mut self,
        target: &Element,
        filter: AttributeFilter,
        key: WatchKey,
    ) -> Option<WebSubscription> {
        let inbox = self.inbox.clone();
        WebSubscription::observe(target, filter, false, move |record| {
            if let Some(mutation) = attribute_mutation(&record) {
                inbox.push(key.clone(), mutation);
            }
        })
    }

    fn unsubscribe(&mut self, subscription: WebSubscription) {
        subscription.disconnect();
    }
}
