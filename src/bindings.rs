//! Script-visible DOM: the `document` global, element wrappers and `alert`.
//!
//! Wrappers are host objects holding a [`NodeId`]; every lookup creates a
//! fresh one, so two wrappers for the same node are not `===`. Natives reach
//! the document through [`SharedDom`] and never hold heap references across
//! calls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use html::{Document, NodeId};
use js::{HeapRef, Value, Vm};

use crate::canvas::{self, CanvasCommand};

pub(crate) struct DomState {
    pub document: Document,
    pub canvases: HashMap<NodeId, Vec<CanvasCommand>>,
    pub alerts: Vec<String>,
}

pub(crate) type SharedDom = Rc<RefCell<DomState>>;

const ELEMENT_INTERFACE: &str = "HTMLElement";

pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// The `prototype` of the global constructor `name`, if the script has not
/// replaced it.
pub(crate) fn interface_prototype(vm: &mut Vm, name: &str) -> Option<HeapRef> {
    let constructor = vm.global(name)?;
    vm.get_property(&constructor, "prototype").ok()?.as_object()
}

/// What a host object stands for. Stored in the high half of its handle,
/// the node id in the low half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HostKind {
    Node = 1,
    Context2d = 2,
}

pub(crate) fn host_handle(kind: HostKind, id: NodeId) -> u64 {
    (kind as u64) << 32 | u64::from(id.0)
}

/// The node behind `value` if it is a host object of `kind`.
pub(crate) fn host_node(vm: &Vm, value: &Value, kind: HostKind) -> Option<NodeId> {
    let data = vm.host_data(value)?;
    if data >> 32 != kind as u64 {
        return None;
    }
    u32::try_from(data & u64::from(u32::MAX)).ok().map(NodeId)
}

fn this_node(vm: &mut Vm, this: &Value) -> Result<NodeId, Value> {
    match host_node(vm, this, HostKind::Node) {
        Some(id) => Ok(id),
        None => Err(vm.type_error("receiver is not a DOM node")),
    }
}

pub(crate) fn install(vm: &mut Vm, dom: &SharedDom) {
    install_element(vm, dom);
    canvas::install(vm, dom);
    install_document(vm, dom);

    let state = dom.clone();
    vm.define_native("alert", move |vm, _this, args| {
        let message = vm.to_display_string(&arg(args, 0));
        log::info!(target: "page", "alert: {message}");
        state.borrow_mut().alerts.push(message);
        Ok(Value::Undefined)
    });
}

/// Wraps `id` for script code. Elements get `tagName` (upper case) and `id`
/// as own properties.
pub(crate) fn wrap_node(vm: &mut Vm, dom: &SharedDom, id: NodeId) -> Value {
    let proto = interface_prototype(vm, ELEMENT_INTERFACE);
    let wrapper = Value::Object(vm.alloc_host(host_handle(HostKind::Node, id), proto));
    let element = {
        let state = dom.borrow();
        state
            .document
            .element(id)
            .map(|el| (el.name.to_ascii_uppercase(), el.id().unwrap_or("").to_string()))
    };
    let node_name = match element {
        Some((tag, element_id)) => {
            let _ = vm.set_property(&wrapper, "tagName", Value::from(tag.as_str()));
            let _ = vm.set_property(&wrapper, "id", Value::from(element_id));
            tag
        }
        None => "#text".to_string(),
    };
    let _ = vm.set_property(&wrapper, "nodeName", Value::from(node_name));
    wrapper
}

fn install_element(vm: &mut Vm, dom: &SharedDom) {
    let constructor = vm.native(ELEMENT_INTERFACE, |vm, _this, _args| {
        Err(vm.type_error("Illegal constructor"))
    });
    let proto = vm.new_object();
    if let Some(r) = constructor.as_object() {
        let _ = vm.set_property(&Value::Object(r), "prototype", Value::Object(proto));
    }
    vm.define_global(ELEMENT_INTERFACE, constructor);

    let state = dom.clone();
    vm.define_method(proto, "getAttribute", move |vm, this, args| {
        let id = this_node(vm, this)?;
        let name = vm.to_display_string(&arg(args, 0));
        let state = state.borrow();
        Ok(state
            .document
            .element(id)
            .and_then(|el| el.attribute(&name))
            .map_or(Value::Null, Value::from))
    });

    let state = dom.clone();
    vm.define_method(proto, "setAttribute", move |vm, this, args| {
        let id = this_node(vm, this)?;
        let name = vm.to_display_string(&arg(args, 0)).to_ascii_lowercase();
        let value = vm.to_display_string(&arg(args, 1));
        if !state.borrow_mut().document.set_attribute(id, &name, &value) {
            return Err(vm.type_error("setAttribute on a non-element"));
        }
        if name == "id" {
            vm.set_property(this, "id", Value::from(value))?;
        }
        Ok(Value::Undefined)
    });

    let state = dom.clone();
    vm.define_method(proto, "appendChild", move |vm, this, args| {
        let parent = this_node(vm, this)?;
        let child_value = arg(args, 0);
        let Some(child) = host_node(vm, &child_value, HostKind::Node) else {
            return Err(vm.type_error("appendChild argument is not a node"));
        };
        if !state.borrow_mut().document.append_child(parent, child) {
            return Err(vm.error("node cannot be inserted here"));
        }
        Ok(child_value)
    });

    let state = dom.clone();
    vm.define_method(proto, "setTextContent", move |vm, this, args| {
        let id = this_node(vm, this)?;
        let text = vm.to_display_string(&arg(args, 0));
        state.borrow_mut().document.set_text_content(id, &text);
        Ok(Value::Undefined)
    });

    let state = dom.clone();
    vm.define_method(proto, "getTextContent", move |vm, this, _args| {
        let id = this_node(vm, this)?;
        let text = state.borrow().document.text_content(id);
        Ok(Value::from(text))
    });

    let state = dom.clone();
    vm.define_method(proto, "getContext", move |vm, this, args| {
        let id = this_node(vm, this)?;
        let kind = vm.to_display_string(&arg(args, 0));
        let is_canvas = state
            .borrow()
            .document
            .element(id)
            .is_some_and(|el| el.name == "canvas");
        if !is_canvas || kind != "2d" {
            return Ok(Value::Null);
        }
        Ok(canvas::context_for(vm, &state, id, this))
    });
}

fn install_document(vm: &mut Vm, dom: &SharedDom) {
    let document = vm.new_object();

    let state = dom.clone();
    vm.define_method(document, "getElementById", move |vm, _this, args| {
        let wanted = vm.to_display_string(&arg(args, 0));
        let found = state.borrow().document.get_element_by_id(&wanted);
        Ok(match found {
            Some(id) => wrap_node(vm, &state, id),
            None => Value::Null,
        })
    });

    let state = dom.clone();
    vm.define_method(document, "createElement", move |vm, _this, args| {
        let name = vm.to_display_string(&arg(args, 0)).to_ascii_lowercase();
        if name.is_empty() {
            return Err(vm.type_error("createElement needs a tag name"));
        }
        let id = state.borrow_mut().document.create_element(name);
        Ok(wrap_node(vm, &state, id))
    });

    let state = dom.clone();
    vm.define_method(document, "createTextNode", move |vm, _this, args| {
        let text = vm.to_display_string(&arg(args, 0));
        let id = state.borrow_mut().document.create_text(text);
        Ok(wrap_node(vm, &state, id))
    });

    let body = dom.borrow().document.body();
    let body = match body {
        Some(id) => wrap_node(vm, dom, id),
        None => Value::Null,
    };
    let document = Value::Object(document);
    let _ = vm.set_property(&document, "body", body);
    vm.define_global("document", document);
}
