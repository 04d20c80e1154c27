//! `CanvasRenderingContext2D`: drawing calls are recorded per canvas, not
//! rasterized. The painter replays them over the canvas box.

use css::{Color, parse_color};
use html::NodeId;
use js::{HeapRef, Value, Vm};
use layout::Rect;

use crate::bindings::{HostKind, SharedDom, arg, host_handle, host_node, interface_prototype};

#[derive(Clone, Debug, PartialEq)]
pub enum CanvasCommand {
    FillRect { rect: Rect, color: Color },
    ClearRect { rect: Rect },
    FillText { text: String, x: f32, y: f32, color: Color },
}

pub(crate) const INTERFACE: &str = "CanvasRenderingContext2D";

pub(crate) fn install(vm: &mut Vm, dom: &SharedDom) {
    let constructor = vm.native(INTERFACE, |vm, _this, _args| {
        Err(vm.type_error("Illegal constructor"))
    });
    let proto = vm.new_object();
    if let Some(r) = constructor.as_object() {
        let _ = vm.set_property(&Value::Object(r), "prototype", Value::Object(proto));
    }
    vm.define_global(INTERFACE, constructor);

    let state = dom.clone();
    vm.define_method(proto, "fillRect", move |vm, this, args| {
        let color = fill_style(vm, this)?;
        record(vm, &state, this, CanvasCommand::FillRect {
            rect: rect_from(args),
            color,
        })
    });
    let state = dom.clone();
    vm.define_method(proto, "clearRect", move |vm, this, args| {
        record(vm, &state, this, CanvasCommand::ClearRect {
            rect: rect_from(args),
        })
    });
    let state = dom.clone();
    vm.define_method(proto, "fillText", move |vm, this, args| {
        let color = fill_style(vm, this)?;
        let text = vm.to_display_string(&arg(args, 0));
        record(vm, &state, this, CanvasCommand::FillText {
            text,
            x: number(args, 1),
            y: number(args, 2),
            color,
        })
    });
}

/// A fresh 2D context bound to `canvas`, with `fillStyle` reset to black.
pub(crate) fn context_for(vm: &mut Vm, dom: &SharedDom, canvas: NodeId, element: &Value) -> Value {
    dom.borrow_mut().canvases.entry(canvas).or_default();
    let proto: Option<HeapRef> = interface_prototype(vm, INTERFACE);
    let context = Value::Object(vm.alloc_host(host_handle(HostKind::Context2d, canvas), proto));
    let _ = vm.set_property(&context, "fillStyle", Value::from("#000000"));
    let _ = vm.set_property(&context, "canvas", element.clone());
    context
}

fn number(args: &[Value], index: usize) -> f32 {
    arg(args, index).to_number() as f32
}

fn rect_from(args: &[Value]) -> Rect {
    Rect::new(number(args, 0), number(args, 1), number(args, 2), number(args, 3))
}

/// Unparseable styles draw in black.
fn fill_style(vm: &mut Vm, this: &Value) -> Result<Color, Value> {
    let style = vm.get_property(this, "fillStyle")?;
    let text = vm.to_display_string(&style);
    Ok(parse_color(&text).unwrap_or(Color::BLACK))
}

fn record(vm: &mut Vm, dom: &SharedDom, this: &Value, command: CanvasCommand) -> Result<Value, Value> {
    let Some(canvas) = host_node(vm, this, HostKind::Context2d) else {
        return Err(vm.type_error("not a canvas context"));
    };
    log::trace!(target: "page", "canvas {canvas}: {command:?}");
    dom.borrow_mut()
        .canvases
        .entry(canvas)
        .or_default()
        .push(command);
    Ok(Value::Undefined)
}
