//! Browser side of the tilt: listeners in, CSS out, one frame loop forever.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    DeviceOrientationEvent, Document, HtmlElement, MouseEvent, TouchEvent, window,
};

use super::Tilt;
use crate::config::TiltConfig;
use crate::error::Result;

const DEPTH_SELECTOR: &str = "[data-depth]";
const GLOSS_SELECTOR: &str = ".gloss";

struct Layer {
    el: HtmlElement,
    depth: f64,
}

struct TiltRig {
    tilt: Tilt,
    device: HtmlElement,
    layers: Vec<Layer>,
    gloss: Option<HtmlElement>,
    orientation_bound: bool,
}

thread_local! {
    static TILT_RIG: RefCell<Option<TiltRig>> = RefCell::new(None);
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn with_rig(f: impl FnOnce(&mut TiltRig)) {
    TILT_RIG.with(|cell| {
        if let Some(rig) = cell.borrow_mut().as_mut() {
            f(rig);
        }
    });
}

fn collect_layers(doc: &Document) -> Result<Vec<Layer>> {
    let nodes = doc.query_selector_all(DEPTH_SELECTOR)?;
    let mut layers = Vec::with_capacity(nodes.length() as usize);
    for i in 0..nodes.length() {
        let Some(el) = nodes.get(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) else {
            continue;
        };
        let depth = el
            .get_attribute("data-depth")
            .and_then(|d| d.trim().parse::<f64>().ok())
            .unwrap_or(0.0);
        if depth != 0.0 {
            layers.push(Layer { el, depth });
        }
    }
    Ok(layers)
}

/// Wire pointer/touch listeners on `device`, bind orientation where no
/// permission is needed, and start the frame loop.
pub fn install(doc: &Document, device: HtmlElement, config: &TiltConfig) -> Result<()> {
    let layers = collect_layers(doc)?;
    let gloss = doc
        .query_selector(GLOSS_SELECTOR)?
        .and_then(|el| el.dyn_into::<HtmlElement>().ok());
    log::debug!("tilt: {} parallax layers, gloss={}", layers.len(), gloss.is_some());

    TILT_RIG.with(|cell| {
        cell.replace(Some(TiltRig {
            tilt: Tilt::new(config.clone()),
            device: device.clone(),
            layers,
            gloss,
            orientation_bound: false,
        }))
    });

    {
        let target = device.clone();
        let closure = Closure::wrap(Box::new(move |evt: MouseEvent| {
            let rect = target.get_bounding_client_rect();
            with_rig(|rig| {
                rig.tilt.point_at(
                    evt.client_x() as f64 - rect.left(),
                    evt.client_y() as f64 - rect.top(),
                    rect.width(),
                    rect.height(),
                )
            });
        }) as Box<dyn FnMut(_)>);
        device.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let target = device.clone();
        let closure = Closure::wrap(Box::new(move |evt: TouchEvent| {
            let Some(touch) = evt.touches().get(0) else {
                return;
            };
            let rect = target.get_bounding_client_rect();
            with_rig(|rig| {
                rig.tilt.point_at(
                    touch.client_x() as f64 - rect.left(),
                    touch.client_y() as f64 - rect.top(),
                    rect.width(),
                    rect.height(),
                )
            });
        }) as Box<dyn FnMut(_)>);
        device.add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    for leave in ["mouseleave", "touchend", "touchcancel"] {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| {
            with_rig(|rig| rig.tilt.release());
        }) as Box<dyn FnMut(_)>);
        device.add_event_listener_with_callback(leave, closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    if orientation_supported() && permission_fn().is_none() {
        bind_orientation();
    }

    start_tilt_loop();
    Ok(())
}

fn orientation_supported() -> bool {
    window()
        .map(|w| Reflect::has(&w, &JsValue::from_str("DeviceOrientationEvent")).unwrap_or(false))
        .unwrap_or(false)
}

/// `DeviceOrientationEvent.requestPermission`, present only where the sensor
/// is gated behind a prompt.
fn permission_fn() -> Option<Function> {
    let w = window()?;
    let ctor = Reflect::get(&w, &JsValue::from_str("DeviceOrientationEvent")).ok()?;
    if ctor.is_undefined() {
        return None;
    }
    Reflect::get(&ctor, &JsValue::from_str("requestPermission"))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

/// Ask for the orientation sensor. Must run inside a user gesture; a denial
/// or missing API leaves pointer/touch tilt as the only input.
pub fn request_orientation() {
    let already = TILT_RIG.with(|c| c.borrow().as_ref().map(|r| r.orientation_bound));
    if already != Some(false) || !orientation_supported() {
        return;
    }
    let Some(request) = permission_fn() else {
        bind_orientation();
        return;
    };
    let promise = match request
        .call0(&JsValue::UNDEFINED)
        .and_then(|p| p.dyn_into::<Promise>())
    {
        Ok(p) => p,
        Err(e) => {
            log::warn!("orientation permission request failed: {e:?}");
            return;
        }
    };
    wasm_bindgen_futures::spawn_local(async move {
        match JsFuture::from(promise).await {
            Ok(answer) if answer.as_string().as_deref() == Some("granted") => bind_orientation(),
            Ok(answer) => log::info!("orientation permission: {answer:?}; pointer tilt only"),
            Err(e) => log::warn!("orientation permission rejected: {e:?}"),
        }
    });
}

fn bind_orientation() {
    let mut bind = false;
    with_rig(|rig| {
        bind = !rig.orientation_bound;
        rig.orientation_bound = true;
    });
    if !bind {
        return;
    }
    let Some(win) = window() else {
        return;
    };
    let closure = Closure::wrap(Box::new(move |evt: DeviceOrientationEvent| {
        with_rig(|rig| rig.tilt.orient(evt.beta(), evt.gamma()));
    }) as Box<dyn FnMut(_)>);
    if let Err(e) =
        win.add_event_listener_with_callback("deviceorientation", closure.as_ref().unchecked_ref())
    {
        log::warn!("deviceorientation listener failed: {e:?}");
    }
    closure.forget();
}

fn start_tilt_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
        with_rig(TiltRig::frame);
        if let Some(w) = window() {
            if let Some(cb) = f.borrow().as_ref() {
                let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
            }
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(w) = window() {
        if let Some(cb) = g.borrow().as_ref() {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }
}

impl TiltRig {
    fn frame(&mut self) {
        self.tilt.step();
        set_style(&self.device, "transform", &self.tilt.transform_css());
        for layer in &self.layers {
            let (dx, dy) = self.tilt.parallax(layer.depth);
            set_style(
                &layer.el,
                "transform",
                &format!("translate3d({dx:.2}px, {dy:.2}px, 0)"),
            );
        }
        if let Some(gloss) = &self.gloss {
            set_style(gloss, "background", &self.tilt.gloss().to_css());
        }
    }
}

fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    el.style().set_property(prop, value).ok();
}
