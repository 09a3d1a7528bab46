// Browser tests for the `setTimeout` scheduler. Run with
// `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use rps_device::DeviceConfig;
use rps_device::audio::web::WebAudioBackend;
use rps_device::audio::{AudioBackend, PlayRequest, SoundKey};
use rps_device::schedule::{Dispatch, Scheduler, TaskId, WebScheduler};
use rps_device::{particles, title};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Document, HtmlCanvasElement};

wasm_bindgen_test_configure!(run_in_browser);

fn recording() -> (Dispatch<u8>, Rc<RefCell<Vec<(TaskId, u8)>>>) {
    let fired = Rc::new(RefCell::new(Vec::new()));
    let sink = fired.clone();
    let dispatch: Dispatch<u8> = Rc::new(move |id: TaskId, task: u8| sink.borrow_mut().push((id, task)));
    (dispatch, fired)
}

#[wasm_bindgen_test]
async fn fires_in_delay_order() {
    let (dispatch, fired) = recording();
    let mut sched = WebScheduler::new(dispatch);
    let late = sched.schedule(30, 2);
    let early = sched.schedule(5, 1);
    assert_eq!(sched.live_timers(), 2);

    TimeoutFuture::new(60).await;
    assert_eq!(*fired.borrow(), vec![(early, 1), (late, 2)]);
}

#[wasm_bindgen_test]
async fn cancelled_tasks_never_fire() {
    let (dispatch, fired) = recording();
    let mut sched = WebScheduler::new(dispatch);
    let id = sched.schedule(10, 7);
    sched.cancel(id);
    assert_eq!(sched.live_timers(), 0);

    TimeoutFuture::new(40).await;
    assert!(fired.borrow().is_empty());
}

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn canvas(doc: &Document) -> HtmlCanvasElement {
    doc.create_element("canvas").unwrap().dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn title_canvas_takes_configured_size() {
    let doc = document();
    let config = DeviceConfig::default();
    let el = canvas(&doc);
    title::canvas::install(&doc, el.clone(), &config.title).unwrap();
    assert_eq!((el.width(), el.height()), (config.title.width, config.title.height));
    title::canvas::show();
    title::canvas::hide();
    assert_eq!(el.style().get_property_value("display").unwrap(), "none");
}

#[wasm_bindgen_test]
fn backdrop_installs_on_a_2d_canvas() {
    let doc = document();
    let config = DeviceConfig::default();
    particles::install(canvas(&doc), &config.particles).unwrap();
}

#[wasm_bindgen_test]
async fn audio_activation_is_quiet_without_buffers() {
    let mut backend = WebAudioBackend::new("sounds/");
    // Headless runners may lack audio output; either way nothing may throw.
    if backend.activate().is_ok() {
        TimeoutFuture::new(20).await;
        assert!(!backend.is_loaded(SoundKey::Click));
        backend
            .play(PlayRequest::new(SoundKey::Click, 0.5, 1.0))
            .unwrap();
    }
}
