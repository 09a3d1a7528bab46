//! Page wiring. Finds the device markup, owns the one `Device` record, and
//! routes clicks, keys and timer firings into the round machine. After every
//! machine call `sync()` hands the emitted events to the sound controller and
//! the title canvas, then repaints the screen.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlCanvasElement, HtmlElement, KeyboardEvent, window};

use crate::audio::web::WebAudioBackend;
use crate::audio::{AudioBackend, SoundController, SoundKey};
use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result};
use crate::game::{Move, MoveSource, RandomMoves, RoundEvent, RoundMachine, RoundTask, ScreenView};
use crate::schedule::{Dispatch, Scheduler, TaskId, WebScheduler};
use crate::{particles, tilt, title};

const SCREEN_SELECTOR: &str = ".screen-text";
const MOVE_BUTTON_SELECTOR: &str = ".btn[data-move]";
const START_SELECTOR: &str = ".btn-start";
const RESET_SELECTOR: &str = ".btn-reset";
const DEVICE_SELECTOR: &str = ".device";
const TITLE_CANVAS_ID: &str = "titleCanvas";
const BACKDROP_ID: &str = "bg";
const UNLOCK_EVENTS: [&str; 3] = ["click", "touchstart", "keydown"];

type Machine = RoundMachine<WebScheduler<RoundTask>, RandomMoves>;
type Sounds = Rc<RefCell<SoundController<WebAudioBackend>>>;

struct Device {
    machine: Machine,
    screen: HtmlElement,
    move_buttons: Vec<HtmlElement>,
    sounds: Sounds,
    shown: Option<ScreenView>,
    moves_live: Option<bool>,
}

thread_local! {
    static DEVICE: RefCell<Option<Device>> = RefCell::new(None);
}

fn with_device(f: impl FnOnce(&mut Device)) {
    DEVICE.with(|cell| {
        if let Some(device) = cell.borrow_mut().as_mut() {
            f(device);
            device.sync();
        }
    });
}

/// Keyboard shortcuts on top of the buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyAction {
    Play(Move),
    Start,
    Reset,
}

fn key_action(key: &str) -> Option<KeyAction> {
    match key {
        "r" | "R" => Some(KeyAction::Play(Move::Rock)),
        "p" | "P" => Some(KeyAction::Play(Move::Paper)),
        "s" | "S" => Some(KeyAction::Play(Move::Scissors)),
        "Enter" | " " => Some(KeyAction::Start),
        "Escape" => Some(KeyAction::Reset),
        _ => None,
    }
}

/// Start a round and, only if one actually began, play the start click.
fn start_round<S, R, B>(machine: &mut RoundMachine<S, R>, sounds: &mut SoundController<B>) -> bool
where
    S: Scheduler<RoundTask>,
    R: MoveSource,
    B: AudioBackend,
{
    let started = machine.start();
    if started {
        sounds.play_start();
    }
    started
}

/// Start button and Enter/Space. Runs inside the gesture handler so the
/// audio unlock and orientation prompt are allowed.
fn press_start(sounds: &Sounds) {
    sounds.borrow_mut().unlock();
    let mut started = false;
    with_device(|d| started = start_round(&mut d.machine, &mut *d.sounds.borrow_mut()));
    if started {
        tilt::rig::request_orientation();
    }
}

fn find<T: JsCast>(doc: &Document, selector: &'static str) -> Result<T> {
    doc.query_selector(selector)?
        .ok_or(DeviceError::MissingElement(selector))?
        .dyn_into::<T>()
        .map_err(|_| DeviceError::MissingElement(selector))
}

fn on_event(target: &web_sys::EventTarget, kind: &str, mut f: impl FnMut() + 'static) -> Result<()> {
    let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| f()) as Box<dyn FnMut(_)>);
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn collect_move_buttons(doc: &Document) -> Result<Vec<(HtmlElement, Move)>> {
    let nodes = doc.query_selector_all(MOVE_BUTTON_SELECTOR)?;
    let mut buttons = Vec::new();
    for i in 0..nodes.length() {
        let Some(el) = nodes.get(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) else {
            continue;
        };
        match el.get_attribute("data-move").as_deref().and_then(Move::from_attr) {
            Some(mv) => buttons.push((el, mv)),
            None => log::warn!("ignoring button with unknown data-move"),
        }
    }
    if buttons.is_empty() {
        return Err(DeviceError::MissingElement(MOVE_BUTTON_SELECTOR));
    }
    Ok(buttons)
}

/// Wire up the page and show the title screen.
pub fn boot(config: DeviceConfig) -> Result<()> {
    config.validate()?;
    let win = window().ok_or_else(|| DeviceError::Js("no window".into()))?;
    let doc = win
        .document()
        .ok_or_else(|| DeviceError::Js("no document".into()))?;

    let screen: HtmlElement = find(&doc, SCREEN_SELECTOR)?;
    let start: HtmlElement = find(&doc, START_SELECTOR)?;
    let reset: HtmlElement = find(&doc, RESET_SELECTOR)?;
    let body: HtmlElement = find(&doc, DEVICE_SELECTOR)?;
    let buttons = collect_move_buttons(&doc)?;
    let button_count = buttons.len();

    let sounds: Sounds = Rc::new(RefCell::new(SoundController::new(
        &config.audio,
        WebAudioBackend::new(&config.audio.base_url),
    )));
    if config.audio.enabled {
        sounds.borrow_mut().backend_mut().preload(&SoundKey::ALL);
    }

    match doc
        .get_element_by_id(TITLE_CANVAS_ID)
        .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
    {
        Some(canvas) => title::canvas::install(&doc, canvas, &config.title)?,
        None => log::warn!("#{TITLE_CANVAS_ID} missing; title animation disabled"),
    }

    if config.particles.enabled {
        match doc
            .get_element_by_id(BACKDROP_ID)
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        {
            Some(canvas) => particles::install(canvas, &config.particles)?,
            None => log::info!("#{BACKDROP_ID} missing; no particle backdrop"),
        }
    }

    tilt::rig::install(&doc, body, &config.tilt)?;

    let dispatch: Dispatch<RoundTask> = Rc::new(|id: TaskId, task: RoundTask| {
        with_device(|d| d.machine.on_timer(id, task));
    });
    let machine = RoundMachine::new(config.round.clone(), WebScheduler::new(dispatch), RandomMoves::default());

    DEVICE.with(|cell| {
        cell.replace(Some(Device {
            machine,
            screen,
            move_buttons: buttons.iter().map(|(el, _)| el.clone()).collect(),
            sounds: sounds.clone(),
            shown: None,
            moves_live: None,
        }))
    });

    for (el, mv) in buttons {
        let sounds = sounds.clone();
        on_event(&el, "click", move || {
            sounds.borrow_mut().unlock();
            with_device(|d| {
                d.machine.submit(mv);
            });
        })?;
    }
    {
        let sounds = sounds.clone();
        on_event(&start, "click", move || press_start(&sounds))?;
    }
    on_event(&reset, "click", move || with_device(|d| d.machine.reset()))?;

    {
        let sounds = sounds.clone();
        let closure = Closure::wrap(Box::new(move |evt: KeyboardEvent| {
            if evt.repeat() {
                return;
            }
            match key_action(&evt.key()) {
                Some(KeyAction::Start) => press_start(&sounds),
                Some(KeyAction::Play(mv)) => with_device(|d| {
                    d.machine.submit(mv);
                }),
                Some(KeyAction::Reset) => with_device(|d| d.machine.reset()),
                None => {}
            }
        }) as Box<dyn FnMut(_)>);
        doc.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    for kind in UNLOCK_EVENTS {
        let sounds = sounds.clone();
        on_event(&doc, kind, move || sounds.borrow_mut().unlock())?;
    }

    with_device(|d| d.machine.show_title());
    log::info!("device ready ({button_count} move buttons)");
    Ok(())
}

impl Device {
    fn sync(&mut self) {
        for event in self.machine.drain_events() {
            match event {
                RoundEvent::RoundStarted => title::canvas::hide(),
                RoundEvent::ReturnedToTitle => title::canvas::show(),
                _ => {}
            }
            self.sounds.borrow_mut().on_round_event(&event);
        }

        let view = self.machine.view();
        if self.shown != Some(view) {
            self.screen.set_inner_html(&view.to_html());
            self.shown = Some(view);
        }

        let live = self.machine.accepts_moves();
        if self.moves_live != Some(live) {
            let value = if live { "auto" } else { "none" };
            for b in &self.move_buttons {
                b.style().set_property("pointer-events", value).ok();
            }
            self.moves_live = Some(live);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PlayRequest;
    use crate::config::{AudioConfig, RoundConfig};
    use crate::game::{GamePhase, ScriptedMoves};
    use crate::schedule::ManualScheduler;

    #[derive(Default)]
    struct Recorder(Vec<PlayRequest>);

    impl AudioBackend for Recorder {
        fn activate(&mut self) -> Result<()> {
            Ok(())
        }

        fn play(&mut self, req: PlayRequest) -> Result<()> {
            self.0.push(req);
            Ok(())
        }
    }

    #[test]
    fn start_click_only_when_a_round_begins() {
        let moves = ScriptedMoves::new(vec![Move::Rock]).unwrap();
        let mut machine = RoundMachine::new(RoundConfig::default(), ManualScheduler::new(), moves);
        machine.show_title();
        let mut sounds = SoundController::new(&AudioConfig::default(), Recorder::default());
        sounds.unlock();

        assert!(start_round(&mut machine, &mut sounds));
        assert_eq!(machine.phase(), GamePhase::Countdown);
        assert_eq!(sounds.backend().0.len(), 1);
        assert_eq!(sounds.backend().0[0].key, SoundKey::Click);

        // Already counting down: no second click.
        assert!(!start_round(&mut machine, &mut sounds));
        assert_eq!(sounds.backend().0.len(), 1);
    }

    #[test]
    fn key_shortcuts() {
        assert_eq!(key_action("r"), Some(KeyAction::Play(Move::Rock)));
        assert_eq!(key_action("P"), Some(KeyAction::Play(Move::Paper)));
        assert_eq!(key_action("s"), Some(KeyAction::Play(Move::Scissors)));
        assert_eq!(key_action("Enter"), Some(KeyAction::Start));
        assert_eq!(key_action("Escape"), Some(KeyAction::Reset));
        assert_eq!(key_action("x"), None);
    }
}
