//! Drifting confetti behind the device.
//!
//! Points live in a 12-unit cube and bounce off its faces; each frame they are
//! projected through a 60° perspective camera sitting 8 units back and drawn
//! as dots on the full-window `#bg` canvas.

use std::cell::RefCell;
use std::rc::Rc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, window};

use crate::config::ParticleConfig;
use crate::error::{DeviceError, Result};

pub const HALF_EXTENT: f64 = 6.0;
pub const MAX_SPEED: f64 = 0.005;
const CAMERA_Z: f64 = 8.0;
const FOV_DEG: f64 = 60.0;
const NEAR: f64 = 0.1;
const POINT_SIZE: f64 = 0.04;

pub const PALETTE: [&str; 7] = [
    "#C5B4E2", "#7BA4DD", "#FF6B00", "#FED925", "#70D44B", "#F32735", "#FA7598",
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub pos: [f64; 3],
    pub vel: [f64; 3],
    pub color: usize,
}

/// A projected dot, in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dot {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub color: usize,
}

pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new<R: Rng>(count: usize, rng: &mut R) -> Self {
        let particles = (0..count)
            .map(|_| Particle {
                pos: [
                    rng.random_range(-HALF_EXTENT..HALF_EXTENT),
                    rng.random_range(-HALF_EXTENT..HALF_EXTENT),
                    rng.random_range(-HALF_EXTENT..HALF_EXTENT),
                ],
                vel: [
                    rng.random_range(-MAX_SPEED..MAX_SPEED),
                    rng.random_range(-MAX_SPEED..MAX_SPEED),
                    rng.random_range(-MAX_SPEED..MAX_SPEED),
                ],
                color: rng.random_range(0..PALETTE.len()),
            })
            .collect();
        Self { particles }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Advance one frame. A coordinate past the cube flips that axis' velocity.
    pub fn step(&mut self) {
        for p in &mut self.particles {
            for axis in 0..3 {
                p.pos[axis] += p.vel[axis];
                if p.pos[axis].abs() > HALF_EXTENT {
                    p.vel[axis] = -p.vel[axis];
                }
            }
        }
    }

    pub fn project(&self, width: f64, height: f64) -> Vec<Dot> {
        let focal = (height / 2.0) / (FOV_DEG.to_radians() / 2.0).tan();
        self.particles
            .iter()
            .filter_map(|p| {
                let depth = CAMERA_Z - p.pos[2];
                if depth <= NEAR {
                    return None;
                }
                let scale = focal / depth;
                Some(Dot {
                    x: width / 2.0 + p.pos[0] * scale,
                    y: height / 2.0 - p.pos[1] * scale,
                    radius: (POINT_SIZE * scale * 0.5).max(0.6),
                    color: p.color,
                })
            })
            .collect()
    }
}

// --- Canvas backdrop -------------------------------------------------------

struct Backdrop {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    field: ParticleField,
    opacity: f64,
}

thread_local! {
    static BACKDROP: RefCell<Option<Backdrop>> = RefCell::new(None);
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Start the backdrop on `canvas`. Runs for the lifetime of the page.
pub fn install(canvas: HtmlCanvasElement, config: &ParticleConfig) -> Result<()> {
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| DeviceError::Js("2d context unavailable".into()))?
        .dyn_into()
        .map_err(JsValue::from)?;
    let mut rng = SmallRng::from_rng(&mut rand::rng());
    let backdrop = Backdrop {
        canvas,
        ctx,
        field: ParticleField::new(config.count, &mut rng),
        opacity: config.opacity,
    };
    backdrop.fit_window();
    BACKDROP.with(|b| b.replace(Some(backdrop)));

    if let Some(win) = window() {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::Event| {
            BACKDROP.with(|b| {
                if let Some(backdrop) = b.borrow().as_ref() {
                    backdrop.fit_window();
                }
            });
        }) as Box<dyn FnMut(_)>);
        win.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    start_backdrop_loop();
    Ok(())
}

fn start_backdrop_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
        BACKDROP.with(|b| {
            if let Some(backdrop) = b.borrow_mut().as_mut() {
                backdrop.frame();
            }
        });
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

impl Backdrop {
    fn fit_window(&self) {
        let Some(win) = window() else {
            return;
        };
        let w = win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let h = win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let dpr = win.device_pixel_ratio().min(2.0);
        self.canvas.set_width((w * dpr) as u32);
        self.canvas.set_height((h * dpr) as u32);
    }

    fn frame(&mut self) {
        self.field.step();
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
        self.ctx.clear_rect(0.0, 0.0, w, h);
        self.ctx.set_global_alpha(self.opacity);
        for dot in self.field.project(w, h) {
            self.ctx.set_fill_style_str(PALETTE[dot.color]);
            self.ctx.begin_path();
            if self
                .ctx
                .arc(dot.x, dot.y, dot.radius, 0.0, std::f64::consts::TAU)
                .is_ok()
            {
                self.ctx.fill();
            }
        }
        self.ctx.set_global_alpha(1.0);
    }
}
