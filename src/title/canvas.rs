//! Title canvas: offscreen label buffer plus a cancellable frame loop.
//!
//! The loop only runs while the title is showing. `hide()` cancels the
//! outstanding frame request so nothing keeps drawing under the countdown.

use std::cell::RefCell;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, window};

use super::GlitchTitle;
use crate::config::TitleConfig;
use crate::error::{DeviceError, Result};

struct TitleCanvas {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    buffer: HtmlCanvasElement,
    bctx: CanvasRenderingContext2d,
    glitch: GlitchTitle,
    config: TitleConfig,
    frame: Option<i32>,
}

thread_local! {
    static TITLE: RefCell<Option<TitleCanvas>> = RefCell::new(None);
    static TITLE_CALLBACK: RefCell<Option<Closure<dyn FnMut(f64)>>> = RefCell::new(None);
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    Ok(canvas
        .get_context("2d")?
        .ok_or_else(|| DeviceError::Js("2d context unavailable".into()))?
        .dyn_into()
        .map_err(JsValue::from)?)
}

/// Bind the title canvas and prepare its offscreen buffer. Does not start drawing.
pub fn install(doc: &Document, canvas: HtmlCanvasElement, config: &TitleConfig) -> Result<()> {
    canvas.set_width(config.width);
    canvas.set_height(config.height);
    let ctx = context_2d(&canvas)?;

    let buffer: HtmlCanvasElement = doc
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| DeviceError::Js("offscreen canvas unavailable".into()))?;
    buffer.set_width(config.width);
    buffer.set_height(config.height);
    let bctx = context_2d(&buffer)?;

    let title = TitleCanvas {
        canvas,
        ctx,
        buffer,
        bctx,
        glitch: GlitchTitle::new(config.noise, SmallRng::from_rng(&mut rand::rng())),
        config: config.clone(),
        frame: None,
    };
    title.render_label();
    TITLE.with(|t| t.replace(Some(title)));

    TITLE_CALLBACK.with(|cb| {
        *cb.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
            TITLE.with(|cell| {
                if let Some(title) = cell.borrow_mut().as_mut() {
                    title.frame = None;
                    title.draw_frame();
                    title.frame = request_frame();
                }
            });
        }) as Box<dyn FnMut(f64)>));
    });

    // Web fonts may land after first paint; re-render the label once they do.
    if let Ok(ready) = doc.fonts().ready() {
        wasm_bindgen_futures::spawn_local(async move {
            if JsFuture::from(ready).await.is_ok() {
                TITLE.with(|cell| {
                    if let Some(title) = cell.borrow().as_ref() {
                        title.render_label();
                    }
                });
            }
        });
    }
    Ok(())
}

fn request_frame() -> Option<i32> {
    let win = window()?;
    TITLE_CALLBACK.with(|cb| {
        cb.borrow()
            .as_ref()
            .and_then(|c| win.request_animation_frame(c.as_ref().unchecked_ref()).ok())
    })
}

/// Show the canvas and (re)start the glitch loop.
pub fn show() {
    TITLE.with(|cell| {
        if let Some(title) = cell.borrow_mut().as_mut() {
            title.canvas.style().set_property("display", "block").ok();
            title.render_label();
            title.glitch.restart();
            if title.frame.is_none() {
                title.frame = request_frame();
            }
        }
    });
}

/// Hide the canvas and cancel the pending frame.
pub fn hide() {
    TITLE.with(|cell| {
        if let Some(title) = cell.borrow_mut().as_mut() {
            title.cancel_frame();
            title.canvas.style().set_property("display", "none").ok();
        }
    });
}

impl TitleCanvas {
    fn render_label(&self) {
        let w = self.buffer.width() as f64;
        let h = self.buffer.height() as f64;
        self.bctx.clear_rect(0.0, 0.0, w, h);
        self.bctx.set_fill_style_str(&self.config.color);
        self.bctx.set_font(&self.config.font);
        self.bctx.set_text_baseline("middle");
        self.bctx.set_text_align("center");
        self.bctx.fill_text(&self.config.text, w / 2.0, h / 2.0).ok();
    }

    fn draw_frame(&mut self) {
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
        self.ctx.clear_rect(0.0, 0.0, w, h);
        for s in self.glitch.frame(w) {
            self.ctx
                .draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    &self.buffer,
                    s.x,
                    0.0,
                    s.width,
                    h,
                    s.x,
                    s.y_offset,
                    s.width,
                    h,
                )
                .ok();
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(id) = self.frame.take() {
            if let Some(w) = window() {
                w.cancel_animation_frame(id).ok();
            }
        }
    }
}
