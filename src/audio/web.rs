//! Web Audio backend: one `AudioContext`, a decoded-buffer cache, and a
//! fresh source + gain node per playback so rapid repeats never cut each
//! other off.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use js_sys::ArrayBuffer;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioContext, AudioContextState, Response, window};

use super::{AudioBackend, PlayRequest, SoundKey};
use crate::error::{DeviceError, Result};

const UNLOCK_SAMPLE_RATE: f32 = 22_050.0;

pub struct WebAudioBackend {
    ctx: Option<AudioContext>,
    unsupported: bool,
    base_url: String,
    buffers: Rc<RefCell<HashMap<SoundKey, AudioBuffer>>>,
    loading: Rc<RefCell<HashSet<SoundKey>>>,
}

impl WebAudioBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            ctx: None,
            unsupported: false,
            base_url: base_url.to_string(),
            buffers: Rc::new(RefCell::new(HashMap::new())),
            loading: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    pub fn is_loaded(&self, key: SoundKey) -> bool {
        self.buffers.borrow().contains_key(&key)
    }

    fn ensure_context(&mut self) -> Result<&AudioContext> {
        if self.unsupported {
            return Err(DeviceError::AudioUnavailable("no AudioContext".into()));
        }
        if self.ctx.is_none() {
            match AudioContext::new() {
                Ok(ctx) => self.ctx = Some(ctx),
                Err(e) => {
                    self.unsupported = true;
                    return Err(DeviceError::AudioUnavailable(format!("{e:?}")));
                }
            }
        }
        self.ctx
            .as_ref()
            .ok_or_else(|| DeviceError::AudioUnavailable("no AudioContext".into()))
    }

    /// Fetch and decode each sound in the background. Keys already cached or
    /// in flight are skipped.
    pub fn preload(&mut self, keys: &[SoundKey]) {
        let ctx = match self.ensure_context() {
            Ok(ctx) => ctx.clone(),
            Err(e) => {
                log::warn!("skipping sound preload: {e}");
                return;
            }
        };
        for &key in keys {
            if self.buffers.borrow().contains_key(&key) || !self.loading.borrow_mut().insert(key) {
                continue;
            }
            let url = format!("{}{}", self.base_url, key.file_name());
            let ctx = ctx.clone();
            let buffers = self.buffers.clone();
            let loading = self.loading.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match load_buffer(&ctx, &url).await {
                    Ok(buffer) => {
                        buffers.borrow_mut().insert(key, buffer);
                        log::debug!("decoded {url}");
                    }
                    Err(e) => log::warn!("failed to load {url}: {e}"),
                }
                loading.borrow_mut().remove(&key);
            });
        }
    }
}

async fn load_buffer(ctx: &AudioContext, url: &str) -> Result<AudioBuffer> {
    let win = window().ok_or_else(|| DeviceError::Js("no window".into()))?;
    let resp: Response = JsFuture::from(win.fetch_with_str(url)).await?.dyn_into()?;
    if !resp.ok() {
        return Err(DeviceError::AudioUnavailable(format!("HTTP {}", resp.status())));
    }
    let bytes: ArrayBuffer = JsFuture::from(resp.array_buffer()?).await?.dyn_into()?;
    let decoded = JsFuture::from(ctx.decode_audio_data(&bytes)?).await?;
    Ok(decoded.dyn_into()?)
}

impl AudioBackend for WebAudioBackend {
    fn activate(&mut self) -> Result<()> {
        let ctx = self.ensure_context()?.clone();
        if ctx.state() == AudioContextState::Suspended {
            // Resolution arrives later; the silent buffer below is what counts
            // as "started inside the gesture".
            match ctx.resume() {
                Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = JsFuture::from(promise).await {
                        log::warn!("AudioContext resume rejected: {e:?}");
                    }
                }),
                Err(e) => log::warn!("AudioContext resume failed: {e:?}"),
            }
        }
        let silent = ctx.create_buffer(1, 1, UNLOCK_SAMPLE_RATE)?;
        let src = ctx.create_buffer_source()?;
        src.set_buffer(Some(&silent));
        src.connect_with_audio_node(&ctx.destination())?;
        src.start()?;
        Ok(())
    }

    fn play(&mut self, req: PlayRequest) -> Result<()> {
        let Some(ctx) = self.ctx.as_ref() else {
            return Ok(());
        };
        let Some(buffer) = self.buffers.borrow().get(&req.key).cloned() else {
            log::debug!("{:?} not decoded yet; skipping", req.key);
            return Ok(());
        };
        let src = ctx.create_buffer_source()?;
        src.set_buffer(Some(&buffer));
        src.playback_rate().set_value(req.rate);
        let gain = ctx.create_gain()?;
        gain.gain().set_value(req.gain);
        src.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&ctx.destination())?;
        src.start()?;
        Ok(())
    }
}
