//! Preset stack composition and frame dispatch.
//!
//! The engine owns the installed presets, one mask per preset, and the draw
//! list (painter's order). Each tick it lets every contributing preset paint
//! a scratch frame covering the whole geometry, then copies the masked
//! region into the output frame; later painters replace earlier ones where
//! their mask admits them. There is no blending; the hardware receives one
//! color per LED.
//!
//! The engine is not internally synchronized. All access goes through the
//! controller's engine mutex.

use std::sync::Arc;

use tracing::warn;

use crate::activity::KeyActivityBus;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;
use crate::preset::LightingPreset;
use crate::transport::DeviceTransport;

pub struct EffectEngine {
    model: Arc<KeyboardModel>,
    transport: Box<dyn DeviceTransport>,
    frame: KeyColorFrame,
    scratch: KeyColorFrame,
    presets: Vec<Box<dyn LightingPreset>>,
    ids: Vec<&'static str>,
    animated: Vec<bool>,
    enabled: Vec<bool>,
    masks: Vec<Vec<bool>>,
    draw_list: Vec<usize>,
    activity: Option<Arc<KeyActivityBus>>,
}

impl EffectEngine {
    pub fn new(model: Arc<KeyboardModel>, transport: Box<dyn DeviceTransport>) -> Self {
        let key_count = model.key_count();
        Self {
            model,
            transport,
            frame: KeyColorFrame::new(key_count),
            scratch: KeyColorFrame::new(key_count),
            presets: Vec::new(),
            ids: Vec::new(),
            animated: Vec::new(),
            enabled: Vec::new(),
            masks: Vec::new(),
            draw_list: Vec::new(),
            activity: None,
        }
    }

    /// Bus handed to every installed preset via `bind_activity`
    pub fn set_activity_bus(&mut self, bus: Arc<KeyActivityBus>) {
        for preset in &mut self.presets {
            preset.bind_activity(Arc::clone(&bus));
        }
        self.activity = Some(bus);
    }

    /// Replace the preset stack. Resets the draw list, enables only the
    /// first preset, and installs all-true masks; supplied masks override
    /// per element when their length matches the key count.
    pub fn set_presets(
        &mut self,
        presets: Vec<Box<dyn LightingPreset>>,
        masks: Option<Vec<Vec<bool>>>,
    ) {
        self.presets = presets;
        let key_count = self.model.key_count();

        self.ids = self.presets.iter().map(|p| p.id()).collect();
        self.animated = self.presets.iter().map(|p| p.is_animated()).collect();
        self.enabled = vec![false; self.presets.len()];
        if let Some(first) = self.enabled.first_mut() {
            *first = true;
        }
        self.masks = vec![vec![true; key_count]; self.presets.len()];
        self.draw_list.clear();
        self.frame.resize(key_count);

        if let Some(bus) = &self.activity {
            for preset in &mut self.presets {
                preset.bind_activity(Arc::clone(bus));
            }
        }

        if let Some(masks) = masks {
            if masks.len() == self.masks.len() {
                for (i, mask) in masks.into_iter().enumerate() {
                    if mask.len() == key_count {
                        self.masks[i] = mask;
                    }
                }
            }
        }
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn preset_ids(&self) -> &[&'static str] {
        &self.ids
    }

    pub fn preset_at(&mut self, index: usize) -> Option<&mut Box<dyn LightingPreset>> {
        self.presets.get_mut(index)
    }

    pub fn preset_enabled(&self, index: usize) -> Option<bool> {
        self.enabled.get(index).copied()
    }

    pub fn set_preset_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.enabled.get_mut(index) {
            Some(entry) => {
                *entry = enabled;
                true
            }
            None => false,
        }
    }

    pub fn preset_animated(&self, index: usize) -> Option<bool> {
        self.animated.get(index).copied()
    }

    pub fn preset_mask(&self, index: usize) -> Option<&[bool]> {
        self.masks.get(index).map(Vec::as_slice)
    }

    /// Install a mask for one preset; rejected when the length is wrong
    pub fn set_preset_mask(&mut self, index: usize, mask: &[bool]) -> bool {
        if mask.len() != self.model.key_count() {
            return false;
        }
        match self.masks.get_mut(index) {
            Some(entry) => {
                *entry = mask.to_vec();
                true
            }
            None => false,
        }
    }

    /// Bulk mask replace. A count mismatch is a no-op; per-element length
    /// mismatches skip that element.
    pub fn set_preset_masks(&mut self, masks: &[Vec<bool>]) -> bool {
        if masks.len() != self.masks.len() {
            return false;
        }
        let key_count = self.model.key_count();
        for (i, mask) in masks.iter().enumerate() {
            if mask.len() == key_count {
                self.masks[i] = mask.clone();
            }
        }
        true
    }

    pub fn draw_list(&self) -> &[usize] {
        &self.draw_list
    }

    /// Set the painter's order. Out-of-range indices are dropped silently;
    /// an empty list restores fallback-by-enabled composition. Duplicates
    /// are kept and paint multiple times.
    pub fn set_draw_list(&mut self, indices: &[usize]) {
        let count = self.presets.len();
        self.draw_list = indices.iter().copied().filter(|&i| i < count).collect();
    }

    fn active_order(&self) -> Vec<usize> {
        if !self.draw_list.is_empty() {
            self.draw_list.clone()
        } else {
            (0..self.presets.len())
                .filter(|&i| self.enabled.get(i).copied().unwrap_or(false))
                .collect()
        }
    }

    /// True iff some preset contributing to the current composition is
    /// animated
    pub fn has_animated_enabled(&self) -> bool {
        self.active_order()
            .into_iter()
            .any(|i| self.animated.get(i).copied().unwrap_or(false))
    }

    /// Compose one frame at `time_seconds` through the active order
    pub fn render_frame(&mut self, time_seconds: f64) {
        let key_count = self.model.key_count();
        if self.frame.len() != key_count {
            self.frame.resize(key_count);
        }
        self.frame.fill(crate::color::RgbColor::BLACK);

        let order = self.active_order();
        for index in order {
            let Some(preset) = self.presets.get_mut(index) else {
                continue;
            };
            self.scratch.resize(key_count);
            preset.render(&self.model, time_seconds, &mut self.scratch);

            let Some(mask) = self.masks.get(index) else {
                continue;
            };
            for k in 0..key_count {
                if mask[k] {
                    if let Some(color) = self.scratch.color(k) {
                        self.frame.set_color(k, color);
                    }
                }
            }
        }
    }

    /// Encode the current frame and hand it to the transport
    pub fn push_frame(&mut self) -> bool {
        let payload = match self.model.encode_frame(&self.frame) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("frame encoding failed: {err}");
                return false;
            }
        };
        self.transport.send_frame(&self.model, &payload)
    }

    pub fn frame(&self) -> &KeyColorFrame {
        &self.frame
    }

    pub fn model(&self) -> &Arc<KeyboardModel> {
        &self.model
    }
}
