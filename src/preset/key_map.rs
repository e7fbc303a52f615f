//! Explicit per-label color map.
//!
//! Parameters of the form `key.<Label>=#RRGGBB` light individual keys over a
//! `background` fill. The shortcut overlay uses this preset with a single
//! `color` applied to whichever keys the active combo selects.

use std::collections::BTreeMap;

use super::{param_color, LightingPreset, ParameterMap};
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

#[derive(Debug, Default)]
pub struct KeyMapPreset {
    background: RgbColor,
    color: RgbColor,
    label_colors: BTreeMap<String, RgbColor>,
}

impl LightingPreset for KeyMapPreset {
    fn id(&self) -> &'static str {
        "key_map"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(c) = param_color(params, "background") {
            self.background = c;
        }
        if let Some(c) = param_color(params, "color") {
            self.color = c;
        }
        self.label_colors.clear();
        for (key, value) in params {
            if let Some(label) = key.strip_prefix("key.") {
                if label.is_empty() {
                    continue;
                }
                if let Some(color) = RgbColor::parse(value) {
                    self.label_colors.insert(label.to_string(), color);
                }
            }
        }
    }

    fn render(&mut self, model: &KeyboardModel, _time_seconds: f64, frame: &mut KeyColorFrame) {
        let total = model.key_count();
        if frame.len() != total {
            frame.resize(total);
        }
        // Without explicit per-label entries, light everything the engine's
        // mask admits in the flat color; the overlay path relies on this.
        if self.label_colors.is_empty() {
            frame.fill(if self.color == RgbColor::BLACK {
                self.background
            } else {
                self.color
            });
            return;
        }
        frame.fill(self.background);
        for (label, color) in &self.label_colors {
            if let Some(index) = model.index_for_key(label) {
                frame.set_color(index, *color);
            }
        }
    }
}
