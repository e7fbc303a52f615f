//! Solid single-color fill

use super::{param_color, LightingPreset, ParameterMap};
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

#[derive(Debug, Default)]
pub struct StaticColorPreset {
    color: RgbColor,
}

impl LightingPreset for StaticColorPreset {
    fn id(&self) -> &'static str {
        "static_color"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(color) = param_color(params, "color") {
            self.color = color;
        }
    }

    fn render(&mut self, _model: &KeyboardModel, _time_seconds: f64, frame: &mut KeyColorFrame) {
        frame.fill(self.color);
    }
}
