//! Scrolling rainbow hue wave across the key index space

use super::{param_color, param_f64, LightingPreset, ParameterMap};
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

#[derive(Debug)]
pub struct RainbowWavePreset {
    speed: f64,
    scale: f64,
    saturation: f64,
    value: f64,
    tint: RgbColor,
    tint_mix: f64,
    use_tint: bool,
}

impl Default for RainbowWavePreset {
    fn default() -> Self {
        Self {
            speed: 0.5,
            scale: 0.15,
            saturation: 1.0,
            value: 1.0,
            tint: RgbColor::WHITE,
            tint_mix: 0.5,
            use_tint: false,
        }
    }
}

impl LightingPreset for RainbowWavePreset {
    fn id(&self) -> &'static str {
        "rainbow_wave"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(v) = param_f64(params, "speed") {
            self.speed = v;
        }
        if let Some(v) = param_f64(params, "scale") {
            self.scale = v;
        }
        if let Some(v) = param_f64(params, "saturation") {
            self.saturation = v;
        }
        if let Some(v) = param_f64(params, "value") {
            self.value = v;
        }
        if let Some(c) = param_color(params, "tint") {
            self.tint = c;
            self.use_tint = true;
        }
        if let Some(v) = param_f64(params, "tint_mix") {
            self.tint_mix = v.clamp(0.0, 1.0);
            self.use_tint = true;
        }
    }

    fn render(&mut self, model: &KeyboardModel, time_seconds: f64, frame: &mut KeyColorFrame) {
        let total = model.key_count();
        if frame.len() != total {
            frame.resize(total);
        }

        for idx in 0..total {
            let phase =
                ((idx as f64 * self.scale + time_seconds * self.speed) * 360.0).rem_euclid(360.0);
            let mut color = RgbColor::from_hsv(
                phase,
                self.saturation.clamp(0.0, 1.0),
                self.value.clamp(0.0, 1.0),
            );
            if self.use_tint {
                color = RgbColor::lerp(color, self.tint, self.tint_mix);
            }
            frame.set_color(idx, color);
        }
    }

    fn is_animated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_zero_is_red() {
        let model =
            KeyboardModel::new("t", 1, 1, vec![], 16, vec![vec!["A".to_string()]]);
        let mut preset = RainbowWavePreset::default();
        let mut frame = KeyColorFrame::new(1);
        preset.render(&model, 0.0, &mut frame);
        assert_eq!(frame.color(0), Some(RgbColor::new(255, 0, 0)));
    }

    #[test]
    fn tint_mix_one_is_pure_tint() {
        let model =
            KeyboardModel::new("t", 1, 1, vec![], 16, vec![vec!["A".to_string()]]);
        let mut preset = RainbowWavePreset::default();
        let mut params = ParameterMap::new();
        params.insert("tint".into(), "#112233".into());
        params.insert("tint_mix".into(), "1.0".into());
        preset.configure(&params);

        let mut frame = KeyColorFrame::new(1);
        preset.render(&model, 0.4, &mut frame);
        assert_eq!(frame.color(0), Some(RgbColor::new(0x11, 0x22, 0x33)));
    }
}
