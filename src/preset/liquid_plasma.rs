//! Layered sine-field plasma over the layout geometry

use super::{normalized_coords, param_color, param_f64, LightingPreset, ParameterMap};
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

#[derive(Debug)]
pub struct LiquidPlasmaPreset {
    speed: f64,
    scale: f64,
    saturation: f64,
    value: f64,
    tint: RgbColor,
    tint_mix: f64,
    use_tint: bool,
    coords: Option<(Vec<f64>, Vec<f64>)>,
}

impl Default for LiquidPlasmaPreset {
    fn default() -> Self {
        Self {
            speed: 0.6,
            scale: 2.5,
            saturation: 0.9,
            value: 1.0,
            tint: RgbColor::WHITE,
            tint_mix: 0.5,
            use_tint: false,
            coords: None,
        }
    }
}

impl LightingPreset for LiquidPlasmaPreset {
    fn id(&self) -> &'static str {
        "liquid_plasma"
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
        let (xs, ys) = self
            .coords
            .get_or_insert_with(|| normalized_coords(model));

        let t = time_seconds * self.speed * std::f64::consts::TAU;
        for i in 0..total {
            let x = xs[i] * self.scale;
            let y = ys[i] * self.scale;
            let mut v = 0.0;
            v += (3.0 * x + t).sin();
            v += (4.0 * (y + 0.25) + t * 1.37).sin();
            v += (5.0 * (x + y) + t * 0.73).sin();
            let r2 = x * x + y * y;
            v += (6.0 * (r2 + 1e-6).sqrt() + t * 1.61).sin();
            v = ((v + 4.0) * 0.125).clamp(0.0, 1.0);

            let mut color = RgbColor::from_hsv(
                360.0 * v,
                self.saturation.clamp(0.0, 1.0),
                self.value.clamp(0.0, 1.0),
            );
            if self.use_tint {
                color = RgbColor::lerp(color, self.tint, self.tint_mix);
            }
            frame.set_color(i, color);
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
    fn paints_full_geometry() {
        let layout = vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["NAN".to_string(), "C".to_string()],
        ];
        let model = KeyboardModel::new("t", 1, 1, vec![], 32, layout);
        let mut preset = LiquidPlasmaPreset::default();
        let mut frame = KeyColorFrame::new(4);
        preset.render(&model, 1.5, &mut frame);
        // Deterministic for a fixed time input
        let mut again = KeyColorFrame::new(4);
        preset.render(&model, 1.5, &mut again);
        assert_eq!(frame, again);
    }
}
