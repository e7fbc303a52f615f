//! Per-key twinkle with deterministic hashed phases

use super::{param_color, param_f64, LightingPreset, ParameterMap};
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

#[derive(Debug)]
pub struct StarMatrixPreset {
    star_color: RgbColor,
    background: RgbColor,
    density: f64,
    speed: f64,
}

impl Default for StarMatrixPreset {
    fn default() -> Self {
        Self {
            star_color: RgbColor::WHITE,
            background: RgbColor::BLACK,
            density: 0.15,
            speed: 1.5,
        }
    }
}

fn hash32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846ca68b);
    x ^= x >> 16;
    x
}

impl LightingPreset for StarMatrixPreset {
    fn id(&self) -> &'static str {
        "star_matrix"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(c) = param_color(params, "star") {
            self.star_color = c;
        }
        if let Some(c) = param_color(params, "background") {
            self.background = c;
        }
        if let Some(v) = param_f64(params, "density") {
            self.density = v.clamp(0.0, 1.0);
        }
        if let Some(v) = param_f64(params, "speed") {
            self.speed = v.max(0.0);
        }
    }

    fn render(&mut self, model: &KeyboardModel, time_seconds: f64, frame: &mut KeyColorFrame) {
        let total = model.key_count();
        if frame.len() != total {
            frame.resize(total);
        }

        for idx in 0..total {
            // Per-key phase offset from a deterministic hash
            let h = hash32(idx as u32 + 1);
            let seed = (h % 10_000) as f64 / 10_000.0;
            let t = time_seconds * self.speed + seed;
            let w = 0.5 * (1.0 + (std::f64::consts::TAU * t).sin());

            // Only the top `density` slice of the cycle is lit
            let threshold = 1.0 - self.density;
            let mut b = 0.0;
            if w > threshold {
                b = ((w - threshold) / self.density.max(1e-6)).clamp(0.0, 1.0);
                b = b * b * (3.0 - 2.0 * b);
            }
            frame.set_color(idx, RgbColor::lerp(self.background, self.star_color, b));
        }
    }

    fn is_animated(&self) -> bool {
        true
    }
}
