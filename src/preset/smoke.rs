//! Drifting fractal-noise smoke with optional keystroke displacement

use std::sync::Arc;

use super::{
    normalized_coords, param_bool, param_color, param_f64, param_f64_min, param_usize,
    LightingPreset, ParameterMap,
};
use crate::activity::KeyActivityBus;
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

pub struct SmokePreset {
    speed: f64,
    scale: f64,
    octaves: usize,
    persistence: f64,
    lacunarity: f64,
    drift_x: f64,
    drift_y: f64,
    contrast: f64,
    color_low: RgbColor,
    color_high: RgbColor,

    reactive_enabled: bool,
    reactive_history: f64,
    reactive_decay: f64,
    reactive_spread: f64,
    reactive_intensity: f64,
    reactive_displacement: f64,
    reactive_push: bool,
    reactive_push_duration: f64,

    coords: Option<(Vec<f64>, Vec<f64>)>,
    bus: Option<Arc<KeyActivityBus>>,
}

impl Default for SmokePreset {
    fn default() -> Self {
        Self {
            speed: 0.2,
            scale: 2.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            drift_x: 0.0,
            drift_y: 0.0,
            contrast: 1.0,
            color_low: RgbColor::BLACK,
            color_high: RgbColor::new(255, 180, 80),
            reactive_enabled: false,
            reactive_history: 1.0,
            reactive_decay: 0.35,
            reactive_spread: 0.08,
            reactive_intensity: 1.0,
            reactive_displacement: 0.06,
            reactive_push: true,
            reactive_push_duration: 0.45,
            coords: None,
            bus: None,
        }
    }
}

impl SmokePreset {
    fn displacement_field(&self, total: usize) -> (Vec<f64>, Vec<f64>) {
        let mut dx = vec![0.0; total];
        let mut dy = vec![0.0; total];
        let (Some(bus), Some((xs, ys))) = (&self.bus, &self.coords) else {
            return (dx, dy);
        };
        if !self.reactive_enabled || total == 0 {
            return (dx, dy);
        }
        let events = bus.recent(self.reactive_history);
        if events.is_empty() {
            return (dx, dy);
        }

        let spread = self.reactive_spread.max(0.01);
        let sigma2 = 2.0 * spread * spread;
        let decay = self.reactive_decay.max(0.01);
        let now = bus.now_seconds();
        let base = self.reactive_displacement.max(0.0);
        let direction = if self.reactive_push { 1.0 } else { -1.0 };
        let push_window = self.reactive_push_duration.max(0.0);

        for ev in events {
            if ev.key_index >= total {
                continue;
            }
            let ex = xs[ev.key_index];
            let ey = ys[ev.key_index];
            let age = (now - ev.time_seconds).max(0.0);
            if push_window > 0.0 && age > push_window {
                continue;
            }
            let window_factor = if push_window > 0.0 {
                (1.0 - age / push_window).max(0.0)
            } else {
                1.0
            };
            let weight = ev.intensity * self.reactive_intensity * (-age / decay).exp() * window_factor;
            if weight <= 0.0 {
                continue;
            }
            for k in 0..total {
                let px = xs[k] - ex;
                let py = ys[k] - ey;
                let dist2 = px * px + py * py;
                let magnitude = base * weight * (-dist2 / sigma2).exp();
                if magnitude <= 0.0 {
                    continue;
                }
                let len = dist2.sqrt();
                if len < 1e-5 {
                    continue;
                }
                dx[k] += direction * (px / len) * magnitude;
                dy[k] += direction * (py / len) * magnitude;
            }
        }
        (dx, dy)
    }
}

impl LightingPreset for SmokePreset {
    fn id(&self) -> &'static str {
        "smoke"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(v) = param_f64(params, "speed") {
            self.speed = v;
        }
        if let Some(v) = param_f64(params, "scale") {
            self.scale = v;
        }
        if let Some(v) = param_usize(params, "octaves") {
            self.octaves = v.max(1);
        }
        if let Some(v) = param_f64(params, "persistence") {
            self.persistence = v;
        }
        if let Some(v) = param_f64(params, "lacunarity") {
            self.lacunarity = v;
        }
        if let Some(v) = param_f64(params, "drift_x") {
            self.drift_x = v;
        }
        if let Some(v) = param_f64(params, "drift_y") {
            self.drift_y = v;
        }
        if let Some(v) = param_f64_min(params, "contrast", 0.0) {
            self.contrast = v;
        }
        if let Some(c) = param_color(params, "color_low") {
            self.color_low = c;
        }
        if let Some(c) = param_color(params, "color_high") {
            self.color_high = c;
        }
        if let Some(v) = param_bool(params, "reactive") {
            self.reactive_enabled = v;
        }
        if let Some(v) = param_f64_min(params, "reactive_history", 0.05) {
            self.reactive_history = v;
        }
        if let Some(v) = param_f64_min(params, "reactive_decay", 0.01) {
            self.reactive_decay = v;
        }
        if let Some(v) = param_f64_min(params, "reactive_spread", 0.005) {
            self.reactive_spread = v;
        }
        if let Some(v) = param_f64_min(params, "reactive_intensity", 0.0) {
            self.reactive_intensity = v;
        }
        if let Some(v) = param_f64_min(params, "reactive_displacement", 0.0) {
            self.reactive_displacement = v;
        }
        if let Some(v) = param_f64_min(params, "reactive_push_duration", 0.0) {
            self.reactive_push_duration = v;
        }
        if let Some(v) = param_bool(params, "reactive_push") {
            self.reactive_push = v;
        }
    }

    fn render(&mut self, model: &KeyboardModel, time_seconds: f64, frame: &mut KeyColorFrame) {
        let total = model.key_count();
        if frame.len() != total {
            frame.resize(total);
        }
        if self.coords.is_none() {
            self.coords = Some(normalized_coords(model));
        }

        let (disp_x, disp_y) = self.displacement_field(total);
        let Some((xs, ys)) = self.coords.as_ref() else {
            return;
        };

        let t_anim = time_seconds * self.speed;
        let offset_x = time_seconds * self.drift_x;
        let offset_y = time_seconds * self.drift_y;

        for i in 0..total {
            let base_x = (xs[i] + disp_x[i]).clamp(0.0, 1.0);
            let base_y = (ys[i] + disp_y[i]).clamp(0.0, 1.0);
            let x = base_x * self.scale + offset_x;
            let y = base_y * self.scale + offset_y;

            let mut amp = 1.0;
            let mut freq = 1.0;
            let mut sum = 0.0;
            let mut norm = 0.0;
            for _ in 0..self.octaves {
                sum += amp * perlin(x * freq, y * freq, t_anim * freq);
                norm += amp;
                amp *= self.persistence;
                freq *= self.lacunarity;
            }
            let mut v = if norm > 0.0 { sum / norm } else { 0.0 };
            v = (0.5 + (v - 0.5) * self.contrast).clamp(0.0, 1.0);
            frame.set_color(i, RgbColor::lerp(self.color_low, self.color_high, v));
        }
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn bind_activity(&mut self, bus: Arc<KeyActivityBus>) {
        self.bus = Some(bus);
    }
}

// ── Perlin noise ─────────────────────────────────────────────────────

const PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209,
    76, 132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198,
    173, 186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212,
    207, 206, 59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44,
    154, 163, 70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79,
    113, 224, 232, 178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12,
    191, 179, 162, 241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157,
    184, 84, 204, 176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29,
    24, 72, 243, 141, 128, 195, 78, 66,
];

fn p(i: i32) -> i32 {
    PERM[(i & 255) as usize] as i32
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn grad(hash: i32, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

/// Classic Perlin noise in [0, 1]
fn perlin(x: f64, y: f64, z: f64) -> f64 {
    let xi = x.floor() as i32;
    let yi = y.floor() as i32;
    let zi = z.floor() as i32;
    let x = x - x.floor();
    let y = y - y.floor();
    let z = z - z.floor();
    let u = fade(x);
    let v = fade(y);
    let w = fade(z);

    let a = p(xi) + yi;
    let aa = p(a) + zi;
    let ab = p(a + 1) + zi;
    let b = p(xi + 1) + yi;
    let ba = p(b) + zi;
    let bb = p(b + 1) + zi;

    let res = lerp(
        lerp(
            lerp(grad(p(aa), x, y, z), grad(p(ba), x - 1.0, y, z), u),
            lerp(
                grad(p(ab), x, y - 1.0, z),
                grad(p(bb), x - 1.0, y - 1.0, z),
                u,
            ),
            v,
        ),
        lerp(
            lerp(
                grad(p(aa + 1), x, y, z - 1.0),
                grad(p(ba + 1), x - 1.0, y, z - 1.0),
                u,
            ),
            lerp(
                grad(p(ab + 1), x, y - 1.0, z - 1.0),
                grad(p(bb + 1), x - 1.0, y - 1.0, z - 1.0),
                u,
            ),
            v,
        ),
        w,
    );
    (res + 1.0) * 0.5
}
