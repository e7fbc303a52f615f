//! Gray-Scott reaction-diffusion sampled onto the key grid.
//!
//! The simulation runs on its own toroidal grid; key colors come from
//! bilinear sampling of the V concentration. Keystrokes optionally inject
//! catalyst around the struck key's grid position.

use std::sync::Arc;

use super::{
    normalized_coords, param_bool, param_color, param_f64, param_f64_min, param_usize,
    LightingPreset, ParameterMap,
};
use crate::activity::KeyActivityBus;
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

pub struct ReactionDiffusionPreset {
    width: usize,
    height: usize,
    du: f64,
    dv: f64,
    feed: f64,
    kill: f64,
    steps_per_frame: usize,
    zoom: f64,
    speed: f64,
    color_a: RgbColor,
    color_b: RgbColor,

    reactive_enabled: bool,
    injection_amount: f64,
    injection_radius: f64,
    injection_decay: f64,
    injection_history: f64,

    u: Vec<f64>,
    v: Vec<f64>,
    inited: bool,
    coords: Option<(Vec<f64>, Vec<f64>)>,
    bus: Option<Arc<KeyActivityBus>>,
}

impl Default for ReactionDiffusionPreset {
    fn default() -> Self {
        Self {
            width: 96,
            height: 32,
            du: 0.16,
            dv: 0.08,
            feed: 0.035,
            kill: 0.065,
            steps_per_frame: 8,
            zoom: 1.0,
            speed: 1.0,
            color_a: RgbColor::BLACK,
            color_b: RgbColor::WHITE,
            reactive_enabled: true,
            injection_amount: 0.8,
            injection_radius: 0.08,
            injection_decay: 0.6,
            injection_history: 1.5,
            u: Vec::new(),
            v: Vec::new(),
            inited: false,
            coords: None,
            bus: None,
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

impl ReactionDiffusionPreset {
    fn init_grid(&mut self) {
        self.u = vec![1.0; self.width * self.height];
        self.v = vec![0.0; self.width * self.height];
        for y in 0..self.height {
            for x in 0..self.width {
                // Sparse deterministic seeding
                let h = hash32((x as u32).wrapping_add(73_856_093u32.wrapping_mul(
                    (y as u32).wrapping_add(19_349_663),
                )));
                if (h % 10_000) as f64 / 10_000.0 > 0.98 {
                    self.v[y * self.width + x] = 1.0;
                }
            }
        }
        self.inited = true;
    }

    fn at(&self, x: i64, y: i64) -> usize {
        let w = self.width as i64;
        let h = self.height as i64;
        let x = x.rem_euclid(w);
        let y = y.rem_euclid(h);
        (y * w + x) as usize
    }

    fn step(&mut self, dt: f64) {
        let mut u2 = self.u.clone();
        let mut v2 = self.v.clone();
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let i = self.at(x, y);
                let u = self.u[i];
                let v = self.v[i];
                let lap_u = self.u[self.at(x - 1, y)]
                    + self.u[self.at(x + 1, y)]
                    + self.u[self.at(x, y - 1)]
                    + self.u[self.at(x, y + 1)]
                    - 4.0 * u;
                let lap_v = self.v[self.at(x - 1, y)]
                    + self.v[self.at(x + 1, y)]
                    + self.v[self.at(x, y - 1)]
                    + self.v[self.at(x, y + 1)]
                    - 4.0 * v;
                let uvv = u * v * v;
                u2[i] = (u + (self.du * lap_u - uvv + self.feed * (1.0 - u)) * dt).clamp(0.0, 1.0);
                v2[i] = (v + (self.dv * lap_v + uvv - (self.kill + self.feed) * v) * dt)
                    .clamp(0.0, 1.0);
            }
        }
        std::mem::swap(&mut self.u, &mut u2);
        std::mem::swap(&mut self.v, &mut v2);
    }

    fn apply_activity_injection(&mut self) {
        let Some(bus) = self.bus.clone() else {
            return;
        };
        let Some((xs, ys)) = self.coords.clone() else {
            return;
        };
        if !self.reactive_enabled || xs.is_empty() || self.width == 0 || self.height == 0 {
            return;
        }
        let events = bus.recent(self.injection_history);
        if events.is_empty() {
            return;
        }

        let now = bus.now_seconds();
        let decay = self.injection_decay.max(0.01);
        let radius_cells = (self.injection_radius * self.width.min(self.height) as f64).max(1.0);
        let radius2 = radius_cells * radius_cells;
        let radius_i = radius_cells.ceil() as i64;

        for ev in events {
            if ev.key_index >= xs.len() {
                continue;
            }
            let age = (now - ev.time_seconds).max(0.0);
            let weight = self.injection_amount * ev.intensity * (-age / decay).exp();
            if weight <= 0.0 {
                continue;
            }
            let cx = (xs[ev.key_index] * (self.width - 1) as f64).round() as i64;
            let cy = (ys[ev.key_index] * (self.height - 1) as f64).round() as i64;

            for dy in -radius_i..=radius_i {
                for dx in -radius_i..=radius_i {
                    let dist2 = (dx * dx + dy * dy) as f64;
                    if dist2 > radius2 {
                        continue;
                    }
                    let delta = weight * (-dist2 / (radius2 * 0.5 + 1e-6)).exp();
                    if delta <= 0.0 {
                        continue;
                    }
                    let idx = self.at(cx + dx, cy + dy);
                    self.u[idx] = (self.u[idx] - delta).clamp(0.0, 1.0);
                    self.v[idx] = (self.v[idx] + delta).clamp(0.0, 1.0);
                }
            }
        }
    }
}

impl LightingPreset for ReactionDiffusionPreset {
    fn id(&self) -> &'static str {
        "reaction_diffusion"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(v) = param_usize(params, "width") {
            self.width = v.max(8);
            self.inited = false;
        }
        if let Some(v) = param_usize(params, "height") {
            self.height = v.max(8);
            self.inited = false;
        }
        if let Some(v) = param_f64(params, "du") {
            self.du = v;
        }
        if let Some(v) = param_f64(params, "dv") {
            self.dv = v;
        }
        if let Some(v) = param_f64(params, "feed") {
            self.feed = v;
        }
        if let Some(v) = param_f64(params, "kill") {
            self.kill = v;
        }
        if let Some(v) = param_usize(params, "steps") {
            self.steps_per_frame = v.max(1);
        }
        if let Some(v) = param_f64_min(params, "zoom", 0.25) {
            self.zoom = v;
        }
        if let Some(v) = param_f64(params, "speed") {
            self.speed = v;
        }
        if let Some(c) = param_color(params, "color_a") {
            self.color_a = c;
        }
        if let Some(c) = param_color(params, "color_b") {
            self.color_b = c;
        }
        if let Some(v) = param_bool(params, "reactive") {
            self.reactive_enabled = v;
        }
        if let Some(v) = param_f64_min(params, "injection_amount", 0.0) {
            self.injection_amount = v;
        }
        if let Some(v) = param_f64_min(params, "injection_radius", 0.001) {
            self.injection_radius = v;
        }
        if let Some(v) = param_f64_min(params, "injection_decay", 0.01) {
            self.injection_decay = v;
        }
        if let Some(v) = param_f64_min(params, "injection_history", 0.05) {
            self.injection_history = v;
        }
    }

    fn render(&mut self, model: &KeyboardModel, _time_seconds: f64, frame: &mut KeyColorFrame) {
        let total = model.key_count();
        if frame.len() != total {
            frame.resize(total);
        }
        if !self.inited {
            self.init_grid();
        }
        if self.coords.is_none() {
            self.coords = Some(normalized_coords(model));
        }

        self.apply_activity_injection();

        let dt = 0.5 * self.speed;
        for _ in 0..self.steps_per_frame {
            self.step(dt);
        }

        let Some((xs, ys)) = self.coords.as_ref() else {
            return;
        };
        for i in 0..total {
            let gx = xs[i] * self.zoom * (self.width - 1) as f64;
            let gy = ys[i] * self.zoom * (self.height - 1) as f64;
            let x0 = gx.floor() as i64;
            let y0 = gy.floor() as i64;
            let tx = gx - x0 as f64;
            let ty = gy - y0 as f64;

            let v00 = self.v[self.at(x0, y0)];
            let v10 = self.v[self.at(x0 + 1, y0)];
            let v01 = self.v[self.at(x0, y0 + 1)];
            let v11 = self.v[self.at(x0 + 1, y0 + 1)];
            let vx0 = v00 * (1.0 - tx) + v10 * tx;
            let vx1 = v01 * (1.0 - tx) + v11 * tx;
            let t = (vx0 * (1.0 - ty) + vx1 * ty).clamp(0.0, 1.0);

            frame.set_color(i, RgbColor::lerp(self.color_a, self.color_b, t));
        }
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn bind_activity(&mut self, bus: Arc<KeyActivityBus>) {
        self.bus = Some(bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concentrations_stay_normalized() {
        let layout = vec![
            (0..4).map(|i| format!("A{i}")).collect::<Vec<_>>(),
            (0..4).map(|i| format!("B{i}")).collect(),
        ];
        let model = KeyboardModel::new("t", 1, 1, vec![], 64, layout);
        let mut preset = ReactionDiffusionPreset::default();
        let mut params = ParameterMap::new();
        params.insert("width".into(), "16".into());
        params.insert("height".into(), "8".into());
        params.insert("steps".into(), "2".into());
        preset.configure(&params);

        let mut frame = KeyColorFrame::new(8);
        for step in 0..5 {
            preset.render(&model, step as f64 * 0.033, &mut frame);
        }
        assert!(preset.u.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(preset.v.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn injection_raises_catalyst_near_struck_key() {
        let layout = vec![
            (0..4).map(|i| format!("A{i}")).collect::<Vec<_>>(),
            (0..4).map(|i| format!("B{i}")).collect(),
        ];
        let model = KeyboardModel::new("t", 1, 1, vec![], 64, layout);
        let bus = Arc::new(KeyActivityBus::new(8, 2.0));

        let mut preset = ReactionDiffusionPreset::default();
        let mut params = ParameterMap::new();
        params.insert("width".into(), "16".into());
        params.insert("height".into(), "8".into());
        params.insert("steps".into(), "1".into());
        // Near-zero feed keeps the injected spot visible for the assertion
        params.insert("speed".into(), "0.0".into());
        preset.configure(&params);
        preset.bind_activity(bus.clone());

        let mut frame = KeyColorFrame::new(8);
        preset.render(&model, 0.0, &mut frame);
        let before: f64 = preset.v.iter().sum();

        bus.record(0, 1.0);
        preset.render(&model, 0.033, &mut frame);
        let after: f64 = preset.v.iter().sum();
        assert!(after > before);
    }
}
