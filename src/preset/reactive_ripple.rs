//! Expanding rings radiating from recent keystrokes

use std::sync::Arc;

use super::{normalized_coords, param_color, param_f64_min, LightingPreset, ParameterMap};
use crate::activity::KeyActivityBus;
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

pub struct ReactiveRipplePreset {
    wave_speed: f64,
    decay_time: f64,
    thickness: f64,
    history_window: f64,
    intensity_scale: f64,
    ripple_color: RgbColor,
    base_color: RgbColor,
    coords: Option<(Vec<f64>, Vec<f64>)>,
    bus: Option<Arc<KeyActivityBus>>,
}

impl Default for ReactiveRipplePreset {
    fn default() -> Self {
        Self {
            wave_speed: 2.0,
            decay_time: 1.2,
            thickness: 0.12,
            history_window: 2.5,
            intensity_scale: 1.0,
            ripple_color: RgbColor::new(0, 170, 255),
            base_color: RgbColor::BLACK,
            coords: None,
            bus: None,
        }
    }
}

fn add_scaled(base: u8, ripple: u8, amount: f64) -> u8 {
    let value = base as f64 + ripple as f64 * amount;
    value.round().clamp(0.0, 255.0) as u8
}

impl LightingPreset for ReactiveRipplePreset {
    fn id(&self) -> &'static str {
        "reactive_ripple"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(v) = param_f64_min(params, "wave_speed", 0.1) {
            self.wave_speed = v;
        }
        if let Some(v) = param_f64_min(params, "decay_time", 0.05) {
            self.decay_time = v;
        }
        if let Some(v) = param_f64_min(params, "thickness", 0.01) {
            self.thickness = v;
        }
        if let Some(v) = param_f64_min(params, "history", 0.1) {
            self.history_window = v;
        }
        if let Some(v) = param_f64_min(params, "intensity", 0.0) {
            self.intensity_scale = v;
        }
        if let Some(c) = param_color(params, "color") {
            self.ripple_color = c;
        }
        if let Some(c) = param_color(params, "base_color") {
            self.base_color = c;
        }
    }

    fn render(&mut self, model: &KeyboardModel, _time_seconds: f64, frame: &mut KeyColorFrame) {
        let total = model.key_count();
        if frame.len() != total {
            frame.resize(total);
        }
        if self
            .coords
            .as_ref()
            .map(|(xs, _)| xs.len() != total)
            .unwrap_or(true)
        {
            self.coords = Some(normalized_coords(model));
        }

        frame.fill(self.base_color);

        let Some(bus) = &self.bus else {
            return;
        };
        let Some((xs, ys)) = self.coords.as_ref() else {
            return;
        };

        let thickness = self.thickness.max(0.005);
        let decay = self.decay_time.max(0.01);
        let speed = self.wave_speed.max(0.01);

        let events = bus.recent(self.history_window);
        if events.is_empty() {
            return;
        }

        let now = bus.now_seconds();
        let mut contributions = vec![0.0; total];
        for ev in events {
            if ev.key_index >= xs.len() {
                continue;
            }
            let ex = xs[ev.key_index];
            let ey = ys[ev.key_index];
            let age = (now - ev.time_seconds).max(0.0);
            let radius = speed * age;
            if radius <= 0.0 {
                continue;
            }
            let decay_factor = (-age / decay).exp();
            for (k, contribution) in contributions.iter_mut().enumerate() {
                let dx = xs[k] - ex;
                let dy = ys[k] - ey;
                let dist = (dx * dx + dy * dy).sqrt();
                let diff = (dist - radius).abs();
                if diff > thickness {
                    continue;
                }
                *contribution +=
                    (1.0 - diff / thickness) * decay_factor * ev.intensity * self.intensity_scale;
            }
        }

        for (k, add) in contributions.into_iter().enumerate() {
            if add <= 0.0 {
                continue;
            }
            let Some(color) = frame.color(k) else {
                continue;
            };
            frame.set_color(
                k,
                RgbColor::new(
                    add_scaled(color.r, self.ripple_color.r, add),
                    add_scaled(color.g, self.ripple_color.g, add),
                    add_scaled(color.b, self.ripple_color.b, add),
                ),
            );
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

    fn model() -> KeyboardModel {
        let layout = vec![
            (0..5).map(|i| format!("A{i}")).collect::<Vec<_>>(),
            (0..5).map(|i| format!("B{i}")).collect(),
        ];
        KeyboardModel::new("t", 1, 1, vec![], 64, layout)
    }

    #[test]
    fn no_bus_renders_base_color_only() {
        let mut preset = ReactiveRipplePreset::default();
        let mut params = ParameterMap::new();
        params.insert("base_color".into(), "#040404".into());
        preset.configure(&params);

        let mut frame = KeyColorFrame::new(10);
        preset.render(&model(), 0.0, &mut frame);
        assert!(frame.as_slice().iter().all(|c| *c == RgbColor::new(4, 4, 4)));
    }

    #[test]
    fn recent_keystroke_produces_a_ring() {
        let model = model();
        let bus = Arc::new(KeyActivityBus::new(10, 2.5));
        let mut preset = ReactiveRipplePreset::default();
        let mut params = ParameterMap::new();
        params.insert("thickness".into(), "0.5".into());
        params.insert("wave_speed".into(), "3.0".into());
        preset.configure(&params);
        preset.bind_activity(bus.clone());

        bus.record(0, 1.0);
        std::thread::sleep(std::time::Duration::from_millis(40));
        let mut frame = KeyColorFrame::new(10);
        preset.render(&model, 0.0, &mut frame);
        let lit = frame
            .as_slice()
            .iter()
            .filter(|c| **c != RgbColor::BLACK)
            .count();
        assert!(lit > 0);
    }
}
