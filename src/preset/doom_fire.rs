//! Classic fire propagation over the layout grid.
//!
//! Heat lives on a rows×cols grid matching the layout. The bottom row is
//! re-ignited with random sparks, and each simulation step pulls cooled heat
//! upward with a random lateral shift. A fixed-step accumulator keeps the
//! simulation rate independent of the render tick.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{param_f64_min, LightingPreset, ParameterMap};
use crate::color::RgbColor;
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

const DEFAULT_PALETTE: [&str; 10] = [
    "#070707", "#1a0c02", "#330d03", "#661103", "#a71b04", "#d12402", "#f24f0f", "#f78d26",
    "#f7c35c", "#fff3a1",
];

pub struct DoomFirePreset {
    speed: f64,
    cooling: f64,
    spark_chance: f64,
    spark_intensity: f64,
    step_interval: f64,
    palette: Vec<RgbColor>,

    rng: SmallRng,
    rows: usize,
    cols: usize,
    heat: Vec<f64>,
    cell_to_key: Vec<i32>,
    key_to_cell: Vec<i32>,
    grid_built: bool,
    last_time: f64,
    accumulator: f64,
}

impl Default for DoomFirePreset {
    fn default() -> Self {
        Self {
            speed: 1.0,
            cooling: 0.05,
            spark_chance: 0.6,
            spark_intensity: 1.0,
            step_interval: 0.015,
            palette: default_palette(),
            rng: SmallRng::from_entropy(),
            rows: 0,
            cols: 0,
            heat: Vec::new(),
            cell_to_key: Vec::new(),
            key_to_cell: Vec::new(),
            grid_built: false,
            last_time: 0.0,
            accumulator: 0.0,
        }
    }
}

fn default_palette() -> Vec<RgbColor> {
    DEFAULT_PALETTE
        .iter()
        .filter_map(|hex| RgbColor::parse(hex))
        .collect()
}

impl DoomFirePreset {
    fn build_grid(&mut self, model: &KeyboardModel) {
        let layout = model.layout();
        self.rows = layout.len();
        self.cols = layout.iter().map(|row| row.len()).max().unwrap_or(0);
        if self.rows == 0 || self.cols == 0 {
            self.grid_built = false;
            return;
        }

        let cell_count = self.rows * self.cols;
        self.cell_to_key = vec![-1; cell_count];
        self.key_to_cell = vec![-1; model.key_count()];

        for (r, row) in layout.iter().enumerate() {
            for (c, label) in row.iter().enumerate() {
                if label == crate::model::PLACEHOLDER_LABEL {
                    continue;
                }
                if let Some(index) = model.index_for_key(label) {
                    let cell = r * self.cols + c;
                    self.cell_to_key[cell] = index as i32;
                    self.key_to_cell[index] = cell as i32;
                }
            }
        }

        self.heat = vec![0.0; cell_count];
        self.grid_built = true;
    }

    fn simulate(&mut self, delta_seconds: f64) {
        self.accumulator += delta_seconds * self.speed.max(0.01);
        let step = self.step_interval.max(0.001);
        while self.accumulator >= step {
            self.ignite_base_row();
            self.propagate();
            self.accumulator -= step;
        }
    }

    fn ignite_base_row(&mut self) {
        if !self.grid_built || self.rows == 0 {
            return;
        }
        let offset = (self.rows - 1) * self.cols;
        for c in 0..self.cols {
            let cell = offset + c;
            if cell >= self.heat.len() || self.cell_to_key[cell] < 0 {
                continue;
            }
            let mut value = self.heat[cell];
            value = (value - self.cooling * (0.5 + 0.5 * self.rng.gen::<f64>())).max(0.0);
            if self.rng.gen::<f64>() < self.spark_chance {
                value = self.spark_intensity * (0.6 + 0.4 * self.rng.gen::<f64>());
            }
            self.heat[cell] = value.clamp(0.0, 1.0);
        }
    }

    fn propagate(&mut self) {
        if !self.grid_built || self.rows < 2 {
            return;
        }
        for r in 0..self.rows - 1 {
            for c in 0..self.cols {
                let dest = r * self.cols + c;
                if dest >= self.heat.len() || self.cell_to_key[dest] < 0 {
                    continue;
                }
                // Pull from the row below, shifted -1..=1 columns
                let shift = self.rng.gen_range(-1i32..=1);
                let shifted = c as i32 + shift;
                let src_col = if (0..self.cols as i32).contains(&shifted) {
                    shifted as usize
                } else {
                    c
                };
                let src = (r + 1) * self.cols + src_col;
                if src >= self.heat.len() {
                    continue;
                }
                let cooled = (self.heat[src] - self.cooling * self.rng.gen::<f64>()).max(0.0);
                self.heat[dest] = cooled.clamp(0.0, 1.0);
            }
        }
    }

    fn color_for_heat(&self, heat: f64) -> RgbColor {
        if self.palette.is_empty() {
            return RgbColor::BLACK;
        }
        let heat = heat.clamp(0.0, 1.0);
        let pos = heat * (self.palette.len() - 1) as f64;
        let i0 = pos.floor() as usize;
        let i1 = (i0 + 1).min(self.palette.len() - 1);
        RgbColor::lerp(self.palette[i0], self.palette[i1], pos - i0 as f64)
    }
}

impl LightingPreset for DoomFirePreset {
    fn id(&self) -> &'static str {
        "doom_fire"
    }

    fn configure(&mut self, params: &ParameterMap) {
        if let Some(v) = param_f64_min(params, "speed", 0.01) {
            self.speed = v;
        }
        if let Some(v) = param_f64_min(params, "cooling", 0.0) {
            self.cooling = v;
        }
        if let Some(v) = param_f64_min(params, "spark_chance", 0.0) {
            self.spark_chance = v;
        }
        if let Some(v) = param_f64_min(params, "spark_intensity", 0.0) {
            self.spark_intensity = v;
        }
        if let Some(v) = param_f64_min(params, "step_interval", 0.001) {
            self.step_interval = v;
        }
        if let Some(list) = params.get("palette") {
            let parsed: Vec<RgbColor> = list
                .split(',')
                .filter_map(|token| RgbColor::parse(token.trim()))
                .collect();
            self.palette = if parsed.is_empty() {
                default_palette()
            } else {
                parsed
            };
        }
    }

    fn render(&mut self, model: &KeyboardModel, time_seconds: f64, frame: &mut KeyColorFrame) {
        let key_count = model.key_count();
        if frame.len() != key_count {
            frame.resize(key_count);
        }
        if !self.grid_built {
            self.build_grid(model);
        }
        if !self.grid_built || self.heat.is_empty() {
            frame.fill(RgbColor::BLACK);
            return;
        }

        if self.last_time == 0.0 {
            self.last_time = time_seconds;
        }
        let delta = (time_seconds - self.last_time).max(0.0);
        self.simulate(delta);
        self.last_time = time_seconds;

        for key in 0..key_count {
            let color = match self.key_to_cell.get(key) {
                Some(&cell) if cell >= 0 => self.color_for_heat(self.heat[cell as usize]),
                _ => RgbColor::BLACK,
            };
            frame.set_color(key, color);
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
    fn heat_stays_normalized() {
        let layout = vec![
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec!["D".to_string(), "E".to_string(), "F".to_string()],
            vec!["G".to_string(), "H".to_string(), "I".to_string()],
        ];
        let model = KeyboardModel::new("t", 1, 1, vec![], 64, layout);
        let mut preset = DoomFirePreset::default();
        let mut frame = KeyColorFrame::new(9);
        for step in 0..20 {
            preset.render(&model, step as f64 * 0.05, &mut frame);
        }
        assert!(preset.heat.iter().all(|h| (0.0..=1.0).contains(h)));
    }

    #[test]
    fn palette_lookup_spans_endpoints() {
        let preset = DoomFirePreset::default();
        assert_eq!(preset.color_for_heat(0.0), RgbColor::new(0x07, 0x07, 0x07));
        assert_eq!(preset.color_for_heat(1.0), RgbColor::new(0xff, 0xf3, 0xa1));
    }
}
