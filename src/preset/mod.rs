//! Lighting preset capability and the built-in preset registry.
//!
//! A preset is one named source of per-key color. The engine owns presets as
//! boxed trait objects and asks each enabled one to paint a scratch frame
//! every tick; masks and painter's order are the engine's business, not the
//! preset's. Reactive presets additionally bind to the key activity bus.

mod doom_fire;
mod key_map;
mod liquid_plasma;
mod rainbow_wave;
mod reaction_diffusion;
mod reactive_ripple;
mod smoke;
mod star_matrix;
mod static_color;

pub use doom_fire::DoomFirePreset;
pub use key_map::KeyMapPreset;
pub use liquid_plasma::LiquidPlasmaPreset;
pub use rainbow_wave::RainbowWavePreset;
pub use reaction_diffusion::ReactionDiffusionPreset;
pub use reactive_ripple::ReactiveRipplePreset;
pub use smoke::SmokePreset;
pub use star_matrix::StarMatrixPreset;
pub use static_color::StaticColorPreset;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::activity::KeyActivityBus;
use crate::color::RgbColor;
use crate::error::{Error, Result};
use crate::frame::KeyColorFrame;
use crate::model::KeyboardModel;

/// Textual preset parameters, as they appear in config and prompt commands
pub type ParameterMap = BTreeMap<String, String>;

/// One source of per-key color
pub trait LightingPreset: Send {
    /// Stable identifier used by the registry and the prompt
    fn id(&self) -> &'static str;

    /// Accept textual parameters; unparseable values keep the previous state
    fn configure(&mut self, _params: &ParameterMap) {}

    /// Paint into `frame`, which has one entry per key and starts zeroed
    fn render(&mut self, model: &KeyboardModel, time_seconds: f64, frame: &mut KeyColorFrame);

    /// Animated presets re-render every tick; static ones only on state change
    fn is_animated(&self) -> bool {
        false
    }

    /// Reactive presets keep the bus handle; everyone else ignores it
    fn bind_activity(&mut self, _bus: Arc<KeyActivityBus>) {}
}

pub type PresetFactory = fn() -> Box<dyn LightingPreset>;

/// Id → factory table for config-driven preset construction
pub struct PresetRegistry {
    factories: BTreeMap<&'static str, PresetFactory>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every built-in preset
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("static_color", || Box::new(StaticColorPreset::default()));
        registry.register("rainbow_wave", || Box::new(RainbowWavePreset::default()));
        registry.register("star_matrix", || Box::new(StarMatrixPreset::default()));
        registry.register("key_map", || Box::new(KeyMapPreset::default()));
        registry.register("liquid_plasma", || Box::new(LiquidPlasmaPreset::default()));
        registry.register("smoke", || Box::new(SmokePreset::default()));
        registry.register("doom_fire", || Box::new(DoomFirePreset::default()));
        registry.register("reaction_diffusion", || {
            Box::new(ReactionDiffusionPreset::default())
        });
        registry.register("reactive_ripple", || {
            Box::new(ReactiveRipplePreset::default())
        });
        registry
    }

    pub fn register(&mut self, id: &'static str, factory: PresetFactory) {
        self.factories.insert(id, factory);
    }

    pub fn create(&self, id: &str) -> Result<Box<dyn LightingPreset>> {
        self.factories
            .get(id)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownPreset(id.to_string()))
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ── Shared parameter helpers ─────────────────────────────────────────

pub(crate) fn param_f64(params: &ParameterMap, key: &str) -> Option<f64> {
    params.get(key).and_then(|v| v.parse().ok())
}

pub(crate) fn param_f64_min(params: &ParameterMap, key: &str, min: f64) -> Option<f64> {
    param_f64(params, key).map(|v| v.max(min))
}

pub(crate) fn param_usize(params: &ParameterMap, key: &str) -> Option<usize> {
    params.get(key).and_then(|v| v.parse().ok())
}

pub(crate) fn param_color(params: &ParameterMap, key: &str) -> Option<RgbColor> {
    params.get(key).and_then(|v| RgbColor::parse(v))
}

pub(crate) fn param_bool(params: &ParameterMap, key: &str) -> Option<bool> {
    params.get(key).map(|v| {
        matches!(
            v.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Normalized (x, y) coordinates per key index, derived from the layout
/// grid: x spans the widest row, y spans the rows, both in [0, 1].
pub(crate) fn normalized_coords(model: &KeyboardModel) -> (Vec<f64>, Vec<f64>) {
    let layout = model.layout();
    let rows = layout.len() as f64;
    let max_cols = layout.iter().map(|row| row.len()).max().unwrap_or(1).max(1) as f64;

    let mut xs = vec![0.0; model.key_count()];
    let mut ys = vec![0.0; model.key_count()];
    let mut idx = 0;
    for (r, row) in layout.iter().enumerate() {
        for c in 0..row.len() {
            if idx >= xs.len() {
                break;
            }
            xs[idx] = if max_cols > 1.0 {
                c as f64 / (max_cols - 1.0)
            } else {
                0.0
            };
            ys[idx] = if rows > 1.0 {
                r as f64 / (rows - 1.0)
            } else {
                0.0
            };
            idx += 1;
        }
    }
    (xs, ys)
}
