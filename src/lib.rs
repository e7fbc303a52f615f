//! keyglow: per-key RGB lighting compositor for USB HID keyboards.
//!
//! A stack of lighting presets is composed through per-preset masks in
//! painter's order, encoded into vendor HID feature reports, and pushed to
//! the device. Desktop focus changes and raw keystrokes reshape the stack
//! while the render loop runs.

pub mod activity;
pub mod cli;
pub mod color;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod frame;
pub mod input_util;
pub mod model;
pub mod preset;
pub mod profiles;
pub mod transport;
pub mod watch;

pub use activity::{KeyActivityBus, KeyActivityEvent};
pub use color::RgbColor;
pub use config::RuntimeConfig;
pub use controller::Controller;
pub use engine::EffectEngine;
pub use error::{Error, Result};
pub use frame::KeyColorFrame;
pub use model::KeyboardModel;
pub use preset::{LightingPreset, ParameterMap, PresetRegistry};
pub use transport::DeviceTransport;
