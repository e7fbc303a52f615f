//! TOML configuration → runtime wiring.
//!
//! The loader compiles everything label-based down to key indices: preset
//! masks from key lists and zones, per-application profiles, and shortcut
//! combos. Legacy per-preset `enabled` flags translate into the initial
//! draw list so only one composition representation survives past load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::KeyboardModel;
use crate::preset::{LightingPreset, ParameterMap, PresetRegistry};
use crate::profiles::{parse_modifier_mask, ProfileBook, ProfileSpec, ShortcutBook, ShortcutSpec};
use crate::transport::{self, DeviceTransport};

/// Everything `main` needs to assemble the running system
pub struct RuntimeConfig {
    pub model: Arc<KeyboardModel>,
    pub transport: Box<dyn DeviceTransport>,
    pub presets: Vec<Box<dyn LightingPreset>>,
    pub preset_parameters: Vec<ParameterMap>,
    pub preset_masks: Vec<Vec<bool>>,
    pub initial_draw_list: Vec<usize>,
    pub frame_interval: Duration,
    pub focus: Option<FocusRuntime>,
}

/// Watcher wiring compiled from the `[focus]` and `[shortcuts.*]` sections
pub struct FocusRuntime {
    pub events_socket: Option<PathBuf>,
    pub profiles: Arc<ProfileBook>,
    pub shortcuts: Arc<ShortcutBook>,
    pub overlay_preset: Option<usize>,
}

// ── Raw TOML shape ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    keyboard: RawKeyboard,
    #[serde(default)]
    engine: RawEngine,
    #[serde(default)]
    presets: Vec<RawPreset>,
    #[serde(default)]
    zones: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    profiles: BTreeMap<String, RawProfile>,
    #[serde(default)]
    focus: Option<RawFocus>,
    #[serde(default)]
    shortcuts: BTreeMap<String, RawShortcut>,
}

#[derive(Deserialize)]
struct RawKeyboard {
    name: String,
    vendor_id: u16,
    product_id: u16,
    packet_header: Vec<u8>,
    packet_length: usize,
    layout: Vec<Vec<String>>,
    interface_usage_page: Option<u16>,
    interface_usage: Option<u16>,
    #[serde(default)]
    keycodes: BTreeMap<String, u16>,
}

#[derive(Deserialize)]
struct RawEngine {
    #[serde(default = "default_transport")]
    transport: String,
    #[serde(default = "default_frame_interval")]
    frame_interval_ms: u64,
}

impl Default for RawEngine {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            frame_interval_ms: default_frame_interval(),
        }
    }
}

fn default_transport() -> String {
    "logging".to_string()
}

fn default_frame_interval() -> u64 {
    33
}

#[derive(Deserialize)]
struct RawPreset {
    id: String,
    enabled: Option<bool>,
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    zones: Vec<String>,
    #[serde(default)]
    params: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawProfile {
    #[serde(default)]
    order: Vec<usize>,
    #[serde(default)]
    masks: BTreeMap<String, RawMask>,
}

#[derive(Deserialize)]
struct RawMask {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    zones: Vec<String>,
}

#[derive(Deserialize)]
struct RawFocus {
    #[serde(default = "default_true")]
    enabled: bool,
    events_socket: Option<PathBuf>,
    #[serde(default)]
    default_profile: String,
    #[serde(default)]
    classes: BTreeMap<String, String>,
    overlay_preset: Option<usize>,
    #[serde(default)]
    default_shortcut: String,
    #[serde(default)]
    shortcut_classes: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct RawShortcut {
    color: Option<String>,
    #[serde(default)]
    combos: BTreeMap<String, Vec<String>>,
}

// ── Loading ──────────────────────────────────────────────────────────

pub fn load(path: &Path, registry: &PresetRegistry) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    compile(raw, registry)
}

/// Parse a config from a TOML string (used by tests and embedders)
pub fn from_toml(content: &str, registry: &PresetRegistry) -> Result<RuntimeConfig> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|err| Error::Config(err.to_string()))?;
    compile(raw, registry)
}

fn compile(raw: RawConfig, registry: &PresetRegistry) -> Result<RuntimeConfig> {
    let kb = raw.keyboard;
    if kb.name.is_empty() {
        return Err(Error::Config("keyboard.name must be provided".into()));
    }
    if kb.vendor_id == 0 || kb.product_id == 0 {
        return Err(Error::Config(
            "keyboard.vendor_id and keyboard.product_id must be non-zero".into(),
        ));
    }
    if kb.packet_header.is_empty() {
        return Err(Error::Config("keyboard.packet_header must not be empty".into()));
    }
    if kb.packet_length == 0 {
        return Err(Error::Config("keyboard.packet_length must be non-zero".into()));
    }
    if kb.layout.is_empty() || kb.layout.iter().all(|row| row.is_empty()) {
        return Err(Error::Config("keyboard.layout must not be empty".into()));
    }

    let mut model = KeyboardModel::new(
        kb.name,
        kb.vendor_id,
        kb.product_id,
        kb.packet_header,
        kb.packet_length,
        kb.layout,
    )
    .with_interface_usage(kb.interface_usage_page, kb.interface_usage);
    if !kb.keycodes.is_empty() {
        model = model.with_keycode_map(&kb.keycodes);
    }
    let model = Arc::new(model);

    let transport = transport::create(&raw.engine.transport)?;
    let frame_interval = Duration::from_millis(raw.engine.frame_interval_ms.max(1));

    // Presets; a config without any gets a lone static fill
    let raw_presets = if raw.presets.is_empty() {
        vec![RawPreset {
            id: "static_color".to_string(),
            enabled: None,
            keys: Vec::new(),
            zones: Vec::new(),
            params: BTreeMap::new(),
        }]
    } else {
        raw.presets
    };

    let mut presets = Vec::with_capacity(raw_presets.len());
    let mut parameters = Vec::with_capacity(raw_presets.len());
    let mut masks = Vec::with_capacity(raw_presets.len());
    let mut enabled_flags = vec![false; raw_presets.len()];
    if let Some(first) = enabled_flags.first_mut() {
        *first = true;
    }

    for (index, spec) in raw_presets.iter().enumerate() {
        let mut preset = registry.create(&spec.id)?;
        preset.configure(&spec.params);
        presets.push(preset);
        parameters.push(spec.params.clone());

        masks.push(if spec.keys.is_empty() && spec.zones.is_empty() {
            vec![true; model.key_count()]
        } else {
            mask_from_labels(&model, &spec.keys, &spec.zones, &raw.zones)
        });

        if let Some(flag) = spec.enabled {
            enabled_flags[index] = flag;
        }
    }

    let initial_draw_list: Vec<usize> = enabled_flags
        .iter()
        .enumerate()
        .filter_map(|(i, &on)| on.then_some(i))
        .collect();

    // Per-application profiles, seeded from the global masks
    let mut profiles = std::collections::HashMap::new();
    for (name, profile) in &raw.profiles {
        // An empty draw order means the profile blanks the device
        if profile.order.is_empty() {
            profiles.insert(
                name.clone(),
                ProfileSpec {
                    draw_list: Vec::new(),
                    masks: vec![vec![false; model.key_count()]; masks.len()],
                },
            );
            continue;
        }
        let mut profile_masks = masks.clone();
        for (index_str, mask) in &profile.masks {
            let index: usize = index_str.parse().map_err(|_| {
                Error::Config(format!("profile {name}: bad preset index {index_str:?}"))
            })?;
            if index >= profile_masks.len() {
                warn!("profile {name}: preset index {index} out of range");
                continue;
            }
            profile_masks[index] = mask_from_labels(&model, &mask.keys, &mask.zones, &raw.zones);
        }
        profiles.insert(
            name.clone(),
            ProfileSpec {
                draw_list: profile.order.clone(),
                masks: profile_masks,
            },
        );
    }

    // Shortcut cheat sheets, compiled to key indices
    let mut shortcuts = std::collections::HashMap::new();
    for (name, shortcut) in &raw.shortcuts {
        let mut spec = ShortcutSpec {
            color: shortcut.color.clone(),
            ..Default::default()
        };
        for (combo, labels) in &shortcut.combos {
            let Some(mask) = parse_modifier_mask(combo) else {
                warn!("shortcut {name}: unknown modifier combo {combo:?}");
                continue;
            };
            let indices: Vec<usize> = labels
                .iter()
                .filter_map(|label| model.index_for_key(label))
                .collect();
            spec.combos.insert(mask, indices);
        }
        shortcuts.insert(name.clone(), spec);
    }

    let focus = raw.focus.filter(|f| f.enabled).map(|f| {
        let overlay_preset = f.overlay_preset.filter(|&index| {
            if index < presets.len() {
                true
            } else {
                warn!("focus.overlay_preset {index} out of range; overlay disabled");
                false
            }
        });
        FocusRuntime {
            events_socket: f.events_socket,
            profiles: Arc::new(ProfileBook {
                default_profile: f.default_profile,
                class_to_profile: f.classes.into_iter().collect(),
                profiles,
            }),
            shortcuts: Arc::new(ShortcutBook {
                default_shortcut: f.default_shortcut,
                class_to_shortcut: f.shortcut_classes.into_iter().collect(),
                shortcuts,
            }),
            overlay_preset,
        }
    });

    Ok(RuntimeConfig {
        model,
        transport,
        presets,
        preset_parameters: parameters,
        preset_masks: masks,
        initial_draw_list,
        frame_interval,
        focus,
    })
}

fn mask_from_labels(
    model: &KeyboardModel,
    keys: &[String],
    zone_names: &[String],
    zones: &BTreeMap<String, Vec<String>>,
) -> Vec<bool> {
    let mut mask = vec![false; model.key_count()];
    for label in keys {
        if let Some(index) = model.index_for_key(label) {
            mask[index] = true;
        }
    }
    for zone in zone_names {
        let Some(labels) = zones.get(zone) else {
            warn!("unknown zone: {zone}");
            continue;
        };
        for label in labels {
            if let Some(index) = model.index_for_key(label) {
                mask[index] = true;
            }
        }
    }
    mask
}
