//! Shortcut overlay engage/disengage and focus-driven profile switching,
//! exercised through the watchers' socket-free state machines.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use keyglow::color::RgbColor;
use keyglow::controller::Controller;
use keyglow::engine::EffectEngine;
use keyglow::frame::KeyColorFrame;
use keyglow::model::KeyboardModel;
use keyglow::preset::{KeyMapPreset, LightingPreset, ParameterMap, StaticColorPreset};
use keyglow::profiles::{ProfileBook, ProfileSpec, ShortcutBook, ShortcutSpec, MOD_CTRL};
use keyglow::transport::DeviceTransport;
use keyglow::watch::{FocusWatcher, ShortcutWatcher};

#[derive(Clone, Default)]
struct NullTransport;

impl DeviceTransport for NullTransport {
    fn id(&self) -> &'static str {
        "null"
    }

    fn connect(&mut self, _model: &KeyboardModel) -> bool {
        true
    }

    fn send_frame(&mut self, _model: &KeyboardModel, _payload: &[u8]) -> bool {
        true
    }
}

const KEY_COUNT: usize = 8;
const OVERLAY: usize = 2;

fn solid(color: &str) -> Box<dyn LightingPreset> {
    let mut preset = StaticColorPreset::default();
    let mut params = ParameterMap::new();
    params.insert("color".into(), color.into());
    preset.configure(&params);
    Box::new(preset)
}

struct Fixture {
    controller: Controller,
    profiles: Arc<ProfileBook>,
    shortcuts: Arc<ShortcutBook>,
}

fn fixture() -> Fixture {
    let rows: Vec<Vec<String>> = vec![
        (0..4).map(|i| format!("K{i}")).collect(),
        (4..8).map(|i| format!("K{i}")).collect(),
    ];
    let model = Arc::new(KeyboardModel::new("demo", 1, 1, vec![0x01], 32, rows));

    let mut engine = EffectEngine::new(model, Box::new(NullTransport::default()));
    let presets: Vec<Box<dyn LightingPreset>> = vec![
        solid("#FF0000"),
        solid("#0000FF"),
        Box::new(KeyMapPreset::default()),
    ];
    engine.set_presets(presets, None);
    // Preset 1 covers only the top row in the background profiles
    let global_masks = vec![
        vec![true; KEY_COUNT],
        vec![true, true, true, true, false, false, false, false],
        vec![true; KEY_COUNT],
    ];
    engine.set_preset_masks(&global_masks);

    let controller = Controller::new(
        engine,
        vec![ParameterMap::new(); 3],
        Duration::from_millis(5),
    );

    let mut profiles = HashMap::new();
    profiles.insert(
        "base".to_string(),
        ProfileSpec {
            draw_list: vec![0, 1],
            masks: global_masks.clone(),
        },
    );
    profiles.insert(
        "work".to_string(),
        ProfileSpec {
            draw_list: vec![1],
            masks: vec![
                vec![true; KEY_COUNT],
                vec![true; KEY_COUNT],
                vec![true; KEY_COUNT],
            ],
        },
    );
    let profiles = Arc::new(ProfileBook {
        default_profile: "base".to_string(),
        class_to_profile: HashMap::from([("terminal".to_string(), "work".to_string())]),
        profiles,
    });

    let mut combos = HashMap::new();
    combos.insert(MOD_CTRL, vec![3usize, 5usize]);
    let mut shortcuts = HashMap::new();
    shortcuts.insert(
        "base-sc".to_string(),
        ShortcutSpec {
            color: Some("#00FF00".to_string()),
            combos,
        },
    );
    let shortcuts = Arc::new(ShortcutBook {
        default_shortcut: "base-sc".to_string(),
        class_to_shortcut: HashMap::new(),
        shortcuts,
    });

    Fixture {
        controller,
        profiles,
        shortcuts,
    }
}

fn compose(controller: &Controller) -> KeyColorFrame {
    controller.with_engine(|engine| {
        engine.render_frame(0.0);
        engine.frame().clone()
    })
}

#[test]
fn shortcut_engage_disengage_restores_the_composition() {
    let fx = fixture();

    let focus = FocusWatcher::new(fx.controller.clone(), Arc::clone(&fx.profiles), None);
    let shortcut = ShortcutWatcher::new(
        fx.controller.clone(),
        Arc::clone(&fx.profiles),
        Arc::clone(&fx.shortcuts),
        KEY_COUNT,
        OVERLAY,
    );
    let shortcut_state = shortcut.state();
    let callback_state = shortcut.state();
    focus.set_class_callback(move |class| callback_state.set_active_class(class));

    // Settle on the default profile for some window
    focus.state().handle_class("firefox");
    let before = compose(&fx.controller);
    assert_eq!(before.color(0), Some(RgbColor::new(0, 0, 255)));
    assert_eq!(before.color(4), Some(RgbColor::new(255, 0, 0)));

    // Ctrl held: exclusive overlay with the combo keys lit
    shortcut_state.drive(MOD_CTRL);
    assert!(shortcut_state.is_engaged());
    fx.controller.with_engine(|engine| {
        assert_eq!(engine.draw_list(), &[OVERLAY]);
        let mask = engine.preset_mask(OVERLAY).unwrap();
        let lit: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
            .collect();
        assert_eq!(lit, vec![3, 5]);
    });
    let engaged = compose(&fx.controller);
    assert_eq!(engaged.color(3), Some(RgbColor::new(0, 255, 0)));
    assert_eq!(engaged.color(5), Some(RgbColor::new(0, 255, 0)));
    assert_eq!(engaged.color(0), Some(RgbColor::BLACK));

    // Ctrl released: the pre-engage composition returns bit for bit
    shortcut_state.drive(0);
    assert!(!shortcut_state.is_engaged());
    let after = compose(&fx.controller);
    assert_eq!(after, before);
}

#[test]
fn comboless_modifier_mask_does_not_engage() {
    let fx = fixture();
    let shortcut = ShortcutWatcher::new(
        fx.controller.clone(),
        Arc::clone(&fx.profiles),
        Arc::clone(&fx.shortcuts),
        KEY_COUNT,
        OVERLAY,
    );
    let state = shortcut.state();

    // Shift alone has no combo in the book
    state.drive(keyglow::profiles::MOD_SHIFT);
    assert!(!state.is_engaged());
    fx.controller.with_engine(|engine| {
        assert!(engine.draw_list().is_empty());
    });
}

#[test]
fn class_change_while_engaged_keeps_the_overlay_exclusive() {
    let fx = fixture();
    let focus = FocusWatcher::new(fx.controller.clone(), Arc::clone(&fx.profiles), None);
    let shortcut = ShortcutWatcher::new(
        fx.controller.clone(),
        Arc::clone(&fx.profiles),
        Arc::clone(&fx.shortcuts),
        KEY_COUNT,
        OVERLAY,
    );
    let state = shortcut.state();
    let callback_state = shortcut.state();
    focus.set_class_callback(move |class| callback_state.set_active_class(class));

    focus.state().handle_class("firefox");
    state.drive(MOD_CTRL);
    // Simulate holding the modifier across a focus change
    state.set_active_class("terminal");
    assert!(state.is_engaged());

    // Release now restores the profile of the *new* class
    state.drive(0);
    fx.controller.with_engine(|engine| {
        assert_eq!(engine.draw_list(), &[1]);
    });
}

#[test]
fn focus_change_applies_the_mapped_profile() {
    let fx = fixture();
    let focus = FocusWatcher::new(fx.controller.clone(), Arc::clone(&fx.profiles), None);

    focus.state().handle_class("firefox");
    fx.controller.with_engine(|engine| {
        assert_eq!(engine.draw_list(), &[0, 1]);
    });

    focus.state().handle_class("terminal");
    fx.controller.with_engine(|engine| {
        assert_eq!(engine.draw_list(), &[1]);
        assert!(engine.preset_mask(1).unwrap().iter().all(|&b| b));
    });

    // Unknown classes fall back to the default profile
    focus.state().handle_class("gimp");
    fx.controller.with_engine(|engine| {
        assert_eq!(engine.draw_list(), &[0, 1]);
    });
}
