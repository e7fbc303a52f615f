//! Composition and encoding behavior across the engine and model

use std::sync::{Arc, Mutex};

use keyglow::color::RgbColor;
use keyglow::engine::EffectEngine;
use keyglow::model::KeyboardModel;
use keyglow::preset::{LightingPreset, ParameterMap, StaticColorPreset};
use keyglow::transport::DeviceTransport;

/// Transport that records every payload it is handed
#[derive(Clone, Default)]
struct CaptureTransport {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl CaptureTransport {
    fn last_frame(&self) -> Option<Vec<u8>> {
        self.frames.lock().unwrap().last().cloned()
    }
}

impl DeviceTransport for CaptureTransport {
    fn id(&self) -> &'static str {
        "capture"
    }

    fn connect(&mut self, _model: &KeyboardModel) -> bool {
        true
    }

    fn send_frame(&mut self, _model: &KeyboardModel, payload: &[u8]) -> bool {
        self.frames.lock().unwrap().push(payload.to_vec());
        true
    }
}

fn labels(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn solid(color: &str) -> Box<dyn LightingPreset> {
    let mut preset = StaticColorPreset::default();
    let mut params = ParameterMap::new();
    params.insert("color".into(), color.into());
    preset.configure(&params);
    Box::new(preset)
}

#[test]
fn static_single_color_composition() {
    // One preset painting (0x10, 0x20, 0x30) over A, B and a placeholder
    let model = Arc::new(KeyboardModel::new(
        "demo",
        1,
        1,
        vec![0x01],
        13,
        labels(&[&["A", "B", "NAN"]]),
    ));
    let transport = CaptureTransport::default();
    let mut engine = EffectEngine::new(model, Box::new(transport.clone()));
    engine.set_presets(vec![solid("#102030")], None);

    engine.render_frame(0.0);
    assert!(engine.push_frame());

    assert_eq!(
        transport.last_frame().unwrap(),
        vec![0x01, 0x10, 0x20, 0x30, 0x10, 0x20, 0x30, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn masked_overlay_replace() {
    // A paints red everywhere; B paints blue but its mask admits key 0 only
    let model = Arc::new(KeyboardModel::new(
        "demo",
        1,
        1,
        vec![],
        6,
        labels(&[&["L", "R"]]),
    ));
    let transport = CaptureTransport::default();
    let mut engine = EffectEngine::new(model, Box::new(transport.clone()));
    engine.set_presets(vec![solid("#FF0000"), solid("#0000FF")], None);
    engine.set_draw_list(&[0, 1]);
    assert!(engine.set_preset_mask(1, &[true, false]));

    engine.render_frame(0.0);
    assert!(engine.push_frame());

    assert_eq!(
        transport.last_frame().unwrap(),
        vec![0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00]
    );
}

#[test]
fn empty_draw_list_matches_a_fresh_engine_byte_for_byte() {
    let model = Arc::new(KeyboardModel::new(
        "demo",
        1,
        1,
        vec![0x05],
        16,
        labels(&[&["A", "B", "C"]]),
    ));

    // Engine that went through a draw list and back
    let transport_a = CaptureTransport::default();
    let mut engine_a = EffectEngine::new(Arc::clone(&model), Box::new(transport_a.clone()));
    engine_a.set_presets(vec![solid("#FF0000"), solid("#00FF00")], None);
    engine_a.set_preset_enabled(1, true);
    assert!(engine_a.set_preset_mask(1, &[false, true, false]));
    engine_a.set_draw_list(&[1, 0]);
    engine_a.render_frame(0.0);
    engine_a.set_draw_list(&[]);
    engine_a.render_frame(0.0);
    engine_a.push_frame();

    // Freshly constructed engine with the same enabled set and masks
    let transport_b = CaptureTransport::default();
    let mut engine_b = EffectEngine::new(model, Box::new(transport_b.clone()));
    engine_b.set_presets(vec![solid("#FF0000"), solid("#00FF00")], None);
    engine_b.set_preset_enabled(1, true);
    assert!(engine_b.set_preset_mask(1, &[false, true, false]));
    engine_b.render_frame(0.0);
    engine_b.push_frame();

    assert_eq!(transport_a.last_frame(), transport_b.last_frame());
}

#[test]
fn all_false_masks_encode_black_after_the_header() {
    let model = Arc::new(KeyboardModel::new(
        "demo",
        1,
        1,
        vec![0xAB, 0xCD],
        8,
        labels(&[&["A", "B"]]),
    ));
    let transport = CaptureTransport::default();
    let mut engine = EffectEngine::new(model, Box::new(transport.clone()));
    engine.set_presets(vec![solid("#FFFFFF")], None);
    engine.set_preset_mask(0, &[false, false]);

    engine.render_frame(0.0);
    engine.push_frame();

    let payload = transport.last_frame().unwrap();
    assert_eq!(&payload[..2], &[0xAB, 0xCD]);
    assert!(payload[2..].iter().all(|&b| b == 0));
}

#[test]
fn placeholder_cells_encode_black_regardless_of_paint() {
    let model = Arc::new(KeyboardModel::new(
        "demo",
        1,
        1,
        vec![0x01],
        16,
        labels(&[&["A", "NAN", "B"]]),
    ));
    let transport = CaptureTransport::default();
    let mut engine = EffectEngine::new(model, Box::new(transport.clone()));
    engine.set_presets(vec![solid("#FFFFFF")], None);

    engine.render_frame(0.0);
    engine.push_frame();

    let payload = transport.last_frame().unwrap();
    // header, A, NAN (black), B
    assert_eq!(&payload[1..4], &[0xFF, 0xFF, 0xFF]);
    assert_eq!(&payload[4..7], &[0x00, 0x00, 0x00]);
    assert_eq!(&payload[7..10], &[0xFF, 0xFF, 0xFF]);
}

#[test]
fn mask_install_and_read_back_roundtrip() {
    let model = Arc::new(KeyboardModel::new(
        "demo",
        1,
        1,
        vec![],
        16,
        labels(&[&["A", "B", "C"]]),
    ));
    let mut engine = EffectEngine::new(model, Box::new(CaptureTransport::default()));
    let masks = vec![vec![true, false, true], vec![false, false, true]];
    engine.set_presets(vec![solid("#FF0000"), solid("#00FF00")], Some(masks.clone()));
    assert_eq!(engine.preset_mask(0).unwrap(), masks[0].as_slice());
    assert_eq!(engine.preset_mask(1).unwrap(), masks[1].as_slice());

    let replacement = vec![vec![false, true, false], vec![true, true, false]];
    assert!(engine.set_preset_masks(&replacement));
    assert_eq!(engine.preset_mask(0).unwrap(), replacement[0].as_slice());
    assert_eq!(engine.preset_mask(1).unwrap(), replacement[1].as_slice());
}

#[test]
fn duplicate_draw_list_entries_paint_repeatedly() {
    let model = Arc::new(KeyboardModel::new(
        "demo",
        1,
        1,
        vec![],
        6,
        labels(&[&["L", "R"]]),
    ));
    let mut engine = EffectEngine::new(model, Box::new(CaptureTransport::default()));
    engine.set_presets(vec![solid("#FF0000"), solid("#0000FF")], None);
    engine.set_preset_mask(0, &[true, false]);
    engine.set_draw_list(&[1, 0, 1, 0]);

    engine.render_frame(0.0);
    // Red is the last painter on key 0; blue survives on key 1
    assert_eq!(engine.frame().color(0), Some(RgbColor::new(255, 0, 0)));
    assert_eq!(engine.frame().color(1), Some(RgbColor::new(0, 0, 255)));
}
