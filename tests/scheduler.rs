//! Animated-vs-static render scheduling through the controller

use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use keyglow::controller::Controller;
use keyglow::engine::EffectEngine;
use keyglow::model::KeyboardModel;
use keyglow::preset::{LightingPreset, ParameterMap, RainbowWavePreset, StaticColorPreset};
use keyglow::transport::DeviceTransport;

#[derive(Clone, Default)]
struct CountingTransport {
    sent: Arc<Mutex<usize>>,
}

impl CountingTransport {
    fn count(&self) -> usize {
        *self.sent.lock().unwrap()
    }
}

impl DeviceTransport for CountingTransport {
    fn id(&self) -> &'static str {
        "counting"
    }

    fn connect(&mut self, _model: &KeyboardModel) -> bool {
        true
    }

    fn send_frame(&mut self, _model: &KeyboardModel, _payload: &[u8]) -> bool {
        *self.sent.lock().unwrap() += 1;
        true
    }
}

fn build() -> (Controller, CountingTransport) {
    let row: Vec<String> = (0..4).map(|i| format!("K{i}")).collect();
    let model = Arc::new(KeyboardModel::new("demo", 1, 1, vec![0x01], 16, vec![row]));
    let transport = CountingTransport::default();
    let mut engine = EffectEngine::new(model, Box::new(transport.clone()));
    let presets: Vec<Box<dyn LightingPreset>> = vec![
        Box::new(StaticColorPreset::default()),
        Box::new(RainbowWavePreset::default()),
    ];
    // Fallback-by-enabled mode: preset 0 (static) on, preset 1 (animated) off
    engine.set_presets(presets, None);
    let controller = Controller::new(
        engine,
        vec![ParameterMap::new(), ParameterMap::new()],
        Duration::from_millis(5),
    );
    (controller, transport)
}

#[test]
fn static_composition_renders_once_and_stops() {
    let (controller, transport) = build();
    controller.sync_render_state(true);
    assert!(!controller.is_render_loop_running());
    assert_eq!(transport.count(), 1);

    // No further frames while nothing is animated
    sleep(Duration::from_millis(30));
    assert_eq!(transport.count(), 1);
    controller.stop_render_loop();
}

#[test]
fn enabling_an_animated_preset_starts_the_loop() {
    let (controller, transport) = build();
    controller.sync_render_state(true);
    assert!(!controller.is_render_loop_running());

    assert!(controller.toggle_preset(1));
    controller.sync_render_state(true);
    assert!(controller.is_render_loop_running());

    sleep(Duration::from_millis(60));
    assert!(transport.count() > 2);

    // Disabling it again stops the loop and flushes one static frame
    assert!(controller.toggle_preset(1));
    controller.sync_render_state(true);
    assert!(!controller.is_render_loop_running());

    let settled = transport.count();
    sleep(Duration::from_millis(30));
    assert_eq!(transport.count(), settled);
    controller.stop_render_loop();
}

#[test]
fn refresh_render_is_sync_with_static_flush() {
    let (controller, transport) = build();
    controller.refresh_render();
    assert_eq!(transport.count(), 1);
    controller.refresh_render();
    assert_eq!(transport.count(), 2);
    controller.stop_render_loop();
}

#[test]
fn start_and_stop_are_idempotent() {
    let (controller, _transport) = build();
    controller.start_render_loop();
    controller.start_render_loop();
    assert!(controller.is_render_loop_running());
    controller.stop_render_loop();
    controller.stop_render_loop();
    assert!(!controller.is_render_loop_running());
}

#[test]
fn live_frame_interval_updates_apply() {
    let (controller, _transport) = build();
    controller.set_frame_interval_ms(0);
    assert_eq!(controller.frame_interval_ms(), 1);
    controller.set_frame_interval_ms(100);
    assert_eq!(controller.frame_interval_ms(), 100);
}
