//! Keystroke publisher: evdev key presses into the activity bus

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use evdev::InputEventKind;
use tracing::debug;

use crate::activity::KeyActivityBus;
use crate::input_util::{find_keyboard_devices, is_would_block};
use crate::model::KeyboardModel;

const SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Key press event value; release (0) and autorepeat (2) are ignored
const KEY_PRESS: i32 = 1;

pub struct KeyActivityWatcher {
    model: Arc<KeyboardModel>,
    bus: Arc<KeyActivityBus>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyActivityWatcher {
    pub fn new(model: Arc<KeyboardModel>, bus: Arc<KeyActivityBus>) -> Self {
        Self {
            model,
            bus,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.stop.store(false, Ordering::SeqCst);
        self.bus.set_key_count(self.model.key_count());

        let model = Arc::clone(&self.model);
        let bus = Arc::clone(&self.bus);
        let stop = Arc::clone(&self.stop);
        self.handle = Some(thread::spawn(move || {
            let mut devices = find_keyboard_devices();
            debug!("activity watcher polling {} device(s)", devices.len());
            while !stop.load(Ordering::SeqCst) {
                for device in &mut devices {
                    match device.fetch_events() {
                        Ok(events) => {
                            for event in events {
                                if event.value() != KEY_PRESS {
                                    continue;
                                }
                                let InputEventKind::Key(key) = event.kind() else {
                                    continue;
                                };
                                if let Some(index) = model.index_for_keycode(key.code()) {
                                    bus.record(index, 1.0);
                                }
                            }
                        }
                        Err(err) if is_would_block(&err) => {}
                        Err(err) => {
                            debug!("evdev read failed: {err}");
                        }
                    }
                }
                thread::sleep(SWEEP_INTERVAL);
            }
        }));
    }

    /// Idempotent; joins the sweep thread and drops the devices with it
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for KeyActivityWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
