//! Shortcut cheat-sheet overlay driven by raw modifier state.
//!
//! Modifier keys are read straight from the evdev nodes, bypassing the
//! compositor, so the overlay also works while a fullscreen client grabs
//! the keyboard. While any modifier combination with a configured combo is
//! held, the engine's draw list is rebound to the overlay preset alone and
//! its mask lights exactly the combo keys. On release the background
//! profile is recomputed from the last-known window class; nothing is
//! saved and restored, so prompt-side changes made while engaged cannot
//! resurrect stale state.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use evdev::{InputEventKind, Key};
use tracing::debug;

use crate::controller::Controller;
use crate::input_util::{find_keyboard_devices, is_would_block};
use crate::profiles::{ProfileBook, ShortcutBook, MOD_ALT, MOD_CTRL, MOD_SHIFT, MOD_SUPER};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn modifier_bit(key: Key) -> Option<u8> {
    match key {
        Key::KEY_LEFTCTRL | Key::KEY_RIGHTCTRL => Some(MOD_CTRL),
        Key::KEY_LEFTSHIFT | Key::KEY_RIGHTSHIFT => Some(MOD_SHIFT),
        Key::KEY_LEFTALT | Key::KEY_RIGHTALT => Some(MOD_ALT),
        Key::KEY_LEFTMETA | Key::KEY_RIGHTMETA => Some(MOD_SUPER),
        _ => None,
    }
}

struct OverlayLatch {
    active_class: String,
    active_shortcut: String,
    engaged: bool,
}

/// State machine core, separated from the evdev polling loop
pub struct ShortcutState {
    controller: Controller,
    profiles: Arc<ProfileBook>,
    shortcuts: Arc<ShortcutBook>,
    key_count: usize,
    overlay_index: usize,
    mods: AtomicU8,
    latch: Mutex<OverlayLatch>,
}

impl ShortcutState {
    pub fn is_engaged(&self) -> bool {
        self.latch.lock().unwrap().engaged
    }

    pub fn current_mods(&self) -> u8 {
        self.mods.load(Ordering::SeqCst)
    }

    /// Called from the focus watcher when the active window class changes
    pub fn set_active_class(&self, class: &str) {
        {
            let mut latch = self.latch.lock().unwrap();
            latch.active_class = class.to_string();
            latch.active_shortcut = self.shortcuts.shortcut_name_for_class(class).to_string();
            if !latch.engaged {
                return;
            }
        }
        // Engaged: refresh overlay color and combo for the new class
        self.drive(self.mods.load(Ordering::SeqCst));
    }

    /// Apply the overlay state machine for a modifier bitmask.
    ///
    /// Engage and disengage are each one burst of controller calls; every
    /// intermediate frame is a valid composition.
    pub fn drive(&self, mods: u8) {
        self.mods.store(mods, Ordering::SeqCst);
        let mut latch = self.latch.lock().unwrap();
        let combo: Option<Vec<usize>> = self
            .shortcuts
            .get(&latch.active_shortcut)
            .and_then(|spec| spec.combos.get(&mods))
            .filter(|indices| !indices.is_empty())
            .cloned();

        if mods != 0 && combo.is_some() {
            let mut mask = vec![false; self.key_count];
            for index in combo.unwrap_or_default() {
                if index < self.key_count {
                    mask[index] = true;
                }
            }
            if !latch.engaged {
                debug!("overlay engage (mods={mods:#06b})");
                self.controller.set_draw_list(&[self.overlay_index]);
                latch.engaged = true;
            }
            if let Some(color) = self
                .shortcuts
                .get(&latch.active_shortcut)
                .and_then(|spec| spec.color.as_deref())
            {
                self.controller
                    .apply_preset_parameter(self.overlay_index, "color", color);
            }
            self.controller.apply_preset_mask(self.overlay_index, &mask);
            self.controller.refresh_render();
        } else {
            if latch.engaged {
                debug!("overlay disengage");
                if let Some(spec) = self.profiles.resolve(&latch.active_class) {
                    self.controller.apply_preset_masks(&spec.masks);
                    self.controller.set_draw_list(&spec.draw_list);
                }
                latch.engaged = false;
            }
            self.controller
                .apply_preset_mask(self.overlay_index, &vec![false; self.key_count]);
            self.controller.refresh_render();
        }
    }
}

pub struct ShortcutWatcher {
    state: Arc<ShortcutState>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ShortcutWatcher {
    pub fn new(
        controller: Controller,
        profiles: Arc<ProfileBook>,
        shortcuts: Arc<ShortcutBook>,
        key_count: usize,
        overlay_index: usize,
    ) -> Self {
        let default_shortcut = shortcuts.default_shortcut.clone();
        Self {
            state: Arc::new(ShortcutState {
                controller,
                profiles,
                shortcuts,
                key_count,
                overlay_index,
                mods: AtomicU8::new(0),
                latch: Mutex::new(OverlayLatch {
                    active_class: String::new(),
                    active_shortcut: default_shortcut,
                    engaged: false,
                }),
            }),
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn state(&self) -> Arc<ShortcutState> {
        Arc::clone(&self.state)
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.stop.store(false, Ordering::SeqCst);
        let state = Arc::clone(&self.state);
        let stop = Arc::clone(&self.stop);
        self.handle = Some(thread::spawn(move || {
            run_loop(&state, &stop);
        }));
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for ShortcutWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(state: &ShortcutState, stop: &AtomicBool) {
    // Per-device masks, combined by OR: releasing Ctrl on one keyboard
    // while another still holds it keeps the overlay up
    let mut devices: Vec<(evdev::Device, u8)> = find_keyboard_devices()
        .into_iter()
        .map(|device| (device, 0u8))
        .collect();
    debug!("shortcut watcher polling {} device(s)", devices.len());

    state.drive(0);

    while !stop.load(Ordering::SeqCst) {
        let mut combined = 0u8;
        for (device, mask) in &mut devices {
            match device.fetch_events() {
                Ok(events) => {
                    for event in events {
                        let InputEventKind::Key(key) = event.kind() else {
                            continue;
                        };
                        let Some(bit) = modifier_bit(key) else {
                            continue;
                        };
                        if event.value() != 0 {
                            *mask |= bit;
                        } else {
                            *mask &= !bit;
                        }
                    }
                }
                Err(err) if is_would_block(&err) => {}
                Err(err) => {
                    debug!("evdev read failed: {err}");
                }
            }
            combined |= *mask;
        }

        if combined != state.current_mods() {
            state.drive(combined);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_bits_cover_left_and_right() {
        assert_eq!(modifier_bit(Key::KEY_LEFTCTRL), Some(MOD_CTRL));
        assert_eq!(modifier_bit(Key::KEY_RIGHTCTRL), Some(MOD_CTRL));
        assert_eq!(modifier_bit(Key::KEY_LEFTSHIFT), Some(MOD_SHIFT));
        assert_eq!(modifier_bit(Key::KEY_RIGHTALT), Some(MOD_ALT));
        assert_eq!(modifier_bit(Key::KEY_LEFTMETA), Some(MOD_SUPER));
        assert_eq!(modifier_bit(Key::KEY_A), None);
    }
}
