//! Render-loop ownership and the thread-safe mutation surface.
//!
//! One mutex guards the engine together with the per-preset parameter maps;
//! every mutation and every frame composition happens under it, so watcher
//! updates are never interleaved with a render. The worst case a watcher
//! waits is one frame composition.
//!
//! The render worker only runs while an animated preset contributes.
//! `sync_render_state` is called after any mutation that can change the
//! animated/static balance and starts or stops the worker accordingly;
//! static compositions are flushed once and then the device is left alone.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::EffectEngine;
use crate::model::KeyboardModel;
use crate::preset::ParameterMap;

struct EngineCell {
    engine: EffectEngine,
    parameters: Vec<ParameterMap>,
}

struct ControllerInner {
    model: Arc<KeyboardModel>,
    cell: Mutex<EngineCell>,
    frame_interval_ms: AtomicU64,
    stop_flag: AtomicBool,
    loop_running: AtomicBool,
    start_time: Mutex<Instant>,
    render_thread: Mutex<Option<JoinHandle<()>>>,
}

/// Cheaply cloneable handle; watchers keep their own copies
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

impl Controller {
    pub fn new(
        engine: EffectEngine,
        parameters: Vec<ParameterMap>,
        frame_interval: Duration,
    ) -> Self {
        let model = Arc::clone(engine.model());
        Self {
            inner: Arc::new(ControllerInner {
                model,
                cell: Mutex::new(EngineCell {
                    engine,
                    parameters,
                }),
                frame_interval_ms: AtomicU64::new((frame_interval.as_millis() as u64).max(1)),
                stop_flag: AtomicBool::new(false),
                loop_running: AtomicBool::new(false),
                start_time: Mutex::new(Instant::now()),
                render_thread: Mutex::new(None),
            }),
        }
    }

    pub fn model(&self) -> &Arc<KeyboardModel> {
        &self.inner.model
    }

    /// Run a closure with exclusive engine access
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut EffectEngine) -> R) -> R {
        let mut cell = self.inner.cell.lock().unwrap();
        f(&mut cell.engine)
    }

    fn render_once(&self, time_seconds: f64) {
        let mut cell = self.inner.cell.lock().unwrap();
        cell.engine.render_frame(time_seconds);
        if !cell.engine.push_frame() {
            warn!("frame push failed; will retry on next render");
        }
    }

    fn engine_has_animated(&self) -> bool {
        self.inner.cell.lock().unwrap().engine.has_animated_enabled()
    }

    // ── Render loop ──────────────────────────────────────────────────

    pub fn is_render_loop_running(&self) -> bool {
        self.inner.loop_running.load(Ordering::SeqCst)
    }

    pub fn start_render_loop(&self) {
        let mut slot = self.inner.render_thread.lock().unwrap();
        if slot.is_some() && self.inner.loop_running.load(Ordering::SeqCst) {
            return;
        }
        if let Some(stale) = slot.take() {
            stale.join().ok();
        }

        self.inner.stop_flag.store(false, Ordering::SeqCst);
        self.inner.loop_running.store(true, Ordering::SeqCst);
        *self.inner.start_time.lock().unwrap() = Instant::now();

        let inner = Arc::clone(&self.inner);
        *slot = Some(thread::spawn(move || {
            debug!("render loop started");
            while !inner.stop_flag.load(Ordering::SeqCst) {
                let elapsed = inner.start_time.lock().unwrap().elapsed().as_secs_f64();
                {
                    let mut cell = inner.cell.lock().unwrap();
                    cell.engine.render_frame(elapsed);
                    if !cell.engine.push_frame() {
                        warn!("frame push failed; will retry on next render");
                    }
                }
                let interval = inner.frame_interval_ms.load(Ordering::SeqCst).max(1);
                thread::sleep(Duration::from_millis(interval));
            }
            inner.loop_running.store(false, Ordering::SeqCst);
            debug!("render loop stopped");
        }));
    }

    pub fn stop_render_loop(&self) {
        self.inner.stop_flag.store(true, Ordering::SeqCst);
        let handle = self.inner.render_thread.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.join().ok();
        }
        self.inner.loop_running.store(false, Ordering::SeqCst);
    }

    /// Reconcile the render loop with the current composition. Starts the
    /// loop when an animated preset contributes, stops it otherwise; a
    /// static composition is re-rendered once when `refresh_static_frame`.
    pub fn sync_render_state(&self, refresh_static_frame: bool) {
        if self.engine_has_animated() {
            if !self.is_render_loop_running() {
                self.render_once(0.0);
                self.start_render_loop();
            }
        } else {
            self.stop_render_loop();
            if refresh_static_frame {
                self.render_once(0.0);
            }
        }
    }

    pub fn refresh_render(&self) {
        self.sync_render_state(true);
    }

    pub fn set_frame_interval_ms(&self, ms: u64) {
        self.inner.frame_interval_ms.store(ms.max(1), Ordering::SeqCst);
    }

    pub fn frame_interval_ms(&self) -> u64 {
        self.inner.frame_interval_ms.load(Ordering::SeqCst)
    }

    // ── Mutation API (each call takes the engine mutex once) ─────────

    pub fn set_draw_list(&self, indices: &[usize]) {
        let mut cell = self.inner.cell.lock().unwrap();
        cell.engine.set_draw_list(indices);
    }

    pub fn apply_preset_masks(&self, masks: &[Vec<bool>]) -> bool {
        let mut cell = self.inner.cell.lock().unwrap();
        cell.engine.set_preset_masks(masks)
    }

    pub fn apply_preset_mask(&self, index: usize, mask: &[bool]) -> bool {
        let mut cell = self.inner.cell.lock().unwrap();
        cell.engine.set_preset_mask(index, mask)
    }

    /// Store a parameter and reconfigure the preset. Success means the index
    /// was valid; unparseable values are silently kept out by the preset.
    pub fn apply_preset_parameter(&self, index: usize, key: &str, value: &str) -> bool {
        let mut cell = self.inner.cell.lock().unwrap();
        if index >= cell.engine.preset_count() {
            return false;
        }
        let count = cell.engine.preset_count();
        if cell.parameters.len() < count {
            cell.parameters.resize(count, ParameterMap::new());
        }
        cell.parameters[index].insert(key.to_string(), value.to_string());
        let params = cell.parameters[index].clone();
        if let Some(preset) = cell.engine.preset_at(index) {
            preset.configure(&params);
        }
        true
    }

    pub fn toggle_preset(&self, index: usize) -> bool {
        let mut cell = self.inner.cell.lock().unwrap();
        match cell.engine.preset_enabled(index) {
            Some(current) => cell.engine.set_preset_enabled(index, !current),
            None => false,
        }
    }

    // ── Interactive prompt ───────────────────────────────────────────

    fn print_banner(&self) {
        println!(
            "Keyboard: {} ({:04x}:{:04x})",
            self.inner.model.name(),
            self.inner.model.vendor_id(),
            self.inner.model.product_id()
        );
    }

    fn print_help(&self) {
        println!("Commands:");
        println!("  help                    - show this help");
        println!("  list                    - list presets");
        println!("  toggle <index>          - toggle preset on/off");
        println!("  set <index> <key> <val> - set preset parameter");
        println!("  frame <ms>              - set frame interval for animated presets");
        println!("  quit                    - exit");
    }

    fn print_presets(&self) {
        let cell = self.inner.cell.lock().unwrap();
        println!("Presets:");
        for i in 0..cell.engine.preset_count() {
            let id = cell.engine.preset_ids()[i];
            let enabled = cell.engine.preset_enabled(i).unwrap_or(false);
            let animated = cell.engine.preset_animated(i).unwrap_or(false);
            let mut line = format!(
                "  [{i}] {id} ({}{})",
                if enabled { "on" } else { "off" },
                if animated { ", animated" } else { "" }
            );
            if let Some(params) = cell.parameters.get(i) {
                if !params.is_empty() {
                    let rendered: Vec<String> =
                        params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    line.push_str(&format!(" params={{{}}}", rendered.join(", ")));
                }
            }
            println!("{line}");
        }
        let order = cell.engine.draw_list();
        if !order.is_empty() {
            println!("Draw order: {order:?}");
        }
    }

    /// Blocking command prompt; returns on `quit` or EOF
    pub fn run_prompt(&self) {
        self.print_banner();
        self.print_help();
        self.print_presets();
        self.sync_render_state(true);

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            print!("> ");
            io::stdout().flush().ok();
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let mut parts = line.split_whitespace();
            let Some(cmd) = parts.next() else {
                continue;
            };
            match cmd {
                "help" => self.print_help(),
                "list" => self.print_presets(),
                "toggle" => {
                    let index = parts.next().and_then(|s| s.parse::<usize>().ok());
                    match index {
                        Some(i) if self.toggle_preset(i) => {
                            self.sync_render_state(true);
                            println!("Toggled preset {i}");
                        }
                        _ => println!("Invalid preset index"),
                    }
                }
                "set" => {
                    let index = parts.next().and_then(|s| s.parse::<usize>().ok());
                    let key = parts.next();
                    let value = parts.next();
                    match (index, key, value) {
                        (Some(i), Some(k), Some(v)) if self.apply_preset_parameter(i, k, v) => {
                            self.sync_render_state(true);
                            println!("Updated preset {i} parameter {k}");
                        }
                        _ => println!("Invalid set command"),
                    }
                }
                "frame" => {
                    let interval = parts.next().and_then(|s| s.parse::<u64>().ok());
                    match interval {
                        Some(ms) if ms > 0 => {
                            self.set_frame_interval_ms(ms);
                            println!("Frame interval set to {ms} ms");
                        }
                        _ => println!("Invalid frame interval"),
                    }
                }
                "quit" | "exit" => break,
                _ => println!("Unknown command"),
            }
        }

        self.stop_render_loop();
        println!("Exiting configurator");
    }
}
