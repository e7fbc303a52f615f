//! Active-window watcher on the Hyprland event socket.
//!
//! Consumes the line-delimited `.socket2.sock` stream; only `activewindow>>`
//! lines matter, and only the application class before the first comma. On a
//! class change the shortcut watcher is notified first, then the matching
//! profile (draw list + masks) is applied to the controller.

use std::io::Read;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::controller::Controller;
use crate::profiles::ProfileBook;

const EVENT_PREFIX: &str = "activewindow>>";
const CONNECT_RETRY: Duration = Duration::from_millis(1000);
const RECONNECT_DELAY: Duration = Duration::from_millis(500);
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Resolve the compositor event socket from the environment
pub fn default_events_socket() -> Option<PathBuf> {
    let signature = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .ok()
        .filter(|s| !s.is_empty())?;
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        if !runtime_dir.is_empty() {
            return Some(
                PathBuf::from(runtime_dir)
                    .join("hypr")
                    .join(&signature)
                    .join(".socket2.sock"),
            );
        }
    }
    Some(
        PathBuf::from("/tmp/hypr")
            .join(signature)
            .join(".socket2.sock"),
    )
}

/// Extract the application class from one event line
pub fn parse_active_window(line: &str) -> Option<&str> {
    let payload = line.strip_prefix(EVENT_PREFIX)?;
    Some(payload.split(',').next().unwrap_or(payload))
}

/// Socket-free watcher core, shared with the reader thread
pub struct FocusState {
    controller: Controller,
    profiles: Arc<ProfileBook>,
    last_class: Mutex<String>,
    on_class: Mutex<Option<Box<dyn Fn(&str) + Send>>>,
}

impl FocusState {
    pub fn handle_line(&self, line: &str) {
        if let Some(class) = parse_active_window(line) {
            self.handle_class(class);
        }
    }

    /// Dedup, notify the class callback, then apply the matching profile
    pub fn handle_class(&self, class: &str) {
        {
            let mut last = self.last_class.lock().unwrap();
            if *last == class {
                return;
            }
            *last = class.to_string();
        }
        debug!("active window class: {class}");
        if let Some(callback) = self.on_class.lock().unwrap().as_ref() {
            callback(class);
        }
        self.apply_profile_for(class);
    }

    pub fn apply_profile_for(&self, class: &str) {
        let Some(spec) = self.profiles.resolve(class) else {
            return;
        };
        self.controller.apply_preset_masks(&spec.masks);
        self.controller.set_draw_list(&spec.draw_list);
        self.controller.refresh_render();
    }

    pub fn last_class(&self) -> String {
        self.last_class.lock().unwrap().clone()
    }
}

pub struct FocusWatcher {
    state: Arc<FocusState>,
    socket_override: Option<PathBuf>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FocusWatcher {
    pub fn new(
        controller: Controller,
        profiles: Arc<ProfileBook>,
        socket_override: Option<PathBuf>,
    ) -> Self {
        Self {
            state: Arc::new(FocusState {
                controller,
                profiles,
                last_class: Mutex::new(String::new()),
                on_class: Mutex::new(None),
            }),
            socket_override,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn state(&self) -> Arc<FocusState> {
        Arc::clone(&self.state)
    }

    /// Install the class-change callback; call before `start`
    pub fn set_class_callback(&self, callback: impl Fn(&str) + Send + 'static) {
        *self.state.on_class.lock().unwrap() = Some(Box::new(callback));
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let socket = self
            .socket_override
            .clone()
            .or_else(default_events_socket);
        let Some(socket) = socket else {
            warn!("no compositor event socket found; focus watcher disabled");
            return;
        };

        self.stop.store(false, Ordering::SeqCst);
        let state = Arc::clone(&self.state);
        let stop = Arc::clone(&self.stop);
        self.handle = Some(thread::spawn(move || {
            run_loop(&state, &stop, &socket);
        }));
    }

    /// Idempotent; sets the stop flag and joins the reader
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for FocusWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(state: &FocusState, stop: &AtomicBool, socket: &PathBuf) {
    info!("focus watcher connecting to {}", socket.display());
    while !stop.load(Ordering::SeqCst) {
        let mut stream = match UnixStream::connect(socket) {
            Ok(stream) => stream,
            Err(err) => {
                debug!("connect failed: {err}");
                thread::sleep(CONNECT_RETRY);
                continue;
            }
        };
        // Bounded read timeout so the stop flag is observed regularly
        stream.set_read_timeout(Some(READ_TIMEOUT)).ok();

        let mut pending: Vec<u8> = Vec::with_capacity(4096);
        let mut chunk = [0u8; 1024];
        while !stop.load(Ordering::SeqCst) {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = pending.drain(..=pos).collect();
                        let text = String::from_utf8_lossy(&line[..line.len() - 1]);
                        state.handle_line(text.trim_end_matches('\r'));
                    }
                }
                Err(err)
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        || err.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(err) => {
                    debug!("socket read failed: {err}");
                    break;
                }
            }
        }
        drop(stream);
        if !stop.load(Ordering::SeqCst) {
            thread::sleep(RECONNECT_DELAY);
        }
    }
}
