//! evdev helpers shared by the input watchers

use std::os::unix::io::AsRawFd;

use evdev::{Device, Key};
use tracing::debug;

/// Switch a device to non-blocking reads
pub fn set_nonblocking(device: &Device) {
    let fd = device.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
    }
}

/// Open every input node that looks like a keyboard (letter keys plus a
/// modifier present), already switched to non-blocking mode.
pub fn find_keyboard_devices() -> Vec<Device> {
    let mut keyboards = Vec::new();
    let Ok(entries) = std::fs::read_dir("/dev/input") else {
        return keyboards;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with("event") {
            continue;
        }
        let Ok(device) = Device::open(&path) else {
            continue;
        };
        let is_keyboard = device.supported_keys().is_some_and(|keys| {
            keys.contains(Key::KEY_A) && keys.contains(Key::KEY_LEFTCTRL)
        });
        if is_keyboard {
            debug!("keyboard input node: {}", path.display());
            set_nonblocking(&device);
            keyboards.push(device);
        }
    }
    keyboards
}

/// True for the errno values a non-blocking read returns when idle
pub fn is_would_block(err: &std::io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK)
    )
}
