//! Device transports: sinks for encoded HID frames

mod hid;
mod logging;

pub use hid::HidTransport;
pub use logging::LoggingTransport;

use crate::error::{Error, Result};
use crate::model::KeyboardModel;

/// Sink for encoded frames.
///
/// `connect` is called once before the render loop starts; `send_frame` is
/// always called from a single thread at a time (the controller serializes
/// engine access).
pub trait DeviceTransport: Send {
    fn id(&self) -> &'static str;
    fn connect(&mut self, model: &KeyboardModel) -> bool;
    fn send_frame(&mut self, model: &KeyboardModel, payload: &[u8]) -> bool;
}

/// Construct a transport by its config identifier
pub fn create(id: &str) -> Result<Box<dyn DeviceTransport>> {
    match id {
        "logging" => Ok(Box::new(LoggingTransport::default())),
        "hid" | "hidapi" => Ok(Box::new(HidTransport::default())),
        other => Err(Error::UnknownTransport(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_by_id() {
        assert_eq!(create("logging").unwrap().id(), "logging");
        assert_eq!(create("hid").unwrap().id(), "hidapi");
        assert_eq!(create("hidapi").unwrap().id(), "hidapi");
        assert!(matches!(create("usb3"), Err(Error::UnknownTransport(_))));
    }
}
