//! Hex-dump transport for development without hardware

use tracing::info;

use super::DeviceTransport;
use crate::model::KeyboardModel;

#[derive(Debug, Default)]
pub struct LoggingTransport;

impl DeviceTransport for LoggingTransport {
    fn id(&self) -> &'static str {
        "logging"
    }

    fn connect(&mut self, model: &KeyboardModel) -> bool {
        info!("logging transport connected to {}", model.name());
        true
    }

    fn send_frame(&mut self, model: &KeyboardModel, payload: &[u8]) -> bool {
        println!(
            "[logging] frame for {} ({} bytes):",
            model.name(),
            payload.len()
        );
        for chunk in payload.chunks(16) {
            let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            println!("  {}", line.join(" "));
        }
        true
    }
}
