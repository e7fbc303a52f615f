//! hidapi transport: feature reports to the real device.
//!
//! Vendor RGB keyboards expose several HID interfaces; the one accepting
//! lighting reports is identified by usage page/usage. Selection order: the
//! model's configured pair, then the common vendor page 0xFF00 usage 0x0001,
//! then the first interface with a matching VID/PID.

use hidapi::{HidApi, HidDevice};
use tracing::{debug, error, info};

use super::DeviceTransport;
use crate::model::KeyboardModel;

/// Vendor-defined usage page most RGB keyboards use for lighting
const FALLBACK_USAGE_PAGE: u16 = 0xFF00;
const FALLBACK_USAGE: u16 = 0x0001;

#[derive(Default)]
pub struct HidTransport {
    api: Option<HidApi>,
    device: Option<HidDevice>,
}

impl HidTransport {
    fn select_and_open(api: &HidApi, model: &KeyboardModel) -> Option<HidDevice> {
        let candidates: Vec<_> = api
            .device_list()
            .filter(|info| {
                info.vendor_id() == model.vendor_id() && info.product_id() == model.product_id()
            })
            .collect();
        if candidates.is_empty() {
            error!(
                "no HID device with VID={:04x} PID={:04x}",
                model.vendor_id(),
                model.product_id()
            );
            return None;
        }

        let preferred = match (model.interface_usage_page(), model.interface_usage()) {
            (Some(page), Some(usage)) => candidates
                .iter()
                .find(|info| info.usage_page() == page && info.usage() == usage),
            _ => None,
        };
        let selected = preferred
            .or_else(|| {
                candidates.iter().find(|info| {
                    info.usage_page() == FALLBACK_USAGE_PAGE && info.usage() == FALLBACK_USAGE
                })
            })
            .or_else(|| candidates.first());

        let info = selected?;
        debug!(
            "opening interface usage_page={:04x} usage={:04x} path={:?}",
            info.usage_page(),
            info.usage(),
            info.path()
        );
        match info.open_device(api) {
            Ok(device) => Some(device),
            Err(err) => {
                error!("failed to open {}: {err}", model.name());
                None
            }
        }
    }
}

impl DeviceTransport for HidTransport {
    fn id(&self) -> &'static str {
        "hidapi"
    }

    fn connect(&mut self, model: &KeyboardModel) -> bool {
        let api = match HidApi::new() {
            Ok(api) => api,
            Err(err) => {
                error!("hidapi init failed: {err}");
                return false;
            }
        };

        match Self::select_and_open(&api, model) {
            Some(device) => {
                info!(
                    "connected to {} (VID={:04x} PID={:04x})",
                    model.name(),
                    model.vendor_id(),
                    model.product_id()
                );
                self.device = Some(device);
                self.api = Some(api);
                true
            }
            None => false,
        }
    }

    fn send_frame(&mut self, model: &KeyboardModel, payload: &[u8]) -> bool {
        let Some(device) = &self.device else {
            error!("send_frame called before connect");
            return false;
        };
        match device.send_feature_report(payload) {
            Ok(()) => true,
            Err(err) => {
                error!("feature report failed for {}: {err}", model.name());
                false
            }
        }
    }
}
