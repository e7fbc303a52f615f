//! Keyboard description and HID frame encoding.
//!
//! A `KeyboardModel` is built once at startup from the configuration and is
//! immutable afterwards. It flattens the layout rows into a row-major key
//! index space; the literal label `"NAN"` marks a placeholder cell that
//! occupies an index but has no physical LED behind it.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::frame::KeyColorFrame;

/// Label used for layout cells without a physical LED
pub const PLACEHOLDER_LABEL: &str = "NAN";

/// Immutable description of one keyboard: identity, wire format, geometry.
#[derive(Debug)]
pub struct KeyboardModel {
    name: String,
    vendor_id: u16,
    product_id: u16,
    packet_header: Vec<u8>,
    packet_length: usize,
    layout: Vec<Vec<String>>,
    key_labels: Vec<String>,
    key_to_index: HashMap<String, usize>,
    keycode_to_index: Vec<Option<usize>>,
    interface_usage_page: Option<u16>,
    interface_usage: Option<u16>,
}

impl KeyboardModel {
    pub fn new(
        name: impl Into<String>,
        vendor_id: u16,
        product_id: u16,
        packet_header: Vec<u8>,
        packet_length: usize,
        layout: Vec<Vec<String>>,
    ) -> Self {
        let mut key_labels = Vec::new();
        let mut key_to_index = HashMap::new();
        for row in &layout {
            for label in row {
                if label != PLACEHOLDER_LABEL {
                    // First occurrence wins for duplicate labels
                    key_to_index
                        .entry(label.clone())
                        .or_insert(key_labels.len());
                }
                key_labels.push(label.clone());
            }
        }

        Self {
            name: name.into(),
            vendor_id,
            product_id,
            packet_header,
            packet_length,
            layout,
            key_labels,
            key_to_index,
            keycode_to_index: Vec::new(),
            interface_usage_page: None,
            interface_usage: None,
        }
    }

    /// Restrict device discovery to a specific HID usage page/usage pair
    pub fn with_interface_usage(mut self, usage_page: Option<u16>, usage: Option<u16>) -> Self {
        self.interface_usage_page = usage_page;
        self.interface_usage = usage;
        self
    }

    /// Install the OS keycode → key index table from label/keycode pairs.
    /// Labels that do not resolve to a key are dropped.
    pub fn with_keycode_map(mut self, entries: &BTreeMap<String, u16>) -> Self {
        let mut table: Vec<Option<usize>> = Vec::new();
        for (label, code) in entries {
            let Some(&index) = self.key_to_index.get(label) else {
                continue;
            };
            let code = *code as usize;
            if table.len() <= code {
                table.resize(code + 1, None);
            }
            table[code] = Some(index);
        }
        self.keycode_to_index = table;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn packet_header(&self) -> &[u8] {
        &self.packet_header
    }

    pub fn packet_length(&self) -> usize {
        self.packet_length
    }

    pub fn layout(&self) -> &[Vec<String>] {
        &self.layout
    }

    pub fn key_labels(&self) -> &[String] {
        &self.key_labels
    }

    pub fn interface_usage_page(&self) -> Option<u16> {
        self.interface_usage_page
    }

    pub fn interface_usage(&self) -> Option<u16> {
        self.interface_usage
    }

    /// Number of key indices, placeholder cells included
    pub fn key_count(&self) -> usize {
        self.key_labels.len()
    }

    /// Index of a key label; placeholder cells are never returned
    pub fn index_for_key(&self, label: &str) -> Option<usize> {
        self.key_to_index.get(label).copied()
    }

    /// Index for an OS keycode. `None` when no keycode map was installed
    /// or the code is unmapped.
    pub fn index_for_keycode(&self, keycode: u16) -> Option<usize> {
        self.keycode_to_index
            .get(keycode as usize)
            .copied()
            .flatten()
    }

    pub fn has_keycode_map(&self) -> bool {
        !self.keycode_to_index.is_empty()
    }

    /// Encode a frame into a vendor HID feature report:
    /// header bytes, then R,G,B per key index, zero-padded to the packet
    /// length. Placeholder cells always encode as black.
    pub fn encode_frame(&self, frame: &KeyColorFrame) -> Result<Vec<u8>> {
        if frame.len() != self.key_labels.len() {
            return Err(Error::FrameSizeMismatch {
                got: frame.len(),
                expected: self.key_labels.len(),
            });
        }

        let mut payload = Vec::with_capacity(self.packet_length.max(
            self.packet_header.len() + self.key_labels.len() * 3,
        ));
        payload.extend_from_slice(&self.packet_header);

        for (index, label) in self.key_labels.iter().enumerate() {
            let color = if label == PLACEHOLDER_LABEL {
                crate::color::RgbColor::BLACK
            } else {
                frame.color(index).unwrap_or_default()
            };
            payload.push(color.r);
            payload.push(color.g);
            payload.push(color.b);
        }

        if payload.len() > self.packet_length {
            return Err(Error::PayloadExceedsPacket {
                got: payload.len(),
                limit: self.packet_length,
            });
        }
        payload.resize(self.packet_length, 0);
        Ok(payload)
    }
}
