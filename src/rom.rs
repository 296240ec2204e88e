//! Read-only mapped memory window with a three-mode image loader: a
//! direct byte array keyed by address, a raw binary file loaded at a
//! start address, or a directory of sidecar JSON descriptors applied in
//! ascending priority order.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::EmulatorError;

/// `load_address` accepts either a JSON integer or a `"0xNNNN"` hex
/// string, matching the sidecar format's explicit dual representation.
fn deserialize_load_address<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrHex {
        Int(u16),
        Hex(String),
    }

    match IntOrHex::deserialize(deserializer)? {
        IntOrHex::Int(value) => Ok(value),
        IntOrHex::Hex(text) => {
            let trimmed = text.trim_start_matches("0x").trim_start_matches("0X");
            u16::from_str_radix(trimmed, 16).map_err(serde::de::Error::custom)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RomImageDescriptor {
    pub name: String,
    #[serde(deserialize_with = "deserialize_load_address")]
    pub load_address: u16,
    pub size: usize,
    pub priority: i32,
}

/// A sparse, read-only mapped window. Addresses inside `[start, end]`
/// with no loaded byte read as zero; addresses outside the window are
/// not claimed by this peripheral at all (the bus falls through to RAM).
pub struct Rom {
    start: u16,
    end: u16,
    bytes: HashMap<u16, u8>,
}

impl Rom {
    pub fn new(start: u16, end: u16) -> Self {
        Rom {
            start,
            end,
            bytes: HashMap::new(),
        }
    }

    pub fn handles_address(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }

    pub fn read(&self, addr: u16) -> u8 {
        if !self.handles_address(addr) {
            return 0;
        }
        self.bytes.get(&addr).copied().unwrap_or(0)
    }

    /// Writes are never accepted; callers (the bus) are expected to drop
    /// them silently rather than call this.
    pub fn write(&mut self, _addr: u16, _value: u8) {}

    /// Direct byte-array load keyed by address, truncated to whatever
    /// falls within the ROM window. Addresses outside the window are
    /// skipped rather than erroring; a caller loading a program that
    /// overruns the window gets the truncation described in §6.
    pub fn load_bytes(&mut self, start: u16, data: &[u8]) {
        let mut addr = start;
        for &byte in data {
            if self.handles_address(addr) {
                self.bytes.insert(addr, byte);
            }
            addr = addr.wrapping_add(1);
        }
    }

    /// Loads a raw binary file at `start`.
    pub fn load_file(&mut self, path: &Path, start: u16) -> Result<(), EmulatorError> {
        let data = fs::read(path).map_err(|source| EmulatorError::RomImageUnreadable {
            name: path.display().to_string(),
            source,
        })?;
        self.load_bytes(start, &data);
        Ok(())
    }

    /// Scans `dir` for `*.json` sidecar descriptors, each paired with a
    /// same-basename `.bin` payload, and applies them in ascending
    /// `priority` order so a later (higher-priority) image's bytes win
    /// any overlap. An image whose `load_address..load_address+size`
    /// falls outside the ROM window is logged and skipped rather than
    /// aborting the whole directory.
    pub fn load_directory(&mut self, dir: &Path) -> Result<(), EmulatorError> {
        let mut descriptors = Vec::new();
        let entries = fs::read_dir(dir).map_err(|source| EmulatorError::RomImageUnreadable {
            name: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| EmulatorError::RomImageUnreadable {
                name: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|source| EmulatorError::RomImageUnreadable {
                name: path.display().to_string(),
                source,
            })?;
            let descriptor: RomImageDescriptor = serde_json::from_str(&text)
                .map_err(|source| EmulatorError::MetadataInvalid { path: path.clone(), source })?;
            descriptors.push((path, descriptor));
        }

        descriptors.sort_by_key(|(_, descriptor)| descriptor.priority);

        for (json_path, descriptor) in descriptors {
            let end = descriptor
                .load_address
                .checked_add(descriptor.size.saturating_sub(1).min(u16::MAX as usize) as u16);
            let in_range = end
                .map(|last| self.handles_address(descriptor.load_address) && self.handles_address(last))
                .unwrap_or(false);
            if !in_range {
                log::warn!(
                    "ROM image {:?} at {:#06x} (size {}) falls outside the ROM window, skipping",
                    descriptor.name,
                    descriptor.load_address,
                    descriptor.size
                );
                continue;
            }

            let bin_path = json_path.with_extension("bin");
            let data = match fs::read(&bin_path) {
                Ok(data) => data,
                Err(source) => {
                    log::warn!("ROM image {:?} unreadable: {}", descriptor.name, source);
                    continue;
                }
            };
            let truncated = &data[..data.len().min(descriptor.size)];
            self.load_bytes(descriptor.load_address, truncated);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_outside_the_window_are_zero() {
        let rom = Rom::new(0x8000, 0xFFFF);
        assert_eq!(rom.read(0x0000), 0);
    }

    #[test]
    fn unassigned_addresses_inside_the_window_are_zero() {
        let rom = Rom::new(0x8000, 0xFFFF);
        assert_eq!(rom.read(0x9000), 0);
    }

    #[test]
    fn load_bytes_truncates_to_the_window() {
        let mut rom = Rom::new(0x8000, 0x8002);
        rom.load_bytes(0x8001, &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(rom.read(0x8000), 0x00);
        assert_eq!(rom.read(0x8001), 0x11);
        assert_eq!(rom.read(0x8002), 0x22);
    }

    #[test]
    fn writes_are_no_ops() {
        let mut rom = Rom::new(0x8000, 0xFFFF);
        rom.load_bytes(0x8000, &[0x42]);
        rom.write(0x8000, 0xFF);
        assert_eq!(rom.read(0x8000), 0x42);
    }

    #[test]
    fn descriptor_accepts_hex_string_load_address() {
        let json = r#"{"name": "test", "load_address": "0xC000", "size": 4, "priority": 1}"#;
        let descriptor: RomImageDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.load_address, 0xC000);
    }

    #[test]
    fn descriptor_accepts_integer_load_address() {
        let json = r#"{"name": "test", "load_address": 32768, "size": 4, "priority": 1}"#;
        let descriptor: RomImageDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.load_address, 0x8000);
    }
}
