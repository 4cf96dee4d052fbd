//! Headless link for tests and emulation: records every physical frame.

use std::sync::{Arc, Mutex};

use crate::link::{LinkError, VfdLink};

/// A [`VfdLink`] that captures frames instead of touching hardware.
///
/// Clones share the same capture buffer, so tests keep one handle and give
/// the other to the transport.
#[derive(Clone, Default)]
pub struct CaptureLink {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_after: Option<usize>,
}

impl CaptureLink {
    pub fn new() -> Self {
        CaptureLink::default()
    }

    /// Accept `n` writes, then fail every subsequent one.
    pub fn failing_after(n: usize) -> Self {
        CaptureLink {
            frames: Arc::default(),
            fail_after: Some(n),
        }
    }

    /// Every frame written so far (length prefix included).
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    /// All payload bytes in write order, length prefixes stripped.
    pub fn payload(&self) -> Vec<u8> {
        self.lock().iter().flat_map(|f| f[1..].to_vec()).collect()
    }

    /// Forget everything captured so far.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VfdLink for CaptureLink {
    fn write_report(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        if self.fail_after.is_some_and(|n| self.lock().len() >= n) {
            return Err(LinkError::Write("capture link failure injected".into()));
        }
        self.lock().push(frame.to_vec());
        Ok(())
    }
}

/// Split a captured payload stream back into `(opcode, data)` commands.
///
/// Assumes the stream starts at a command boundary and that data lengths
/// follow the protocol (set-pixel carries its byte count, set-symbol two
/// bytes, and so on). Good enough for asserting on wire traffic in tests.
pub fn decode_commands(payload: &[u8]) -> Vec<(u8, Vec<u8>)> {
    use crate::proto::*;

    let mut out = Vec::new();
    let mut i = 0;
    while i < payload.len() {
        if payload[i] != CMD_PREFIX || i + 1 >= payload.len() {
            break;
        }
        let opcode = payload[i + 1];
        i += 2;
        let data_len = match opcode {
            CMD_SET_CLOCK => 2,
            CMD_SMALL_CLOCK | CMD_BIG_CLOCK => 1,
            CMD_SET_SYMBOL => 2,
            CMD_SET_DIMM | CMD_SET_RAM => 1,
            CMD_SET_PIXEL => 1 + payload.get(i).copied().unwrap_or(0) as usize,
            _ => 0,
        };
        let end = (i + data_len).min(payload.len());
        out.push((opcode, payload[i..end].to_vec()));
        i = end;
    }
    out
}
