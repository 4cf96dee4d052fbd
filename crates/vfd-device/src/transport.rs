//! FIFO command queue with chunked device writes.

use std::collections::VecDeque;

use tracing::{debug, error};

use crate::link::VfdLink;
use crate::proto::CMD_PREFIX;

/// Maximum payload bytes per physical write; the frame adds one length byte.
///
/// This boundary is wire protocol, not an implementation choice - the
/// device reassembles the command stream from length-prefixed 63-byte
/// chunks.
pub const CHUNK_PAYLOAD: usize = 63;

/// Byte queue plus the (optionally bound) physical interface.
///
/// Producers append opcode/data pairs; `flush` drains strictly in order.
/// The queue is always drained to empty before the link may be dropped.
pub struct Transport<L: VfdLink> {
    queue: VecDeque<u8>,
    link: Option<L>,
}

impl<L: VfdLink> Default for Transport<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: VfdLink> Transport<L> {
    pub fn new() -> Self {
        Transport {
            queue: VecDeque::new(),
            link: None,
        }
    }

    /// Bind a freshly opened link, discarding any stale queued bytes.
    pub fn open(&mut self, link: L) {
        self.queue.clear();
        self.link = Some(link);
    }

    /// Drop the link. Idempotent; safe to call if `open` never happened.
    pub fn close(&mut self) {
        self.link = None;
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Queue one command: escape byte, then the opcode.
    pub fn queue_cmd(&mut self, opcode: u8) {
        self.queue.push_back(CMD_PREFIX);
        self.queue.push_back(opcode);
    }

    /// Queue one raw data byte.
    pub fn queue_data(&mut self, data: u8) {
        self.queue.push_back(data);
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue to the device in length-prefixed chunks.
    ///
    /// Returns `true` if the queue was empty or fully transmitted. On any
    /// write failure the remaining queue is discarded, the link is closed
    /// and `false` is returned; the transport must be re-opened before any
    /// further output is possible.
    pub fn flush(&mut self) -> bool {
        if self.queue.is_empty() {
            return true;
        }
        let Some(link) = self.link.as_mut() else {
            return false;
        };

        while !self.queue.is_empty() {
            let n = self.queue.len().min(CHUNK_PAYLOAD);
            let mut frame = Vec::with_capacity(n + 1);
            frame.push(n as u8);
            frame.extend(self.queue.drain(..n));

            if let Err(err) = link.write_report(&frame) {
                error!(%err, "transport write failed, closing device");
                self.queue.clear();
                self.link = None;
                return false;
            }
        }
        debug!("queue flushed");
        true
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::testing::CaptureLink;
    use proptest::prelude::*;

    #[test]
    fn test_flush_empty_queue_writes_nothing() {
        let link = CaptureLink::new();
        let mut t = Transport::new();
        t.open(link.clone());
        assert!(t.flush());
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_queue_cmd_escapes_opcode() {
        let link = CaptureLink::new();
        let mut t = Transport::new();
        t.open(link.clone());
        t.queue_cmd(0x50);
        t.queue_data(0x07);
        assert!(t.flush());
        assert_eq!(link.frames(), vec![vec![3, 0x1b, 0x50, 0x07]]);
    }

    #[test]
    fn test_chunking_at_63_bytes() {
        let link = CaptureLink::new();
        let mut t = Transport::new();
        t.open(link.clone());
        for i in 0..130u32 {
            t.queue_data(i as u8);
        }
        assert!(t.flush());

        let frames = link.frames();
        assert_eq!(frames.len(), 3, "ceil(130/63) writes");
        assert_eq!(frames[0][0], 63);
        assert_eq!(frames[1][0], 63);
        assert_eq!(frames[2][0], 4);
        for f in &frames {
            assert_eq!(f.len(), f[0] as usize + 1, "length prefix matches payload");
        }
        let reassembled: Vec<u8> = frames.iter().flat_map(|f| f[1..].to_vec()).collect();
        let expected: Vec<u8> = (0..130u32).map(|i| i as u8).collect();
        assert_eq!(reassembled, expected);
    }

    #[test]
    fn test_flush_without_link_fails_and_keeps_queue() {
        let mut t: Transport<CaptureLink> = Transport::new();
        t.queue_data(1);
        assert!(!t.flush());
        assert_eq!(t.queued(), 1);
    }

    #[test]
    fn test_write_failure_discards_queue_and_closes() {
        let link = CaptureLink::failing_after(1);
        let mut t = Transport::new();
        t.open(link.clone());
        for _ in 0..100 {
            t.queue_data(0xaa);
        }
        assert!(!t.flush());
        assert!(!t.is_open());
        assert_eq!(t.queued(), 0, "queue discarded after failure");
        assert_eq!(link.frames().len(), 1, "only the successful chunk went out");

        // Further output needs a re-open first.
        t.queue_data(0xbb);
        assert!(!t.flush());
        t.open(CaptureLink::new());
        assert!(t.flush(), "open discards stale bytes, queue is empty");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut t: Transport<CaptureLink> = Transport::new();
        t.close();
        t.close();
        t.open(CaptureLink::new());
        t.close();
        t.close();
        assert!(!t.is_open());
    }

    proptest! {
        #[test]
        fn prop_chunk_count_and_reassembly(payload in proptest::collection::vec(any::<u8>(), 0..400)) {
            let link = CaptureLink::new();
            let mut t = Transport::new();
            t.open(link.clone());
            for &b in &payload {
                t.queue_data(b);
            }
            prop_assert!(t.flush());

            let frames = link.frames();
            prop_assert_eq!(frames.len(), payload.len().div_ceil(CHUNK_PAYLOAD));
            let mut reassembled = Vec::new();
            for f in &frames {
                prop_assert_eq!(f[0] as usize, f.len() - 1);
                prop_assert!(f.len() - 1 <= CHUNK_PAYLOAD);
                reassembled.extend_from_slice(&f[1..]);
            }
            prop_assert_eq!(reassembled, payload);
        }
    }
}
