//! Decouples pipeline operand fetches from WRAM access latency: a fetch is enqueued, later
//! satisfied by the [`crate::memory::MemoryController`]'s timing model, and the real bytes are
//! moved against [`crate::memory::Wram`] when the request retires, then handed back to the
//! pipeline slot that asked for it.

use std::collections::HashMap;

use crate::memory::controller::{AccessKind, CompletedRequest, MemoryController, Requester};
use crate::memory::Storage;
use util::ByteStream;

/// Which thread/pipeline slot a pending fetch belongs to, so the result can be routed back.
pub type RequestToken = u64;

enum Pending {
    Read { address: u32, length: u32 },
    Write { address: u32, data: ByteStream },
}

/// Staging area between the pipeline and the memory controller for WRAM-resident operands.
pub struct OperandCollector {
    pending: HashMap<u64, Pending>,
    tokens: HashMap<u64, RequestToken>,
    ready: Vec<(RequestToken, Option<ByteStream>)>,
}

impl OperandCollector {
    pub fn new() -> OperandCollector {
        OperandCollector {
            pending: HashMap::new(),
            tokens: HashMap::new(),
            ready: Vec::new(),
        }
    }

    /// Enqueues a WRAM read, tagging it with `token` so the caller can match the eventual
    /// result without keeping its own side table. The controller only models timing; the
    /// actual bytes are read from `Wram` when the request retires in [`Self::cycle`].
    pub fn request_read(&mut self, controller: &mut MemoryController, token: RequestToken, address: u32, length: u32) {
        let id = controller.enqueue(address, length, AccessKind::Read, None, Requester::Collector);
        self.pending.insert(id, Pending::Read { address, length });
        self.token_for(id, token);
    }

    /// Enqueues a WRAM write. The bytes are staged here and written into `Wram` when the
    /// request retires, matching the controller's timing-only model of the access.
    pub fn request_write(
        &mut self,
        controller: &mut MemoryController,
        token: RequestToken,
        address: u32,
        length: u32,
        data: ByteStream,
    ) {
        let id = controller.enqueue(address, length, AccessKind::Write, None, Requester::Collector);
        self.pending.insert(id, Pending::Write { address, data });
        self.token_for(id, token);
    }

    fn token_for(&mut self, id: u64, token: RequestToken) {
        self.tokens.insert(id, token);
    }

    /// Drains controller completions addressed to this collector's outstanding requests,
    /// performs the real `Wram` access the completion represents (read bytes out for a load,
    /// write staged bytes in for a store), and stages the result for [`Self::take_ready`].
    pub fn cycle(&mut self, completed: Vec<CompletedRequest>, wram: &mut dyn Storage) {
        for c in completed {
            let Some(pending) = self.pending.remove(&c.id) else {
                continue;
            };
            let Some(token) = self.tokens.remove(&c.id) else {
                continue;
            };

            let result = match pending {
                Pending::Read { address, length } => wram.borrow_slice(address, length).ok().map(ByteStream::from),
                Pending::Write { address, data } => {
                    if let Ok(slice) = wram.borrow_slice_mut(address, data.size() as u32) {
                        slice.copy_from_slice(data.as_slice());
                    }
                    None
                }
            };

            self.ready.push((token, result));
        }
    }

    /// Results that arrived this cycle, ready for the pipeline to pick up and unblock their
    /// thread.
    pub fn take_ready(&mut self) -> Vec<(RequestToken, Option<ByteStream>)> {
        std::mem::take(&mut self.ready)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::controller::Requester;
    use crate::memory::Wram;

    #[test]
    fn completed_read_returns_bytes_from_wram() {
        let mut wram = Wram::new(64);
        wram.write_word(4, 0xDEAD_BEEF).unwrap();

        let mut collector = OperandCollector::new();
        collector.pending.insert(0, Pending::Read { address: 4, length: 4 });
        collector.tokens.insert(0, 7);

        let completed = vec![CompletedRequest { id: 0, data: None, requester: Requester::Collector }];
        collector.cycle(completed, &mut wram);

        let ready = collector.take_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, 7);
        let bytes = ready[0].1.as_ref().unwrap();
        assert_eq!(u32::from_le_bytes([bytes.get(0), bytes.get(1), bytes.get(2), bytes.get(3)]), 0xDEAD_BEEF);
    }

    #[test]
    fn completed_write_persists_into_wram() {
        let mut wram = Wram::new(64);

        let mut collector = OperandCollector::new();
        let data = ByteStream::from(&[0x11u8, 0x22, 0x33, 0x44][..]);
        collector.pending.insert(0, Pending::Write { address: 8, data });
        collector.tokens.insert(0, 3);

        let completed = vec![CompletedRequest { id: 0, data: None, requester: Requester::Collector }];
        collector.cycle(completed, &mut wram);

        assert_eq!(wram.read_word(8).unwrap(), 0x4433_2211);
    }
}
