//! Programmable mover between Atomic/IRAM/operand collector and the memory controller.
//!
//! Each request carries a source region, destination region, and length; it is retired by
//! reading the source store, then issuing a write burst through the memory controller (MRAM
//! side) or directly into the destination store (SRAM-to-SRAM).

use std::collections::VecDeque;

use crate::memory::controller::{AccessKind, CompletedRequest, MemoryController, Requester};
use crate::memory::Storage;
use util::ByteStream;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmaRegion {
    Atomic,
    Iram,
    Wram,
    Mram,
}

#[derive(Clone, Debug)]
pub struct DmaRequest {
    pub id: u64,
    pub source: DmaRegion,
    pub source_address: u32,
    pub destination: DmaRegion,
    pub destination_address: u32,
    pub length: u32,
}

enum InFlight {
    /// Waiting on the memory controller to return bytes read from MRAM.
    AwaitingRead { request: DmaRequest, mc_id: u64 },
    /// Waiting on the memory controller to retire an MRAM write.
    AwaitingWrite { id: u64, mc_id: u64, length: u32 },
}

/// A request queue that coordinates with Atomic/IRAM/the operand collector/the memory
/// controller to move bytes between device stores. `cycle()` advances its internal state one
/// logic tick; transfers that don't touch MRAM complete immediately (SRAM-to-SRAM moves do not
/// incur DRAM timing).
pub struct Dma {
    queue: VecDeque<DmaRequest>,
    in_flight: Vec<InFlight>,
    completed: Vec<u64>,
    bytes_moved: u64,
}

impl Dma {
    pub fn new() -> Dma {
        Dma {
            queue: VecDeque::new(),
            in_flight: Vec::new(),
            completed: Vec::new(),
            bytes_moved: 0,
        }
    }

    pub fn enqueue(&mut self, request: DmaRequest) {
        self.queue.push_back(request);
    }

    pub fn has_work(&self) -> bool {
        !self.queue.is_empty() || !self.in_flight.is_empty()
    }

    pub fn take_completed(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.completed)
    }

    pub fn bytes_moved(&self) -> u64 {
        self.bytes_moved
    }

    /// Advances the DMA one logic tick: retires a completed in-flight transfer's memory-side
    /// half, and admits one new queued request directly (SRAM source) or via the memory
    /// controller (MRAM source/destination).
    pub fn cycle(
        &mut self,
        controller: &mut MemoryController,
        atomic: &mut dyn Storage,
        iram: &mut dyn Storage,
        wram: &mut dyn Storage,
    ) {
        for completed in controller.take_completed_for(Requester::Dma) {
            self.resolve(completed, atomic, iram, wram, controller);
        }

        if let Some(request) = self.queue.pop_front() {
            self.admit(request, atomic, iram, wram, controller);
        }
    }

    fn read_source(
        &self,
        region: DmaRegion,
        address: u32,
        length: u32,
        atomic: &dyn Storage,
        iram: &dyn Storage,
        wram: &dyn Storage,
    ) -> Option<ByteStream> {
        let store: &dyn Storage = match region {
            DmaRegion::Atomic => atomic,
            DmaRegion::Iram => iram,
            DmaRegion::Wram => wram,
            DmaRegion::Mram => return None,
        };
        store.borrow_slice(address, length).ok().map(ByteStream::from)
    }

    fn write_destination(
        &self,
        region: DmaRegion,
        address: u32,
        data: &ByteStream,
        atomic: &mut dyn Storage,
        iram: &mut dyn Storage,
        wram: &mut dyn Storage,
    ) {
        let store: &mut dyn Storage = match region {
            DmaRegion::Atomic => atomic,
            DmaRegion::Iram => iram,
            DmaRegion::Wram => wram,
            DmaRegion::Mram => return,
        };
        if let Ok(slice) = store.borrow_slice_mut(address, data.size() as u32) {
            slice.copy_from_slice(data.as_slice());
        }
    }

    fn admit(
        &mut self,
        request: DmaRequest,
        atomic: &mut dyn Storage,
        iram: &mut dyn Storage,
        wram: &mut dyn Storage,
        controller: &mut MemoryController,
    ) {
        if request.source != DmaRegion::Mram && request.destination != DmaRegion::Mram {
            if let Some(data) = self.read_source(request.source, request.source_address, request.length, atomic, iram, wram) {
                self.write_destination(request.destination, request.destination_address, &data, atomic, iram, wram);
                self.bytes_moved += data.size() as u64;
            }
            self.completed.push(request.id);
            return;
        }

        if request.source == DmaRegion::Mram {
            let mc_id = controller.enqueue(request.source_address, request.length, AccessKind::Read, None, Requester::Dma);
            self.in_flight.push(InFlight::AwaitingRead { request, mc_id });
            return;
        }

        // destination == Mram, source is SRAM
        if let Some(data) = self.read_source(request.source, request.source_address, request.length, atomic, iram, wram) {
            let length = request.length;
            let mc_id = controller.enqueue(request.destination_address, length, AccessKind::Write, Some(data), Requester::Dma);
            self.in_flight.push(InFlight::AwaitingWrite { id: request.id, mc_id, length });
        }
    }

    fn resolve(
        &mut self,
        completed: CompletedRequest,
        atomic: &mut dyn Storage,
        iram: &mut dyn Storage,
        wram: &mut dyn Storage,
        _controller: &mut MemoryController,
    ) {
        let mut finished_index = None;
        for (i, f) in self.in_flight.iter().enumerate() {
            let matches = match f {
                InFlight::AwaitingRead { mc_id, .. } => *mc_id == completed.id,
                InFlight::AwaitingWrite { mc_id, .. } => *mc_id == completed.id,
            };
            if matches {
                finished_index = Some(i);
                break;
            }
        }

        let Some(i) = finished_index else { return };
        match self.in_flight.remove(i) {
            InFlight::AwaitingRead { request, .. } => {
                if let Some(data) = completed.data {
                    self.write_destination(request.destination, request.destination_address, &data, atomic, iram, wram);
                    self.bytes_moved += data.size() as u64;
                }
                self.completed.push(request.id);
            }
            InFlight::AwaitingWrite { id, length, .. } => {
                self.bytes_moved += length as u64;
                self.completed.push(id);
            }
        }
    }
}
