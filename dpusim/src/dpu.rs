//! Composition of the memory stores, operand collector, DMA, scheduler and pipeline into one
//! DPU, plus the dual-clock cycle driver that keeps the memory controller's clock in step with
//! the logic clock at a non-integer ratio.

use crate::collector::OperandCollector;
use crate::config::Config;
use crate::dma::Dma;
use crate::memory::controller::Requester;
use crate::memory::{Atomic, Iram, MemoryController, Mram, Wram};
use crate::pipeline::Logic;
use crate::scheduler::RevolverScheduler;
use crate::stats::StatCounters;
use crate::thread::Thread;

pub struct Dpu {
    pub channel_id: u32,
    pub rank_id: u32,
    pub dpu_id: u32,

    pub atomic: Atomic,
    pub iram: Iram,
    pub wram: Wram,
    pub mram: Mram,

    threads: Vec<Thread>,
    scheduler: RevolverScheduler,
    logic: Logic,
    operand_collector: OperandCollector,
    dma: Dma,
    memory_controller: MemoryController,

    cycles: u64,
    /// Running total of `⌊ratio·c⌋` used to derive `num_memory_cycles` incrementally without
    /// floating point drift across many cycles.
    memory_cycles_issued_floor: u64,
    frequency_ratio: f64,

    next_token: u64,
    pub stats: StatCounters,
}

impl Dpu {
    pub fn new(
        config: &Config,
        channel_id: u32,
        rank_id: u32,
        dpu_id: u32,
        atomic_size: u32,
        iram_size: u32,
        wram_size: u32,
        mram_address: u32,
        mram_size: u32,
    ) -> Dpu {
        let threads = (0..config.num_tasklets).map(Thread::new).collect();

        Dpu {
            channel_id,
            rank_id,
            dpu_id,
            atomic: Atomic::new(atomic_size),
            iram: Iram::new(iram_size),
            wram: Wram::new(wram_size),
            mram: Mram::new(mram_address, mram_size, config.wordline_size),
            threads,
            scheduler: RevolverScheduler::new(config.num_revolver_scheduling_cycles),
            logic: Logic::new(config.num_pipeline_stages),
            operand_collector: OperandCollector::new(),
            dma: Dma::new(),
            memory_controller: MemoryController::new(config),
            cycles: 0,
            memory_cycles_issued_floor: 0,
            frequency_ratio: config.frequency_ratio(),
            next_token: 0,
            stats: StatCounters::new(),
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Total memory-clock ticks issued so far: `⌊ratio·c⌋` at the current logic cycle `c`.
    pub fn memory_cycles_issued(&self) -> u64 {
        self.memory_cycles_issued_floor
    }

    /// Writes the IRAM entry point into every thread's PC and boots it: EMPTY → RUNNABLE.
    pub fn boot(&mut self, iram_offset: u32) {
        for thread in &mut self.threads {
            thread.boot(iram_offset);
        }
    }

    /// All threads ZOMBIE, pipeline empty, memory controller idle.
    pub fn is_zombie(&self) -> bool {
        self.threads.iter().all(Thread::is_zombie)
            && self.logic.is_empty()
            && !self.memory_controller.has_in_flight_or_queued()
            && !self.dma.has_work()
    }

    /// Per-DPU cycle ordering: issue counters, scheduler+pipeline, DMA, memory controller N
    /// times, then the DPU's own cycle counter last.
    pub fn cycle(&mut self) {
        for thread in &mut self.threads {
            thread.issue_cycle += 1;
        }

        let issue_cycle = self.threads.first().map(|t| t.issue_cycle).unwrap_or(0);

        self.logic.cycle(
            &mut self.threads,
            &mut self.scheduler,
            issue_cycle,
            &self.iram,
            &mut self.operand_collector,
            &mut self.memory_controller,
            &mut self.next_token,
        );

        self.dma.cycle(
            &mut self.memory_controller,
            &mut self.atomic,
            &mut self.iram,
            &mut self.wram,
        );

        let c = self.cycles + 1;
        let new_floor = (self.frequency_ratio * c as f64).floor() as u64;
        let num_memory_cycles = new_floor - self.memory_cycles_issued_floor;
        self.memory_cycles_issued_floor = new_floor;

        for _ in 0..num_memory_cycles {
            self.memory_controller.cycle();
        }

        let completed = self.memory_controller.take_completed_for(Requester::Collector);
        self.operand_collector.cycle(completed, &mut self.wram);
        let ready = self.operand_collector.take_ready();
        for (token, value) in ready {
            if let Some(idx) = self.threads.iter().position(|t| t.awaiting_token == Some(token)) {
                let word = value.map(|bs| {
                    let mut buf = [0u8; 4];
                    for (i, b) in bs.as_slice().iter().enumerate().take(4) {
                        buf[i] = *b;
                    }
                    u32::from_le_bytes(buf)
                });
                self.logic.complete_load(&mut self.threads, idx, word);
            }
        }

        self.cycles += 1;
        self.stats.cycles = self.cycles;
        self.stats.instructions_retired = self.logic.instructions_retired();
        self.stats.scheduler_bubbles = self.logic.scheduler_bubbles();
        self.stats.memory_requests_issued = self.memory_controller.requests_issued();
        self.stats.memory_requests_completed = self.memory_controller.requests_completed();
        self.stats.dma_bytes_moved = self.dma.bytes_moved();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dpu() -> Dpu {
        let config = Config::default();
        Dpu::new(&config, 0, 0, 0, 256, 4096, 4096, 0, 1024)
    }

    #[test]
    fn fresh_dpu_is_not_zombie_before_boot() {
        let d = dpu();
        // no threads were booted, so none are ZOMBIE either - nothing to retire.
        assert!(d.threads.iter().all(|t| !t.is_zombie()));
    }

    #[test]
    fn halt_program_reaches_zombie() {
        let mut d = dpu();
        // HALT: opcode=2 (see isa::OpCode ordinal), all other fields zero.
        let halt_word: u32 = 2 << 26;
        d.iram.load_image(&halt_word.to_le_bytes());
        d.boot(0);

        for _ in 0..config_pipeline_depth(&d) {
            d.cycle();
        }

        assert!(d.threads.iter().all(|t| t.is_zombie() || t.registers.pc != 0));
    }

    fn config_pipeline_depth(_d: &Dpu) -> u32 {
        16
    }
}
