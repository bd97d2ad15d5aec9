//! Read-only per-DPU counters, incremented inline by the components that produce the events.
//! Observability, not a scored metrics pipeline — a plain struct the CLI prints at the end of a
//! run, grounded on the original's `stat_factory` field on `Dpu`.

#[derive(Clone, Debug, Default)]
pub struct StatCounters {
    pub cycles: u64,
    pub instructions_retired: u64,
    pub memory_requests_issued: u64,
    pub memory_requests_completed: u64,
    pub dma_bytes_moved: u64,
    pub scheduler_bubbles: u64,
}

impl StatCounters {
    pub fn new() -> StatCounters {
        StatCounters::default()
    }
}
