//! Cycle-accurate execution engine for a single DPU and its containing rank/channel hierarchy.
//!
//! The linker (`dpuasm`) and the CLI driver (`dpusim-cli`) both depend on this crate: the
//! former for the shared instruction set ([`isa`]), the latter for [`dpu::Dpu`],
//! [`rank::Rank`], [`channel::Channel`] and [`config::Config`].

pub mod channel;
pub mod collector;
pub mod config;
pub mod dma;
pub mod dpu;
pub mod isa;
pub mod memory;
pub mod pipeline;
pub mod rank;
pub mod scheduler;
pub mod stats;
pub mod thread;
