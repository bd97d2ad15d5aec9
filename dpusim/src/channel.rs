//! A channel: a fixed-size group of ranks. Broadcast-style host transfers group DPUs by
//! `dpu_id % 8` within each (channel, rank) pair; see `dpusim-cli`'s host orchestration.

use crate::rank::Rank;

pub struct Channel {
    pub channel_id: u32,
    pub ranks: Vec<Rank>,
}

impl Channel {
    pub fn new(ranks: Vec<Rank>, channel_id: u32) -> Channel {
        Channel { channel_id, ranks }
    }

    pub fn is_zombie(&self) -> bool {
        self.ranks.iter().all(Rank::is_zombie)
    }
}
