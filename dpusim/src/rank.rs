//! A rank: a fixed-size group of DPUs sharing a rank id within a channel.

use crate::dpu::Dpu;

pub struct Rank {
    pub rank_id: u32,
    pub dpus: Vec<Dpu>,
}

impl Rank {
    pub fn new(dpus: Vec<Dpu>, rank_id: u32) -> Rank {
        Rank { rank_id, dpus }
    }

    pub fn is_zombie(&self) -> bool {
        self.dpus.iter().all(Dpu::is_zombie)
    }
}
