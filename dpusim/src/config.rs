//! Every knob named in the device's configuration surface, validated once at construction
//! and then threaded by reference into every constructor that needs it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Illegal or missing configuration knob: a negative count, a misaligned size, or a size
/// that isn't a multiple of the granularity it claims to use.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{knob} must be positive, got {value}")]
    NotPositive { knob: &'static str, value: i64 },

    #[error("{knob} ({value}) must be a multiple of {granularity}")]
    Misaligned {
        knob: &'static str,
        value: u64,
        granularity: u64,
    },
}

/// Device and simulation configuration, built once and shared read-only thereafter.
///
/// Mirrors the global knob list: topology counts, pipeline depth, DRAM geometry and timing,
/// bandwidth, and the `load_local` snapshot-restore switch. `dpusim-cli` layers this from an
/// optional JSON config file under CLI flag overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub num_channels: u32,
    pub num_ranks_per_channel: u32,
    pub num_dpus_per_rank: u32,
    pub num_tasklets: u32,
    pub num_pipeline_stages: u32,
    pub num_simulation_threads: usize,
    pub num_revolver_scheduling_cycles: u32,

    pub read_bandwidth: u64,
    pub write_bandwidth: u64,

    pub logic_frequency: u64,
    pub memory_frequency: u64,

    pub wordline_size: u32,
    pub mram_data_width: u32,
    pub min_access_granularity: u32,

    pub t_ras: u32,
    pub t_rcd: u32,
    pub t_cl: u32,
    pub t_bl: u32,
    pub t_rp: u32,

    pub load_local: bool,

    pub bin_dirpath: String,
    pub image_dirpath: String,
    pub benchmark: String,
    pub verbose: bool,
}

impl Config {
    /// Ratio of memory clock ticks per logic clock tick (`memory_frequency / logic_frequency`).
    /// Drives the dual-clock `num_memory_cycles` computation each logic tick.
    pub fn frequency_ratio(&self) -> f64 {
        self.memory_frequency as f64 / self.logic_frequency as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        macro_rules! positive {
            ($field:ident) => {
                if self.$field == 0 {
                    return Err(ConfigError::NotPositive {
                        knob: stringify!($field),
                        value: self.$field as i64,
                    });
                }
            };
        }

        positive!(num_channels);
        positive!(num_ranks_per_channel);
        positive!(num_dpus_per_rank);
        positive!(num_tasklets);
        positive!(num_pipeline_stages);
        positive!(num_revolver_scheduling_cycles);
        positive!(logic_frequency);
        positive!(memory_frequency);
        positive!(wordline_size);
        positive!(mram_data_width);
        positive!(min_access_granularity);

        if self.num_simulation_threads == 0 {
            return Err(ConfigError::NotPositive {
                knob: "num_simulation_threads",
                value: 0,
            });
        }

        let bytes_per_beat = (self.mram_data_width / 8) as u64;
        if bytes_per_beat == 0 || self.wordline_size as u64 % bytes_per_beat != 0 {
            return Err(ConfigError::Misaligned {
                knob: "wordline_size",
                value: self.wordline_size as u64,
                granularity: bytes_per_beat,
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            num_channels: 1,
            num_ranks_per_channel: 1,
            num_dpus_per_rank: 8,
            num_tasklets: 11,
            num_pipeline_stages: 5,
            num_simulation_threads: 8,
            num_revolver_scheduling_cycles: 11,

            read_bandwidth: 1,
            write_bandwidth: 1,

            logic_frequency: 300,
            memory_frequency: 500,

            wordline_size: 32,
            mram_data_width: 64,
            min_access_granularity: 32,

            t_ras: 28,
            t_rcd: 10,
            t_cl: 10,
            t_bl: 2,
            t_rp: 5,

            load_local: false,

            bin_dirpath: "bin".to_string(),
            image_dirpath: "images".to_string(),
            benchmark: String::new(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_zero_counts() {
        let mut cfg = Config::default();
        cfg.num_tasklets = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_misaligned_wordline() {
        let mut cfg = Config::default();
        cfg.wordline_size = 5;
        cfg.mram_data_width = 64;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn frequency_ratio_matches_scenario() {
        let mut cfg = Config::default();
        cfg.logic_frequency = 300;
        cfg.memory_frequency = 500;
        assert!((cfg.frequency_ratio() - 5.0 / 3.0).abs() < 1e-9);
    }
}
