//! Argument parsing and config layering: built-in defaults, then an optional JSON config file,
//! then CLI flags (CLI wins), grounded in the pack's clap-derive CLI pattern.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dpusim::config::Config;

#[derive(Parser, Debug)]
#[command(name = "dpusim", about = "Cycle-accurate PIM/DPU simulator: link SDK sources and run the device model.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// JSON config file layered under built-in defaults and under these flags.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Links a benchmark plus SDK sources under `root` and writes linker outputs to `bin_dirpath`.
    Link { root: PathBuf, bin_dirpath: PathBuf },
    /// Runs the simulator against an already-linked `bin_dirpath`.
    Run { bin_dirpath: PathBuf },
}

/// Every knob in spec.md §6, each optional so an unset flag leaves the config-file/default
/// value untouched.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    #[arg(long)]
    pub num_channels: Option<u32>,
    #[arg(long)]
    pub num_ranks_per_channel: Option<u32>,
    #[arg(long)]
    pub num_dpus_per_rank: Option<u32>,
    #[arg(long)]
    pub num_tasklets: Option<u32>,
    #[arg(long)]
    pub num_pipeline_stages: Option<u32>,
    #[arg(long)]
    pub num_simulation_threads: Option<usize>,
    #[arg(long)]
    pub num_revolver_scheduling_cycles: Option<u32>,
    #[arg(long)]
    pub read_bandwidth: Option<u64>,
    #[arg(long)]
    pub write_bandwidth: Option<u64>,
    #[arg(long)]
    pub logic_frequency: Option<u64>,
    #[arg(long)]
    pub memory_frequency: Option<u64>,
    #[arg(long)]
    pub wordline_size: Option<u32>,
    #[arg(long)]
    pub mram_data_width: Option<u32>,
    #[arg(long)]
    pub min_access_granularity: Option<u32>,
    #[arg(long)]
    pub t_ras: Option<u32>,
    #[arg(long)]
    pub t_rcd: Option<u32>,
    #[arg(long)]
    pub t_cl: Option<u32>,
    #[arg(long)]
    pub t_bl: Option<u32>,
    #[arg(long)]
    pub t_rp: Option<u32>,
    #[arg(long)]
    pub load_local: bool,
    #[arg(long)]
    pub image_dirpath: Option<String>,
    #[arg(long)]
    pub benchmark: Option<String>,
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConfigOverrides {
    /// Applies every `Some` field (and either boolean flag, if set) over `base`. This is the
    /// last layer, so whatever it touches wins over the config file and the built-in defaults.
    pub fn apply(&self, mut base: Config) -> Config {
        macro_rules! over {
            ($field:ident) => {
                if let Some(v) = self.$field {
                    base.$field = v;
                }
            };
        }

        over!(num_channels);
        over!(num_ranks_per_channel);
        over!(num_dpus_per_rank);
        over!(num_tasklets);
        over!(num_pipeline_stages);
        over!(num_simulation_threads);
        over!(num_revolver_scheduling_cycles);
        over!(read_bandwidth);
        over!(write_bandwidth);
        over!(logic_frequency);
        over!(memory_frequency);
        over!(wordline_size);
        over!(mram_data_width);
        over!(min_access_granularity);
        over!(t_ras);
        over!(t_rcd);
        over!(t_cl);
        over!(t_bl);
        over!(t_rp);

        if self.load_local {
            base.load_local = true;
        }
        if let Some(v) = &self.image_dirpath {
            base.image_dirpath = v.clone();
        }
        if let Some(v) = &self.benchmark {
            base.benchmark = v.clone();
        }
        if self.verbose {
            base.verbose = true;
        }

        base
    }
}

/// Built-in defaults, then `config_path`'s JSON (if given), then `overrides`. Validates the
/// result before returning it.
pub fn load_config(config_path: Option<&std::path::Path>, overrides: &ConfigOverrides) -> anyhow::Result<Config> {
    let mut config = Config::default();

    if let Some(path) = config_path {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
        config = serde_json::from_str(&text).with_context(|| format!("parsing config file {path:?}"))?;
    }

    config = overrides.apply(config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let mut overrides = ConfigOverrides::default();
        overrides.num_tasklets = Some(4);
        let config = overrides.apply(Config::default());
        assert_eq!(config.num_tasklets, 4);
    }

    #[test]
    fn unset_overrides_leave_defaults_untouched() {
        let overrides = ConfigOverrides::default();
        let config = overrides.apply(Config::default());
        assert_eq!(config, Config::default());
    }
}
