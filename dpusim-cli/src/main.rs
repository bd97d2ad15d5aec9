//! `dpusim` binary: `link` runs the relocatable linker over an SDK source tree, `run` drives the
//! cycle-accurate simulator against an already-linked `bin_dirpath`.

mod chunk;
mod cli;
mod host;

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use indexmap::IndexMap;
use rayon::prelude::*;

use dpuasm::linker_script::{LinkerScript, Region};
use dpuasm::relocatable::Relocatable;
use dpusim::config::Config;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = cli::load_config(cli.config.as_deref(), &cli.overrides)?;

    match cli.command {
        Command::Link { root, bin_dirpath } => {
            config.bin_dirpath = bin_dirpath.to_string_lossy().to_string();
            run_link(&root, &bin_dirpath, &config)
        }
        Command::Run { bin_dirpath } => {
            config.bin_dirpath = bin_dirpath.to_string_lossy().to_string();
            run_simulation(&bin_dirpath, &config)
        }
    }
}

/// Derives `"<lib>.<basename-without-suffix>"` relocatable names from
/// `<root>/sdk/build/<lib>/CMakeFiles/<lib>.dir/*.o`.
///
/// Lex/Parse/AnalyzeLiveness (all of `Relocatable::from_source`) run in parallel across the
/// discovered units, matching the linker's "phases run in parallel across relocatables"
/// ordering guarantee — only the discovery walk itself and the later `dpuasm::link::link` call
/// are sequential.
fn discover_sdk(root: &Path) -> anyhow::Result<IndexMap<String, Relocatable>> {
    let sdk_root = root.join("sdk").join("build");
    let mut units: Vec<(String, std::path::PathBuf, String)> = Vec::new();

    for lib_entry in std::fs::read_dir(&sdk_root).with_context(|| format!("reading {sdk_root:?}"))? {
        let lib_entry = lib_entry?;
        if !lib_entry.file_type()?.is_dir() {
            continue;
        }
        let lib = lib_entry.file_name().to_string_lossy().to_string();
        let unit_dir = lib_entry.path().join("CMakeFiles").join(format!("{lib}.dir"));
        if !unit_dir.is_dir() {
            continue;
        }

        for obj_entry in std::fs::read_dir(&unit_dir)? {
            let obj_entry = obj_entry?;
            let path = obj_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("o") {
                continue;
            }
            let basename = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
            let name = format!("{lib}.{basename}");
            let source = std::fs::read_to_string(&path).with_context(|| format!("reading {path:?}"))?;
            units.push((name, path, source));
        }
    }

    let relocatables: Result<Vec<(String, Relocatable)>, dpuasm::error::ParseError> = units
        .into_par_iter()
        .map(|(name, path, source)| {
            let relocatable = Relocatable::from_source(name.clone(), path, source)?;
            Ok((name, relocatable))
        })
        .collect();

    Ok(relocatables.context("parsing SDK relocatable")?.into_iter().collect())
}

fn discover_benchmark(root: &Path, bench: &str) -> anyhow::Result<Relocatable> {
    let path = root
        .join("benchmark")
        .join("build")
        .join(bench)
        .join("dpu")
        .join("CMakeFiles")
        .join(format!("{bench}_device.dir"))
        .join("task.c.o");
    let source = std::fs::read_to_string(&path).with_context(|| format!("reading {path:?}"))?;
    Ok(Relocatable::from_source(bench.to_string(), path, source)?)
}

fn build_linker_script(_config: &Config) -> LinkerScript {
    LinkerScript::new(
        Region { offset: 0, size: 256 },
        Region { offset: 0, size: 24576 },
        Region { offset: 0, size: 65536 },
        Region { offset: 0, size: 67108864 },
    )
}

fn run_link(root: &Path, bin_dirpath: &Path, config: &Config) -> anyhow::Result<()> {
    if config.benchmark.is_empty() {
        bail!("--benchmark must name the benchmark to link (matches <root>/benchmark/build/<bench>)");
    }

    let benchmark = discover_benchmark(root, &config.benchmark)?;
    let sdk = discover_sdk(root)?;
    let mut linker_script = build_linker_script(config);

    let executable = dpuasm::link::link(benchmark, &sdk, &mut linker_script).context("linking failed")?;
    dpuasm::image::emit(&executable, &linker_script, bin_dirpath).context("writing linker output")?;

    if config.verbose {
        println!("linked {} into {}", config.benchmark, bin_dirpath.display());
    }

    Ok(())
}

fn run_simulation(bin_dirpath: &Path, config: &Config) -> anyhow::Result<()> {
    let images = host::Images::load(bin_dirpath).context("loading linker output")?;
    let num_executions = chunk::read_num_executions(bin_dirpath).context("reading num_executions.txt")?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_simulation_threads)
        .build()
        .context("building simulation thread pool")?;

    let mut host = host::Host::build(config, &images);

    for execution in 0..num_executions {
        if execution > 0 {
            host.reboot_all();
        }

        let host_pointers = chunk::discover_locators(bin_dirpath, chunk::ChunkKind::DpuHost, execution, 0)?;
        let mram_offsets = chunk::discover_locators(bin_dirpath, chunk::ChunkKind::DpuMramHeapPointerName, execution, 0)?;

        for pointer_name in &host_pointers {
            host.transfer_input_dpu_host(bin_dirpath, execution, pointer_name, &pool)?;
        }
        for offset in &mram_offsets {
            let offset: u32 = offset.parse().context("parsing mram heap pointer offset from chunk filename")?;
            host.transfer_input_dpu_mram(bin_dirpath, execution, offset, &pool)?;
        }

        host.run_to_completion(&pool);

        for pointer_name in &host_pointers {
            host.transfer_output_dpu_host(bin_dirpath, execution, pointer_name, images.wram_size, &pool)?;
        }
        for offset in &mram_offsets {
            let offset: u32 = offset.parse().context("parsing mram heap pointer offset from chunk filename")?;
            host.transfer_output_dpu_mram(bin_dirpath, execution, offset, &pool)?;
        }

        if config.verbose {
            println!("execution {execution} complete");
        }
    }

    Ok(())
}
