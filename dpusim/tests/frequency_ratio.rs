//! End-to-end check of the dual-clock cycle driver: over 10 logic cycles at
//! `logic_frequency = 300`, `memory_frequency = 500`, the memory controller must be ticked
//! exactly `Σ ⌊c·5/3⌋ − ⌊(c−1)·5/3⌋ = ⌊50/3⌋ = 16` times in total.

use dpusim::config::Config;
use dpusim::dpu::Dpu;

#[test]
fn memory_cycles_over_ten_logic_cycles_matches_expected_ratio() {
    let mut config = Config::default();
    config.logic_frequency = 300;
    config.memory_frequency = 500;

    let mut dpu = Dpu::new(&config, 0, 0, 0, 256, 4096, 4096, 0, 1024);
    dpu.boot(0);

    for _ in 0..10 {
        dpu.cycle();
    }

    assert_eq!(dpu.cycles(), 10);
    assert_eq!(dpu.memory_cycles_issued(), 16);
}
