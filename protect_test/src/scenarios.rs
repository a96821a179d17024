mod basic;
mod capabilities;

use crate::test_ctx::env_flag;

pub fn run_all() {
    run("version", basic::scenario_version);
    run("self-status", basic::scenario_self_status);
    run("repeat-idempotent", basic::scenario_repeat_idempotent);
    run("snapshot-mode", basic::scenario_snapshot_mode);
    run("ffi-entry", basic::scenario_ffi_entry);
    run(
        "real-maps-counting-sink",
        capabilities::scenario_real_maps_counting_sink,
    );
    run(
        "real-maps-probe-miss",
        capabilities::scenario_real_maps_probe_miss,
    );
    if env_flag("PROTECT_TEST_STRESS") {
        run("repeat-stress", basic::scenario_repeat_stress);
    }
}

fn run(name: &str, scenario: fn()) {
    println!("scenario: {name}");
    scenario();
}
