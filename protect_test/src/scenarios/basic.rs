use zygote_protect::{
    ScanMode, get_version, invocation_count, last_report, mprotect_self, mprotect_self_with,
    zygote_protect_native_mprotect,
};

use crate::test_ctx::{ensure_status, expected_self_status};

pub fn scenario_version() {
    let version = get_version();
    assert!(version.starts_with("zygote_protect "), "bad version: {version}");
}

pub fn scenario_self_status() {
    let before = invocation_count();
    let status = mprotect_self();
    ensure_status(status, expected_self_status(), "mprotect_self");
    assert_eq!(invocation_count(), before + 1);

    let last = last_report().expect("last report missing");
    assert_eq!(last.mode, ScanMode::Reopen);
    match last.result {
        Ok(report) => {
            assert_eq!(status, 0);
            assert_eq!(report.selected, report.protected + report.failed);
        }
        Err(errno) => assert_eq!(errno.status(), status),
    }
}

pub fn scenario_repeat_idempotent() {
    let first = mprotect_self();
    let second = mprotect_self();
    ensure_status(second, first, "second mprotect_self");
}

pub fn scenario_snapshot_mode() {
    let status = match mprotect_self_with(ScanMode::Snapshot) {
        Ok(_) => 0,
        Err(errno) => errno.status(),
    };
    ensure_status(status, expected_self_status(), "mprotect_self_with(Snapshot)");
    let last = last_report().expect("last report missing");
    assert_eq!(last.mode, ScanMode::Snapshot);
}

pub fn scenario_ffi_entry() {
    ensure_status(
        zygote_protect_native_mprotect(),
        expected_self_status(),
        "zygote_protect_native_mprotect",
    );
}

pub fn scenario_repeat_stress() {
    let expected = expected_self_status();
    for round in 0..256 {
        ensure_status(mprotect_self(), expected, &format!("mprotect_self round {round}"));
    }
}
