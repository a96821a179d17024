use std::fs;

use zygote_protect::{ProtectSink, ZygoteProtectErrno};

pub const APP_MARKER: &str = "/data/app";

pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

pub fn page_size() -> usize {
    let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if value <= 0 { 4096 } else { value as usize }
}

pub fn read_self_maps() -> String {
    fs::read_to_string("/proc/self/maps").unwrap_or_default()
}

// 当前进程是否加载了应用安装目录下的私有可执行映射
pub fn has_app_exec_region() -> bool {
    read_self_maps().lines().any(|line| {
        let perms = line.split_whitespace().nth(1).unwrap_or("");
        perms.len() >= 4
            && perms.as_bytes()[2] == b'x'
            && perms.as_bytes()[3] == b'p'
            && line.contains(APP_MARKER)
    })
}

pub fn expected_self_status() -> i32 {
    if has_app_exec_region() { 0 } else { -1 }
}

// 只计数不修改的保护实现
#[derive(Default)]
pub struct CountingSink {
    pub calls: Vec<(usize, usize)>,
}

impl ProtectSink for CountingSink {
    fn protect(&mut self, start: usize, len: usize) -> Result<(), ZygoteProtectErrno> {
        self.calls.push((start, len));
        Ok(())
    }
}

pub fn ensure_status(status: i32, expected: i32, op: &str) {
    assert_eq!(status, expected, "{op} returned unexpected status {status}");
}
