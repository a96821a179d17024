// 进程级运行状态：调用次数与最近一次自保护结果
use crate::errno::Errno;
use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{ProtectReport, ScanMode};

// Mutex poison 恢复扩展，避免持锁线程 panic 后引发连锁 panic
pub(crate) trait MutexPoisonRecover<T> {
    fn lock_or_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexPoisonRecover<T> for Mutex<T> {
    fn lock_or_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// 一次自保护调用的结果
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunRecord {
    pub ts_ms: u64,
    pub mode: ScanMode,
    pub result: Result<ProtectReport, Errno>,
}

#[derive(Default)]
pub(super) struct RunState {
    pub(super) invocations: u64,
    pub(super) last: Option<RunRecord>,
}

pub(super) static GLOBAL: Lazy<Mutex<RunState>> = Lazy::new(|| Mutex::new(RunState::default()));

#[inline]
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

pub(super) fn record_run(state: &mut RunState, mode: ScanMode, result: Result<ProtectReport, Errno>) {
    state.invocations = state.invocations.saturating_add(1);
    state.last = Some(RunRecord {
        ts_ms: now_ms(),
        mode,
        result,
    });
}
