// runtime 模块入口：探测 + 选择两阶段扫描驱动，以及进程级结果记录
use crate::android::memory;
use crate::errno::Errno;
use crate::log;
use std::borrow::Borrow;

mod classify;
mod maps;
mod mutate;
mod state;

#[cfg(test)]
mod tests;

pub use maps::{MapsSource, ProcSelfMaps};
pub use mutate::{ProtectSink, SyscallProtect};
pub use state::RunRecord;

use classify::{Excluded, Verdict};
use maps::MapsLine;
use state::{GLOBAL, MutexPoisonRecover};

// Reopen：探测与选择各自重新打开 maps，选择阶段能看到探测之后新出现的映射
// Snapshot：只读取一次，两个阶段基于同一份快照
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScanMode {
    #[default]
    Reopen,
    Snapshot,
}

// 一次选择阶段的统计
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProtectReport {
    pub scanned: usize,
    pub malformed: usize,
    pub selected: usize,
    pub protected: usize,
    pub failed: usize,
}

// 显式传入的能力集合：maps 数据源 + 保护修改实现
pub(crate) struct ProtectContext<'a, S: ?Sized, P: ?Sized> {
    source: &'a S,
    sink: &'a mut P,
    page_size: usize,
    mode: ScanMode,
}

impl<'a, S, P> ProtectContext<'a, S, P>
where
    S: MapsSource + ?Sized,
    P: ProtectSink + ?Sized,
{
    pub(crate) fn new(
        source: &'a S,
        sink: &'a mut P,
        page_size: usize,
        mode: ScanMode,
    ) -> Result<Self, Errno> {
        if page_size == 0 {
            return Err(Errno::InvalidArg);
        }
        Ok(Self {
            source,
            sink,
            page_size,
            mode,
        })
    }

    pub(crate) fn run(&mut self) -> Result<ProtectReport, Errno> {
        match self.mode {
            ScanMode::Reopen => self.run_reopen(),
            ScanMode::Snapshot => self.run_snapshot(),
        }
    }

    // 每个阶段打开的行迭代器在阶段结束（包括探测提前返回）时被丢弃，文件随之关闭
    fn run_reopen(&mut self) -> Result<ProtectReport, Errno> {
        if !probe(maps::open_lines(self.source)?) {
            log::info(format_args!("no private executable app region, skip"));
            return Err(Errno::NoQualifyingRegion);
        }
        let lines = maps::open_lines(self.source)?;
        Ok(self.select_and_protect(lines))
    }

    fn run_snapshot(&mut self) -> Result<ProtectReport, Errno> {
        let lines: Vec<MapsLine> = maps::open_lines(self.source)?.collect();
        if !probe(&lines) {
            log::info(format_args!("no private executable app region, skip"));
            return Err(Errno::NoQualifyingRegion);
        }
        Ok(self.select_and_protect(&lines))
    }

    fn select_and_protect<I>(&mut self, lines: I) -> ProtectReport
    where
        I: IntoIterator,
        I::Item: Borrow<MapsLine>,
    {
        let mut report = ProtectReport::default();
        for line in lines {
            report.scanned += 1;
            let Ok(region) = maps::parse_record(line.borrow()) else {
                report.malformed += 1;
                continue;
            };

            match classify::classify(&region) {
                Verdict::Include(reason) => {
                    report.selected += 1;
                    match mutate::protect_region(&mut *self.sink, &region, self.page_size) {
                        Ok(range) => {
                            report.protected += 1;
                            log::debug(format_args!(
                                "protect {:?} start=0x{:x} len=0x{:x} path={}",
                                reason, range.start, range.len, region.path
                            ));
                        }
                        Err(_) => report.failed += 1,
                    }
                }
                Verdict::Exclude(Excluded::Allowlisted) => {
                    log::debug(format_args!("skip allowlisted path={}", region.path));
                }
                Verdict::Exclude(Excluded::AppPathMentionsSystem) => {
                    log::debug(format_args!("skip system app path={}", region.path));
                }
                Verdict::Exclude(_) => {}
            }
        }
        report
    }
}

// 探测阶段：找到第一个匹配即停止读取
fn probe<I>(lines: I) -> bool
where
    I: IntoIterator,
    I::Item: Borrow<MapsLine>,
{
    lines.into_iter().any(|line| {
        maps::parse_record(line.borrow()).is_ok_and(|region| classify::is_probe_match(&region))
    })
}

// 使用调用方提供的能力执行一次完整的探测 + 选择流程
pub(crate) fn run_with<S, P>(
    source: &S,
    sink: &mut P,
    mode: ScanMode,
    page_size: usize,
) -> Result<ProtectReport, Errno>
where
    S: MapsSource + ?Sized,
    P: ProtectSink + ?Sized,
{
    let result = ProtectContext::new(source, sink, page_size, mode)?.run();
    if let Ok(report) = &result {
        log::info(format_args!(
            "protect pass done mode={:?} scanned={} malformed={} selected={} protected={} failed={}",
            mode, report.scanned, report.malformed, report.selected, report.protected, report.failed
        ));
    }
    result
}

// 对当前进程自身执行，并记录到进程级状态
pub(crate) fn run_self(mode: ScanMode) -> Result<ProtectReport, Errno> {
    let page_size = memory::page_size_or_default();
    let mut sink = SyscallProtect;
    let result = run_with(&ProcSelfMaps, &mut sink, mode, page_size);
    state::record_run(&mut GLOBAL.lock_or_poison(), mode, result);
    result
}

pub(crate) fn last_run() -> Option<RunRecord> {
    GLOBAL.lock_or_poison().last
}

pub(crate) fn invocation_count() -> u64 {
    GLOBAL.lock_or_poison().invocations
}
