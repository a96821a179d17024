// 选中区域的保护修改：页对齐后逐个调用保护修改能力，单个失败不影响后续区域
use crate::android::memory::{self, ProtectRange};
use crate::errno::Errno;
use crate::log;

use super::maps::MemoryRegion;

// "修改内存区间保护属性" 能力，生产实现直接发起系统调用，测试中替换为记录器
pub trait ProtectSink {
    fn protect(&mut self, start: usize, len: usize) -> Result<(), Errno>;
}

// 对当前进程地址空间生效的系统调用实现
#[derive(Clone, Copy, Debug, Default)]
pub struct SyscallProtect;

impl ProtectSink for SyscallProtect {
    fn protect(&mut self, start: usize, len: usize) -> Result<(), Errno> {
        memory::change_protection(start, len).map_err(|err| {
            log::debug(format_args!(
                "change protection failed start=0x{start:x} len=0x{len:x} errno={err}"
            ));
            Errno::MutationFailed
        })
    }
}

// 计算区域的对齐区间并发起修改；返回值只用于统计，调用方不重试
pub(super) fn protect_region<P: ProtectSink + ?Sized>(
    sink: &mut P,
    region: &MemoryRegion,
    page_size: usize,
) -> Result<ProtectRange, Errno> {
    let range = memory::aligned_range(region.start, region.end, page_size)?;
    sink.protect(range.start, range.len)?;
    Ok(range)
}
