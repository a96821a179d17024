use crate::errno::Errno;
use crate::log;
use crate::runtime::{self, MapsSource, ProtectSink};
use crate::version;

pub use crate::runtime::{ProtectReport, RunRecord, ScanMode};

pub fn get_version() -> String {
    version::version_str_full()
}

// 启用后输出每个区域的处理细节
pub fn set_debug(debug: bool) {
    log::set_debug_enabled(debug);
}

pub fn get_debug() -> bool {
    log::debug_enabled()
}

// 对当前进程执行一次自保护，返回 0 表示完成（单个区域失败不计入），-1 表示未执行任何修改
pub fn mprotect_self() -> i32 {
    match mprotect_self_with(ScanMode::Reopen) {
        Ok(_) => Errno::Ok.status(),
        Err(errno) => errno.status(),
    }
}

// 指定扫描模式执行自保护，返回本次选择阶段的统计
pub fn mprotect_self_with(mode: ScanMode) -> Result<ProtectReport, Errno> {
    runtime::run_self(mode)
}

// 使用调用方提供的 maps 数据源和保护修改实现执行同样的流程，不影响进程级记录
pub fn protect_regions<S, P>(
    source: &S,
    sink: &mut P,
    mode: ScanMode,
    page_size: usize,
) -> Result<ProtectReport, Errno>
where
    S: MapsSource + ?Sized,
    P: ProtectSink + ?Sized,
{
    runtime::run_with(source, sink, mode, page_size)
}

// 最近一次 mprotect_self / mprotect_self_with 的结果
pub fn last_report() -> Option<RunRecord> {
    runtime::last_run()
}

pub fn invocation_count() -> u64 {
    runtime::invocation_count()
}

// 供 JNI 注册层直接绑定的无参入口
#[unsafe(no_mangle)]
pub extern "C" fn zygote_protect_native_mprotect() -> i32 {
    mprotect_self()
}
