#![allow(dead_code)]
#![allow(clippy::missing_safety_doc)]

#[cfg(not(any(target_os = "android", target_os = "linux")))]
compile_error!("zygote_protect supports Android (and Linux hosts for development) only");

#[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
compile_error!("zygote_protect supports only 64-bit architectures: aarch64 and x86_64");

// 公共 API 层，提供自保护入口、报告查询与调试开关
mod api;
// 错误码定义
mod errno;
// 日志输出，Android 使用 logcat，Linux 主机输出到 stderr
mod log;
// Android 相关：页大小与内存保护系统调用
mod android;
// 运行时：maps 读取、区域分类、保护修改与全局报告
mod runtime;
// 版本信息
mod version;

pub use api::{
    ProtectReport, RunRecord, ScanMode, get_debug, get_version, invocation_count, last_report,
    mprotect_self, mprotect_self_with, protect_regions, set_debug,
    zygote_protect_native_mprotect,
};
pub use errno::Errno as ZygoteProtectErrno;
pub use runtime::{MapsSource, ProcSelfMaps, ProtectSink, SyscallProtect};
