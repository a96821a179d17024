// 内存页面保护属性的修改，以及保护范围的页对齐计算

use crate::errno::Errno;
use crate::log;

// sysconf 无法给出页大小时使用的回退值
pub const DEFAULT_PAGE_SIZE: usize = 4096;

// 代码页被修改后的保护属性：保留读和执行，去掉写
pub const SEALED_CODE_PROT: libc::c_int = libc::PROT_READ | libc::PROT_EXEC;

// "修改内存区间保护属性" 能力对应的系统调用号，由 libc 按目标系统和架构在编译期解析
// aarch64 与 x86_64 的编号不同，不在此处硬编码
const SYS_CHANGE_PROTECTION: libc::c_long = libc::SYS_mprotect;

// 一次保护修改的目标区间
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProtectRange {
    pub start: usize,
    pub len: usize,
}

pub fn page_size() -> Option<usize> {
    let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if value <= 0 {
        return None;
    }
    usize::try_from(value).ok()
}

pub fn page_size_or_default() -> usize {
    page_size().unwrap_or_else(|| {
        log::warn(format_args!(
            "page size unavailable, fall back to {DEFAULT_PAGE_SIZE}"
        ));
        DEFAULT_PAGE_SIZE
    })
}

// 起始地址向下对齐到页边界；长度沿用未对齐的起始地址计算（end - start），
// 因此起始地址不对齐时末页覆盖可能少于 page_size 字节，保持原有行为不做修正
pub fn aligned_range(start: usize, end: usize, page_size: usize) -> Result<ProtectRange, Errno> {
    if page_size == 0 || start >= end {
        return Err(Errno::InvalidArg);
    }
    Ok(ProtectRange {
        start: start - start % page_size,
        len: end - start,
    })
}

// 对 [start, start+len) 发起保护修改系统调用，失败时返回 OS errno
pub fn change_protection(start: usize, len: usize) -> Result<(), i32> {
    let result = unsafe {
        libc::syscall(
            SYS_CHANGE_PROTECTION,
            start as *mut libc::c_void,
            len as libc::size_t,
            SEALED_CODE_PROT,
        )
    };
    if result != 0 {
        let err = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        return Err(err);
    }
    Ok(())
}
