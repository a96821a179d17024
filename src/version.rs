const VERSION_STR: &str = env!("CARGO_PKG_VERSION");

#[cfg(target_arch = "aarch64")]
const VERSION_ARCH: &str = "aarch64";
#[cfg(target_arch = "x86_64")]
const VERSION_ARCH: &str = "x86_64";
#[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
const VERSION_ARCH: &str = "unknown";

#[cfg(target_os = "android")]
const VERSION_OS: &str = "android";
#[cfg(not(target_os = "android"))]
const VERSION_OS: &str = "linux";

pub fn version_str() -> &'static str {
    VERSION_STR
}

// 返回包含库名、系统和架构的完整版本字符串
pub fn version_str_full() -> String {
    format!("zygote_protect {} ({}-{})", version_str(), VERSION_OS, VERSION_ARCH)
}
