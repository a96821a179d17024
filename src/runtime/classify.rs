// 区域分类策略：应用包探测、系统库白名单、应用原生代码筛选
use once_cell::sync::Lazy;
use std::collections::BTreeSet;

use super::maps::MemoryRegion;

// 系统库目录标记，任一命中即视为平台提供的原生库
pub(crate) const SYSTEM_LIB_MARKERS: &[&str] = &["/system/lib64/", "/system/lib/"];
// 应用安装包目录标记
pub(crate) const APP_PACKAGE_MARKER: &str = "/data/app";
// 应用路径中出现该子串时不做修改
pub(crate) const APP_SYSTEM_EXCLUSION: &str = "system";

// 进程运行必需的平台库，即使位于系统库目录也不修改
pub(crate) const ALLOWLIST_NAMES: &[&str] = &[
    "libandroid.so",
    "libc.so",
    "libcamera2ndk.so",
    "libdl.so",
    "libGLES.so",
    "libjnigraphics.so",
    "liblog.so",
    "libm.so",
    "libmediandk.so",
    "libOpenMAXAL.so",
    "libOpenSLES.so",
    "libstdc++.so",
    "libvulkan.so",
    "libz.so",
    "libc++.so",
    "libGLESv3.so",
    "libwilhelm.so",
    "libGLESv2.so",
    "libGLESv1_CM.so",
    "libsensor.so",
];

static ALLOWLIST: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| ALLOWLIST_NAMES.iter().copied().collect());

// 选中原因
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Selected {
    SystemLibrary,
    AppPackage,
}

// 排除原因，仅用于调试日志和测试
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Excluded {
    NotPrivateExec,
    Allowlisted,
    AppPathMentionsSystem,
    NoMarker,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Verdict {
    Include(Selected),
    Exclude(Excluded),
}

pub(crate) fn is_allowlisted(base_name: &str) -> bool {
    ALLOWLIST.contains(base_name)
}

fn is_system_library_path(path: &str) -> bool {
    SYSTEM_LIB_MARKERS.iter().any(|marker| path.contains(marker))
}

fn is_app_package_path(path: &str) -> bool {
    path.contains(APP_PACKAGE_MARKER)
}

// 探测阶段：是否存在来自应用安装目录的私有可执行映射
pub(crate) fn is_probe_match(region: &MemoryRegion) -> bool {
    region.perms.is_private_exec() && is_app_package_path(&region.path)
}

// 选择阶段：
// (a) 系统库目录下且文件名不在白名单中
// (b) 应用安装目录下且路径不含 "system"
pub(crate) fn classify(region: &MemoryRegion) -> Verdict {
    if !region.perms.is_private_exec() {
        return Verdict::Exclude(Excluded::NotPrivateExec);
    }

    let path = region.path.as_str();
    let system_library = is_system_library_path(path);
    if system_library && !is_allowlisted(region.base_name()) {
        return Verdict::Include(Selected::SystemLibrary);
    }
    if is_app_package_path(path) {
        if path.contains(APP_SYSTEM_EXCLUSION) {
            return Verdict::Exclude(Excluded::AppPathMentionsSystem);
        }
        return Verdict::Include(Selected::AppPackage);
    }
    if system_library {
        return Verdict::Exclude(Excluded::Allowlisted);
    }
    Verdict::Exclude(Excluded::NoMarker)
}
