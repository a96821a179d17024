// 自保护操作错误码，0 表示成功
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Errno {
    Ok = 0,                 // 成功
    NoQualifyingRegion = 1, // 探测阶段未找到应用私有可执行映射
    SourceUnavailable = 2,  // /proc/self/maps 无法打开
    MalformedLine = 3,      // maps 行无法解析（仅在行级别使用）
    MutationFailed = 4,     // 单个区域保护修改失败（仅在区域级别使用）
    InvalidArg = 5,         // 参数无效
    Unknown = 1001,         // 未知错误
}

impl Errno {
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    // 对外的粗粒度状态码：成功为 0，其余一律为 -1
    pub const fn status(self) -> i32 {
        if self.is_ok() { 0 } else { -1 }
    }
}

impl From<Errno> for i32 {
    fn from(value: Errno) -> Self {
        value as i32
    }
}

#[cfg(test)]
mod tests {
    use super::Errno;

    #[test]
    fn status_collapses_failures() {
        assert_eq!(Errno::Ok.status(), 0);
        assert_eq!(Errno::NoQualifyingRegion.status(), -1);
        assert_eq!(Errno::SourceUnavailable.status(), -1);
        assert_eq!(Errno::InvalidArg.status(), -1);
    }

    #[test]
    fn detailed_code_is_discriminant() {
        assert_eq!(i32::from(Errno::SourceUnavailable), 2);
        assert_eq!(Errno::Unknown.as_i32(), 1001);
        assert!(Errno::Ok.is_ok());
        assert!(!Errno::MutationFailed.is_ok());
    }
}
