// Android 平台相关功能的模块入口

// 内存保护操作：页大小查询、页对齐与保护修改系统调用
pub mod memory;
