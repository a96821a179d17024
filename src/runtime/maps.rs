// /proc/self/maps 的打开、有界逐行读取与单行解析
use crate::errno::Errno;
use crate::log;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};


pub(crate) const MAPS_PATH: &str = "/proc/self/maps";
// 单行上限：PATH_MAX 加上区间、权限、偏移、设备号、inode 等字段仍有余量
pub(crate) const MAX_LINE_LEN: usize = 4096;
const DELETED_SUFFIX: &str = " (deleted)";

// 行首：start-end 十六进制区间 + 权限字段，剩余部分交给路径解析
static MAPS_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9A-Fa-f]+)-([0-9A-Fa-f]+)\s+(\S+)(.*)$").expect("maps head pattern")
});

// maps 数据源，每次 open 都从头开始读取
pub trait MapsSource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>, Errno>;
}

// 当前进程自身的 /proc/self/maps
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcSelfMaps;

impl MapsSource for ProcSelfMaps {
    fn open(&self) -> Result<Box<dyn BufRead + '_>, Errno> {
        let file = File::open(MAPS_PATH).map_err(|err| {
            log::error(format_args!("open {MAPS_PATH} failed: {err}"));
            Errno::SourceUnavailable
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

// 权限字段 rwxp / r-xs 等
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Perms {
    pub(crate) read: bool,
    pub(crate) write: bool,
    pub(crate) exec: bool,
    pub(crate) private: bool,
}

impl Perms {
    fn parse(field: &str) -> Option<Self> {
        let bytes = field.as_bytes();
        if bytes.len() < 4 {
            return None;
        }
        let read = flag(bytes[0], b'r')?;
        let write = flag(bytes[1], b'w')?;
        let exec = flag(bytes[2], b'x')?;
        let private = match bytes[3] {
            b'p' => true,
            b's' => false,
            _ => return None,
        };
        Some(Self {
            read,
            write,
            exec,
            private,
        })
    }

    // 对应 maps 中的 "-xp"：私有、可执行且不可写
    pub(crate) fn is_private_exec(&self) -> bool {
        self.exec && self.private && !self.write
    }
}

fn flag(byte: u8, set: u8) -> Option<bool> {
    match byte {
        value if value == set => Some(true),
        b'-' => Some(false),
        _ => None,
    }
}

// 单行 maps 记录，仅在一次扫描内存活
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MemoryRegion {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) perms: Perms,
    pub(crate) path: String,
}

impl MemoryRegion {
    pub(crate) fn base_name(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map_or(self.path.as_str(), |(_, name)| name)
    }
}

// 读取到的一行原始文本；超过上限时截断并标记
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MapsLine {
    pub(crate) text: String,
    pub(crate) truncated: bool,
}

// 有界逐行迭代器，单行最多保留 max_len 字节，超出部分丢弃到下一个换行符
// 读取出错时结束本轮扫描，不把错误当作致命失败
pub(crate) struct MapsLines<R> {
    reader: R,
    buf: Vec<u8>,
    max_len: usize,
    done: bool,
}

impl<R: BufRead> MapsLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self::with_max_len(reader, MAX_LINE_LEN)
    }

    pub(crate) fn with_max_len(reader: R, max_len: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            max_len,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for MapsLines<R> {
    type Item = MapsLine;

    fn next(&mut self) -> Option<MapsLine> {
        if self.done {
            return None;
        }
        self.buf.clear();
        let mut truncated = false;
        let mut got_any = false;

        loop {
            let chunk = match self.reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::warn(format_args!("read maps failed, stop scanning: {err}"));
                    // 已读到半行时该行不完整，按截断处理
                    if got_any {
                        truncated = true;
                    }
                    self.done = true;
                    break;
                }
            };
            if chunk.is_empty() {
                self.done = true;
                break;
            }
            got_any = true;

            let (consumed, found_newline) = match chunk.iter().position(|byte| *byte == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (chunk.len(), false),
            };
            let content = if found_newline {
                &chunk[..consumed - 1]
            } else {
                chunk
            };
            let room = self.max_len.saturating_sub(self.buf.len());
            if content.len() > room {
                truncated = true;
            }
            self.buf.extend_from_slice(&content[..content.len().min(room)]);
            self.reader.consume(consumed);
            if found_newline {
                break;
            }
        }

        if !got_any {
            return None;
        }
        let mut text = String::from_utf8_lossy(&self.buf).into_owned();
        if text.ends_with('\r') {
            text.pop();
        }
        Some(MapsLine { text, truncated })
    }
}

// 打开数据源并返回惰性行序列；迭代器被丢弃时底层文件随之关闭
pub(crate) fn open_lines<'a, S: MapsSource + ?Sized>(
    source: &'a S,
) -> Result<MapsLines<Box<dyn BufRead + 'a>>, Errno> {
    Ok(MapsLines::new(source.open()?))
}

// 解析读取到的一行；被截断的行路径不可信，按格式错误处理
pub(crate) fn parse_record(line: &MapsLine) -> Result<MemoryRegion, Errno> {
    if line.truncated {
        log::debug(format_args!(
            "skip truncated maps line: {}",
            line.text.get(..64).unwrap_or(line.text.as_str())
        ));
        return Err(Errno::MalformedLine);
    }
    parse_maps_line(&line.text)
}

// 格式：<hex-start>-<hex-end> <perms> [offset dev inode] [path]
pub(crate) fn parse_maps_line(line: &str) -> Result<MemoryRegion, Errno> {
    let caps = MAPS_HEAD.captures(line).ok_or(Errno::MalformedLine)?;
    let start = usize::from_str_radix(&caps[1], 16).map_err(|_| Errno::MalformedLine)?;
    let end = usize::from_str_radix(&caps[2], 16).map_err(|_| Errno::MalformedLine)?;
    if start >= end {
        return Err(Errno::MalformedLine);
    }
    let perms = Perms::parse(&caps[3]).ok_or(Errno::MalformedLine)?;
    let rest = caps.get(4).map_or("", |value| value.as_str());
    Ok(MemoryRegion {
        start,
        end,
        perms,
        path: parse_backing_path(rest).to_string(),
    })
}

// 路径从第一个以 '/' 或 '[' 开头的字段开始，直到行尾（路径中可能含空格）
fn parse_backing_path(rest: &str) -> &str {
    let mut cursor = rest.trim();
    loop {
        if cursor.is_empty() {
            return "";
        }
        if cursor.starts_with('/') || cursor.starts_with('[') {
            break;
        }
        match cursor.find(char::is_whitespace) {
            Some(pos) => cursor = cursor[pos..].trim_start(),
            None => return "",
        }
    }
    cursor.strip_suffix(DELETED_SUFFIX).unwrap_or(cursor).trim_end()
}
