// 两阶段扫描驱动的单元测试，使用内存中的 maps 表和记录型保护实现
use super::{MapsSource, ProtectReport, ProtectSink, ScanMode, run_with};
use crate::errno::Errno;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::io::{BufRead, Cursor, Read};

const PAGE: usize = 0x1000;

const APP_LIB: &str = "00400000-00401000 r-xp 0 0:0 /data/app/pkg/lib/arm64/libpkg.so";
const GLES_LIB: &str = "7f0000000000-7f0000010000 r-xp 0 0:0 /system/lib64/libGLESv2.so";

// 每次 open 依次返回下一张表（用完后重复最后一张），并统计打开/关闭次数
struct TableSource {
    tables: Vec<String>,
    opens: Cell<usize>,
    closes: Cell<usize>,
}

impl TableSource {
    fn new(table: &[&str]) -> Self {
        Self::with_drift(&[table])
    }

    fn with_drift(tables: &[&[&str]]) -> Self {
        Self {
            tables: tables
                .iter()
                .map(|lines| {
                    let mut text = lines.join("\n");
                    text.push('\n');
                    text
                })
                .collect(),
            opens: Cell::new(0),
            closes: Cell::new(0),
        }
    }
}

struct TrackedReader<'a> {
    inner: Cursor<&'a [u8]>,
    closes: &'a Cell<usize>,
}

impl Read for TrackedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for TrackedReader<'_> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}

impl Drop for TrackedReader<'_> {
    fn drop(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

impl MapsSource for TableSource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>, Errno> {
        let index = self.opens.get().min(self.tables.len() - 1);
        self.opens.set(self.opens.get() + 1);
        Ok(Box::new(TrackedReader {
            inner: Cursor::new(self.tables[index].as_bytes()),
            closes: &self.closes,
        }))
    }
}

struct UnavailableSource;

impl MapsSource for UnavailableSource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>, Errno> {
        Err(Errno::SourceUnavailable)
    }
}

// 记录所有保护修改调用，可指定若干起始地址失败
#[derive(Default)]
struct Recorder {
    calls: Vec<(usize, usize)>,
    fail_starts: BTreeSet<usize>,
}

impl ProtectSink for Recorder {
    fn protect(&mut self, start: usize, len: usize) -> Result<(), Errno> {
        self.calls.push((start, len));
        if self.fail_starts.contains(&start) {
            return Err(Errno::MutationFailed);
        }
        Ok(())
    }
}

fn status(result: Result<ProtectReport, Errno>) -> i32 {
    match result {
        Ok(_) => Errno::Ok.status(),
        Err(errno) => errno.status(),
    }
}

fn run(source: &TableSource, mode: ScanMode) -> (Result<ProtectReport, Errno>, Vec<(usize, usize)>) {
    let mut recorder = Recorder::default();
    let result = run_with(source, &mut recorder, mode, PAGE);
    (result, recorder.calls)
}

#[test]
fn end_to_end_app_lib_protected_and_gles_spared() {
    for mode in [ScanMode::Reopen, ScanMode::Snapshot] {
        let source = TableSource::new(&[APP_LIB, GLES_LIB]);
        let (result, calls) = run(&source, mode);
        assert_eq!(status(result), 0);
        assert_eq!(calls, vec![(0x400000, 0x1000)]);
        let report = result.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.selected, 1);
        assert_eq!(report.protected, 1);
        assert_eq!(report.failed, 0);
    }
}

#[test]
fn no_app_region_returns_minus_one_without_mutation() {
    let table = [
        "7f0000000000-7f0000010000 r-xp 0 0:0 /system/lib64/libfoo.so",
        "00400000-00401000 r--p 0 0:0 /data/app/pkg/base.apk",
        "00500000-00501000 r-xs 0 0:0 /data/app/pkg/lib/libshared.so",
    ];
    for mode in [ScanMode::Reopen, ScanMode::Snapshot] {
        let source = TableSource::new(&table);
        let (result, calls) = run(&source, mode);
        assert_eq!(result, Err(Errno::NoQualifyingRegion));
        assert_eq!(status(result), -1);
        assert!(calls.is_empty());
        assert_eq!(source.opens.get(), 1);
    }
}

#[test]
fn allowlisted_system_lib_excluded_other_included() {
    let table = [
        APP_LIB,
        "7f0000000000-7f0000010000 r-xp 0 0:0 /system/lib64/libc.so",
        "7f0000100000-7f0000110000 r-xp 0 0:0 /system/lib64/libfoo.so",
    ];
    let source = TableSource::new(&table);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(status(result), 0);
    assert_eq!(calls, vec![(0x400000, 0x1000), (0x7f0000100000, 0x10000)]);
}

#[test]
fn app_path_mentioning_system_is_excluded() {
    let table = [
        APP_LIB,
        "00600000-00602000 r-xp 0 0:0 /data/app/com.android.systemui/lib/arm64/libui.so",
    ];
    let source = TableSource::new(&table);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(status(result), 0);
    assert_eq!(calls, vec![(0x400000, 0x1000)]);
}

#[test]
fn system_app_alone_still_passes_probe() {
    // 探测只看应用目录标记，不做 "system" 排除
    let table = ["00600000-00602000 r-xp 0 0:0 /data/app/com.android.systemui/lib/libui.so"];
    let source = TableSource::new(&table);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(result.map(|report| report.selected), Ok(0));
    assert!(calls.is_empty());
}

#[test]
fn malformed_lines_do_not_abort_the_pass() {
    let table = [
        "not a maps line",
        "zzzz-1000 r-xp 0 0:0 /data/app/pkg/lib/libbad.so",
        "",
        "00800000",
        APP_LIB,
        "2000-1000 r-xp 0 0:0 /system/lib64/libbackwards.so",
        "7f0000100000-7f0000110000 r-xp 0 0:0 /system/lib64/libfoo.so",
    ];
    let source = TableSource::new(&table);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(status(result), 0);
    assert_eq!(calls, vec![(0x400000, 0x1000), (0x7f0000100000, 0x10000)]);
    let report = result.unwrap();
    assert_eq!(report.scanned, 7);
    assert_eq!(report.malformed, 5);
}

#[test]
fn per_region_failure_is_ignored() {
    let table = [
        APP_LIB,
        "7f0000100000-7f0000110000 r-xp 0 0:0 /system/lib64/libfoo.so",
        "7f0000200000-7f0000210000 r-xp 0 0:0 /system/lib64/libbar.so",
    ];
    let source = TableSource::new(&table);
    let mut recorder = Recorder {
        fail_starts: BTreeSet::from([0x400000, 0x7f0000100000]),
        ..Recorder::default()
    };
    let result = run_with(&source, &mut recorder, ScanMode::Reopen, PAGE);
    assert_eq!(status(result), 0);
    let report = result.unwrap();
    assert_eq!(report.selected, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.protected, 1);
    // 失败不重试
    assert_eq!(recorder.calls.len(), 3);
}

#[test]
fn unaligned_start_rounds_down_keeps_length() {
    let table = ["00400123-00402000 r-xp 0 0:0 /data/app/pkg/lib/libpkg.so"];
    let source = TableSource::new(&table);
    let (_, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(calls, vec![(0x400000, 0x402000 - 0x400123)]);
}

#[test]
fn repeated_invocation_is_idempotent() {
    let source = TableSource::new(&[APP_LIB, GLES_LIB]);
    let mut recorder = Recorder::default();
    let first = run_with(&source, &mut recorder, ScanMode::Reopen, PAGE);
    let second = run_with(&source, &mut recorder, ScanMode::Reopen, PAGE);
    assert_eq!(first, second);
    assert_eq!(status(second), 0);
    assert_eq!(
        recorder.calls,
        vec![(0x400000, 0x1000), (0x400000, 0x1000)]
    );
    assert_eq!(source.opens.get(), 4);
}

#[test]
fn reopen_reads_twice_snapshot_reads_once() {
    let reopen = TableSource::new(&[APP_LIB]);
    let _ = run(&reopen, ScanMode::Reopen);
    assert_eq!(reopen.opens.get(), 2);

    let snapshot = TableSource::new(&[APP_LIB]);
    let _ = run(&snapshot, ScanMode::Snapshot);
    assert_eq!(snapshot.opens.get(), 1);
}

#[test]
fn reopen_selection_sees_table_drift() {
    let late_lib = "7f0000300000-7f0000310000 r-xp 0 0:0 /system/lib64/liblate.so";
    let first: &[&str] = &[APP_LIB];
    let second: &[&str] = &[late_lib];

    // 探测后应用库被卸载、新系统库被加载：Reopen 只处理第二张表
    let source = TableSource::with_drift(&[first, second]);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(status(result), 0);
    assert_eq!(calls, vec![(0x7f0000300000, 0x10000)]);

    // Snapshot 始终基于第一次读取的内容
    let source = TableSource::with_drift(&[first, second]);
    let (result, calls) = run(&source, ScanMode::Snapshot);
    assert_eq!(status(result), 0);
    assert_eq!(calls, vec![(0x400000, 0x1000)]);
}

#[test]
fn probe_gate_uses_first_read_only() {
    let first: &[&str] = &[GLES_LIB];
    let second: &[&str] = &[APP_LIB];
    for mode in [ScanMode::Reopen, ScanMode::Snapshot] {
        let source = TableSource::with_drift(&[first, second]);
        let (result, calls) = run(&source, mode);
        assert_eq!(result, Err(Errno::NoQualifyingRegion));
        assert!(calls.is_empty());
    }
}

#[test]
fn every_opened_stream_is_closed() {
    let hit = TableSource::new(&[APP_LIB, GLES_LIB]);
    let _ = run(&hit, ScanMode::Reopen);
    assert_eq!(hit.opens.get(), 2);
    assert_eq!(hit.closes.get(), 2);

    let miss = TableSource::new(&[GLES_LIB]);
    let _ = run(&miss, ScanMode::Reopen);
    assert_eq!(miss.opens.get(), 1);
    assert_eq!(miss.closes.get(), 1);

    let snapshot = TableSource::new(&[APP_LIB]);
    let _ = run(&snapshot, ScanMode::Snapshot);
    assert_eq!(snapshot.closes.get(), 1);
}

#[test]
fn unavailable_source_reports_minus_one() {
    let mut recorder = Recorder::default();
    for mode in [ScanMode::Reopen, ScanMode::Snapshot] {
        let result = run_with(&UnavailableSource, &mut recorder, mode, PAGE);
        assert_eq!(result, Err(Errno::SourceUnavailable));
        assert_eq!(status(result), -1);
    }
    assert!(recorder.calls.is_empty());
}

#[test]
fn zero_page_size_is_rejected_before_reading() {
    let source = TableSource::new(&[APP_LIB]);
    let mut recorder = Recorder::default();
    let result = run_with(&source, &mut recorder, ScanMode::Reopen, 0);
    assert_eq!(result, Err(Errno::InvalidArg));
    assert_eq!(source.opens.get(), 0);
}

#[test]
fn overlong_line_is_skipped_without_corrupting_neighbours() {
    let long_path = format!(
        "7f0000100000-7f0000110000 r-xp 0 0:0 /system/lib64/{}libc.so",
        "x".repeat(super::maps::MAX_LINE_LEN)
    );
    let table = [APP_LIB, long_path.as_str(), GLES_LIB];
    let source = TableSource::new(&table);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(calls, vec![(0x400000, 0x1000)]);
    let report = result.unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.malformed, 1);
}

#[test]
fn writable_exec_regions_are_never_mutated() {
    let table = [
        APP_LIB,
        "00500000-00501000 rwxp 0 0:0 /data/app/pkg/lib/arm64/libjit.so",
        "7f0000100000-7f0000110000 rwxp 0 0:0 /system/lib64/libfoo.so",
    ];
    let source = TableSource::new(&table);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(calls, vec![(0x400000, 0x1000)]);
    assert_eq!(result.map(|report| report.selected), Ok(1));

    // 仅有可写可执行的应用映射时探测不通过
    let source = TableSource::new(&["00500000-00501000 rwxp 0 0:0 /data/app/pkg/lib/arm64/libjit.so"]);
    let (result, calls) = run(&source, ScanMode::Reopen);
    assert_eq!(result, Err(Errno::NoQualifyingRegion));
    assert!(calls.is_empty());
}
