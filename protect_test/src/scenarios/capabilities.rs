use std::io::{BufRead, Cursor};

use zygote_protect::{MapsSource, ScanMode, ZygoteProtectErrno, protect_regions};

use crate::test_ctx::{CountingSink, page_size, read_self_maps};

const SYNTHETIC_APP_LINE: &str =
    "00400000-00401000 r-xp 00000000 00:00 0 /data/app/protect.test/lib/arm64/libprotect_test.so";

// 真实 maps 内容加一行合成的应用库，保证探测阶段通过
struct SelfMapsWithApp {
    content: String,
}

impl SelfMapsWithApp {
    fn new(with_app: bool) -> Self {
        let mut content = read_self_maps();
        if with_app {
            content.push_str(SYNTHETIC_APP_LINE);
            content.push('\n');
        }
        Self { content }
    }
}

impl MapsSource for SelfMapsWithApp {
    fn open(&self) -> Result<Box<dyn BufRead + '_>, ZygoteProtectErrno> {
        Ok(Box::new(Cursor::new(self.content.as_bytes())))
    }
}

pub fn scenario_real_maps_counting_sink() {
    let page = page_size();
    let source = SelfMapsWithApp::new(true);
    for mode in [ScanMode::Reopen, ScanMode::Snapshot] {
        let mut sink = CountingSink::default();
        let report = protect_regions(&source, &mut sink, mode, page).expect("probe should pass");
        assert!(report.scanned >= source.content.lines().count());
        assert_eq!(report.malformed, 0, "real maps lines should all parse");
        assert_eq!(report.selected, sink.calls.len());
        assert!(sink.calls.contains(&(0x400000, 0x1000)));
        for (start, len) in &sink.calls {
            assert_eq!(start % page, 0, "unaligned start 0x{start:x}");
            assert!(*len > 0);
        }
    }
}

pub fn scenario_real_maps_probe_miss() {
    let source = SelfMapsWithApp::new(false);
    if source.content.contains("/data/app") {
        return;
    }
    let mut sink = CountingSink::default();
    let result = protect_regions(&source, &mut sink, ScanMode::Reopen, page_size());
    assert_eq!(result, Err(ZygoteProtectErrno::NoQualifyingRegion));
    assert!(sink.calls.is_empty());
}
