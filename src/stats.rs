//! 전송 통계

use std::ops::Range;
use std::time::{Duration, Instant};

/// 진행 중인 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 원본 파일 크기
    pub file_size: u64,

    /// 지금까지 읽은 바이트
    pub bytes_read: u64,

    /// 전송된 프레임 수
    pub frames_sent: u64,

    /// 전송된 와이어 바이트 (프레임 오버헤드 포함)
    pub wire_bytes: u64,

    /// 수신한 응답 수
    pub acks_received: u64,

    /// 프레임 생성 실패로 건너뛴 구간
    pub skipped: Vec<Range<u64>>,

    /// 읽은 데이터의 CRC32 (누적)
    crc32: u32,
}

impl TransferStats {
    pub fn new(file_size: u64) -> Self {
        Self {
            start_time: Instant::now(),
            file_size,
            bytes_read: 0,
            frames_sent: 0,
            wire_bytes: 0,
            acks_received: 0,
            skipped: Vec::new(),
            crc32: 0,
        }
    }

    /// 윈도우 읽기 기록
    pub fn record_read(&mut self, data: &[u8]) {
        self.bytes_read += data.len() as u64;

        let mut hasher = crc32fast::Hasher::new_with_initial(self.crc32);
        hasher.update(data);
        self.crc32 = hasher.finalize();
    }

    /// 프레임 전송 기록
    pub fn record_sent(&mut self, wire_len: usize) {
        self.frames_sent += 1;
        self.wire_bytes += wire_len as u64;
    }

    pub fn record_ack(&mut self) {
        self.acks_received += 1;
    }

    /// 건너뛴 구간 기록
    pub fn record_skipped(&mut self, offset: u64, len: usize) {
        self.skipped.push(offset..offset + len as u64);
    }

    pub fn frames_skipped(&self) -> u64 {
        self.skipped.len() as u64
    }

    /// 건너뛴 총 바이트
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped.iter().map(|r| r.end - r.start).sum()
    }

    /// 진행률 (%), 참고용
    pub fn progress_percent(&self) -> f64 {
        if self.file_size == 0 {
            return 100.0;
        }
        (self.bytes_read as f64 / self.file_size as f64 * 100.0).min(100.0)
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.bytes_read as f64 / elapsed
    }

    /// 최종 보고서
    pub fn finish(self, filename: impl Into<String>) -> TransferReport {
        TransferReport {
            filename: filename.into(),
            elapsed: self.elapsed(),
            file_size: self.file_size,
            bytes_read: self.bytes_read,
            frames_sent: self.frames_sent,
            wire_bytes: self.wire_bytes,
            acks_received: self.acks_received,
            crc32: self.crc32,
            skipped: self.skipped,
        }
    }
}

/// 전송 완료 보고서
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// 프린터측 파일 이름
    pub filename: String,
    pub elapsed: Duration,
    pub file_size: u64,
    pub bytes_read: u64,
    pub frames_sent: u64,
    pub wire_bytes: u64,
    pub acks_received: u64,
    pub crc32: u32,
    pub skipped: Vec<Range<u64>>,
}

impl TransferReport {
    /// 누락 구간 없이 전송되었는지
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.bytes_read == self.file_size
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "File: {} | Bytes: {}/{} | Frames: {} sent, {} skipped | CRC32: {:08X} | Elapsed: {:.2}s",
            self.filename,
            self.bytes_read,
            self.file_size,
            self.frames_sent,
            self.skipped.len(),
            self.crc32,
            self.elapsed.as_secs_f64(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut stats = TransferStats::new(2600);
        let mut last = stats.progress_percent();
        assert_eq!(last, 0.0);

        for len in [1280usize, 1280, 40] {
            stats.record_read(&vec![0u8; len]);
            let now = stats.progress_percent();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_empty_file_progress() {
        assert_eq!(TransferStats::new(0).progress_percent(), 100.0);
    }

    #[test]
    fn test_report_tracks_skipped_ranges() {
        let mut stats = TransferStats::new(2600);
        stats.record_read(&[1u8; 1280]);
        stats.record_sent(1286);
        stats.record_read(&[2u8; 1280]);
        stats.record_skipped(1280, 1280);
        stats.record_read(&[3u8; 40]);
        stats.record_sent(46);

        assert_eq!(stats.frames_skipped(), 1);
        assert_eq!(stats.skipped_bytes(), 1280);

        let report = stats.finish("part.gcode");
        assert!(!report.is_complete());
        assert_eq!(report.skipped, vec![1280..2560]);
        assert_eq!(report.wire_bytes, 1286 + 46);
        assert!(report.summary().contains("part.gcode"));
    }

    #[test]
    fn test_crc_matches_source() {
        let data = b"G28\nG1 Z0.2 F1200\n";
        let mut stats = TransferStats::new(data.len() as u64);
        stats.record_read(&data[..5]);
        stats.record_read(&data[5..]);

        let report = stats.finish("a.gcode");
        assert_eq!(report.crc32, crc32fast::hash(data));
        assert!(report.is_complete());
    }
}
