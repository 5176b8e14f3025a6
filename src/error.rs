//! 에러 타입 정의

use thiserror::Error;

/// FC3D 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 길이 0인 청크로 프레임 생성 시도
    #[error("유효하지 않은 청크: 길이 {len}")]
    InvalidChunk { len: usize },

    /// 오프셋이 32비트 범위를 벗어남 (4GiB 초과 파일)
    #[error("오프셋 범위 초과: {offset} > u32::MAX")]
    OffsetOutOfRange { offset: u64 },

    #[error("잘못된 프레임: {0}")]
    MalformedFrame(String),

    #[error("체크섬 불일치: expected {expected:02X}, got {got:02X}")]
    ChecksumMismatch { expected: u8, got: u8 },

    #[error("유효하지 않은 종결 바이트: expected 83, got {got:02X}")]
    InvalidTerminator { got: u8 },

    #[error("응답 타임아웃: {timeout_ms}ms")]
    AckTimeout { timeout_ms: u64 },

    #[error("취소됨")]
    Cancelled,

    #[error("주소 해석 실패: {addr}")]
    AddrResolve { addr: String },

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// 청크 단위로 건너뛸 수 있는 프레임 생성 에러인지
    pub fn is_chunk_error(&self) -> bool {
        matches!(self, Error::InvalidChunk { .. } | Error::OffsetOutOfRange { .. })
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
