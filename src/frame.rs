//! 청크와 프레임 정의
//!
//! - Chunk: 파일에서 읽은 연속 바이트 조각 (1 ~ 1280 bytes) + 절대 오프셋
//! - Frame: 청크의 와이어 표현
//!
//! ```text
//! | payload (N) | offset (4, 역순 BE) | checksum (1) | 0x83 (1) |
//! ```
//!
//! checksum은 payload와 offset 필드 N + 4 바이트의 누적 XOR.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result, FRAME_TERMINATOR, FRAME_TRAILER_LEN};

/// offset 필드 길이
const OFFSET_FIELD_LEN: usize = 4;

/// 파일 청크 (송신 단위)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 파일 내 첫 바이트의 절대 오프셋
    pub offset: u64,

    /// 청크 데이터
    pub data: Bytes,
}

impl Chunk {
    pub fn new(offset: u64, data: Bytes) -> Self {
        Self { offset, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 다음 청크의 오프셋
    pub fn end_offset(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    /// 프레임으로 변환
    pub fn to_frame(&self) -> Result<Frame> {
        Frame::encode(&self.data, self.offset)
    }
}

/// 와이어 프레임 (불변)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// 청크 데이터와 절대 오프셋으로 프레임 생성
    pub fn encode(chunk: &[u8], offset: u64) -> Result<Self> {
        if chunk.is_empty() {
            return Err(Error::InvalidChunk { len: 0 });
        }
        let offset = u32::try_from(offset).map_err(|_| Error::OffsetOutOfRange { offset })?;

        let mut buf = BytesMut::with_capacity(chunk.len() + FRAME_TRAILER_LEN);
        buf.put_slice(chunk);

        // big-endian으로 인코딩 후 역순 배치
        let mut field = offset.to_be_bytes();
        field.reverse();
        buf.put_slice(&field);

        let sum = checksum(&buf);
        buf.put_u8(sum);
        buf.put_u8(FRAME_TERMINATOR);

        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// 수신한 바이트를 프레임으로 검증
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() <= FRAME_TRAILER_LEN {
            return Err(Error::MalformedFrame(format!(
                "프레임 길이 부족: {} bytes",
                data.len()
            )));
        }

        let terminator = data[data.len() - 1];
        if terminator != FRAME_TERMINATOR {
            return Err(Error::InvalidTerminator { got: terminator });
        }

        let sum_pos = data.len() - 2;
        let expected = checksum(&data[..sum_pos]);
        let got = data[sum_pos];
        if expected != got {
            return Err(Error::ChecksumMismatch { expected, got });
        }

        Ok(Self {
            bytes: Bytes::copy_from_slice(data),
        })
    }

    /// payload 길이 (N)
    pub fn payload_len(&self) -> usize {
        self.bytes.len() - FRAME_TRAILER_LEN
    }

    /// 와이어 길이 (N + 6)
    pub fn wire_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[..self.payload_len()]
    }

    /// offset 필드 복원
    pub fn offset(&self) -> u32 {
        let n = self.payload_len();
        let mut field = [0u8; OFFSET_FIELD_LEN];
        field.copy_from_slice(&self.bytes[n..n + OFFSET_FIELD_LEN]);
        field.reverse();
        u32::from_be_bytes(field)
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 2]
    }

    pub fn terminator(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// 누적 XOR 체크섬
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b)
}
