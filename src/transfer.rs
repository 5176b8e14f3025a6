//! 파일 전송 오케스트레이터
//!
//! - 파일을 chunk_size 윈도우로 순차 읽기
//! - 윈도우마다 프레임 하나 전송 후 응답 하나 대기
//! - 프레임 생성 실패 시 해당 윈도우만 건너뜀 (재시도/중단 없음)

use std::path::Path;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::frame::{Chunk, Frame};
use crate::stats::TransferStats;
use crate::transport::Transport;
use crate::{Config, Result};

/// 파일 전송기
///
/// 핸드쉐이크는 포함하지 않음. `begin`과 `end` 사이에서 호출해야 함
pub struct FileTransfer<'a, T: Transport> {
    transport: &'a T,
    config: &'a Config,
}

impl<'a, T: Transport> FileTransfer<'a, T> {
    pub fn new(transport: &'a T, config: &'a Config) -> Self {
        Self { transport, config }
    }

    /// 로컬 파일 전송
    pub async fn send_file(&self, path: impl AsRef<Path>) -> Result<TransferStats> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path).await?;
        let file_size = file.metadata().await?.len();

        info!("Sending file {} ({} bytes)", path.display(), file_size);
        self.stream(&mut file, file_size).await
    }

    /// 임의 소스 전송
    pub async fn stream<R>(&self, source: &mut R, file_size: u64) -> Result<TransferStats>
    where
        R: AsyncRead + Unpin,
    {
        self.stream_with(source, file_size, Chunk::to_frame).await
    }

    async fn stream_with<R, F>(
        &self,
        source: &mut R,
        file_size: u64,
        encode: F,
    ) -> Result<TransferStats>
    where
        R: AsyncRead + Unpin,
        F: Fn(&Chunk) -> Result<Frame>,
    {
        // chunk_size 0이면 첫 읽기가 EOF로 오인됨
        self.config.validate()?;

        let mut stats = TransferStats::new(file_size);
        let mut buf = vec![0u8; self.config.chunk_size];
        let mut position = 0u64;

        loop {
            // 읽기 직전 위치가 이 윈도우의 오프셋
            let len = read_window(source, &mut buf).await?;
            let chunk = Chunk::new(position, Bytes::copy_from_slice(&buf[..len]));
            if chunk.is_empty() {
                info!(
                    "파일 끝: {} bytes, {} frames 전송, {} 건너뜀 ({:.1} KB/s)",
                    stats.bytes_read,
                    stats.frames_sent,
                    stats.frames_skipped(),
                    stats.throughput() / 1000.0
                );
                break;
            }

            position = chunk.end_offset();
            stats.record_read(&chunk.data);

            let frame = match encode(&chunk) {
                Ok(frame) => frame,
                Err(e) if e.is_chunk_error() => {
                    warn!("청크 건너뜀: offset={}, len={}: {}", chunk.offset, chunk.len(), e);
                    stats.record_skipped(chunk.offset, chunk.len());
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.transport.send(frame.as_bytes()).await?;
            stats.record_sent(frame.wire_len());

            self.transport.recv_ack().await?;
            stats.record_ack();

            debug!(
                "프레임 전송: offset={}, len={} ({:.1}%)",
                chunk.offset,
                chunk.len(),
                stats.progress_percent()
            );

            if self.config.chunk_interval_us > 0 {
                tokio::time::sleep(self.config.chunk_interval()).await;
            }
        }

        Ok(stats)
    }
}

/// 윈도우를 가득 채울 때까지 읽기 (EOF면 짧을 수 있음)
async fn read_window<R>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
