//! 전송 핸드쉐이크 (M4001 / M28 / M29)
//!
//! 사용 순서 (호출측 책임, 런타임 검사 없음):
//! 1. `prepare`
//! 2. `begin(filename)`
//! 3. 모든 데이터 프레임
//! 4. `end(filename)` - 해당 전송의 마지막 메시지

use tracing::info;

use crate::command::Command;
use crate::transport::{Ack, Transport};
use crate::Result;

/// 핸드쉐이크 제어기
pub struct Handshake<'a, T: Transport> {
    transport: &'a T,
}

impl<'a, T: Transport> Handshake<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// 통신 시작 (`M4001`)
    pub async fn prepare(&self) -> Result<Ack> {
        self.control(Command::Prepare).await
    }

    /// 파일 쓰기 시작 (`M28 <filename>`)
    pub async fn begin(&self, filename: &str) -> Result<Ack> {
        self.control(Command::BeginWrite(filename.to_string())).await
    }

    /// 파일 쓰기 종료 (`M29 <filename>`)
    pub async fn end(&self, filename: &str) -> Result<Ack> {
        self.control(Command::EndWrite(filename.to_string())).await
    }

    async fn control(&self, command: Command) -> Result<Ack> {
        info!("Sending {}", command);
        self.transport.exchange(&command.to_payload()).await
    }
}
