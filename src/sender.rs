//! 송신자 (PC측)
//!
//! - 단일 제어 명령 전송 (prepare 후 명령 하나)
//! - 파일 업로드 전체 흐름 (prepare → begin → 프레임 → end)

use std::path::Path;

use tokio::io::AsyncRead;
use tracing::info;

use crate::cancel::CancelToken;
use crate::command::Command;
use crate::handshake::Handshake;
use crate::stats::{TransferReport, TransferStats};
use crate::transfer::FileTransfer;
use crate::transport::{Ack, PrinterAddr, Transport, UdpTransport};
use crate::{Config, Result};

/// 명령 송신자
pub struct CommandSender<'a, T: Transport> {
    transport: &'a T,
}

impl<'a, T: Transport> CommandSender<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// prepare 후 명령 전송, 응답 하나 기록
    pub async fn send(&self, command: &Command) -> Result<Ack> {
        Handshake::new(self.transport).prepare().await?;

        info!("Sending command: {}", command);
        let ack = self.transport.exchange(&command.to_payload()).await?;
        info!("응답: {}", ack.text().trim_end());

        Ok(ack)
    }
}

/// 프린터 연결
pub struct Printer<T: Transport = UdpTransport> {
    transport: T,
    config: Config,
}

impl Printer<UdpTransport> {
    /// UDP로 프린터 연결
    pub async fn connect(addr: &PrinterAddr, config: Config) -> Result<Self> {
        Self::connect_with_cancel(addr, config, CancelToken::never()).await
    }

    pub async fn connect_with_cancel(
        addr: &PrinterAddr,
        config: Config,
        cancel: CancelToken,
    ) -> Result<Self> {
        let transport = UdpTransport::connect(addr, &config)
            .await?
            .with_cancel(cancel);
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Printer<T> {
    pub fn new(transport: T, config: Config) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handshake(&self) -> Handshake<'_, T> {
        Handshake::new(&self.transport)
    }

    /// 단일 명령 전송
    pub async fn send_command(&self, command: &Command) -> Result<Ack> {
        CommandSender::new(&self.transport).send(command).await
    }

    /// 로컬 파일을 프린터에 `remote_name`으로 업로드
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        remote_name: &str,
    ) -> Result<TransferReport> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path).await?;
        let file_size = file.metadata().await?.len();

        info!("Sending file {} as {} ({} bytes)", path.display(), remote_name, file_size);
        self.upload(&mut file, file_size, remote_name).await
    }

    /// 임의 소스 업로드
    pub async fn upload<R>(
        &self,
        source: &mut R,
        file_size: u64,
        remote_name: &str,
    ) -> Result<TransferReport>
    where
        R: AsyncRead + Unpin,
    {
        // 핸드쉐이크 전에 거부 (M28만 열린 채 남지 않도록)
        self.config.validate()?;

        let handshake = self.handshake();

        handshake.prepare().await?;
        self.pause().await;
        handshake.begin(remote_name).await?;
        self.pause().await;

        let stats: TransferStats = FileTransfer::new(&self.transport, &self.config)
            .stream(source, file_size)
            .await?;

        self.pause().await;
        handshake.end(remote_name).await?;

        let report = stats.finish(remote_name);
        info!("{}", report.summary());
        Ok(report)
    }

    /// 핸드쉐이크 단계 사이 대기
    async fn pause(&self) {
        if self.config.step_delay_ms > 0 {
            tokio::time::sleep(self.config.step_delay()).await;
        }
    }
}

/// 로컬 경로에서 프린터측 파일 이름 결정
pub fn remote_name_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::transport::testing::RecordingTransport;
    use crate::Error;

    #[tokio::test]
    async fn test_command_is_prepared() {
        let printer = Printer::new(RecordingTransport::new(), Config::immediate());

        let ack = printer.send_command(&Command::HomeZ).await.unwrap();
        assert_eq!(ack.text(), "ok");

        assert_eq!(printer.transport().sent_text(), vec!["M4001", "G28 Z"]);
        assert_eq!(printer.transport().acks_read(), 2);
    }

    #[tokio::test]
    async fn test_custom_command_is_verbatim() {
        let transport = RecordingTransport::new();
        CommandSender::new(&transport)
            .send(&Command::Custom("M104 S210".into()))
            .await
            .unwrap();

        assert_eq!(transport.sent()[1], b"M104 S210");
    }

    #[tokio::test]
    async fn test_failed_prepare_skips_command() {
        let transport = RecordingTransport::new();
        transport.fail_next_ack(Error::AckTimeout { timeout_ms: 10 });

        let result = CommandSender::new(&transport).send(&Command::HomeAll).await;
        assert!(result.is_err());
        assert_eq!(transport.sent_text(), vec!["M4001"]);
    }

    #[tokio::test]
    async fn test_upload_is_bracketed_by_handshake() {
        let data: Vec<u8> = (0..2600).map(|i| (i % 97) as u8).collect();
        let printer = Printer::new(RecordingTransport::new(), Config::immediate());

        let report = printer
            .upload(&mut data.as_slice(), data.len() as u64, "cube.gcode")
            .await
            .unwrap();

        let sent = printer.transport().sent();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[0], b"M4001");
        assert_eq!(sent[1], b"M28 cube.gcode");
        assert_eq!(sent[5], b"M29 cube.gcode");

        let offsets: Vec<u32> = sent[2..5]
            .iter()
            .map(|bytes| Frame::parse(bytes).unwrap().offset())
            .collect();
        assert_eq!(offsets, vec![0, 1280, 2560]);
        assert_eq!(printer.transport().acks_read(), 6);

        assert!(report.is_complete());
        assert_eq!(report.filename, "cube.gcode");
        assert_eq!(report.crc32, crc32fast::hash(&data));
    }

    #[tokio::test]
    async fn test_invalid_chunk_size_sends_nothing() {
        let data = vec![7u8; 2600];

        for chunk_size in [0, 4000] {
            let mut config = Config::immediate();
            config.chunk_size = chunk_size;
            let printer = Printer::new(RecordingTransport::new(), config);

            let err = printer
                .upload(&mut data.as_slice(), 2600, "cube.gcode")
                .await
                .unwrap_err();

            assert!(matches!(err, Error::InvalidConfig(_)));
            assert!(printer.transport().sent().is_empty());
        }
    }

    #[test]
    fn test_remote_name_for() {
        assert_eq!(remote_name_for(Path::new("/tmp/prints/cube.gcode")), "cube.gcode");
        assert_eq!(remote_name_for(Path::new("benchy.gcode")), "benchy.gcode");
    }
}
