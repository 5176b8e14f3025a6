//! 프린터 에뮬레이터 (프린터측)
//!
//! - 모든 데이터그램에 응답 하나
//! - M28/M29 쓰기 세션 관리
//! - 프레임 검증 후 오프셋 위치에 조립
//! - 완료된 파일은 메모리 저장소(SD 카드)에 보관

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::command::Command;
use crate::frame::Frame;
use crate::{Result, FRAME_TERMINATOR, FRAME_TRAILER_LEN, RECV_BUFFER_SIZE};

/// 쓰기 세션당 기본 최대 파일 크기 (64 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 64 * 1024 * 1024;

/// 진행 중인 쓰기 세션
#[derive(Debug)]
struct WriteSession {
    filename: String,
    data: BytesMut,
    frames: u64,
    bad_frames: u64,
}

impl WriteSession {
    fn new(filename: String) -> Self {
        Self {
            filename,
            data: BytesMut::new(),
            frames: 0,
            bad_frames: 0,
        }
    }

    /// 오프셋 위치에 payload 배치 (빈 구간은 0으로 채움)
    fn place(&mut self, offset: usize, payload: &[u8]) {
        let end = offset + payload.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(payload);
        self.frames += 1;
    }
}

/// 데이터그램 처리 결과
#[derive(Debug)]
pub struct Outcome {
    /// 응답 (None이면 응답 없음)
    pub reply: Option<Bytes>,

    /// M29로 완료된 파일
    pub completed: Option<(String, Bytes)>,
}

impl Outcome {
    fn reply(text: &str) -> Self {
        Self {
            reply: Some(Bytes::copy_from_slice(text.as_bytes())),
            completed: None,
        }
    }

    fn silent() -> Self {
        Self {
            reply: None,
            completed: None,
        }
    }
}

/// 프린터 에뮬레이터
pub struct PrinterEmulator {
    socket: UdpSocket,

    /// 저장된 파일 (SD 카드)
    storage: Arc<DashMap<String, Bytes>>,

    /// 현재 쓰기 세션
    session: Mutex<Option<WriteSession>>,

    /// 수신한 명령 기록
    history: Mutex<Vec<Command>>,

    /// 데이터그램 무시 비율 (0.0 ~ 1.0), 손실 시뮬레이션
    drop_rate: f64,

    /// 완료 파일 저장 디렉터리
    storage_dir: Option<PathBuf>,

    /// 조립 버퍼 상한, 넘는 프레임은 폐기
    max_file_size: usize,
}

impl PrinterEmulator {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("프린터 에뮬레이터 시작: {}", socket.local_addr()?);

        Ok(Self {
            socket,
            storage: Arc::new(DashMap::new()),
            session: Mutex::new(None),
            history: Mutex::new(Vec::new()),
            drop_rate: 0.0,
            storage_dir: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        })
    }

    pub fn with_drop_rate(mut self, drop_rate: f64) -> Self {
        self.drop_rate = drop_rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// 저장소 공유 핸들
    pub fn storage(&self) -> Arc<DashMap<String, Bytes>> {
        self.storage.clone()
    }

    pub fn file(&self, name: &str) -> Option<Bytes> {
        self.storage.get(name).map(|entry| entry.value().clone())
    }

    /// 수신한 명령 목록
    pub fn history(&self) -> Vec<Command> {
        self.history.lock().clone()
    }

    /// 취소될 때까지 수신 루프 실행
    pub async fn run(&self, cancel: CancelToken) -> Result<()> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE + FRAME_TRAILER_LEN];

        loop {
            let (len, peer) = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("프린터 에뮬레이터 종료");
                    return Ok(());
                }
                result = self.socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("수신 에러: {}", e);
                        continue;
                    }
                },
            };

            let outcome = self.handle_datagram(&buf[..len]);

            if let Some(reply) = outcome.reply {
                if let Err(e) = self.socket.send_to(&reply, peer).await {
                    warn!("응답 전송 실패: {}", e);
                }
            }

            if let (Some((name, data)), Some(dir)) = (outcome.completed, &self.storage_dir) {
                let path = dir.join(sanitize_filename(&name));
                match tokio::fs::write(&path, &data).await {
                    Ok(()) => info!("파일 저장: {}", path.display()),
                    Err(e) => warn!("파일 저장 실패 {}: {}", path.display(), e),
                }
            }
        }
    }

    /// 데이터그램 하나 처리
    pub fn handle_datagram(&self, data: &[u8]) -> Outcome {
        if self.drop_rate > 0.0 && rand::random::<f64>() < self.drop_rate {
            debug!("데이터그램 무시 (손실 시뮬레이션): {} bytes", data.len());
            return Outcome::silent();
        }

        if data.len() > FRAME_TRAILER_LEN && data.last() == Some(&FRAME_TERMINATOR) {
            self.handle_frame(data);
            return Outcome::reply("ok\r\n");
        }

        let command = Command::parse(&String::from_utf8_lossy(data));
        self.history.lock().push(command.clone());
        self.handle_command(command)
    }

    fn handle_frame(&self, data: &[u8]) {
        let mut session = self.session.lock();
        let Some(session) = session.as_mut() else {
            warn!("M28 없이 프레임 수신: {} bytes", data.len());
            return;
        };

        match Frame::parse(data) {
            Ok(frame) => {
                let offset = frame.offset() as usize;
                let end = offset.saturating_add(frame.payload_len());
                if end > self.max_file_size {
                    warn!(
                        "프레임 폐기: offset={}, len={} (최대 {} bytes 초과)",
                        offset,
                        frame.payload_len(),
                        self.max_file_size
                    );
                    session.bad_frames += 1;
                    return;
                }

                debug!(
                    "프레임 수신: offset={}, len={}, checksum={:02X}",
                    offset,
                    frame.payload_len(),
                    frame.checksum()
                );
                session.place(offset, frame.payload());
            }
            Err(e) => {
                warn!("프레임 폐기: {}", e);
                session.bad_frames += 1;
            }
        }
    }

    fn handle_command(&self, command: Command) -> Outcome {
        info!("명령 수신: {}", command);

        match command {
            Command::BeginWrite(name) => {
                let reply = format!("Writing to file: {}\r\nok\r\n", name);
                if let Some(previous) = self.session.lock().replace(WriteSession::new(name)) {
                    warn!("완료되지 않은 쓰기 세션 폐기: {}", previous.filename);
                }
                Outcome::reply(&reply)
            }

            Command::EndWrite(name) => {
                let Some(session) = self.session.lock().take() else {
                    warn!("M28 없이 M29 수신: {}", name);
                    return Outcome::reply("ok\r\n");
                };
                if session.filename != name {
                    warn!("파일 이름 불일치: M28 {} / M29 {}", session.filename, name);
                }

                let data = session.data.freeze();
                info!(
                    "파일 완료: {} ({} bytes, {} frames, {} bad, CRC32 {:08X})",
                    session.filename,
                    data.len(),
                    session.frames,
                    session.bad_frames,
                    crc32fast::hash(&data)
                );
                self.storage.insert(session.filename.clone(), data.clone());

                Outcome {
                    reply: Some(Bytes::from_static(b"Done saving file.\r\nok\r\n")),
                    completed: Some((session.filename, data)),
                }
            }

            Command::DeleteFile(name) => match self.storage.remove(&name) {
                Some(_) => Outcome::reply(&format!("File deleted: {}\r\nok\r\n", name)),
                None => Outcome::reply(&format!("Deletion failed, File: {}.\r\nok\r\n", name)),
            },

            _ => Outcome::reply("ok\r\n"),
        }
    }
}

/// 경로 구성요소 제거
fn sanitize_filename(name: &str) -> PathBuf {
    Path::new(name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("unnamed.gcode"))
}
