//! # FC3D (File & Command sender for 3D printers)
//!
//! UDP 기반 3D 프린터 G-code 파일/명령 전송
//!
//! ## 핵심 특징
//! - **핸드쉐이크**: `M4001` → `M28 <file>` → 데이터 프레임 → `M29 <file>`
//! - **프레임**: payload + 역순 오프셋 + XOR 체크섬 + `0x83` 종결 바이트
//! - **순차 전송**: 프레임마다 응답 하나를 기다린 후 다음 프레임
//! - **재전송 없음**: 생성 실패한 청크는 건너뛰고 계속 진행
//! - **타임아웃/취소**: 응답 대기는 설정으로 제한 가능

pub mod cancel;
pub mod command;
pub mod config;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod transfer;
pub mod transport;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use command::Command;
pub use config::Config;
pub use error::{Error, Result};
pub use frame::{Chunk, Frame};
pub use handshake::Handshake;
pub use receiver::{PrinterEmulator, DEFAULT_MAX_FILE_SIZE};
pub use sender::{CommandSender, Printer};
pub use stats::{TransferReport, TransferStats};
pub use transfer::FileTransfer;
pub use transport::{Ack, PrinterAddr, Transport, UdpTransport};

/// 청크(윈도우) 크기 (바이트)
pub const BUFFERSIZE: usize = 1280;

/// 응답 수신 버퍼 크기
pub const RECV_BUFFER_SIZE: usize = 1280;

/// 프레임 종결 바이트
pub const FRAME_TERMINATOR: u8 = 0x83;

/// 프레임 트레일러 길이 (오프셋 4 + 체크섬 1 + 종결 1)
pub const FRAME_TRAILER_LEN: usize = 6;
