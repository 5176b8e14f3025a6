//! FC3D 프린터 에뮬레이터
//!
//! 실제 프린터 없이 fc3d 전송을 확인하기 위한 UDP 엔드포인트
//! - 모든 데이터그램에 응답
//! - M28/M29 사이 프레임을 조립해 저장
//!
//! 사용법:
//!   cargo run --release --bin fc3d-printer -- [OPTIONS]
//!
//! 예시:
//!   # 기본 실행, 수신 파일을 ./sd 에 저장
//!   cargo run --release --bin fc3d-printer -- --bind 0.0.0.0:8899 --storage ./sd
//!
//!   # 10% 손실 시뮬레이션
//!   cargo run --release --bin fc3d-printer -- --drop-rate 0.1

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fc3d::{cancel_pair, PrinterEmulator, DEFAULT_MAX_FILE_SIZE};

#[derive(Parser, Debug)]
#[clap(name = "fc3d-printer")]
#[clap(about = "UDP 3D printer emulator for fc3d", long_about = None)]
struct Cli {
    /// 바인드 주소
    #[clap(short, long, default_value = "0.0.0.0:8899")]
    bind: SocketAddr,

    /// 완료 파일 저장 디렉터리
    #[clap(short, long)]
    storage: Option<PathBuf>,

    /// 데이터그램 무시 비율 (0.0 ~ 1.0)
    #[clap(long, default_value_t = 0.0)]
    drop_rate: f64,

    /// 파일당 최대 크기 (bytes)
    #[clap(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: usize,

    /// 디버그 로그 출력
    #[clap(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut emulator = PrinterEmulator::bind(cli.bind)
        .await?
        .with_drop_rate(cli.drop_rate)
        .with_max_file_size(cli.max_file_size);

    if let Some(dir) = cli.storage {
        tokio::fs::create_dir_all(&dir).await?;
        info!("저장 디렉터리: {}", dir.display());
        emulator = emulator.with_storage_dir(dir);
    }

    let (cancel_handle, cancel_token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_handle.cancel();
        }
    });

    emulator.run(cancel_token).await?;

    let storage = emulator.storage();
    info!("저장된 파일 {}개", storage.len());
    for entry in storage.iter() {
        info!("  {} ({} bytes)", entry.key(), entry.value().len());
    }

    Ok(())
}
