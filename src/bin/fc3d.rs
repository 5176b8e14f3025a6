//! FC3D - File & Command sender for 3D printers
//!
//! UDP로 3D 프린터에 G-code 파일/명령 전송
//! - 인자가 없으면 원래 대화형 방식으로 주소/동작을 입력받음
//! - Ctrl-C로 응답 대기 취소
//!
//! 사용법:
//!   cargo run --release --bin fc3d -- [OPTIONS] [COMMAND]
//!
//! 예시:
//!   # 파일 전송
//!   cargo run --release --bin fc3d -- --host 192.168.1.50 --port 8899 file cube.gcode
//!
//!   # Z축 원점 복귀
//!   cargo run --release --bin fc3d -- --host 192.168.1.50 --port 8899 command home-z
//!
//!   # 임의 명령 (공백 그대로 전송, 따옴표로 감쌀 것)
//!   cargo run --release --bin fc3d -- --addr 192.168.1.50:8899 custom "M117 Hello"
//!
//!   # 대화형
//!   cargo run --release --bin fc3d

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use fc3d::sender::remote_name_for;
use fc3d::{cancel_pair, Command, Config, Printer, PrinterAddr};

#[derive(Parser, Debug)]
#[clap(name = "fc3d")]
#[clap(about = "File & Command sender for 3D printers (UDP)", long_about = None)]
struct Cli {
    /// 프린터 주소 (host:port)
    #[clap(long, conflicts_with_all = ["host", "port"])]
    addr: Option<PrinterAddr>,

    /// 프린터 IP 주소 (없으면 입력 요청)
    #[clap(long)]
    host: Option<String>,

    /// 프린터 포트 (없으면 입력 요청)
    #[clap(long)]
    port: Option<u16>,

    /// 응답 대기 타임아웃 (ms, 0 = 무한 대기)
    #[clap(long, default_value_t = 5000)]
    ack_timeout_ms: u64,

    /// 핸드쉐이크 단계 사이 대기 (ms)
    #[clap(long, default_value_t = 2000)]
    step_delay_ms: u64,

    /// 프레임 전송 간격 (us)
    #[clap(long, default_value_t = 0)]
    chunk_interval_us: u64,

    /// 디버그 로그 출력
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// G-code 파일 전송
    File {
        path: PathBuf,

        /// 프린터측 파일 이름 (기본: 로컬 파일 이름)
        #[clap(long)]
        name: Option<String>,
    },

    /// 목록 명령 전송
    #[clap(subcommand)]
    Command(Listed),

    /// 임의 명령 전송 (입력 그대로)
    Custom { text: String },
}

#[derive(Subcommand, Debug)]
enum Listed {
    /// G28 Z
    HomeZ,
    /// G28 X Y
    HomeXy,
    /// G28
    HomeAll,
    /// M30 <file>
    Delete { file: String },
}

impl Listed {
    fn into_command(self) -> Command {
        match self {
            Listed::HomeZ => Command::HomeZ,
            Listed::HomeXy => Command::HomeXY,
            Listed::HomeAll => Command::HomeAll,
            Listed::Delete { file } => Command::DeleteFile(file),
        }
    }
}

/// 표준 입력에서 한 줄 읽기
fn prompt(message: &str) -> io::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// 대화형으로 동작 선택
fn prompt_action() -> io::Result<Option<Action>> {
    let option = prompt("Do you want to send a file / command / or custom command: ")?;

    match option.to_lowercase().as_str() {
        "file" | "f" => {
            let path = prompt("Please enter path to file: ")?;
            Ok(Some(Action::File {
                path: PathBuf::from(path),
                name: None,
            }))
        }
        "command" | "c" => {
            println!("----------------------------------------------------------");
            println!("HOME Z");
            println!("HOME X,Y");
            println!("HOME ALL");
            println!("DELETE FILE FROM SD");
            println!("----------------------------------------------------------");

            let command = prompt("Please enter a listed command: ")?;
            let listed = match command.to_lowercase().as_str() {
                "home z" | "z" => Listed::HomeZ,
                "home x,y" | "x" => Listed::HomeXy,
                "home all" | "a" => Listed::HomeAll,
                "delete file from sd card" | "d" => {
                    let file = prompt("Please enter filename on SD card: ")?;
                    Listed::Delete { file }
                }
                "exit" | "e" => return Ok(None),
                other => {
                    warn!("알 수 없는 명령: {}", other);
                    return Ok(None);
                }
            };
            Ok(Some(Action::Command(listed)))
        }
        "custom" | "cu" => {
            let text = prompt("Please enter command: ")?;
            Ok(Some(Action::Custom { text }))
        }
        other => {
            warn!("알 수 없는 선택: {}", other);
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    println!("Welcome to FC3D (File & Command sender for 3D printers)");
    println!("----------------------------------------------------------");
    println!("Current range of printers tested: ");
    println!("X-smart, X-pro");
    println!("----------------------------------------------------------");

    let addr = match cli.addr {
        Some(addr) => addr,
        None => {
            let host = match cli.host {
                Some(host) => host,
                None => prompt("Please enter IP address: ")?,
            };
            let port = match cli.port {
                Some(port) => port,
                None => prompt("Please enter IP port: ")?
                    .parse::<u16>()
                    .map_err(|e| format!("유효하지 않은 포트: {}", e))?,
            };
            if host.is_empty() {
                return Err("IP 주소가 비어 있음".into());
            }
            PrinterAddr::new(host, port)
        }
    };

    let action = match cli.action {
        Some(action) => action,
        None => match prompt_action()? {
            Some(action) => action,
            None => return Ok(()),
        },
    };

    // 입력 검증은 연결 전에
    match &action {
        Action::File { path, .. } if !path.is_file() => {
            return Err(format!("파일 없음: {}", path.display()).into());
        }
        Action::Custom { text } if text.trim().is_empty() => {
            return Err("빈 명령".into());
        }
        _ => {}
    }

    let config = Config {
        ack_timeout_ms: cli.ack_timeout_ms,
        step_delay_ms: cli.step_delay_ms,
        chunk_interval_us: cli.chunk_interval_us,
        ..Config::default()
    };

    // Ctrl-C → 응답 대기 취소
    let (cancel_handle, cancel_token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("취소 요청");
            cancel_handle.cancel();
        }
    });

    let printer = Printer::connect_with_cancel(&addr, config, cancel_token).await?;
    info!("프린터 연결: {} ({})", addr, printer.transport().printer_addr());

    match action {
        Action::File { path, name } => {
            let remote_name = name.unwrap_or_else(|| remote_name_for(&path));
            let report = printer.upload_file(&path, &remote_name).await?;
            if !report.is_complete() {
                warn!("누락 구간: {:?}", report.skipped);
            }
        }
        Action::Command(listed) => {
            let command = listed.into_command();
            info!("{}", command);
            printer.send_command(&command).await?;
        }
        Action::Custom { text } => {
            printer.send_command(&Command::Custom(text)).await?;
        }
    }

    Ok(())
}
