//! 프린터 제어 명령 정의
//!
//! 모든 명령은 ASCII 텍스트 그대로 전송되며 체크섬/프레이밍 없음

use std::fmt;

/// 통신 시작
pub const PREPARE: &str = "M4001";

/// 파일 쓰기 시작
pub const BEGIN_WRITE: &str = "M28";

/// 파일 쓰기 종료
pub const END_WRITE: &str = "M29";

/// 저장소 파일 삭제
pub const DELETE_FILE: &str = "M30";

/// 원점 복귀
pub const HOME: &str = "G28";

/// 제어 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `M4001`
    Prepare,

    /// `M28 <filename>`
    BeginWrite(String),

    /// `M29 <filename>`
    EndWrite(String),

    /// `M30 <filename>`
    DeleteFile(String),

    /// `G28 Z`
    HomeZ,

    /// `G28 X Y`
    HomeXY,

    /// `G28`
    HomeAll,

    /// 임의 명령 (그대로 전송)
    Custom(String),
}

impl Command {
    /// 전송 페이로드
    pub fn to_payload(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// 수신한 텍스트를 명령으로 해석 (에뮬레이터용)
    pub fn parse(text: &str) -> Self {
        let text = text.trim_end_matches(['\r', '\n', '\0']);
        let (code, arg) = match text.split_once(' ') {
            Some((code, arg)) => (code, Some(arg)),
            None => (text, None),
        };

        match (code, arg) {
            (PREPARE, None) => Command::Prepare,
            (BEGIN_WRITE, Some(name)) => Command::BeginWrite(name.to_string()),
            (END_WRITE, Some(name)) => Command::EndWrite(name.to_string()),
            (DELETE_FILE, Some(name)) => Command::DeleteFile(name.to_string()),
            (HOME, None) => Command::HomeAll,
            (HOME, Some("Z")) => Command::HomeZ,
            (HOME, Some("X Y")) => Command::HomeXY,
            _ => Command::Custom(text.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Prepare => f.write_str(PREPARE),
            Command::BeginWrite(name) => write!(f, "{} {}", BEGIN_WRITE, name),
            Command::EndWrite(name) => write!(f, "{} {}", END_WRITE, name),
            Command::DeleteFile(name) => write!(f, "{} {}", DELETE_FILE, name),
            Command::HomeZ => write!(f, "{} Z", HOME),
            Command::HomeXY => write!(f, "{} X Y", HOME),
            Command::HomeAll => f.write_str(HOME),
            Command::Custom(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_grammar() {
        assert_eq!(Command::Prepare.to_payload(), b"M4001");
        assert_eq!(
            Command::BeginWrite("cube.gcode".into()).to_payload(),
            b"M28 cube.gcode"
        );
        assert_eq!(
            Command::EndWrite("cube.gcode".into()).to_payload(),
            b"M29 cube.gcode"
        );
        assert_eq!(
            Command::DeleteFile("cube.gcode".into()).to_payload(),
            b"M30 cube.gcode"
        );
        assert_eq!(Command::HomeZ.to_payload(), b"G28 Z");
        assert_eq!(Command::HomeXY.to_payload(), b"G28 X Y");
        assert_eq!(Command::HomeAll.to_payload(), b"G28");
        assert_eq!(Command::Custom("M105".into()).to_payload(), b"M105");
    }

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("M4001"), Command::Prepare);
        assert_eq!(
            Command::parse("M28 part.gcode"),
            Command::BeginWrite("part.gcode".into())
        );
        assert_eq!(
            Command::parse("M29 part.gcode\r\n"),
            Command::EndWrite("part.gcode".into())
        );
        assert_eq!(Command::parse("G28 X Y"), Command::HomeXY);
        assert_eq!(Command::parse("G28"), Command::HomeAll);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Command::parse("m4001"), Command::Custom("m4001".into()));
        assert_eq!(Command::parse("M28"), Command::Custom("M28".into()));
    }
}
