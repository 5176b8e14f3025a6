//! 전송 설정

use std::time::Duration;

use crate::{Error, Result, BUFFERSIZE, RECV_BUFFER_SIZE};

/// FC3D 전송 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 청크(윈도우) 크기 (바이트), 1 ~ BUFFERSIZE
    pub chunk_size: usize,

    /// 응답 수신 버퍼 크기
    pub recv_buffer_size: usize,

    /// 응답 대기 타임아웃 (밀리초)
    /// 0이면 응답이 올 때까지 무한 대기
    pub ack_timeout_ms: u64,

    /// 핸드쉐이크 단계 사이 대기 (밀리초)
    /// prepare → begin → 전송 → end 사이에 적용
    pub step_delay_ms: u64,

    /// 프레임 전송 간격 (마이크로초)
    /// 0이면 응답 즉시 다음 프레임 전송
    pub chunk_interval_us: u64,

    /// SO_BROADCAST 설정 여부
    pub broadcast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: BUFFERSIZE,
            recv_buffer_size: RECV_BUFFER_SIZE,
            ack_timeout_ms: 5000,   // 5초
            step_delay_ms: 2000,    // 2초
            chunk_interval_us: 0,   // 최대 속도
            broadcast: true,
        }
    }
}

impl Config {
    /// 응답을 무한 대기하는 설정 (타임아웃 없음)
    pub fn blocking() -> Self {
        Self {
            ack_timeout_ms: 0,
            ..Self::default()
        }
    }

    /// 대기 없는 설정 (에뮬레이터, 테스트용)
    pub fn immediate() -> Self {
        Self {
            ack_timeout_ms: 1000,
            step_delay_ms: 0,
            chunk_interval_us: 0,
            ..Self::default()
        }
    }

    /// 응답 타임아웃 (None이면 무한 대기)
    pub fn ack_timeout(&self) -> Option<Duration> {
        (self.ack_timeout_ms > 0).then(|| Duration::from_millis(self.ack_timeout_ms))
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn chunk_interval(&self) -> Duration {
        Duration::from_micros(self.chunk_interval_us)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > BUFFERSIZE {
            return Err(Error::InvalidConfig(format!(
                "chunk_size는 1 ~ {} 범위여야 함: {}",
                BUFFERSIZE, self.chunk_size
            )));
        }
        if self.recv_buffer_size == 0 {
            return Err(Error::InvalidConfig("recv_buffer_size는 0일 수 없음".into()));
        }
        Ok(())
    }
}
