//! 파이프라인 에러 타입
//!
//! [`WatchError`]는 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<WatchError> for BanwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 라인 단위 에러(평판 조회 실패, 밴리스트 기록 실패)는 발생 지점에서
//! 로그만 남기고 다음 라인으로 넘어가며, 여기로 전파되지 않습니다.

use banwatch_core::error::{BanwatchError, PipelineError};

/// 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// 테일링 실패 (파일 열기, stat 등)
    #[error("tail error: {path}: {reason}")]
    Tail {
        /// 감시 대상 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 평판 서비스 조회 실패
    #[error("reputation error: {provider}: {reason}")]
    Reputation {
        /// 제공자 이름
        provider: String,
        /// 실패 사유 (HTTP 상태, 제공자 에러 코드 등)
        reason: String,
    },

    /// 밴리스트 파일 열기/기록 실패
    #[error("banlist error: {path}: {reason}")]
    Banlist {
        /// 밴리스트 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// HTTP 클라이언트 에러
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<WatchError> for BanwatchError {
    fn from(err: WatchError) -> Self {
        BanwatchError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_error_display() {
        let err = WatchError::Tail {
            path: "/var/log/game/server.log".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("server.log"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn reputation_error_display() {
        let err = WatchError::Reputation {
            provider: "getipintel".to_owned(),
            reason: "HTTP 429".to_owned(),
        };
        assert!(err.to_string().contains("getipintel"));
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn converts_to_banwatch_error() {
        let err = WatchError::Channel("receiver closed".to_owned());
        let core_err: BanwatchError = err.into();
        assert!(matches!(core_err, BanwatchError::Pipeline(_)));
    }
}
