//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 파이프라인의 각 단계가 주고받는 데이터 구조를 정의합니다.
//! `LogLine` -> (추출) -> IP 문자열 -> (평판 조회) -> [`ScoreResult`] -> (판정) -> [`BanRecord`]

use std::fmt;

use serde::{Deserialize, Serialize};

/// 밴리스트에 기록되는 고정 사유 메시지
///
/// 모든 레코드에 동일하게 사용됩니다. 밴리스트 파일을 소비하는 외부
/// 시스템(게임 서버)이 이 문구를 그대로 접속자에게 보여주므로
/// 바이트 단위로 보존해야 합니다 (첫 문장 뒤 공백 두 칸 포함).
pub const BAN_MESSAGE: &str = "You have been banned on suspicion of proxy use.  \
If you believe this is in error, please contact the administrators.";

/// 감시 중인 파일에서 수집된 로그 한 줄
///
/// 테일러가 생성하고 추출기가 즉시 소비하는 일시적 데이터입니다.
#[derive(Debug, Clone)]
pub struct LogLine {
    /// 원본 파일 경로
    pub source: String,
    /// 줄 내용 (개행 제외)
    pub text: String,
}

impl LogLine {
    /// 새 LogLine을 생성합니다.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.text)
    }
}

/// 평판 서비스 조회 결과
///
/// `score`는 프록시일 확률(0.0~1.0)이며, `metadata`는 제공자가 돌려준
/// 원본 응답에서 점수 외의 필드를 그대로 담습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 위험 점수
    pub score: f64,
    /// 제공자 부가 정보 (원본 JSON)
    pub metadata: serde_json::Value,
}

impl ScoreResult {
    /// 부가 정보 없이 점수만으로 결과를 생성합니다.
    pub fn new(score: f64) -> Self {
        Self {
            score,
            metadata: serde_json::Value::Null,
        }
    }

    /// 부가 정보를 설정합니다.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// 밴리스트에 영속화되는 레코드
///
/// IP가 고유 키이며, 생성 이후 수정/삭제되지 않습니다.
/// 파일에는 한 줄에 `<ip>:<message>` 형식으로 기록됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    /// 밴 대상 IP (dotted-quad)
    pub ip: String,
    /// 사유 메시지
    pub message: String,
}

impl BanRecord {
    /// 고정 사유 메시지로 새 레코드를 생성합니다.
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            message: BAN_MESSAGE.to_owned(),
        }
    }
}

// Display가 곧 파일 포맷입니다. 별도 직렬화 함수를 두지 않습니다.
impl fmt::Display for BanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ban_message_is_byte_exact() {
        // 첫 문장 뒤 공백 두 칸이 원본 포맷입니다.
        assert!(BAN_MESSAGE.contains("proxy use.  If you believe"));
        assert!(!BAN_MESSAGE.ends_with('\n'));
    }

    #[test]
    fn ban_record_line_format() {
        let record = BanRecord::new("10.0.0.5");
        let line = record.to_string();
        assert!(line.starts_with("10.0.0.5:"));
        assert!(line.ends_with("contact the administrators."));
    }

    #[test]
    fn score_result_with_metadata() {
        let result = ScoreResult::new(0.97)
            .with_metadata(serde_json::json!({ "queryIP": "10.0.0.5" }));
        assert_eq!(result.score, 0.97);
        assert_eq!(result.metadata["queryIP"], "10.0.0.5");
    }

    #[test]
    fn log_line_display() {
        let line = LogLine::new("/var/log/server.log", "Connect (v1.0): 10.0.0.5");
        assert_eq!(
            line.to_string(),
            "/var/log/server.log: Connect (v1.0): 10.0.0.5"
        );
    }
}
