//! Connect 라인에서 접속 IP 추출
//!
//! [`ConnectExtractor`]는 로그 한 줄에서 접속 공지 패턴을 찾아
//! IP 주소를 뽑아내는 순수 함수입니다.
//!
//! # 알고리즘
//! 1. 줄 시작에 고정된 타임스탬프 패턴(`^[0-9:;\[\]]+ `)이 있으면 제거
//! 2. 남은 텍스트에서 `Connect (v<버전>): <ip>` 패턴을 탐색
//! 3. 매칭되면 캡처된 IP 반환, 아니면 `None` (에러 아님)
//!
//! # 사용 예시
//! ```
//! use banwatch_pipeline::extract::ConnectExtractor;
//!
//! let extractor = ConnectExtractor::new().unwrap();
//! let ip = extractor.extract("12:34:56 Connect (v1.0): 10.0.0.5 extra");
//! assert_eq!(ip, Some("10.0.0.5"));
//! ```

use regex::Regex;

use crate::error::WatchError;

/// 줄 시작의 타임스탬프 토큰 (숫자, 콜론, 세미콜론, 대괄호 + 공백 한 칸)
const TIMESTAMP_PATTERN: &str = r"^[0-9:;\[\]]+ ";

/// 접속 공지 패턴. 캡처 그룹 1이 dotted-quad IP입니다.
const CONNECT_PATTERN: &str = r"Connect \(v[0-9.]+\): ([0-9]+\.[0-9]+\.[0-9]+\.[0-9]+)";

/// Connect 라인 추출기
///
/// 패턴은 생성 시 한 번만 컴파일됩니다. `regex::Regex`는 `Sync`이지만
/// 파이프라인 간 독립성을 위해 파이프라인마다 자체 인스턴스를 만듭니다.
pub struct ConnectExtractor {
    timestamp: Regex,
    connect: Regex,
}

impl ConnectExtractor {
    /// 새 추출기를 생성합니다.
    pub fn new() -> Result<Self, WatchError> {
        Ok(Self {
            timestamp: Regex::new(TIMESTAMP_PATTERN)?,
            connect: Regex::new(CONNECT_PATTERN)?,
        })
    }

    /// 로그 한 줄에서 접속 IP를 추출합니다.
    ///
    /// 접속 공지 패턴이 없으면 `None`을 반환합니다. 매칭 실패는
    /// 정상적인 결과이며 에러로 취급하지 않습니다.
    pub fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        let text = match self.timestamp.find(line) {
            Some(prefix) => &line[prefix.end()..],
            None => line,
        };

        self.connect
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extractor() -> ConnectExtractor {
        ConnectExtractor::new().unwrap()
    }

    #[test]
    fn extracts_ip_with_timestamp_prefix() {
        let ip = extractor().extract("12:34:56 Connect (v1.0): 10.0.0.5 extra");
        assert_eq!(ip, Some("10.0.0.5"));
    }

    #[test]
    fn extracts_ip_without_timestamp() {
        let ip = extractor().extract("Connect (v2.13.1): 192.168.1.100");
        assert_eq!(ip, Some("192.168.1.100"));
    }

    #[test]
    fn extracts_ip_with_bracketed_timestamp() {
        let ip = extractor().extract("[12:00:01] Connect (v1.0): 172.16.0.9");
        assert_eq!(ip, Some("172.16.0.9"));
    }

    #[test]
    fn trailing_noise_is_ignored() {
        let ip = extractor().extract("12:34:56 Connect (v1.0): 10.0.0.5 nickname=zan");
        assert_eq!(ip, Some("10.0.0.5"));
    }

    #[test]
    fn non_connect_line_yields_none() {
        let ex = extractor();
        assert_eq!(ex.extract("12:34:56 Disconnect: 10.0.0.5"), None);
        assert_eq!(ex.extract("chat message from player"), None);
        assert_eq!(ex.extract(""), None);
    }

    #[test]
    fn connect_without_version_yields_none() {
        assert_eq!(extractor().extract("Connect: 10.0.0.5"), None);
    }

    #[test]
    fn incomplete_ip_yields_none() {
        assert_eq!(extractor().extract("Connect (v1.0): 10.0.5"), None);
    }

    proptest! {
        // 접속 공지 패턴이 없는 줄은 어떤 경우에도 IP를 내놓지 않아야 합니다.
        #[test]
        fn arbitrary_non_connect_lines_yield_none(line in r"[a-z0-9:;\[\] .]{0,80}") {
            prop_assert_eq!(extractor().extract(&line), None);
        }

        // 타임스탬프 유무와 무관하게 잘 구성된 줄에서는 정확히 그 IP가 나와야 합니다.
        #[test]
        fn well_formed_lines_yield_exact_ip(
            a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255,
            with_ts in proptest::bool::ANY,
        ) {
            let ip = format!("{a}.{b}.{c}.{d}");
            let prefix = if with_ts { "23:59:59 " } else { "" };
            let line = format!("{prefix}Connect (v1.0): {ip} noise");
            prop_assert_eq!(extractor().extract(&line), Some(ip.as_str()));
        }
    }
}
