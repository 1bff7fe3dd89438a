//! 설정 관리 -- banwatch.toml 파싱 및 런타임 설정
//!
//! [`BanwatchConfig`]는 모든 크레이트가 사용하는 최상위 설정 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 데몬에서 적용)
//! 2. 환경변수 (`BANWATCH_WATCH_LOG_FILES=/var/log/a.log,/var/log/b.log` 형식)
//! 3. 설정 파일 (`banwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), banwatch_core::error::BanwatchError> {
//! use banwatch_core::config::BanwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = BanwatchConfig::load("banwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = BanwatchConfig::parse("[reputation]\nmin_score = 0.9")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BanwatchError, ConfigError};

/// Banwatch 통합 설정
///
/// `banwatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BanwatchConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 파일 감시 설정
    #[serde(default)]
    pub watch: WatchConfig,
    /// 밴리스트 파일 설정
    #[serde(default)]
    pub banlist: BanlistConfig,
    /// 평판 서비스 설정
    #[serde(default)]
    pub reputation: ReputationConfig,
}

impl BanwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BanwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BanwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BanwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                BanwatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, BanwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            BanwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `BANWATCH_{SECTION}_{FIELD}`
    /// 예: `BANWATCH_REPUTATION_MIN_SCORE=0.9`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "BANWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "BANWATCH_GENERAL_LOG_FORMAT");

        // Watch
        override_csv(&mut self.watch.log_files, "BANWATCH_WATCH_LOG_FILES");
        override_u64(
            &mut self.watch.poll_interval_ms,
            "BANWATCH_WATCH_POLL_INTERVAL_MS",
        );

        // Banlist
        override_string(&mut self.banlist.path, "BANWATCH_BANLIST_PATH");

        // Reputation
        override_string(&mut self.reputation.endpoint, "BANWATCH_REPUTATION_ENDPOINT");
        override_string(&mut self.reputation.contact, "BANWATCH_REPUTATION_CONTACT");
        override_f64(
            &mut self.reputation.min_score,
            "BANWATCH_REPUTATION_MIN_SCORE",
        );
        override_u64(
            &mut self.reputation.timeout_ms,
            "BANWATCH_REPUTATION_TIMEOUT_MS",
        );
        override_u64(
            &mut self.reputation.cache_ttl_secs,
            "BANWATCH_REPUTATION_CACHE_TTL_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), BanwatchError> {
        self.general.validate()?;
        self.watch.validate()?;
        self.banlist.validate()?;
        self.reputation.validate()?;
        Ok(())
    }
}

/// 일반 설정 (로깅)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// tracing 필터 기본값 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 출력 형식 ("json" 또는 "pretty")
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

impl GeneralConfig {
    fn validate(&self) -> Result<(), BanwatchError> {
        if self.log_format != "json" && self.log_format != "pretty" {
            return Err(invalid_value(
                "general.log_format",
                format!("'{}' is not one of 'json', 'pretty'", self.log_format),
            ));
        }
        Ok(())
    }
}

/// 로그 파일 감시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// 감시할 로그 파일 경로 목록 (비어 있으면 안 됨)
    pub log_files: Vec<String>,
    /// 테일 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            log_files: vec!["/var/log/game/server.log".to_owned()],
            poll_interval_ms: 500,
        }
    }
}

impl WatchConfig {
    const MAX_POLL_INTERVAL_MS: u64 = 60_000;

    fn validate(&self) -> Result<(), BanwatchError> {
        if self.log_files.is_empty() {
            return Err(invalid_value(
                "watch.log_files",
                "at least one log file must be configured",
            ));
        }
        for path in &self.log_files {
            validate_file_path("watch.log_files", path)?;
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > Self::MAX_POLL_INTERVAL_MS {
            return Err(invalid_value(
                "watch.poll_interval_ms",
                format!("must be 1-{}", Self::MAX_POLL_INTERVAL_MS),
            ));
        }
        Ok(())
    }
}

/// 밴리스트 파일 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BanlistConfig {
    /// 밴리스트 파일 경로 (없으면 첫 기록 시 생성)
    pub path: String,
}

impl Default for BanlistConfig {
    fn default() -> Self {
        Self {
            path: "/var/lib/banwatch/banlist.txt".to_owned(),
        }
    }
}

impl BanlistConfig {
    fn validate(&self) -> Result<(), BanwatchError> {
        validate_file_path("banlist.path", &self.path)
    }
}

/// 평판 서비스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// 조회 엔드포인트 URL
    pub endpoint: String,
    /// 제공자에 전달할 연락처 (getipintel ToS 요구사항, 빈 값이면 생략)
    pub contact: String,
    /// 밴 판정 최소 점수 (이상이면 밴, 경계값 포함)
    pub min_score: f64,
    /// HTTP 요청 타임아웃 (밀리초)
    pub timeout_ms: u64,
    /// IP별 점수 캐시 TTL (초, 0이면 캐시 비활성화)
    pub cache_ttl_secs: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://check.getipintel.net/check.php".to_owned(),
            contact: String::new(),
            min_score: 0.95,
            timeout_ms: 5000,
            cache_ttl_secs: 3600,
        }
    }
}

impl ReputationConfig {
    const MAX_TIMEOUT_MS: u64 = 600_000;

    fn validate(&self) -> Result<(), BanwatchError> {
        if self.endpoint.is_empty() {
            return Err(invalid_value("reputation.endpoint", "must not be empty"));
        }
        if !self.min_score.is_finite() || !(0.0..=1.0).contains(&self.min_score) {
            return Err(invalid_value(
                "reputation.min_score",
                "must be a finite value within 0.0..=1.0",
            ));
        }
        if self.timeout_ms == 0 || self.timeout_ms > Self::MAX_TIMEOUT_MS {
            return Err(invalid_value(
                "reputation.timeout_ms",
                format!("must be 1-{}", Self::MAX_TIMEOUT_MS),
            ));
        }
        Ok(())
    }
}

// --- 검증/오버라이드 헬퍼 ---

fn invalid_value(field: &str, reason: impl Into<String>) -> BanwatchError {
    BanwatchError::Config(ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    })
}

/// 파일 경로가 안전한지 검증합니다 (절대 경로, ".." 금지).
fn validate_file_path(field: &str, path_str: &str) -> Result<(), BanwatchError> {
    if path_str.is_empty() {
        return Err(invalid_value(field, "path must not be empty"));
    }

    let path = Path::new(path_str);

    if path.components().any(|c| c == Component::ParentDir) {
        return Err(invalid_value(
            field,
            format!("path '{path_str}' contains path traversal pattern '..'"),
        ));
    }

    if !path.is_absolute() {
        return Err(invalid_value(
            field,
            format!("path '{path_str}' must be an absolute path"),
        ));
    }

    Ok(())
}

fn override_string(target: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *target = value;
    }
}

fn override_u64(target: &mut u64, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var, value, "ignoring non-numeric env override"),
        }
    }
}

fn override_f64(target: &mut f64, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(var, value, "ignoring non-numeric env override"),
        }
    }
}

fn override_csv(target: &mut Vec<String>, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *target = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
    }
}
