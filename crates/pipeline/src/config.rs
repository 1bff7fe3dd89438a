//! 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`BanwatchConfig`](banwatch_core::config::BanwatchConfig)에서
//! 파이프라인이 실제로 사용하는 값만 추려낸 평탄화된 뷰입니다.
//!
//! # 사용 예시
//! ```ignore
//! use banwatch_core::config::BanwatchConfig;
//! use banwatch_pipeline::config::PipelineConfig;
//!
//! let core_config = BanwatchConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 감시할 로그 파일 경로 목록
    pub log_files: Vec<String>,
    /// 테일 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 밴리스트 파일 경로
    pub banlist_path: String,
    /// 밴 판정 최소 점수 (경계값 포함)
    pub min_score: f64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 테일러 -> 파이프라인 라인 채널 용량
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_files: vec!["/var/log/game/server.log".to_owned()],
            poll_interval_ms: 500,
            banlist_path: "/var/lib/banwatch/banlist.txt".to_owned(),
            min_score: 0.95,
            channel_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    /// core의 `BanwatchConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &banwatch_core::config::BanwatchConfig) -> Self {
        Self {
            log_files: core.watch.log_files.clone(),
            poll_interval_ms: core.watch.poll_interval_ms,
            banlist_path: core.banlist.path.clone(),
            min_score: core.reputation.min_score,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// core 설정을 거치지 않고 빌더로 직접 구성된 경우를 대비한
    /// 최소한의 검증입니다.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.log_files.is_empty() {
            return Err(WatchError::Config {
                field: "log_files".to_owned(),
                reason: "at least one log file must be configured".to_owned(),
            });
        }
        if self.banlist_path.is_empty() {
            return Err(WatchError::Config {
                field: "banlist_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(WatchError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if !self.min_score.is_finite() || !(0.0..=1.0).contains(&self.min_score) {
            return Err(WatchError::Config {
                field: "min_score".to_owned(),
                reason: "must be a finite value within 0.0..=1.0".to_owned(),
            });
        }
        if self.channel_capacity == 0 {
            return Err(WatchError::Config {
                field: "channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 감시 파일 목록을 설정합니다.
    pub fn log_files(mut self, files: Vec<String>) -> Self {
        self.config.log_files = files;
        self
    }

    /// 폴링 주기(밀리초)를 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 밴리스트 경로를 설정합니다.
    pub fn banlist_path(mut self, path: impl Into<String>) -> Self {
        self.config.banlist_path = path.into();
        self
    }

    /// 최소 점수를 설정합니다.
    pub fn min_score(mut self, score: f64) -> Self {
        self.config.min_score = score;
        self
    }

    /// 라인 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, WatchError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = banwatch_core::config::BanwatchConfig::default();
        core.watch.log_files = vec!["/var/log/game/eu.log".to_owned()];
        core.watch.poll_interval_ms = 100;
        core.reputation.min_score = 0.5;

        let config = PipelineConfig::from_core(&core);
        assert_eq!(config.log_files, vec!["/var/log/game/eu.log".to_owned()]);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.min_score, 0.5);
        // 확장 필드는 기본값
        assert_eq!(config.channel_capacity, 1024);
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = PipelineConfigBuilder::new()
            .log_files(vec!["/tmp/test.log".to_owned()])
            .poll_interval_ms(50)
            .banlist_path("/tmp/banlist.txt")
            .min_score(0.5)
            .build()
            .unwrap();
        assert_eq!(config.min_score, 0.5);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn builder_rejects_empty_log_files() {
        let result = PipelineConfigBuilder::new().log_files(Vec::new()).build();
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_nan_min_score() {
        let config = PipelineConfig {
            min_score: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
