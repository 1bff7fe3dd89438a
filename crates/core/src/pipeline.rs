//! 파이프라인 trait -- 모듈 생명주기 정의
//!
//! 데몬은 이 trait을 통해 파이프라인을 시작/정지하고 상태를 조회합니다.
//!
//! # 생명주기
//! ```text
//! Initialized -> start() -> Running -> stop() -> Stopped
//! ```

use crate::error::BanwatchError;

/// 파이프라인 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작 중이나 일부 기능 저하 (사유 포함)
    Degraded(String),
    /// 동작 불가 (사유 포함)
    Unhealthy(String),
}

/// 파이프라인 생명주기 trait
///
/// 구현체는 `start()`에서 백그라운드 태스크를 스폰하고,
/// `stop()`에서 모든 태스크를 정리해야 합니다.
#[allow(async_fn_in_trait)]
pub trait Pipeline: Send {
    /// 파이프라인을 시작합니다.
    ///
    /// 이미 실행 중이면 [`PipelineError::AlreadyRunning`](crate::error::PipelineError::AlreadyRunning)을
    /// 반환합니다.
    async fn start(&mut self) -> Result<(), BanwatchError>;

    /// 파이프라인을 정지하고 백그라운드 태스크를 정리합니다.
    async fn stop(&mut self) -> Result<(), BanwatchError>;

    /// 현재 헬스 상태를 반환합니다.
    async fn health_check(&self) -> HealthStatus;
}
