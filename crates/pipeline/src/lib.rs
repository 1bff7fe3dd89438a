#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`tail`]: 파일 끝에서부터 새 줄을 수집 (`tail -f` 방식, 로테이션 감지)
//! - [`extract`]: 타임스탬프 제거 후 Connect 패턴에서 IP 추출
//! - [`reputation`]: 평판 조회 trait, HTTP 제공자, 점수 캐시
//! - [`banlist`]: append 전용 중복 제거 밴리스트 스토어
//! - [`pipeline`]: 파일별 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입

pub mod banlist;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod reputation;
pub mod tail;

// --- 주요 타입 re-export ---

pub use banlist::{BanOutcome, BanlistStore};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::WatchError;
pub use extract::ConnectExtractor;
pub use pipeline::{WatchPipeline, WatchPipelineBuilder};
pub use reputation::{HttpScoreProvider, ScoreCache, ScoreProvider};
pub use tail::FileTailer;
