//! 파이프라인 오케스트레이션 -- 파일별 테일링/추출/조회/판정/기록 흐름
//!
//! [`WatchPipeline`]은 core의 [`Pipeline`](banwatch_core::pipeline::Pipeline)
//! trait을 구현하여 데몬에서 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! (파일마다) FileTailer -> mpsc -> 처리 루프
//!                                   extract -> provider.score -> min_score 판정 -> store.add
//! ```
//!
//! 파이프라인 내에서 라인은 테일러가 전달한 순서 그대로 처리됩니다.
//! 파이프라인 사이에는 순서 보장이 없으며, 스토어와 provider만 공유합니다.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use banwatch_core::error::{BanwatchError, PipelineError};
use banwatch_core::pipeline::{HealthStatus, Pipeline};
use banwatch_core::types::LogLine;

use crate::banlist::{BanOutcome, BanlistStore};
use crate::config::PipelineConfig;
use crate::error::WatchError;
use crate::extract::ConnectExtractor;
use crate::reputation::ScoreProvider;
use crate::tail::FileTailer;

/// stop() 시 태스크가 스스로 종료되길 기다리는 최대 시간
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 로그 감시 파이프라인
///
/// 설정된 로그 파일마다 독립적인 테일링/처리 태스크 쌍을 실행합니다.
///
/// # 사용 예시
/// ```ignore
/// use banwatch_pipeline::{WatchPipelineBuilder, HttpScoreProvider, BanlistStore};
///
/// let mut pipeline = WatchPipelineBuilder::new()
///     .config(config)
///     .provider(provider)
///     .store(store)
///     .build()?;
///
/// pipeline.start().await?;
/// ```
pub struct WatchPipeline {
    /// 파이프라인 설정
    config: PipelineConfig,
    /// 현재 상태
    state: PipelineState,
    /// 평판 제공자 (모든 파이프라인 공유)
    provider: Arc<dyn ScoreProvider>,
    /// 밴리스트 스토어 (모든 파이프라인 공유)
    store: Arc<BanlistStore>,
    /// shutdown 브로드캐스트 송신측
    shutdown_tx: broadcast::Sender<()>,
    /// 백그라운드 태스크 핸들
    tasks: Vec<JoinHandle<()>>,
}

impl WatchPipeline {
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 실행 중인 백그라운드 태스크 수를 반환합니다.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Pipeline for WatchPipeline {
    async fn start(&mut self) -> Result<(), BanwatchError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(files = self.config.log_files.len(), "starting watch pipeline");

        // 태스크를 하나라도 스폰하기 전에 모든 파일의 존재를 확인한다.
        // 설정된 파일 중 하나라도 없으면 전체 시작이 실패한다 (의도된
        // 단순화: 잘못된 경로 하나가 프로세스 전체를 중단시킨다).
        for path in &self.config.log_files {
            if tokio::fs::metadata(path).await.is_err() {
                return Err(PipelineError::WatchFileNotFound { path: path.clone() }.into());
            }
        }

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        for path in &self.config.log_files {
            // 파이프라인마다 자체 추출기 인스턴스를 만든다.
            let extractor = ConnectExtractor::new().map_err(BanwatchError::from)?;

            let (line_tx, line_rx) = mpsc::channel(self.config.channel_capacity);

            let tailer = FileTailer::new(path, poll_interval, line_tx);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let tail_path = path.clone();
            self.tasks.push(tokio::spawn(async move {
                match tailer.run(shutdown_rx).await {
                    Ok(()) => debug!(path = %tail_path, "tail task finished"),
                    Err(WatchError::Channel(_)) => {
                        debug!(path = %tail_path, "line channel closed, tail task exiting");
                    }
                    Err(err) => warn!(path = %tail_path, error = %err, "tail task failed"),
                }
            }));

            let provider = Arc::clone(&self.provider);
            let store = Arc::clone(&self.store);
            let min_score = self.config.min_score;
            self.tasks.push(tokio::spawn(process_lines(
                line_rx, extractor, provider, store, min_score,
            )));

            info!(path = %path, "watching log file");
        }

        self.state = PipelineState::Running;
        info!("watch pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BanwatchError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping watch pipeline");

        // 테일러가 shutdown을 받으면 line 채널이 닫히고,
        // 처리 루프는 남은 라인을 소진한 뒤 스스로 끝난다.
        let _ = self.shutdown_tx.send(());

        for mut task in self.tasks.drain(..) {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("task did not stop in time, aborting");
                task.abort();
            }
        }

        self.state = PipelineState::Stopped;
        info!("watch pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                let dead = self.tasks.iter().filter(|t| t.is_finished()).count();
                if dead > 0 {
                    HealthStatus::Degraded(format!("{dead} background task(s) exited"))
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 채널에서 라인을 받아 순서대로 처리하는 루프
///
/// 채널이 닫히면 (테일러 종료) 루프도 끝납니다.
async fn process_lines(
    mut line_rx: mpsc::Receiver<LogLine>,
    extractor: ConnectExtractor,
    provider: Arc<dyn ScoreProvider>,
    store: Arc<BanlistStore>,
    min_score: f64,
) {
    while let Some(line) = line_rx.recv().await {
        handle_line(&line, &extractor, provider.as_ref(), &store, min_score).await;
    }
    debug!("line channel drained, processing loop exiting");
}

/// 라인 하나에 대한 전체 판정 흐름
///
/// 모든 복구 가능한 에러는 여기서 로그로 해소되며 전파되지 않습니다.
/// 다음 라인 처리가 곧 자연스러운 재시도입니다.
pub(crate) async fn handle_line(
    line: &LogLine,
    extractor: &ConnectExtractor,
    provider: &dyn ScoreProvider,
    store: &BanlistStore,
    min_score: f64,
) {
    counter!("banwatch_lines_total").increment(1);

    let Some(ip) = extractor.extract(&line.text) else {
        return;
    };
    counter!("banwatch_connects_total").increment(1);

    let result = match provider.score(ip).await {
        Ok(result) => result,
        Err(err) => {
            counter!("banwatch_reputation_errors_total").increment(1);
            warn!(ip, source = %line.source, error = %err, "reputation lookup failed, skipping line");
            return;
        }
    };

    // 경계값 포함: score == min_score 도 밴 대상
    if result.score < min_score {
        info!(ip, score = result.score, min_score, "score below minimum, skipping");
        return;
    }

    match store.add(ip, result.score).await {
        Ok(BanOutcome::Added) => {
            counter!("banwatch_bans_total").increment(1);
        }
        Ok(BanOutcome::AlreadyListed) => {}
        Err(err) => {
            warn!(ip, error = %err, "banlist write failed, dropping this attempt");
        }
    }
}

/// 파이프라인 빌더
///
/// 전역 싱글턴 대신 provider와 store 핸들을 명시적으로 주입받습니다.
/// 테스트에서는 가짜 provider/임시 파일 store로 대체할 수 있습니다.
pub struct WatchPipelineBuilder {
    config: PipelineConfig,
    provider: Option<Arc<dyn ScoreProvider>>,
    store: Option<Arc<BanlistStore>>,
}

impl WatchPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            provider: None,
            store: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 평판 제공자를 지정합니다 (필수).
    pub fn provider(mut self, provider: Arc<dyn ScoreProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// 밴리스트 스토어를 지정합니다.
    ///
    /// 지정하지 않으면 설정의 `banlist_path`로 새 스토어를 만듭니다.
    pub fn store(mut self, store: Arc<BanlistStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 파이프라인을 빌드합니다.
    pub fn build(self) -> Result<WatchPipeline, WatchError> {
        self.config.validate()?;

        let provider = self.provider.ok_or_else(|| WatchError::Config {
            field: "provider".to_owned(),
            reason: "a score provider is required".to_owned(),
        })?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(BanlistStore::new(&self.config.banlist_path)));

        let (shutdown_tx, _) = broadcast::channel(4);

        Ok(WatchPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            provider,
            store,
            shutdown_tx,
            tasks: Vec::new(),
        })
    }
}

impl Default for WatchPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
