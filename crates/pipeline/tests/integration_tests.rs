//! 통합 테스트 -- 로그 추가부터 밴리스트 기록까지 전체 흐름 검증

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use banwatch_core::pipeline::Pipeline;
use banwatch_core::types::{BAN_MESSAGE, ScoreResult};
use banwatch_pipeline::config::PipelineConfigBuilder;
use banwatch_pipeline::error::WatchError;
use banwatch_pipeline::pipeline::WatchPipelineBuilder;
use banwatch_pipeline::reputation::ScoreProvider;

/// 고정 점수를 돌려주고 호출 횟수를 세는 가짜 provider
struct FixedScoreProvider {
    score: f64,
    calls: AtomicUsize,
}

impl FixedScoreProvider {
    fn new(score: f64) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreProvider for FixedScoreProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn score(&self, _ip: &str) -> Result<ScoreResult, WatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ScoreResult::new(self.score))
    }
}

fn append(path: &Path, data: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(data.as_bytes()).unwrap();
}

/// 조건이 참이 될 때까지 폴링하며 기다립니다.
async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}

/// 전체 흐름: 접속 라인 추가 -> 점수 조회 -> 밴리스트 기록
#[tokio::test]
async fn qualifying_connect_line_lands_in_the_banlist() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("server.log");
    let banlist_path = dir.path().join("banlist.txt");
    std::fs::write(&log_path, "").unwrap();

    let config = PipelineConfigBuilder::new()
        .log_files(vec![log_path.to_string_lossy().into_owned()])
        .banlist_path(banlist_path.to_string_lossy().into_owned())
        .poll_interval_ms(20)
        .min_score(0.5)
        .build()
        .unwrap();

    let provider = FixedScoreProvider::new(0.9);
    let mut pipeline = WatchPipelineBuilder::new()
        .config(config)
        .provider(provider.clone())
        .build()
        .unwrap();

    pipeline.start().await.unwrap();

    // 시작 전 내용은 무시되도록 테일러가 자리잡을 시간을 준다
    tokio::time::sleep(Duration::from_millis(100)).await;
    append(&log_path, "12:34:56 Connect (v1.0): 10.0.0.5 extra\n");

    assert!(wait_until(|| banlist_path.exists()).await);
    pipeline.stop().await.unwrap();

    let content = std::fs::read_to_string(&banlist_path).unwrap();
    assert_eq!(content, format!("10.0.0.5:{BAN_MESSAGE}\n"));
    assert_eq!(provider.calls(), 1);
}

/// 점수가 임계값 미만이면 밴리스트는 비어 있어야 한다
#[tokio::test]
async fn below_threshold_score_leaves_banlist_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("server.log");
    let banlist_path = dir.path().join("banlist.txt");
    std::fs::write(&log_path, "").unwrap();

    let config = PipelineConfigBuilder::new()
        .log_files(vec![log_path.to_string_lossy().into_owned()])
        .banlist_path(banlist_path.to_string_lossy().into_owned())
        .poll_interval_ms(20)
        .min_score(0.5)
        .build()
        .unwrap();

    let provider = FixedScoreProvider::new(0.2);
    let mut pipeline = WatchPipelineBuilder::new()
        .config(config)
        .provider(provider.clone())
        .build()
        .unwrap();

    pipeline.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    append(&log_path, "12:34:56 Connect (v1.0): 10.0.0.5 extra\n");

    // 라인이 provider까지는 도달하고
    assert!(wait_until(|| provider.calls() >= 1).await);
    pipeline.stop().await.unwrap();

    // 스토어는 호출되지 않는다
    assert!(!banlist_path.exists());
}

/// 여러 파일을 감시할 때 모든 파이프라인이 같은 스토어로 합류한다
#[tokio::test]
async fn multiple_watched_files_share_one_banlist() {
    let dir = tempfile::tempdir().unwrap();
    let log_a = dir.path().join("a.log");
    let log_b = dir.path().join("b.log");
    let banlist_path = dir.path().join("banlist.txt");
    std::fs::write(&log_a, "").unwrap();
    std::fs::write(&log_b, "").unwrap();

    let config = PipelineConfigBuilder::new()
        .log_files(vec![
            log_a.to_string_lossy().into_owned(),
            log_b.to_string_lossy().into_owned(),
        ])
        .banlist_path(banlist_path.to_string_lossy().into_owned())
        .poll_interval_ms(20)
        .min_score(0.5)
        .build()
        .unwrap();

    let provider = FixedScoreProvider::new(1.0);
    let mut pipeline = WatchPipelineBuilder::new()
        .config(config)
        .provider(provider.clone())
        .build()
        .unwrap();

    pipeline.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    append(&log_a, "Connect (v1.0): 10.0.0.1\n");
    append(&log_b, "Connect (v1.0): 10.0.0.2\n");

    assert!(
        wait_until(|| {
            std::fs::read_to_string(&banlist_path)
                .map(|c| c.lines().count() == 2)
                .unwrap_or(false)
        })
        .await
    );
    pipeline.stop().await.unwrap();

    let content = std::fs::read_to_string(&banlist_path).unwrap();
    assert!(content.contains("10.0.0.1:"));
    assert!(content.contains("10.0.0.2:"));
}

/// 파이프라인 생명주기: start 중복 호출은 에러, stop 후 헬스는 Unhealthy
#[tokio::test]
async fn pipeline_lifecycle_transitions() {
    use banwatch_core::pipeline::HealthStatus;

    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("server.log");
    std::fs::write(&log_path, "").unwrap();

    let config = PipelineConfigBuilder::new()
        .log_files(vec![log_path.to_string_lossy().into_owned()])
        .banlist_path(dir.path().join("banlist.txt").to_string_lossy().into_owned())
        .poll_interval_ms(20)
        .build()
        .unwrap();

    let mut pipeline = WatchPipelineBuilder::new()
        .config(config)
        .provider(FixedScoreProvider::new(0.0))
        .build()
        .unwrap();

    assert_eq!(
        pipeline.health_check().await,
        HealthStatus::Unhealthy("not started".to_owned())
    );

    pipeline.start().await.unwrap();
    assert_eq!(pipeline.health_check().await, HealthStatus::Healthy);
    assert!(pipeline.start().await.is_err());

    pipeline.stop().await.unwrap();
    assert_eq!(
        pipeline.health_check().await,
        HealthStatus::Unhealthy("stopped".to_owned())
    );
}
