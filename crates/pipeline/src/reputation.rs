//! 평판 조회 -- IP 위험 점수 질의
//!
//! [`ScoreProvider`]는 파이프라인과 평판 서비스 사이의 경계 trait입니다.
//! 테스트에서는 가짜 구현으로 대체합니다.
//!
//! 기본 구현 [`HttpScoreProvider`]는 getipintel 스타일 API를 호출합니다:
//!
//! ```text
//! GET {endpoint}?ip=<ip>&format=json&flags=m[&contact=<contact>]
//! -> {"status": "success", "result": "0.97", ...}
//! ```
//!
//! 조회 실패는 호출한 파이프라인에서 로그 후 해당 라인을 건너뛰며,
//! 이 크레이트 안에서 재시도하지 않습니다.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use banwatch_core::config::ReputationConfig;
use banwatch_core::types::ScoreResult;

use crate::error::WatchError;

/// 평판 조회 trait
///
/// 모든 파이프라인이 같은 provider 인스턴스를 `Arc`로 공유합니다.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// 제공자 이름 (로깅용)
    fn name(&self) -> &str;

    /// IP의 위험 점수를 조회합니다.
    async fn score(&self, ip: &str) -> Result<ScoreResult, WatchError>;
}

/// 캐시 엔트리
struct CacheEntry {
    result: ScoreResult,
    inserted_at: Instant,
}

/// IP별 점수 TTL 캐시
///
/// 같은 IP가 반복 접속할 때 원격 조회를 줄입니다.
/// provider 내부에 두어 모든 파이프라인이 공유합니다.
pub struct ScoreCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ScoreCache {
    /// 주어진 TTL로 새 캐시를 생성합니다.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 만료되지 않은 캐시 항목을 조회합니다.
    pub fn get(&self, ip: &str) -> Option<ScoreResult> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(ip)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.result.clone())
    }

    /// 조회 결과를 캐시에 넣고, 만료된 항목을 정리합니다.
    pub fn insert(&self, ip: &str, result: ScoreResult) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
            entries.insert(
                ip.to_owned(),
                CacheEntry {
                    result,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// 현재 캐시 항목 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// 캐시가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// getipintel 스타일 HTTP 평판 제공자
pub struct HttpScoreProvider {
    endpoint: String,
    contact: String,
    client: Client,
    cache: Option<ScoreCache>,
}

impl HttpScoreProvider {
    /// 설정에서 새 제공자를 생성합니다.
    ///
    /// `cache_ttl_secs = 0`이면 캐시를 두지 않습니다.
    pub fn new(config: &ReputationConfig) -> Result<Self, WatchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let cache = (config.cache_ttl_secs > 0)
            .then(|| ScoreCache::new(Duration::from_secs(config.cache_ttl_secs)));

        Ok(Self {
            endpoint: config.endpoint.clone(),
            contact: config.contact.clone(),
            client,
            cache,
        })
    }

    /// 제공자 응답 본문에서 점수를 추출합니다.
    ///
    /// getipintel은 성공 시 `status: "success"`와 함께 점수를 문자열로
    /// 돌려주며, 에러는 음수 `result` 코드로 보고합니다.
    fn parse_body(provider: &str, body: Value) -> Result<ScoreResult, WatchError> {
        let fail = |reason: String| WatchError::Reputation {
            provider: provider.to_owned(),
            reason,
        };

        let status = body.get("status").and_then(Value::as_str).unwrap_or("missing");
        if status != "success" {
            let code = body.get("result").and_then(Value::as_str).unwrap_or("?");
            return Err(fail(format!("provider status '{status}' (result {code})")));
        }

        let score = match body.get("result") {
            Some(Value::String(s)) => s.parse::<f64>().ok(),
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
        .ok_or_else(|| fail("missing or malformed 'result' field".to_owned()))?;

        // 음수는 제공자 에러 코드, 1 초과는 프로토콜 위반
        if !(0.0..=1.0).contains(&score) {
            return Err(fail(format!("provider error code {score}")));
        }

        Ok(ScoreResult::new(score).with_metadata(body))
    }
}

#[async_trait]
impl ScoreProvider for HttpScoreProvider {
    fn name(&self) -> &str {
        "getipintel"
    }

    async fn score(&self, ip: &str) -> Result<ScoreResult, WatchError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(ip) {
                debug!(ip, score = hit.score, "score cache hit");
                return Ok(hit);
            }
        }

        let mut query: Vec<(&str, &str)> = vec![("ip", ip), ("format", "json"), ("flags", "m")];
        if !self.contact.is_empty() {
            query.push(("contact", &self.contact));
        }

        debug!(ip, endpoint = %self.endpoint, "querying reputation service");

        let response = self.client.get(&self.endpoint).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Reputation {
                provider: self.name().to_owned(),
                reason: format!("HTTP {status}"),
            });
        }

        let body: Value = response.json().await?;
        let result = Self::parse_body(self.name(), body)?;

        if let Some(cache) = &self.cache {
            cache.insert(ip, result.clone());
        }

        Ok(result)
    }
}
