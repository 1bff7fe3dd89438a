//! 밴리스트 스토어 -- append 전용 중복 제거 영속 레지스트리
//!
//! 한 줄에 레코드 하나, `<ip>:<message>` 형식의 평문 파일입니다.
//! 외부 소비자(게임 서버/방화벽)가 이 파일을 다시 읽어 적용하므로
//! 새 레코드는 항상 끝에만 추가되고, 기존 줄은 절대 재정렬되거나
//! 다시 쓰이지 않습니다.
//!
//! # 중복 판정
//! 기록 전에 파일 전체를 스캔하여 `ip`로 **시작하는** 줄이 있으면
//! 이미 등록된 것으로 간주합니다. 이 접두사 비교는 원본 밴리스트
//! 소비자와의 호환을 위해 유지합니다: `"1.2.3.4"`는 `"1.2.3.40"`
//! 레코드에도 매칭됩니다.
//!
//! # 동시성
//! 스캔-후-추가 시퀀스 전체가 스토어별 비동기 뮤텍스로 직렬화되어,
//! 여러 파이프라인이 같은 새 IP를 동시에 기록해도 레코드는 정확히
//! 하나만 생깁니다.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::info;

use banwatch_core::types::BanRecord;

use crate::error::WatchError;

/// `add` 호출의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanOutcome {
    /// 새 레코드가 추가됨
    Added,
    /// 이미 등록되어 있어 기록을 생략함 (멱등 no-op)
    AlreadyListed,
}

/// 밴리스트 스토어
///
/// 모든 파이프라인이 같은 인스턴스를 `Arc`로 공유합니다.
pub struct BanlistStore {
    path: PathBuf,
    /// 스캔-후-추가 시퀀스를 직렬화하는 락
    write_lock: Mutex<()>,
}

impl BanlistStore {
    /// 주어진 경로를 사용하는 새 스토어를 생성합니다.
    ///
    /// 파일은 첫 기록 시점에 없으면 생성됩니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// 밴리스트 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// IP를 밴리스트에 추가합니다.
    ///
    /// 이미 등록된 IP면 기록 없이 [`BanOutcome::AlreadyListed`]를
    /// 반환합니다. 파일 열기/기록 실패는 에러로 반환되며, 호출측은
    /// 로그 후 다음 라인으로 진행합니다 (같은 IP의 다음 접속에서
    /// 자연스럽게 재시도됩니다).
    ///
    /// `score`는 판정 로그에만 쓰입니다.
    pub async fn add(&self, ip: &str, score: f64) -> Result<BanOutcome, WatchError> {
        let _guard = self.write_lock.lock().await;

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| WatchError::Banlist {
                path: self.path.display().to_string(),
                reason: format!("open failed: {e}"),
            })?;

        // TODO: 접두사 비교를 IP 정확 일치로 바꾸기 (소비자들이 접두사
        // 가림에 의존하지 않는 것이 확인되면).
        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines.next_line().await? {
            if line.starts_with(ip) {
                info!(ip, score, "already in banlist, skipping");
                return Ok(BanOutcome::AlreadyListed);
            }
        }

        // 스캔이 파일 끝에 도달함: 아직 밴되지 않은 정상 경로.
        let record = BanRecord::new(ip);
        let mut file = lines.into_inner().into_inner();
        file.write_all(format!("{record}\n").as_bytes())
            .await
            .map_err(|e| WatchError::Banlist {
                path: self.path.display().to_string(),
                reason: format!("append failed: {e}"),
            })?;
        file.flush().await.map_err(|e| WatchError::Banlist {
            path: self.path.display().to_string(),
            reason: format!("flush failed: {e}"),
        })?;

        info!(ip, score, "added to banlist");
        Ok(BanOutcome::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use banwatch_core::types::BAN_MESSAGE;

    fn store_in(dir: &tempfile::TempDir) -> BanlistStore {
        BanlistStore::new(dir.path().join("banlist.txt"))
    }

    #[tokio::test]
    async fn add_writes_expected_record_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let outcome = store.add("10.0.0.5", 0.9).await.unwrap();
        assert_eq!(outcome, BanOutcome::Added);

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, format!("10.0.0.5:{BAN_MESSAGE}\n"));
    }

    #[tokio::test]
    async fn second_add_for_same_ip_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.add("10.0.0.5", 0.9).await.unwrap(), BanOutcome::Added);
        assert_eq!(
            store.add("10.0.0.5", 0.99).await.unwrap(),
            BanOutcome::AlreadyListed
        );

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn prefix_match_shadows_longer_ip() {
        // 문서화된 접두사 비교 특성: 1.2.3.4 레코드가 1.2.3.40을 가린다.
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.add("1.2.3.4", 0.9).await.unwrap(), BanOutcome::Added);
        assert_eq!(
            store.add("1.2.3.40", 0.9).await.unwrap(),
            BanOutcome::AlreadyListed
        );

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("1.2.3.4:"));
    }

    #[tokio::test]
    async fn distinct_ips_get_distinct_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add("1.2.3.40", 0.9).await.unwrap();
        // 반대 순서의 접두사는 가리지 않는다
        assert_eq!(store.add("1.2.3.4", 0.9).await.unwrap(), BanOutcome::Added);

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn concurrent_adds_for_same_ip_write_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(
                async move { store.add("10.0.0.5", 0.9).await },
            ));
        }

        let mut added = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == BanOutcome::Added {
                added += 1;
            }
        }

        assert_eq!(added, 1);
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn open_failure_surfaces_as_banlist_error() {
        // 존재하지 않는 디렉토리 아래 경로는 생성에 실패한다
        let store = BanlistStore::new("/nonexistent-dir-banwatch/banlist.txt");
        let err = store.add("10.0.0.5", 0.9).await.unwrap_err();
        assert!(matches!(err, WatchError::Banlist { .. }));
    }
}
