//! 파일 테일러 -- 커지는 로그 파일을 끝에서부터 따라갑니다.
//!
//! `tail -f`와 유사한 동작을 비동기 폴링 방식으로 구현합니다.
//! 시작 시점의 기존 내용은 무시하고, 이후 추가되는 줄만 순서대로
//! mpsc 채널로 전달합니다.
//!
//! # 로테이션/절단 감지
//! - inode 변경 감지 (logrotate 등, Unix 전용)
//! - 파일 크기 축소 감지 (truncation)
//! - 둘 다 새 내용의 처음(offset 0)부터 다시 따라갑니다
//!
//! 개행으로 끝나지 않은 미완성 줄은 offset을 전진시키지 않고
//! 다음 폴링에서 다시 읽습니다.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use banwatch_core::types::LogLine;

use crate::error::WatchError;

/// 파일 테일러
///
/// 파일 하나를 감시하며 새로 추가된 줄을 [`LogLine`]으로 만들어
/// 채널로 전달합니다. 파이프라인마다 하나씩 생성됩니다.
pub struct FileTailer {
    /// 감시 대상 파일 경로
    path: PathBuf,
    /// 폴링 주기
    poll_interval: Duration,
    /// 수집된 줄 전송 채널
    tx: mpsc::Sender<LogLine>,
    /// 마지막으로 소비한 바이트 오프셋
    offset: u64,
    /// 현재 파일의 inode (Unix 전용, 로테이션 감지용)
    #[cfg(unix)]
    inode: Option<u64>,
}

impl FileTailer {
    /// 새 테일러를 생성합니다.
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration, tx: mpsc::Sender<LogLine>) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            tx,
            offset: 0,
            #[cfg(unix)]
            inode: None,
        }
    }

    /// 감시 대상 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 테일링 루프를 실행합니다.
    ///
    /// 시작 시점에 파일이 존재하지 않으면 즉시 에러를 반환합니다
    /// (설정 오류로 간주). 이후에는 shutdown 브로드캐스트를 받을 때까지
    /// 실행되며, 로테이션으로 파일이 잠시 사라지는 것은 허용합니다.
    ///
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), WatchError> {
        let meta = fs::metadata(&self.path).await.map_err(|e| WatchError::Tail {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        // 기존 내용은 무시: 현재 파일 끝에서부터 따라간다.
        self.offset = meta.len();
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            self.inode = Some(meta.ino());
        }

        debug!(path = %self.path.display(), offset = self.offset, "tail started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(path = %self.path.display(), "tail shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match self.poll_once().await {
                Ok(()) => {}
                // 수신측이 닫히면 파이프라인이 종료 중이므로 루프를 끝낸다.
                Err(err @ WatchError::Channel(_)) => return Err(err),
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "tail poll failed, retrying");
                }
            }
        }
    }

    /// 한 번의 폴링: 로테이션 확인 후 새로 완성된 줄을 모두 전달합니다.
    async fn poll_once(&mut self) -> Result<(), WatchError> {
        let meta = match fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // 로테이션 도중 파일이 잠시 사라질 수 있다. 새 파일을 기다린다.
                self.offset = 0;
                #[cfg(unix)]
                {
                    self.inode = None;
                }
                return Ok(());
            }
            Err(e) => {
                return Err(WatchError::Tail {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let inode = meta.ino();
            if self.inode.is_some_and(|prev| prev != inode) {
                debug!(path = %self.path.display(), "rotation detected, following new file");
                self.offset = 0;
            }
            self.inode = Some(inode);
        }

        if meta.len() < self.offset {
            debug!(path = %self.path.display(), "truncation detected, resetting offset");
            self.offset = 0;
        }

        if meta.len() == self.offset {
            return Ok(());
        }

        let mut file = fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;

        let pending = meta.len() - self.offset;
        let mut buf = Vec::with_capacity(pending as usize);
        file.take(pending).read_to_end(&mut buf).await?;

        // 마지막 개행까지만 소비한다. 미완성 줄은 다음 폴링에서 다시 읽는다.
        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(());
        };

        let source = self.path.display().to_string();
        for raw in buf[..=last_newline].split(|&b| b == b'\n') {
            if raw.is_empty() {
                continue;
            }
            let text = String::from_utf8_lossy(raw);
            let text = text.trim_end_matches('\r');
            self.tx
                .send(LogLine::new(&source, text))
                .await
                .map_err(|_| WatchError::Channel("line receiver dropped".to_owned()))?;
        }

        self.offset += last_newline as u64 + 1;
        Ok(())
    }
}
