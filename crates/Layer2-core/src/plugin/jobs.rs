//! Background Jobs - 네트워크 작업 백그라운드 실행
//!
//! 설치/제거/카탈로그/업데이트 확인처럼 오래 걸리는 작업을 tokio 런타임에서
//! 실행하고, 결과는 채널로 소유 스레드에 전달합니다. 소유 스레드는
//! [`JobRunner::try_next`]로 자신의 이벤트 루프에서 결과를 꺼내 갑니다.
//!
//! ```ignore
//! let mut jobs = JobRunner::new(installer, runtime.handle().clone());
//! jobs.submit(Job::CheckUpdates { repository: None })?;
//!
//! // UI 루프 안에서
//! while let Some(result) = jobs.try_next() {
//!     render(result);
//! }
//! ```

use super::catalog::RemoteCatalogEntry;
use super::installer::{InstallOutcome, PluginInstaller};
use super::update::UpdateCandidate;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tickr_foundation::{Error, Result};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

/// 백그라운드 작업
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Install {
        source: String,
        subpath: Option<String>,
    },
    Uninstall {
        name: String,
    },
    Catalog {
        repository: String,
    },
    CheckUpdates {
        repository: Option<String>,
    },
}

impl Job {
    /// 중복 실행 방지 키
    pub fn key(&self) -> String {
        match self {
            Job::Install { source, subpath } => match subpath {
                Some(sub) => format!("install:{}:{}", source, sub),
                None => format!("install:{}", source),
            },
            Job::Uninstall { name } => format!("uninstall:{}", name),
            Job::Catalog { repository } => format!("catalog:{}", repository),
            Job::CheckUpdates { repository } => match repository {
                Some(repo) => format!("check-updates:{}", repo),
                None => "check-updates".to_string(),
            },
        }
    }
}

/// 작업 결과 값
#[derive(Debug, Clone)]
pub enum JobOutput {
    Installed(InstallOutcome),
    Uninstalled(String),
    Catalog(Vec<RemoteCatalogEntry>),
    Updates(Vec<UpdateCandidate>),
}

/// 완료된 작업
#[derive(Debug)]
pub struct JobResult {
    pub key: String,
    pub job: Job,
    pub output: Result<JobOutput>,
}

/// 작업 키 점유 (Drop 시 해제, 작업이 패닉해도 풀림)
struct JobSlot {
    in_flight: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

/// 백그라운드 작업 실행기
pub struct JobRunner {
    installer: Arc<PluginInstaller>,
    handle: Handle,
    in_flight: Arc<Mutex<HashSet<String>>>,
    tx: mpsc::UnboundedSender<JobResult>,
    rx: mpsc::UnboundedReceiver<JobResult>,
}

impl JobRunner {
    pub fn new(installer: Arc<PluginInstaller>, handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            installer,
            handle,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            tx,
            rx,
        }
    }

    /// 작업 제출 (같은 키가 실행 중이면 Busy)
    pub fn submit(&self, job: Job) -> Result<String> {
        let key = job.key();
        if !self.in_flight.lock().insert(key.clone()) {
            return Err(Error::Busy(key));
        }

        debug!("Submitting job {}", key);
        let installer = Arc::clone(&self.installer);
        let slot = JobSlot {
            in_flight: Arc::clone(&self.in_flight),
            key: key.clone(),
        };
        let tx = self.tx.clone();

        self.handle.spawn(async move {
            let output = run(&installer, &job).await;
            let task_key = slot.key.clone();
            drop(slot);
            // 수신자가 없으면 결과 폐기
            let _ = tx.send(JobResult {
                key: task_key,
                job,
                output,
            });
        });

        Ok(key)
    }

    /// 실행 중인 작업 여부
    pub fn is_running(&self, key: &str) -> bool {
        self.in_flight.lock().contains(key)
    }

    /// 실행 중인 작업 수
    pub fn pending(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// 완료된 결과 하나 (대기하지 않음)
    pub fn try_next(&mut self) -> Option<JobResult> {
        self.rx.try_recv().ok()
    }

    /// 다음 결과 대기
    pub async fn recv(&mut self) -> Option<JobResult> {
        self.rx.recv().await
    }
}

async fn run(installer: &PluginInstaller, job: &Job) -> Result<JobOutput> {
    match job {
        Job::Install { source, subpath } => installer
            .install_from_source(source, subpath.as_deref())
            .await
            .map(JobOutput::Installed),
        Job::Uninstall { name } => installer
            .uninstall(name)
            .await
            .map(|_| JobOutput::Uninstalled(name.clone())),
        Job::Catalog { repository } => installer
            .fetch_catalog(repository)
            .await
            .map(JobOutput::Catalog),
        Job::CheckUpdates { repository } => installer
            .check_for_updates(repository.as_deref())
            .await
            .map(JobOutput::Updates),
    }
}
