use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domain::error::{DispatchError, Result};
use domain::model::{StatusMap, Submission};
use domain::service::JobScheduler;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::infrastructure::command::Exec;

/// Predicate deciding whether a finished script satisfied the caller.
pub type CheckSuccess = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// A bounded pool of workers draining a shared queue of scripts.
///
/// Once any script satisfies `check_success`, the remaining queue is drained
/// without execution; scripts already in flight are not preempted.
#[derive(TypedBuilder)]
pub struct LocalPool {
    pub scripts: Vec<PathBuf>,

    #[builder(default, setter(strip_option))]
    pub check_success: Option<CheckSuccess>,

    #[builder(default)]
    pub directory: Option<PathBuf>,

    #[builder(default = 1)]
    pub nproc: usize,

    #[builder(default)]
    pub permit_nonzero: bool,

    /// Bounds each worker join, not individual script runtime.
    #[builder(default, setter(strip_option))]
    pub timeout: Option<Duration>,
}

impl LocalPool {
    /// Run every queued script across `nproc` workers, blocking until the
    /// whole pool has drained.
    pub async fn run(self) -> Result<()> {
        let (tx, rx) = flume::unbounded();
        for script in self.scripts {
            let _ = tx.send(Some(script));
        }
        // One sentinel per worker so each sees the end of the queue.
        for _ in 0..self.nproc {
            let _ = tx.send(None);
        }
        drop(tx);

        let succeeded = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(self.nproc);
        for n in 0..self.nproc {
            workers.push(tokio::spawn(worker(
                n,
                rx.clone(),
                Arc::clone(&succeeded),
                self.check_success.clone(),
                self.directory.clone(),
                self.permit_nonzero,
            )));
        }
        drop(rx);

        for handle in workers {
            let joined = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
                    DispatchError::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "worker did not finish in time",
                    ))
                })?,
                None => handle.await,
            };
            joined.map_err(|e| DispatchError::Io(io::Error::other(e)))?;
        }
        Ok(())
    }
}

async fn worker(
    n: usize,
    queue: flume::Receiver<Option<PathBuf>>,
    succeeded: Arc<AtomicBool>,
    check_success: Option<CheckSuccess>,
    directory: Option<PathBuf>,
    permit_nonzero: bool,
) {
    while let Ok(item) = queue.recv_async().await {
        let Some(script) = item else {
            break;
        };
        if succeeded.load(Ordering::SeqCst) {
            tracing::debug!(worker = n, "draining {} from the queue", script.display());
            continue;
        }
        tracing::debug!(worker = n, "running {}", script.display());
        let exec = Exec::builder()
            .argv(vec![script.display().to_string()])
            .directory(directory.clone())
            .permit_nonzero(permit_nonzero)
            .build();
        let stdout = match exec.run().await {
            Ok(stdout) => stdout,
            // A failing script is fatal for the job, not for the pool.
            Err(DispatchError::Execution { code, output, .. }) => {
                tracing::error!(worker = n, code, "{} exited non-zero", script.display());
                output
            }
            Err(e) => {
                tracing::error!(worker = n, "{} could not run: {e}", script.display());
                continue;
            }
        };
        let log = script.with_extension("log");
        if let Err(e) = tokio::fs::write(&log, stdout).await {
            tracing::error!(worker = n, "cannot write {}: {e}", log.display());
        }
        if let Some(check) = &check_success {
            if check(&script) {
                tracing::debug!(worker = n, "{} satisfied the success check", script.display());
                succeeded.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Adapter exposing the pool through the uniform scheduler interface.
///
/// A submission runs to completion before the generated run token is
/// returned, so a token's status is always the empty map.
pub struct LocalScheduler {
    nproc: usize,
}

impl LocalScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self { nproc: config.nproc }
    }
}

#[async_trait::async_trait]
impl JobScheduler for LocalScheduler {
    async fn submit(&self, submission: Submission) -> Result<String> {
        LocalPool::builder()
            .scripts(submission.command)
            .directory(submission.directory)
            .nproc(submission.nproc.unwrap_or(self.nproc).max(1))
            .permit_nonzero(submission.permit_nonzero)
            .build()
            .run()
            .await?;
        Ok(Uuid::new_v4().to_string())
    }

    async fn status(&self, _job_id: &str) -> Result<StatusMap> {
        Ok(StatusMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn make_script(directory: &Path, index: usize, body: &str) -> PathBuf {
        let path = directory.join(format!("job{index}.sh"));
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn every_script_runs_and_leaves_a_log() {
        let tmp = tempfile::tempdir().unwrap();
        let jobs: Vec<PathBuf> = (0..4)
            .map(|i| make_script(tmp.path(), i, &format!("echo I am job: {i}")))
            .collect();

        LocalPool::builder()
            .scripts(jobs.clone())
            .nproc(2)
            .build()
            .run()
            .await
            .unwrap();

        for (i, job) in jobs.iter().enumerate() {
            let log = fs::read_to_string(job.with_extension("log")).unwrap();
            assert_eq!(format!("I am job: {i}"), log.trim());
        }
    }

    #[tokio::test]
    async fn single_worker_preserves_queue_order() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("order.txt");
        let jobs: Vec<PathBuf> = (0..3)
            .map(|i| {
                make_script(tmp.path(), i, &format!("echo {i} >> {}", marker.display()))
            })
            .collect();

        LocalPool::builder().scripts(jobs).build().run().await.unwrap();

        let order = fs::read_to_string(&marker).unwrap();
        assert_eq!(vec!["0", "1", "2"], order.lines().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn a_failing_script_does_not_stop_the_pool() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = make_script(tmp.path(), 0, "echo broken; exit 1");
        let good = make_script(tmp.path(), 1, "echo fine");

        LocalPool::builder()
            .scripts(vec![bad.clone(), good.clone()])
            .build()
            .run()
            .await
            .unwrap();

        assert_eq!("broken", fs::read_to_string(bad.with_extension("log")).unwrap().trim());
        assert_eq!("fine", fs::read_to_string(good.with_extension("log")).unwrap().trim());
    }

    #[tokio::test]
    async fn success_check_skips_the_remaining_queue() {
        let tmp = tempfile::tempdir().unwrap();
        let jobs: Vec<PathBuf> = (0..6)
            .map(|i| make_script(tmp.path(), i, &format!("sleep 0.2\necho I am job: {i}")))
            .collect();

        let check: CheckSuccess = Arc::new(|script: &Path| {
            script.file_name().is_some_and(|name| name == "job3.sh")
        });
        LocalPool::builder()
            .scripts(jobs.clone())
            .check_success(check)
            .nproc(2)
            .build()
            .run()
            .await
            .unwrap();

        for job in &jobs[..4] {
            assert!(job.with_extension("log").is_file(), "missing log for {}", job.display());
        }
        assert!(!jobs[5].with_extension("log").is_file());
    }

    #[tokio::test]
    async fn trait_submission_yields_a_run_token_and_an_empty_status() {
        let tmp = tempfile::tempdir().unwrap();
        let job = make_script(tmp.path(), 0, "echo done");
        let scheduler = LocalScheduler::new(&SchedulerConfig::default());

        let submission = Submission::builder().command(vec![job.clone()]).build();
        let token = scheduler.submit(submission).await.unwrap();

        assert!(!token.is_empty());
        assert!(scheduler.status(&token).await.unwrap().is_empty());
        assert!(job.with_extension("log").is_file());
    }
}
