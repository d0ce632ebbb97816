use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use domain::error::{DispatchError, Result};
use domain::model::{StatusMap, Submission};
use domain::service::{ControlOutcome, JobScheduler};

/// Handle to one submission against a single backend.
///
/// A `Job` is created unsubmitted, bound to a native identifier by the one
/// permitted [`submit`](Job::submit) call, and considered finished once its
/// backend no longer reports it.
pub struct Job {
    scheduler: Arc<dyn JobScheduler>,
    id: Option<String>,
    scripts: Vec<PathBuf>,
    logs: Vec<PathBuf>,
}

impl Job {
    pub fn new(scheduler: Arc<dyn JobScheduler>) -> Self {
        Self {
            scheduler,
            id: None,
            scripts: Vec::new(),
            logs: Vec::new(),
        }
    }

    /// The native identifier bound at submission, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn scripts(&self) -> &[PathBuf] {
        &self.scripts
    }

    /// Expected per-script logfiles, one per submitted script.
    pub fn logs(&self) -> &[PathBuf] {
        &self.logs
    }

    /// Submit the request through the backend selected at construction.
    ///
    /// Every script must exist and be executable before any side effect
    /// happens. A second call on an already-submitted instance is a logged
    /// no-op rather than a double submission.
    pub async fn submit(&mut self, mut submission: Submission) -> Result<()> {
        if let Some(id) = &self.id {
            tracing::warn!(%id, "job already submitted, ignoring");
            return Ok(());
        }
        validate_scripts(&submission.command)?;
        if submission.directory.is_none() {
            submission.directory = Some(env::current_dir()?);
        }
        self.scripts = submission.command.clone();
        self.logs = submission.command.iter().map(|s| s.with_extension("log")).collect();
        let id = self.scheduler.submit(submission).await?;
        tracing::debug!(%id, "job submitted");
        self.id = Some(id);
        Ok(())
    }

    /// Snapshot the backend's view of this job. Unsubmitted jobs and jobs
    /// the backend has forgotten both yield an empty map.
    pub async fn stat(&self) -> Result<StatusMap> {
        match &self.id {
            Some(id) => self.scheduler.status(id).await,
            None => Ok(StatusMap::new()),
        }
    }

    /// A job is finished once the backend no longer reports it.
    pub async fn finished(&self) -> Result<bool> {
        Ok(self.stat().await?.is_empty())
    }

    /// Block in a sleep-poll cycle until the job disappears from the
    /// backend's job table.
    ///
    /// When `check_success` returns true for any of the expected logfiles
    /// the job is killed early. `monitor` fires once per polling cycle.
    pub async fn wait(
        &self,
        check_success: Option<&(dyn Fn(&Path) -> bool + Send + Sync)>,
        interval: Duration,
        mut monitor: Option<&mut (dyn FnMut() + Send)>,
    ) -> Result<()> {
        while !self.finished().await? {
            if let Some(check) = check_success {
                if self.logs.iter().any(|log| check(log)) {
                    tracing::debug!("success condition met, terminating early");
                    self.kill().await?;
                    break;
                }
            }
            if let Some(monitor) = monitor.as_mut() {
                monitor();
            }
            tokio::time::sleep(interval).await;
        }
        Ok(())
    }

    pub async fn kill(&self) -> Result<ControlOutcome> {
        let outcome = self.scheduler.kill(self.bound_id()?).await?;
        note_unsupported("kill", outcome);
        Ok(outcome)
    }

    pub async fn hold(&self) -> Result<ControlOutcome> {
        let outcome = self.scheduler.hold(self.bound_id()?).await?;
        note_unsupported("hold", outcome);
        Ok(outcome)
    }

    pub async fn release(&self) -> Result<ControlOutcome> {
        let outcome = self.scheduler.release(self.bound_id()?).await?;
        note_unsupported("release", outcome);
        Ok(outcome)
    }

    pub async fn alter(&self, priority: Option<i32>) -> Result<ControlOutcome> {
        let outcome = self.scheduler.alter(self.bound_id()?, priority).await?;
        note_unsupported("alter", outcome);
        Ok(outcome)
    }

    fn bound_id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| DispatchError::InvalidArgument("job has not been submitted".to_owned()))
    }
}

fn validate_scripts(scripts: &[PathBuf]) -> Result<()> {
    if scripts.is_empty() {
        return Err(DispatchError::InvalidArgument("no scripts to submit".to_owned()));
    }
    let missing: Vec<&Path> =
        scripts.iter().filter(|s| !s.is_file()).map(PathBuf::as_path).collect();
    if !missing.is_empty() {
        return Err(DispatchError::InvalidArgument(format!(
            "scripts cannot be found: {missing:?}"
        )));
    }
    let unexecutable: Vec<&Path> = scripts
        .iter()
        .filter(|s| rustix::fs::access(s.as_path(), rustix::fs::Access::EXEC_OK).is_err())
        .map(PathBuf::as_path)
        .collect();
    if !unexecutable.is_empty() {
        return Err(DispatchError::InvalidArgument(format!(
            "scripts are not executable: {unexecutable:?}"
        )));
    }
    Ok(())
}

fn note_unsupported(operation: &str, outcome: ControlOutcome) {
    if outcome == ControlOutcome::Unsupported {
        tracing::debug!(operation, "unavailable for this backend");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubScheduler {
        submissions: AtomicUsize,
        killed: AtomicBool,
        /// Status queries still to answer before the job reads as gone.
        remaining: AtomicUsize,
    }

    impl StubScheduler {
        fn new(remaining: usize) -> Self {
            Self {
                submissions: AtomicUsize::new(0),
                killed: AtomicBool::new(false),
                remaining: AtomicUsize::new(remaining),
            }
        }
    }

    #[async_trait::async_trait]
    impl JobScheduler for StubScheduler {
        async fn submit(&self, _submission: Submission) -> Result<String> {
            let n = self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(format!("stub-{n}"))
        }

        async fn status(&self, _job_id: &str) -> Result<StatusMap> {
            if self.killed.load(Ordering::SeqCst) {
                return Ok(StatusMap::new());
            }
            let left = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
                .unwrap();
            if left == 0 {
                return Ok(StatusMap::new());
            }
            let mut data = StatusMap::new();
            data.insert("job_state".to_owned(), "r".to_owned());
            Ok(data)
        }

        async fn kill(&self, _job_id: &str) -> Result<ControlOutcome> {
            self.killed.store(true, Ordering::SeqCst);
            Ok(ControlOutcome::Applied)
        }
    }

    fn make_script(directory: &Path, name: &str) -> PathBuf {
        let path = directory.join(name);
        fs::write(&path, "#!/bin/sh\necho hello\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn submission(scripts: Vec<PathBuf>) -> Submission {
        Submission::builder().command(scripts).build()
    }

    #[tokio::test]
    async fn second_submit_does_not_reach_the_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let script = make_script(tmp.path(), "first.sh");
        let scheduler = Arc::new(StubScheduler::new(0));
        let mut job = Job::new(scheduler.clone());

        job.submit(submission(vec![script.clone()])).await.unwrap();
        let id = job.id().map(str::to_owned);
        job.submit(submission(vec![script])).await.unwrap();

        assert_eq!(1, scheduler.submissions.load(Ordering::SeqCst));
        assert_eq!(id.as_deref(), job.id());
    }

    #[tokio::test]
    async fn submit_rejects_missing_scripts_before_any_side_effect() {
        let tmp = tempfile::tempdir().unwrap();
        let scheduler = Arc::new(StubScheduler::new(0));
        let mut job = Job::new(scheduler.clone());

        let err = job
            .submit(submission(vec![tmp.path().join("nowhere.sh")]))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidArgument(_)));
        assert_eq!(0, scheduler.submissions.load(Ordering::SeqCst));
        assert!(job.id().is_none());
    }

    #[tokio::test]
    async fn submit_rejects_unexecutable_scripts() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("plain.sh");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        let mut job = Job::new(Arc::new(StubScheduler::new(0)));

        let err = job.submit(submission(vec![path])).await.unwrap_err();

        assert!(matches!(err, DispatchError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn unsubmitted_job_reports_an_empty_status() {
        let job = Job::new(Arc::new(StubScheduler::new(usize::MAX)));
        assert!(job.stat().await.unwrap().is_empty());
        assert!(job.finished().await.unwrap());
    }

    #[tokio::test]
    async fn finished_once_the_backend_forgets_the_job() {
        let tmp = tempfile::tempdir().unwrap();
        let script = make_script(tmp.path(), "done.sh");
        let mut job = Job::new(Arc::new(StubScheduler::new(0)));

        job.submit(submission(vec![script])).await.unwrap();

        assert!(job.finished().await.unwrap());
    }

    #[tokio::test]
    async fn wait_kills_the_job_once_the_success_check_fires() {
        let tmp = tempfile::tempdir().unwrap();
        let script = make_script(tmp.path(), "winner.sh");
        let scheduler = Arc::new(StubScheduler::new(usize::MAX));
        let mut job = Job::new(scheduler.clone());
        job.submit(submission(vec![script])).await.unwrap();

        job.wait(
            Some(&|log: &Path| log.extension().is_some_and(|e| e == "log")),
            Duration::from_millis(10),
            None,
        )
        .await
        .unwrap();

        assert!(scheduler.killed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn wait_invokes_the_monitor_once_per_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let script = make_script(tmp.path(), "steady.sh");
        let mut job = Job::new(Arc::new(StubScheduler::new(2)));
        job.submit(submission(vec![script])).await.unwrap();

        let mut cycles = 0usize;
        let mut monitor = || cycles += 1;
        job.wait(None, Duration::from_millis(10), Some(&mut monitor)).await.unwrap();

        assert_eq!(2, cycles);
    }

    #[tokio::test]
    async fn unimplemented_control_operations_degrade_to_unsupported() {
        let tmp = tempfile::tempdir().unwrap();
        let script = make_script(tmp.path(), "held.sh");
        let mut job = Job::new(Arc::new(StubScheduler::new(0)));
        job.submit(submission(vec![script])).await.unwrap();

        assert_eq!(ControlOutcome::Unsupported, job.hold().await.unwrap());
        assert_eq!(ControlOutcome::Unsupported, job.release().await.unwrap());
        assert_eq!(ControlOutcome::Unsupported, job.alter(Some(-1)).await.unwrap());
        assert_eq!(ControlOutcome::Applied, job.kill().await.unwrap());
    }

    #[tokio::test]
    async fn control_operations_require_a_submitted_job() {
        let job = Job::new(Arc::new(StubScheduler::new(0)));
        assert!(matches!(
            job.kill().await.unwrap_err(),
            DispatchError::InvalidArgument(_)
        ));
    }
}
