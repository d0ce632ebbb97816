use std::env;

use domain::error::{DispatchError, Result};
use domain::model::{StatusMap, Submission};
use domain::service::{ControlOutcome, JobScheduler};

use super::models;
use crate::config::SchedulerConfig;
use crate::infrastructure::command::Exec;
use crate::infrastructure::service::job_scheduler::array;

/// Per-task index variable exported by LSF to array tasks.
const TASK_ENV: &str = "LSB_JOBINDEX";

/// Client for the Load Sharing Facility command-line tools.
///
/// Hold, release and alter have no counterparts here; those operations keep
/// the trait's unsupported outcome. A hold requested at submission is
/// realized by stopping the job right after its id is known.
pub struct LsfClient {
    queue: Option<String>,
    redirect_task_logs: bool,
}

impl LsfClient {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            queue: config.queue.clone(),
            redirect_task_logs: config.redirect_task_logs,
        }
    }

    fn bsub_argv(&self, submission: &Submission, array_size: Option<usize>) -> Vec<String> {
        let mut cmd = vec!["bsub".to_owned()];
        if let Some(directory) = &submission.directory {
            cmd.extend(["-cwd".to_owned(), directory.display().to_string()]);
        }
        if let Some(size) = array_size {
            // The array range rides on the job name; the dispatcher owns
            // per-task logging.
            let name = submission.name.as_deref().unwrap_or("array");
            cmd.extend(["-J".to_owned(), format!("{name}[1-{size}]%{size}")]);
            cmd.extend(["-o".to_owned(), "/dev/null".to_owned()]);
        } else {
            if let Some(log) = &submission.log {
                cmd.extend(["-o".to_owned(), log.display().to_string()]);
            }
            if let Some(name) = &submission.name {
                cmd.extend(["-J".to_owned(), name.clone()]);
            }
        }
        if !submission.deps.is_empty() {
            let expr = submission
                .deps
                .iter()
                .map(|dep| format!("done({dep})"))
                .collect::<Vec<_>>()
                .join(" && ");
            cmd.extend(["-w".to_owned(), expr]);
        }
        if let Some(threads) = submission.threads {
            cmd.extend(["-R".to_owned(), format!("span[ptile={threads}]")]);
        }
        if let Some(priority) = submission.priority {
            cmd.extend(["-sp".to_owned(), priority.to_string()]);
        }
        if let Some(queue) = submission.queue.as_ref().or(self.queue.as_ref()) {
            cmd.extend(["-q".to_owned(), queue.clone()]);
        }
        if let Some(runtime) = submission.runtime {
            cmd.extend(["-W".to_owned(), runtime.to_string()]);
        }
        cmd
    }
}

#[async_trait::async_trait]
impl JobScheduler for LsfClient {
    async fn submit(&self, mut submission: Submission) -> Result<String> {
        let array_size = (submission.command.len() > 1).then_some(submission.command.len());
        if array_size.is_some() {
            let directory = match submission.directory.clone() {
                Some(directory) => directory,
                None => env::current_dir()?,
            };
            let artifacts = array::prep_array(
                &submission.command,
                &directory,
                TASK_ENV,
                self.redirect_task_logs,
            )?;
            tracing::debug!("array dispatcher written to {}", artifacts.script.display());
            submission.command = vec![artifacts.script];
            submission.log = None;
        }
        let script = submission
            .command
            .first()
            .ok_or_else(|| DispatchError::InvalidArgument("no scripts to submit".to_owned()))?;
        // bsub takes the job script on stdin.
        let payload = tokio::fs::read_to_string(script).await?;

        let stdout = Exec::builder()
            .argv(self.bsub_argv(&submission, array_size))
            .directory(submission.directory.clone())
            .stdin(payload)
            .build()
            .run()
            .await?;
        let job_id = models::parse_job_id(&stdout)?;
        if submission.hold {
            Exec::builder()
                .argv(vec!["bstop".to_owned(), job_id.clone()])
                .build()
                .run()
                .await?;
            tracing::debug!(%job_id, "job stopped at submission");
        }
        tracing::debug!(%job_id, "job submitted to the LSF queue");
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> Result<StatusMap> {
        let stdout = Exec::builder()
            .argv(vec!["bjobs".to_owned(), "-l".to_owned(), job_id.to_owned()])
            .permit_nonzero(true)
            .build()
            .run()
            .await?;
        Ok(models::parse_status(&stdout))
    }

    async fn kill(&self, job_id: &str) -> Result<ControlOutcome> {
        Exec::builder()
            .argv(vec!["bkill".to_owned(), job_id.to_owned()])
            .build()
            .run()
            .await?;
        tracing::debug!(job_id, "removed job from the queue");
        Ok(ControlOutcome::Applied)
    }
}
