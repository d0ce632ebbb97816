use std::env;

use domain::error::Result;
use domain::model::{StatusMap, Submission};
use domain::service::{ControlOutcome, JobScheduler};

use super::models;
use crate::config::SchedulerConfig;
use crate::infrastructure::command::Exec;
use crate::infrastructure::service::job_scheduler::array;

/// Per-task index variable exported by SGE to array tasks.
const TASK_ENV: &str = "SGE_TASK_ID";

/// Client for the Sun Grid Engine command-line tools.
pub struct SgeClient {
    queue: Option<String>,
    redirect_task_logs: bool,
}

impl SgeClient {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            queue: config.queue.clone(),
            redirect_task_logs: config.redirect_task_logs,
        }
    }

    fn qsub_argv(&self, submission: &Submission, array_size: Option<usize>) -> Vec<String> {
        let mut cmd: Vec<String> = ["qsub", "-cwd", "-V", "-w", "e"].map(String::from).to_vec();
        if let Some(size) = array_size {
            cmd.extend(["-t".to_owned(), format!("1-{size}"), "-tc".to_owned(), size.to_string()]);
            // The dispatcher owns per-task logging, so the job log goes to
            // the null sink.
            cmd.extend(["-j", "y", "-o", "/dev/null"].map(String::from));
        }
        if !submission.deps.is_empty() {
            cmd.extend(["-hold_jid".to_owned(), submission.deps.join(",")]);
        }
        if submission.hold {
            cmd.push("-h".to_owned());
        }
        if array_size.is_none() {
            if let Some(log) = &submission.log {
                cmd.extend(["-j".to_owned(), "y".to_owned(), "-o".to_owned(), log.display().to_string()]);
            }
        }
        if let Some(name) = &submission.name {
            cmd.extend(["-N".to_owned(), name.clone()]);
        }
        if let Some(pe_opts) = &submission.pe_opts {
            cmd.push("-pe".to_owned());
            cmd.extend(pe_opts.split_whitespace().map(String::from));
        }
        if let Some(priority) = submission.priority {
            cmd.extend(["-p".to_owned(), priority.to_string()]);
        }
        if let Some(queue) = submission.queue.as_ref().or(self.queue.as_ref()) {
            cmd.extend(["-q".to_owned(), queue.clone()]);
        }
        if let Some(shell) = &submission.shell {
            cmd.extend(["-S".to_owned(), shell.display().to_string()]);
        }
        if let Some(runtime) = submission.runtime {
            cmd.extend(["-l".to_owned(), format!("h_rt={runtime}")]);
        }
        cmd
    }
}

#[async_trait::async_trait]
impl JobScheduler for SgeClient {
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
        let mut argv = self.qsub_argv(&submission, array_size);
        argv.extend(submission.command.iter().map(|c| c.display().to_string()));

        let stdout = Exec::builder()
            .argv(argv)
            .directory(submission.directory.clone())
            .build()
            .run()
            .await?;
        let job_id = models::parse_job_id(&stdout, array_size.is_some())?;
        tracing::debug!(%job_id, "job submitted to the SGE queue");
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> Result<StatusMap> {
        let stdout = Exec::builder()
            .argv(vec!["qstat".to_owned(), "-j".to_owned(), job_id.to_owned()])
            .permit_nonzero(true)
            .build()
            .run()
            .await?;
        Ok(models::parse_status(&stdout))
    }

    async fn kill(&self, job_id: &str) -> Result<ControlOutcome> {
        Exec::builder()
            .argv(vec!["qdel".to_owned(), job_id.to_owned()])
            .build()
            .run()
            .await?;
        tracing::debug!(job_id, "removed job from the queue");
        Ok(ControlOutcome::Applied)
    }

    async fn hold(&self, job_id: &str) -> Result<ControlOutcome> {
        Exec::builder()
            .argv(vec!["qhold".to_owned(), job_id.to_owned()])
            .build()
            .run()
            .await?;
        tracing::debug!(job_id, "holding back job");
        Ok(ControlOutcome::Applied)
    }

    async fn release(&self, job_id: &str) -> Result<ControlOutcome> {
        Exec::builder()
            .argv(vec!["qrls".to_owned(), job_id.to_owned()])
            .build()
            .run()
            .await?;
        tracing::debug!(job_id, "released job from the queue");
        Ok(ControlOutcome::Applied)
    }

    async fn alter(&self, job_id: &str, priority: Option<i32>) -> Result<ControlOutcome> {
        let mut argv = vec!["qalter".to_owned()];
        if let Some(priority) = priority {
            argv.extend(["-p".to_owned(), priority.to_string()]);
        }
        argv.push(job_id.to_owned());
        Exec::builder().argv(argv).build().run().await?;
        tracing::debug!(job_id, "altered job parameters in the queue");
        Ok(ControlOutcome::Applied)
    }
}
