mod config;
mod infrastructure;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ::config::{Config, Environment, File};
use anyhow::Context;
use domain::model::{SchedulerKind, Submission};
use domain::service::JobScheduler;
use service::Job;

use self::config::DispatchConfig;
use self::infrastructure::service::job_scheduler::{array, LocalScheduler, LsfClient, SgeClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::builder()
        .add_source(File::with_name("dispatch").required(false))
        .add_source(Environment::with_prefix("DISPATCH").separator("__"))
        .build()
        .with_context(|| "Failed to build config")?;
    let config: DispatchConfig = config.try_deserialize()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scripts: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if scripts.is_empty() {
        anyhow::bail!("no scripts given");
    }
    let array_job = scripts.len() > 1;

    let scheduler: Arc<dyn JobScheduler> = match config.scheduler.kind {
        SchedulerKind::Local => Arc::new(LocalScheduler::new(&config.scheduler)),
        SchedulerKind::Sge => Arc::new(SgeClient::new(&config.scheduler)),
        SchedulerKind::Lsf => Arc::new(LsfClient::new(&config.scheduler)),
    };

    let mut job = Job::new(scheduler);
    job.submit(Submission::builder().command(scripts).build()).await?;
    tracing::info!(id = job.id(), kind = %config.scheduler.kind, "job submitted");

    job.wait(None, Duration::from_secs(config.poll_interval), None).await?;

    // Grid jobs left to the scheduler's own array logging still need their
    // per-task logs matched back to the scripts.
    if array_job
        && !config.scheduler.redirect_task_logs
        && config.scheduler.kind != SchedulerKind::Local
    {
        let directory = std::env::current_dir()?;
        if let Some(manifest) = array::latest_manifest(&directory)? {
            array::rename_array_logs(&manifest, &directory)?;
        }
    }
    tracing::info!("job finished");
    Ok(())
}
