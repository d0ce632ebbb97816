use std::path::PathBuf;
use std::process::Stdio;

use domain::error::{DispatchError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use typed_builder::TypedBuilder;

/// One external command, run to completion with stderr folded into stdout.
///
/// Every scheduler client routes its shell-outs through here, so the
/// exit-code policy and interrupt handling live in exactly one place.
#[derive(Debug, TypedBuilder)]
pub struct Exec {
    #[builder(setter(into))]
    pub argv: Vec<String>,

    #[builder(default)]
    pub directory: Option<PathBuf>,

    /// Payload written to the child's stdin, which is closed afterwards.
    #[builder(default, setter(strip_option, into))]
    pub stdin: Option<String>,

    /// Treat non-zero exit codes as success.
    #[builder(default)]
    pub permit_nonzero: bool,
}

impl Exec {
    /// Spawn the command and block until it exits, returning the combined
    /// stdout/stderr text with trailing whitespace stripped.
    ///
    /// An interrupt during the wait kills the child before surfacing, so no
    /// orphan processes are left behind.
    pub async fn run(self) -> Result<String> {
        let joined = self.argv.join(" ");
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| DispatchError::InvalidArgument("empty command".to_owned()))?;
        tracing::debug!("executing '{joined}'");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(if self.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(directory) = &self.directory {
            command.current_dir(directory);
        }
        let mut child = command.spawn()?;

        if let Some(payload) = &self.stdin {
            let mut writer = child.stdin.take().ok_or_else(|| {
                DispatchError::UnexpectedOutput("child stdin not captured".to_owned())
            })?;
            writer.write_all(payload.as_bytes()).await?;
        }

        let mut stdout = child.stdout.take().ok_or_else(|| {
            DispatchError::UnexpectedOutput("child stdout not captured".to_owned())
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            DispatchError::UnexpectedOutput("child stderr not captured".to_owned())
        })?;
        let mut out = Vec::new();
        let mut err = Vec::new();

        let interrupted = tokio::select! {
            gathered = async {
                let (o, e) = tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
                o.and(e)
            } => {
                gathered?;
                false
            }
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            let _ = child.kill().await;
            return Err(DispatchError::Interrupted(joined));
        }

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(status) = waited else {
            let _ = child.kill().await;
            return Err(DispatchError::Interrupted(joined));
        };
        let status = status?;

        out.extend_from_slice(&err);
        let output = String::from_utf8_lossy(&out).trim_end().to_string();
        let code = status.code().unwrap_or(-1);
        if status.success() {
            Ok(output)
        } else if self.permit_nonzero {
            tracing::debug!("ignoring non-zero return code {code} for '{joined}'");
            Ok(output)
        } else {
            Err(DispatchError::Execution {
                command: joined,
                code,
                output,
            })
        }
    }
}
