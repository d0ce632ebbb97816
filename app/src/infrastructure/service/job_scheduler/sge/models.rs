use domain::error::{DispatchError, Result};
use domain::model::StatusMap;
use regex::Regex;

/// Extract the native job id from a `qsub` acknowledgement.
///
/// Plain replies read `Your job 1071077 ("name") has been submitted`; array
/// replies carry the task range after a dot, as in
/// `Your job-array 1071078.1-5:1 ("name") has been submitted`. Positional,
/// tied to the qsub client's reply format.
pub fn parse_job_id(stdout: &str, array: bool) -> Result<String> {
    let token = stdout.split_whitespace().nth(2).ok_or_else(|| {
        DispatchError::UnexpectedOutput(format!("no job id in qsub reply: {stdout}"))
    })?;
    let id = if array {
        token.split('.').next().unwrap_or(token)
    } else {
        token
    };
    Ok(id.to_owned())
}

/// Parse `qstat -j` output into its raw field map.
///
/// Returns the empty map as soon as the "jobs do not exist" marker shows up.
/// Decorative separator lines (runs of `=`) and blanks are skipped; the rest
/// split once on the first colon-plus-whitespace into key and value.
pub fn parse_status(stdout: &str) -> StatusMap {
    let line_split = Regex::new(r":\s+").unwrap();
    let mut data = StatusMap::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.contains("jobs do not exist") {
            return StatusMap::new();
        }
        if line.is_empty() || line.contains(&"=".repeat(30)) {
            continue;
        }
        let mut kv = line_split.splitn(line, 2);
        if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
            data.insert(key.to_owned(), value.to_owned());
        }
    }
    data
}
