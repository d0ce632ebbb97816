use domain::error::{DispatchError, Result};
use domain::model::StatusMap;
use regex::Regex;

/// Extract the native job id from a `bsub` acknowledgement.
///
/// The reply reads `Job <3407845> is submitted to queue <q_share>.`; the id
/// is the second whitespace token with its angle brackets stripped.
/// Positional, tied to the bsub client's reply format.
pub fn parse_job_id(stdout: &str) -> Result<String> {
    let token = stdout.split_whitespace().nth(1).ok_or_else(|| {
        DispatchError::UnexpectedOutput(format!("no job id in bsub reply: {stdout}"))
    })?;
    if token.len() < 3 {
        return Err(DispatchError::UnexpectedOutput(format!(
            "malformed job id token in bsub reply: {stdout}"
        )));
    }
    Ok(token[1..token.len() - 1].to_owned())
}

/// Parse `bjobs -l` output into its raw field map.
///
/// Returns the empty map as soon as the "is not found" marker shows up.
/// Separator lines and blanks are skipped; the rest split once on the first
/// colon-plus-whitespace into key and value.
pub fn parse_status(stdout: &str) -> StatusMap {
    let line_split = Regex::new(r":\s+").unwrap();
    let mut data = StatusMap::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.contains("is not found") {
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
