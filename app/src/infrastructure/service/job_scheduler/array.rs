use std::io::Write;
use std::path::{Path, PathBuf};

use domain::error::{DispatchError, Result};
use indoc::formatdoc;

/// Files materialized for one array submission.
///
/// Both are left on disk; the submitting caller owns their cleanup.
#[derive(Debug, Clone)]
pub struct ArrayArtifacts {
    /// The dispatcher each array task executes.
    pub script: PathBuf,
    /// The newline-delimited list of scripts, 1-indexed by line number.
    pub manifest: PathBuf,
}

/// Write the manifest and dispatcher for an array of scripts.
///
/// `task_env` is interpolated verbatim, so the same dispatcher shape works
/// for any scheduler's task-index variable (`SGE_TASK_ID`, `LSB_JOBINDEX`,
/// ...). With `redirect_logs` the dispatcher sends each task's output to a
/// logfile named after the resolved script; without it, logging is left to
/// the scheduler.
pub fn prep_array(
    scripts: &[PathBuf],
    directory: &Path,
    task_env: &str,
    redirect_logs: bool,
) -> Result<ArrayArtifacts> {
    let mut manifest_file = tempfile::Builder::new()
        .prefix("array_")
        .suffix(".jobs")
        .tempfile_in(directory)?;
    for script in scripts {
        writeln!(manifest_file, "{}", script.display())?;
    }
    let (_, manifest) = manifest_file.keep().map_err(|e| DispatchError::Io(e.error))?;

    let script = manifest.with_extension("script");
    let content = if redirect_logs {
        formatdoc! {r#"
            #!/bin/sh
            script=`sed -n "${{{task_env}}}p" {manifest}`
            log="${{script%.*}}".log
            $script > $log 2>&1
        "#, manifest = manifest.display()}
    } else {
        formatdoc! {r#"
            #!/bin/sh
            script=`sed -n "${{{task_env}}}p" {manifest}`
            $script
        "#, manifest = manifest.display()}
    };
    std::fs::write(&script, content)?;

    Ok(ArrayArtifacts { script, manifest })
}

/// Reconcile scheduler-templated array logs with the per-script names the
/// rest of the pipeline expects.
///
/// Backends left to their own array logging write `arrayJob_<N>.log` files;
/// this moves each one next to its manifest line's script, matched by task
/// index.
pub fn rename_array_logs(manifest: &Path, directory: &Path) -> Result<()> {
    tracing::debug!("renaming array logs listed in {}", manifest.display());
    let scripts: Vec<PathBuf> = std::fs::read_to_string(manifest)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(PathBuf::from)
        .collect();
    let mut array_logs: Vec<PathBuf> = std::fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| task_index(path).is_some())
        .collect();
    array_logs.sort_by_key(|path| task_index(path));
    if array_logs.len() != scripts.len() {
        return Err(DispatchError::InvalidArgument(
            "number of scripts and logs non-identical".to_owned(),
        ));
    }
    for (array_log, script) in array_logs.iter().zip(&scripts) {
        std::fs::rename(array_log, script.with_extension("log"))?;
    }
    Ok(())
}

/// Most recently written array manifest in `directory`, if any.
pub fn latest_manifest(directory: &Path) -> Result<Option<PathBuf>> {
    let mut manifests: Vec<PathBuf> = std::fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("array_") && n.ends_with(".jobs"))
        })
        .collect();
    manifests.sort_by_key(|path| {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    });
    Ok(manifests.pop())
}

fn task_index(path: &Path) -> Option<u32> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("arrayJob_"))
        .and_then(|name| name.strip_suffix(".log"))
        .and_then(|index| index.parse().ok())
}
