// src/exec/validate.rs

//! Pre-launch checks. Nothing here touches the process table.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::RunnerError;

use super::InvocationRequest;

/// Resolve the request's program to an absolute path of an existing
/// executable file.
///
/// - A bare name is looked up in `PATH` with `which`.
/// - An absolute path is checked as-is.
/// - A relative path with a separator is taken relative to `working_dir`
///   (the directory the child starts in), or to our own working directory
///   when none is set. The child is always started with the absolute result,
///   so the file that was checked is the file that runs.
pub(crate) fn resolve_executable(
    program: &Path,
    working_dir: Option<&Path>,
) -> Result<PathBuf, RunnerError> {
    if program.as_os_str().is_empty() {
        return Err(invalid(program, "empty path"));
    }

    if !program.is_absolute() && program.components().count() == 1 {
        return which::which(program).map_err(|_| invalid(program, "not found in PATH"));
    }

    let candidate = if program.is_absolute() {
        program.to_path_buf()
    } else {
        base_dir(working_dir)
            .map_err(|err| invalid(program, &format!("cannot resolve working directory: {err}")))?
            .join(program)
    };

    check_candidate(&candidate)?;
    Ok(candidate)
}

fn base_dir(working_dir: Option<&Path>) -> std::io::Result<PathBuf> {
    match working_dir {
        Some(dir) if dir.is_absolute() => Ok(dir.to_path_buf()),
        Some(dir) => Ok(std::env::current_dir()?.join(dir)),
        None => std::env::current_dir(),
    }
}

/// Reject argument lists and environment overrides the OS cannot represent.
pub(crate) fn validate_arguments(request: &InvocationRequest) -> Result<(), RunnerError> {
    for (idx, arg) in request.arguments().iter().enumerate() {
        if arg.contains('\0') {
            return Err(RunnerError::InvalidArguments(format!(
                "argument {idx} contains a NUL byte"
            )));
        }
    }

    for (key, value) in request.env_overrides() {
        if key.is_empty() {
            return Err(RunnerError::InvalidArguments(
                "environment variable name is empty".to_string(),
            ));
        }
        if key.contains('=') || key.contains('\0') {
            return Err(RunnerError::InvalidArguments(format!(
                "environment variable name '{}' contains '=' or a NUL byte",
                key.escape_default()
            )));
        }
        if value.contains('\0') {
            return Err(RunnerError::InvalidArguments(format!(
                "value of environment variable '{key}' contains a NUL byte"
            )));
        }
    }

    Ok(())
}

fn check_candidate(path: &Path) -> Result<(), RunnerError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Err(invalid(path, "does not exist")),
    };

    if !meta.is_file() {
        return Err(invalid(path, "is not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(invalid(path, "is not executable"));
        }
    }

    Ok(())
}

fn invalid(path: &Path, reason: &str) -> RunnerError {
    RunnerError::InvalidExecutable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
