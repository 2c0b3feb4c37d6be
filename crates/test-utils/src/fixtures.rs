#![allow(dead_code)]

//! Throwaway scripts and firmware folders on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Write an executable `sh` script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).expect("script metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod script");
    }

    path
}

/// A script that ignores SIGTERM and sleeps, so only SIGKILL ends it.
pub fn stubborn_script(dir: &Path) -> PathBuf {
    write_script(dir, "stubborn.sh", "trap '' TERM\nsleep 60\nsleep 60")
}

/// A stand-in for `odin4` that prints its arguments and exits with `code`.
pub fn fake_tool(dir: &Path, name: &str, code: i32) -> PathBuf {
    write_script(
        dir,
        name,
        &format!("for a in \"$@\"; do echo \"arg:$a\"; done\necho \"done\" 1>&2\nexit {code}"),
    )
}

/// A temp directory holding empty files with the given names.
pub fn firmware_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("create tempdir");
    for name in names {
        fs::write(dir.path().join(name), b"").expect("write firmware file");
    }
    dir
}
