//! Executable lookup on `PATH`.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Resolves `program` the way a shell would, using `path_var` as `PATH`.
///
/// Names containing a path separator are checked as-is.
pub fn find_in(program: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_var = path_var?;
    for dir in env::split_paths(path_var) {
        let full = dir.join(program);
        if is_executable(&full) {
            return Some(full);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{program}.exe"));
            if is_executable(&exe) {
                return Some(exe);
            }
        }
    }
    None
}

/// Resolves `program` against the process `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH");
    find_in(program, path_var.as_deref())
}

/// Canonical form of `path`, or the path itself when it cannot be resolved.
pub fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn touch_exec(path: &Path) {
        fs::write(path, "#!/bin/sh\n").unwrap();
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn finds_program_in_later_path_entry() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        touch_exec(&b.path().join("python3"));
        let joined = env::join_paths([a.path(), b.path()]).unwrap();
        let found = find_in("python3", Some(joined.as_os_str())).unwrap();
        assert_eq!(found, b.path().join("python3"));
    }

    #[test]
    fn skips_non_executable_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("brew"), "").unwrap();
        let joined = env::join_paths([dir.path()]).unwrap();
        assert!(find_in("brew", Some(joined.as_os_str())).is_none());
    }

    #[test]
    fn absolute_paths_bypass_path_lookup() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("pip");
        touch_exec(&exe);
        assert_eq!(find_in(exe.to_str().unwrap(), None), Some(exe));
    }
}
