use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::fs;
use std::io;
use std::path::Path;

fn open_target(log_file: Option<&Path>) -> Target {
    let Some(path) = log_file else {
        return Target::Stderr;
    };
    // If the file cannot be opened (permissions, readonly FS, etc.), fall back to stderr.
    let opened = (|| -> io::Result<Target> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Target::Pipe(Box::new(file)))
    })();
    opened.unwrap_or_else(|err| {
        eprintln!("depctl: cannot open log file {}: {err}", path.display());
        Target::Stderr
    })
}

/// Installs the global logger. `RUST_LOG` still wins over the default level.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with(log_file: Option<&Path>, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = Builder::new()
        .filter_level(level)
        .parse_env(Env::default())
        .target(open_target(log_file))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unwritable_log_file_falls_back_to_stderr() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let target = open_target(Some(&blocker.join("depctl.log")));
        assert!(matches!(target, Target::Stderr));
    }

    #[test]
    fn log_file_and_parents_are_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/depctl.log");
        let target = open_target(Some(&path));
        assert!(matches!(target, Target::Pipe(_)));
        assert!(path.exists());
    }
}
