use crate::CoreError;
use fs2::FileExt;
use shellrun_runtime::CancelToken;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Serializes command execution when parallelism is disabled.
///
/// One gate lives as long as the `Client` that owns it. Acquiring with
/// parallelism disabled takes an in-process mutex and, if configured, an
/// exclusive advisory lock on a file; with parallelism enabled acquisition is
/// a no-op. Everything is released when the returned guard is dropped.
#[derive(Debug, Default)]
pub struct ParallelismGate {
    mutex: Mutex<()>,
    lock_path: Option<PathBuf>,
}

impl ParallelismGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_file(lock_path: impl Into<PathBuf>) -> Self {
        Self {
            mutex: Mutex::new(()),
            lock_path: Some(lock_path.into()),
        }
    }

    pub fn lock_path(&self) -> Option<&Path> {
        self.lock_path.as_deref()
    }

    /// Block until this caller may run a command.
    pub fn acquire(&self, parallel: bool) -> Result<GateGuard<'_>, CoreError> {
        if parallel {
            return Ok(GateGuard {
                _file: None,
                mutex: None,
            });
        }

        debug!("waiting for parallelism gate");
        // The mutex guards no data, so a panic in a previous holder leaves
        // nothing inconsistent.
        let mutex = self.mutex.lock().unwrap_or_else(PoisonError::into_inner);
        let file = match &self.lock_path {
            Some(path) => Some(FileLock::acquire(path)?),
            None => None,
        };
        debug!("parallelism gate acquired");

        // Fields drop in declaration order: file lock first, then the mutex.
        Ok(GateGuard {
            _file: file,
            mutex: Some(mutex),
        })
    }
}

/// Held for the duration of one execution.
#[derive(Debug)]
pub struct GateGuard<'a> {
    _file: Option<FileLock>,
    mutex: Option<MutexGuard<'a, ()>>,
}

impl GateGuard<'_> {
    /// Whether this guard actually excludes other executions.
    pub fn is_exclusive(&self) -> bool {
        self.mutex.is_some()
    }
}

#[derive(Debug)]
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        file.lock_exclusive()
            .map_err(|e| CoreError::Lock(format!("{}: {e}", path.display())))?;

        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Route Ctrl-C to `token`. A second Ctrl-C exits the process immediately.
pub fn install_signal_handler(token: CancelToken) {
    let _ = ctrlc::set_handler(move || {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        token.cancel();
        eprintln!("\ninterrupt received, stopping running command...");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn parallel_acquire_is_not_exclusive() {
        let gate = ParallelismGate::new();
        let a = gate.acquire(true).unwrap();
        let b = gate.acquire(true).unwrap();
        assert!(!a.is_exclusive());
        assert!(!b.is_exclusive());
    }

    #[test]
    fn serial_acquire_excludes_others() {
        let gate = Arc::new(ParallelismGate::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let _guard = gate.acquire(false).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gate_released_after_panic() {
        let gate = Arc::new(ParallelismGate::new());
        let worker = Arc::clone(&gate);
        let result = thread::spawn(move || {
            let _guard = worker.acquire(false).unwrap();
            panic!("holder panicked");
        })
        .join();
        assert!(result.is_err());

        let guard = gate.acquire(false).unwrap();
        assert!(guard.is_exclusive());
    }

    #[test]
    fn lock_file_created_and_released() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("locks").join("shellrun.lock");
        let gate = ParallelismGate::with_lock_file(&lock_path);

        {
            let _guard = gate.acquire(false).unwrap();
            assert!(lock_path.exists());
            let other = File::open(&lock_path).unwrap();
            assert!(other.try_lock_exclusive().is_err());
        }

        let other = File::open(&lock_path).unwrap();
        assert!(other.try_lock_exclusive().is_ok());
        other.unlock().unwrap();
    }

    #[test]
    fn lock_file_skipped_when_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("shellrun.lock");
        let gate = ParallelismGate::with_lock_file(&lock_path);
        let _guard = gate.acquire(true).unwrap();
        assert!(!lock_path.exists());
    }
}
