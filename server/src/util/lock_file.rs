use anyhow::Context;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug)]
enum Message {
    Shutdown {
        tx: tokio::sync::oneshot::Sender<()>,
    },
}

/// A lock file held on a dedicated thread.
///
/// File locks are blocking and tied to the descriptor that took them,
/// so one thread owns the lock for as long as the process needs it.
#[derive(Debug)]
pub struct LockFile {
    tx: std::sync::mpsc::Sender<Message>,
    handle: std::sync::Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl LockFile {
    /// Create a lock file at the given path and acquire it,
    /// failing immediately if another process holds it.
    pub async fn acquire<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_owned();
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || lock_file_thread(path, ready_tx, rx));

        ready_rx
            .await
            .context("the lock file thread failed to respond")??;

        Ok(Self {
            tx,
            handle: std::sync::Mutex::new(Some(handle)),
        })
    }

    /// Release the lock and join the thread.
    ///
    /// This should only be called once.
    /// If it is never called,
    /// the lock is released when the last handle drops.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(Message::Shutdown { tx })
            .ok()
            .context("the lock file thread is gone")?;
        rx.await
            .context("the lock file thread did not confirm the unlock")?;

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .context("missing thread handle")?;
        tokio::task::spawn_blocking(move || {
            handle.join().ok().context("the lock file thread panicked")
        })
        .await?
    }
}

fn lock_file_thread(
    path: PathBuf,
    ready_tx: tokio::sync::oneshot::Sender<anyhow::Result<()>>,
    rx: std::sync::mpsc::Receiver<Message>,
) {
    let file = match std::fs::File::create(&path)
        .with_context(|| format!("failed to create lock file \"{}\"", path.display()))
    {
        Ok(file) => file,
        Err(error) => {
            let _ = ready_tx.send(Err(error)).is_ok();
            return;
        }
    };

    let mut lock = fd_lock::RwLock::new(file);
    let guard = match lock.try_write().context("failed to take the file lock") {
        Ok(guard) => guard,
        Err(error) => {
            let _ = ready_tx.send(Err(error)).is_ok();
            return;
        }
    };
    let _ = ready_tx.send(Ok(())).is_ok();

    // Hold the lock until asked to shut down or every handle drops.
    let message = rx.recv().ok();
    drop(guard);
    if let Some(Message::Shutdown { tx }) = message {
        let _ = tx.send(()).is_ok();
    }
}
