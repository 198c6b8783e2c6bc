use confab_core::{ConfabError, ConfabResult};
use rusqlite::Connection;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Handle to the storage worker.
///
/// The worker is a dedicated OS thread that owns the [`Connection`]
/// exclusively and runs jobs one at a time in the order they were submitted.
/// Handles are cheap to clone; the worker exits and closes the connection
/// once the last handle is dropped.
#[derive(Clone)]
pub struct Bridge {
    tx: mpsc::UnboundedSender<Job>,
}

impl Bridge {
    /// Start a worker on the SQLite database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> ConfabResult<Self> {
        let path = path.as_ref().to_path_buf();
        Self::start(move || Connection::open(path)).await
    }

    /// Start a worker on a private in-memory database.
    pub async fn open_in_memory() -> ConfabResult<Self> {
        Self::start(Connection::open_in_memory).await
    }

    async fn start<F>(connect: F) -> ConfabResult<Self>
    where
        F: FnOnce() -> rusqlite::Result<Connection> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready_rx) = oneshot::channel::<ConfabResult<()>>();

        std::thread::Builder::new()
            .name("confab-bridge".into())
            .spawn(move || {
                let mut conn = match connect() {
                    Ok(conn) => conn,
                    Err(e) => {
                        let _ = ready_tx.send(Err(storage_error(e)));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                run_worker(&mut conn, rx);
            })?;

        ready_rx
            .await
            .map_err(|_| ConfabError::Storage("bridge worker exited during startup".into()))??;
        Ok(Self { tx })
    }

    /// Queue `op` for execution on the worker and wait for its result.
    ///
    /// The job is enqueued when `submit` is called, not when the returned
    /// future is first polled, so call order is execution order. An error or
    /// panic inside `op` fails only this result; later jobs still run.
    pub fn submit<F, R>(&self, op: F) -> impl Future<Output = ConfabResult<R>> + Send + 'static
    where
        F: FnOnce(&mut Connection) -> ConfabResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel::<ConfabResult<R>>();
        let job: Job = Box::new(move |conn: &mut Connection| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(move || op(conn)))
                .unwrap_or_else(|_| Err(ConfabError::Storage("storage operation panicked".into())));
            let _ = result_tx.send(outcome);
        });
        let queued = self
            .tx
            .send(job)
            .map_err(|_| ConfabError::Storage("bridge worker is not running".into()));

        async move {
            queued?;
            result_rx
                .await
                .map_err(|_| ConfabError::Storage("bridge worker dropped the operation".into()))?
        }
    }
}

fn run_worker(conn: &mut Connection, mut rx: mpsc::UnboundedReceiver<Job>) {
    info!("Storage bridge worker started");
    while let Some(job) = rx.blocking_recv() {
        job(conn);
    }
    debug!("Storage bridge worker exiting");
}

/// Wrap an engine error. Engine failures are surfaced as-is, never retried.
pub(crate) fn storage_error(e: rusqlite::Error) -> ConfabError {
    ConfabError::Storage(e.to_string())
}
