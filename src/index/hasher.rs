use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use futures_channel::oneshot;
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::ext::{AsyncTryInto, BestEffortPathExt};
use crate::index::{ContentId, ContentIdError};

/// Hashing tasks kept in flight per worker thread. Bounds how many files are
/// buffered in memory at once.
const MAX_IN_FLIGHT_PER_WORKER: usize = 4;

type HashReceiver = oneshot::Receiver<Result<ContentId, ContentIdError>>;

/// Computes content ids on a pool of worker threads.
pub struct ContentHasher {
    dispatcher: Dispatcher,
    workers: NonZeroUsize,
}

impl ContentHasher {
    /// Creates a hasher with `jobs` worker threads, or one per available core
    pub fn new(jobs: Option<NonZeroUsize>) -> Result<Self, HasherCreationError> {
        let workers = jobs.unwrap_or_else(Self::determine_worker_count);
        debug!("Using {} worker threads for hashing", workers);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self {
            dispatcher,
            workers,
        })
    }

    fn determine_worker_count() -> NonZeroUsize {
        available_parallelism().unwrap_or(NonZeroUsize::MIN)
    }

    /// Hashes every path and returns the ids in the order of `paths`.
    ///
    /// Results may complete in any order; each one lands in the slot of the
    /// path it was dispatched for. The first failure aborts the whole batch.
    pub async fn hash_all(&self, paths: &[PathBuf]) -> Result<Vec<ContentId>, HashError> {
        let max_in_flight = self.workers.get() * MAX_IN_FLIGHT_PER_WORKER;
        let mut slots: Vec<Option<ContentId>> = vec![None; paths.len()];
        let mut queued = paths.iter().enumerate();
        let mut pending = FuturesUnordered::new();

        debug!(
            "Hashing {} files with at most {} in flight",
            paths.len(),
            max_in_flight
        );

        loop {
            while pending.len() < max_in_flight {
                let Some((index, path)) = queued.next() else {
                    break;
                };
                let receiver = self.dispatch_hash(path)?;
                pending.push(async move { (index, receiver.await) });
            }

            let Some((index, result)) = pending.next().await else {
                break;
            };

            let content_id = match result {
                Ok(inner) => inner.context(ContentSnafu)?,
                Err(source) => {
                    return Err(HashError::CanceledError {
                        path: paths[index].clone(),
                        source,
                    });
                }
            };
            debug!("Hashed {} -> {}", paths[index].display(), content_id);
            slots[index] = Some(content_id);
        }

        slots
            .into_iter()
            .zip(paths)
            .map(|(slot, path)| slot.context(MissingResultSnafu { path: path.clone() }))
            .collect()
    }

    fn dispatch_hash(&self, path: &Path) -> Result<HashReceiver, HashError> {
        let owned_path = path.to_path_buf();

        self.dispatcher
            .dispatch(move || async move {
                AsyncTryInto::<ContentId>::async_try_into(owned_path.as_path()).await
            })
            .map_err(|e| HashError::DispatchError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })
    }
}

#[derive(Debug, Snafu)]
pub enum HasherCreationError {
    #[snafu(display("Failed to create hashing worker pool"))]
    DispatcherError { source: std::io::Error },
}

#[derive(Debug, Snafu)]
pub enum HashError {
    #[snafu(display("Failed to dispatch hashing of {}: {}", path.best_effort_path_display(), error))]
    DispatchError { path: PathBuf, error: String },
    #[snafu(display("Failed to compute content id"))]
    ContentError { source: ContentIdError },
    #[snafu(display("Hashing of {} was cancelled", path.best_effort_path_display()))]
    CanceledError {
        path: PathBuf,
        source: oneshot::Canceled,
    },
    #[snafu(display("No content id was produced for {}", path.best_effort_path_display()))]
    MissingResultError { path: PathBuf },
}
