//! Background content store worker thread
//!
//! Every store read, delete and clear issued by the editor runs here so
//! slow stores never stall the interaction thread.

use crossbeam_channel::{Receiver, Sender};
use log::debug;
use offimg_core::{DecodeError, HashAlgorithm, NodeId, StoreError, StoreHandle};
use std::thread;

use crate::error::ResolveError;
use crate::sniff;

/// Work for the store worker
#[derive(Debug, Clone)]
pub enum StoreRequest {
    /// Look up the bytes behind a node's content hash
    Resolve {
        generation: u64,
        node: NodeId,
        hash: String,
    },
    Delete { hash: String },
    Clear,
}

/// How a resolution ended
#[derive(Debug)]
pub enum ResolveOutcome {
    /// Displayable URI for the stored bytes
    Resolved(String),
    /// Nothing stored under the hash
    Miss,
    Failed(ResolveError),
}

/// Result of a store request
#[derive(Debug)]
pub enum StoreResult {
    Resolved {
        generation: u64,
        node: NodeId,
        hash: String,
        outcome: ResolveOutcome,
    },
    Deleted {
        hash: String,
        result: Result<(), StoreError>,
    },
    Cleared {
        result: Result<(), StoreError>,
    },
}

/// Store worker handle
pub struct StoreWorker {
    request_tx: Sender<StoreRequest>,
    result_rx: Receiver<StoreResult>,
    _worker_thread: thread::JoinHandle<()>,
}

impl StoreWorker {
    /// Spawn a new store worker thread
    pub fn spawn(store: StoreHandle, algorithm: HashAlgorithm) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let worker_thread = thread::spawn(move || {
            worker_loop(request_rx, result_tx, store, algorithm);
        });

        Self {
            request_tx,
            result_rx,
            _worker_thread: worker_thread,
        }
    }

    /// Queue a request. Returns false if the worker has gone away.
    pub fn request(&self, req: StoreRequest) -> bool {
        self.request_tx.send(req).is_ok()
    }

    /// Try to receive a result (non-blocking)
    pub fn try_recv_result(&self) -> Option<StoreResult> {
        self.result_rx.try_recv().ok()
    }

    pub fn results(&self) -> &Receiver<StoreResult> {
        &self.result_rx
    }
}

/// Worker thread main loop
fn worker_loop(
    request_rx: Receiver<StoreRequest>,
    result_tx: Sender<StoreResult>,
    store: StoreHandle,
    algorithm: HashAlgorithm,
) {
    // Exits once the editor drops its request sender
    for req in request_rx {
        let result = match req {
            StoreRequest::Resolve {
                generation,
                node,
                hash,
            } => {
                let outcome = resolve(&store, algorithm, &hash);
                StoreResult::Resolved {
                    generation,
                    node,
                    hash,
                    outcome,
                }
            }
            StoreRequest::Delete { hash } => StoreResult::Deleted {
                result: store.delete_item(&hash),
                hash,
            },
            StoreRequest::Clear => StoreResult::Cleared {
                result: store.clear(),
            },
        };

        if result_tx.send(result).is_err() {
            debug!("store worker result receiver dropped, exiting");
            break;
        }
    }
}

/// Fetch and verify the bytes stored under `hash`
pub fn resolve(store: &StoreHandle, algorithm: HashAlgorithm, hash: &str) -> ResolveOutcome {
    let bytes = match store.get_item(hash) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return ResolveOutcome::Miss,
        Err(e) => return ResolveOutcome::Failed(e.into()),
    };

    let actual = algorithm.digest(&bytes);
    if actual != hash {
        return ResolveOutcome::Failed(
            DecodeError::Integrity {
                expected: hash.to_string(),
                actual,
            }
            .into(),
        );
    }

    match sniff::display_uri(bytes) {
        Ok(src) => ResolveOutcome::Resolved(src),
        Err(e) => ResolveOutcome::Failed(e.into()),
    }
}
