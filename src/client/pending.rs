//! Pending-request table keyed by nonce
//!
//! Written by `send` callers, read by the read loop. The closed flag lives
//! under the same lock so a request registered concurrently with teardown is
//! either drained by it or refused.

use crate::error::ClientError;
use crate::protocol::Payload;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

pub(crate) type Outcome = Result<Payload, ClientError>;

#[derive(Default)]
struct Table {
    closed: bool,
    waiters: HashMap<String, oneshot::Sender<Outcome>>,
}

#[derive(Clone, Default)]
pub(crate) struct PendingTable {
    table: Arc<Mutex<Table>>,
}

impl PendingTable {
    /// Register a waiter, failing with `Closed` once teardown has run
    pub fn register(&self, nonce: String) -> Result<Waiter, ClientError> {
        let (tx, rx) = oneshot::channel();
        let mut table = self.table.lock();
        if table.closed {
            return Err(ClientError::Closed);
        }
        table.waiters.insert(nonce.clone(), tx);
        Ok(Waiter {
            nonce,
            rx,
            table: self.table.clone(),
        })
    }

    /// Deliver an outcome; `false` if no request is waiting on `nonce`
    pub fn resolve(&self, nonce: &str, outcome: Outcome) -> bool {
        let tx = self.table.lock().waiters.remove(nonce);
        match tx {
            Some(tx) => {
                // Receiver gone means the caller stopped waiting
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Refuse new registrations and fail everything still waiting
    pub fn close(&self) -> usize {
        let waiters: Vec<_> = {
            let mut table = self.table.lock();
            table.closed = true;
            table.waiters.drain().map(|(_, tx)| tx).collect()
        };
        let count = waiters.len();
        for tx in waiters {
            let _ = tx.send(Err(ClientError::Closed));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.table.lock().waiters.len()
    }
}

/// Caller side of one pending request. Dropping it unregisters the nonce.
pub(crate) struct Waiter {
    nonce: String,
    rx: oneshot::Receiver<Outcome>,
    table: Arc<Mutex<Table>>,
}

impl Waiter {
    pub async fn wait(mut self) -> Outcome {
        (&mut self.rx).await.unwrap_or(Err(ClientError::Closed))
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.table.lock().waiters.remove(&self.nonce);
    }
}
