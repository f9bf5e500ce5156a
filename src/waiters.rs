/*!
The table of requests that wait for their replies

Entries are keyed by datapath id and transaction id. Each datapath has its
own lock, so traffic of different switches does not serialize, and
appending a fragment and completing on the last one happen under the same
lock. A waiter is released exactly once: with all fragments in arrival
order, or as abandoned when its switch goes away.
*/

use std::collections::HashMap;
use std::error;
use std::fmt;
use std::result;
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, PartialEq)]
pub enum Error {
    /// A request with the same datapath id and xid is still waiting
    DuplicateRequest(u64, u32),
    /// There is no waiting request with this datapath id and xid
    NotFound(u64, u32),
    /// No terminal fragment arrived in time
    TimedOut(u64, u32),
    /// The switch disconnected before the request completed
    Abandoned(u64, u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::DuplicateRequest(dpid, xid) => {
                write!(f, "Request {} on datapath {} is already pending", xid, dpid)
            }
            Error::NotFound(dpid, xid) => write!(f, "No request {} pending on datapath {}", xid, dpid),
            Error::TimedOut(dpid, xid) => {
                write!(f, "Request {} on datapath {} timed out", xid, dpid)
            }
            Error::Abandoned(dpid, xid) => write!(
                f,
                "Datapath {} disconnected while request {} was pending",
                dpid, xid
            ),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "Pending request error"
    }
}

pub type Result<T> = result::Result<T, Error>;

enum Outcome<M> {
    Complete(Vec<M>),
    Abandoned,
}

struct Pending<M> {
    replies: Vec<M>,
    done: SyncSender<Outcome<M>>,
}

impl<M> Pending<M> {
    fn release(self) {
        // The receiver is gone if the waiter timed out in the meantime
        let _ = self.done.try_send(Outcome::Complete(self.replies));
    }
}

type Transactions<M> = Mutex<HashMap<u32, Pending<M>>>;

/// A registered request, used to wait for its completion
#[must_use]
pub struct Handle<M> {
    dpid: u64,
    xid: u32,
    done: Receiver<Outcome<M>>,
}

impl<M> Handle<M> {
    pub fn dpid(&self) -> u64 {
        self.dpid
    }

    pub fn xid(&self) -> u32 {
        self.xid
    }
}

/// Pending requests of all datapaths
pub struct Waiters<M> {
    datapaths: RwLock<HashMap<u64, Arc<Transactions<M>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<M> Waiters<M> {
    pub fn new() -> Waiters<M> {
        Waiters {
            datapaths: RwLock::new(HashMap::new()),
        }
    }

    fn transactions(&self, dpid: u64) -> Option<Arc<Transactions<M>>> {
        let datapaths = self.datapaths.read().unwrap_or_else(PoisonError::into_inner);
        datapaths.get(&dpid).cloned()
    }

    /// Opens the table of a datapath that joined.
    /// Requests can only be registered for open datapaths.
    pub fn open(&self, dpid: u64) {
        let mut datapaths = self.datapaths.write().unwrap_or_else(PoisonError::into_inner);
        datapaths.entry(dpid).or_default();
    }

    /// Registers a request before its message is sent
    pub fn register(&self, dpid: u64, xid: u32) -> Result<Handle<M>> {
        // A datapath without a table is gone or was never connected
        let transactions = self.transactions(dpid).ok_or(Error::Abandoned(dpid, xid))?;
        let mut transactions = lock(&transactions);
        if transactions.contains_key(&xid) {
            return Err(Error::DuplicateRequest(dpid, xid));
        }
        let (done, rx) = sync_channel(1);
        transactions.insert(
            xid,
            Pending {
                replies: vec![],
                done,
            },
        );
        trace!("Registered request {} on datapath {}", xid, dpid);
        Ok(Handle { dpid, xid, done: rx })
    }

    /// Appends a reply fragment to a pending request
    pub fn append(&self, dpid: u64, xid: u32, msg: M) -> Result<()> {
        self.deliver(dpid, xid, msg, true)
    }

    /// Removes a pending request and releases its waiter.
    /// Nothing happens if the request is not pending.
    pub fn complete(&self, dpid: u64, xid: u32) {
        if let Some(transactions) = self.transactions(dpid) {
            if let Some(pending) = lock(&transactions).remove(&xid) {
                pending.release();
            }
        }
    }

    /// Appends a reply fragment and, unless more fragments follow,
    /// completes the request in the same step
    pub fn deliver(&self, dpid: u64, xid: u32, msg: M, more: bool) -> Result<()> {
        let transactions = self.transactions(dpid).ok_or(Error::NotFound(dpid, xid))?;
        let mut transactions = lock(&transactions);
        match transactions.get_mut(&xid) {
            Some(pending) => pending.replies.push(msg),
            None => return Err(Error::NotFound(dpid, xid)),
        }
        if !more {
            if let Some(pending) = transactions.remove(&xid) {
                pending.release();
            }
        }
        Ok(())
    }

    /// Removes a pending request without releasing its waiter.
    /// Returns whether the request was pending.
    pub fn cancel(&self, dpid: u64, xid: u32) -> bool {
        match self.transactions(dpid) {
            Some(transactions) => lock(&transactions).remove(&xid).is_some(),
            None => false,
        }
    }

    /// Closes the table of a datapath and abandons its pending requests
    pub fn forget(&self, dpid: u64) {
        let removed = {
            let mut datapaths = self.datapaths.write().unwrap_or_else(PoisonError::into_inner);
            datapaths.remove(&dpid)
        };
        if let Some(transactions) = removed {
            for (xid, pending) in lock(&transactions).drain() {
                debug!("Abandoning request {} on datapath {}", xid, dpid);
                let _ = pending.done.try_send(Outcome::Abandoned);
            }
        }
    }

    /// Whether a request is pending
    pub fn is_pending(&self, dpid: u64, xid: u32) -> bool {
        self.transactions(dpid)
            .map_or(false, |transactions| lock(&transactions).contains_key(&xid))
    }

    /// Blocks until the request completes or `timeout` elapses.
    /// A timed out request is removed from the table.
    pub fn wait(&self, handle: Handle<M>, timeout: Duration) -> Result<Vec<M>> {
        let Handle { dpid, xid, done } = handle;
        let outcome = match done.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                self.cancel(dpid, xid);
                // The terminal fragment may have arrived after the timeout
                match done.try_recv() {
                    Ok(outcome) => outcome,
                    Err(_) => return Err(Error::TimedOut(dpid, xid)),
                }
            }
            Err(RecvTimeoutError::Disconnected) => Outcome::Abandoned,
        };
        match outcome {
            Outcome::Complete(replies) => Ok(replies),
            Outcome::Abandoned => Err(Error::Abandoned(dpid, xid)),
        }
    }
}

impl<M> Default for Waiters<M> {
    fn default() -> Waiters<M> {
        Waiters::new()
    }
}
