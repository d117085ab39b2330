//! Bookkeeping for in-flight RPC calls.
//!
//! Each call owns a slot in a msg-id-keyed map from the moment it is
//! registered until it resolves. Resolution removes the slot, so a late or
//! duplicate answer finds nothing and is discarded — every call completes
//! exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::oneshot;

use crate::errors::InvocationError;

/// Lifecycle of an in-flight call after it has been written to the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum CallState {
    /// Written, no acknowledgment seen yet. Eligible for resend.
    Sent,
    /// The server acknowledged receipt. Never resent.
    Acknowledged,
}

/// One registered call awaiting its answer.
pub(crate) struct PendingCall {
    /// TL-serialized request body, kept for resends.
    pub request: Vec<u8>,
    /// Resolution slot; consuming it is what resolves the call.
    pub tx: oneshot::Sender<Result<Vec<u8>, InvocationError>>,
    pub state: CallState,
    /// How many times this call has been re-sent.
    pub resends: u32,
    pub created_at: Instant,
    /// Cell shared with the caller's drop guard; resends re-key the map and
    /// update this so cancellation always targets the live entry.
    pub key_cell: Arc<Mutex<i64>>,
}

/// The msg-id → call map. One lock, short critical sections, no awaiting
/// while held.
#[derive(Default)]
pub(crate) struct PendingMap {
    calls: Mutex<HashMap<i64, PendingCall>>,
}

impl PendingMap {
    /// Register a call under `msg_id` before its frame hits the wire.
    pub fn register(&self, msg_id: i64, call: PendingCall) {
        self.calls.lock().unwrap().insert(msg_id, call);
    }

    /// Resolve and remove the call registered under `msg_id`.
    ///
    /// Returns `false` when no such call exists (late, duplicate, or
    /// cancelled), which callers log and ignore.
    pub fn resolve(&self, msg_id: i64, result: Result<Vec<u8>, InvocationError>) -> bool {
        let call = self.calls.lock().unwrap().remove(&msg_id);
        match call {
            Some(call) => {
                // the receiver may be gone if the caller timed out
                let _ = call.tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Mark a call as acknowledged by the server.
    pub fn acknowledge(&self, msg_id: i64) {
        if let Some(call) = self.calls.lock().unwrap().get_mut(&msg_id) {
            call.state = CallState::Acknowledged;
        }
    }

    /// Remove and return the call under `msg_id` without resolving it.
    pub fn take(&self, msg_id: i64) -> Option<PendingCall> {
        self.calls.lock().unwrap().remove(&msg_id)
    }

    /// Remove every call still in `Sent` state, for resending after a
    /// reconnect. Acknowledged calls stay put.
    pub fn take_unacknowledged(&self) -> Vec<(i64, PendingCall)> {
        let mut calls = self.calls.lock().unwrap();
        let ids: Vec<i64> = calls
            .iter()
            .filter(|(_, c)| c.state == CallState::Sent)
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| calls.remove(&id).map(|c| (id, c)))
            .collect()
    }

    /// Fail every registered call with `ConnectionLost`.
    pub fn fail_all(&self) {
        let calls: Vec<PendingCall> = {
            let mut map = self.calls.lock().unwrap();
            map.drain().map(|(_, c)| c).collect()
        };
        for call in calls {
            let _ = call.tx.send(Err(InvocationError::ConnectionLost));
        }
    }

    /// Number of in-flight calls.
    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}
