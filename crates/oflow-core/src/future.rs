//! Request/reply correlation futures.
//!
//! A [`MessageFuture`] is a single-assignment result slot keyed (by
//! construction) on the originating request's transaction id. One producer
//! - the connection's inbound reader - satisfies it exactly once; any
//! number of consumer threads may block on it, with or without a deadline,
//! and satisfaction wakes them all. Listeners registered before
//! satisfaction run on the satisfier's thread; listeners registered after
//! run immediately on the registering thread.
//!
//! Cancellation is implicit via timeout only. A waiter that timed out and
//! returned [`Disposition::Unsatisfied`] has simply observed "not done
//! yet"; the future may still be satisfied later, which is not an error.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use oflow_proto::Message;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Terminal outcome of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The expected reply arrived.
    Success(Message),
    /// The request needs no reply and was accepted (e.g. a flow-mod that
    /// produced no error within the barrier window).
    SuccessNoReply,
    /// The peer answered with a protocol error message.
    PeerError(Message),
    /// A local fault prevented completion.
    Failure(CoreError),
}

/// What a (possibly bounded) wait observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Not satisfied within the observation window.
    Unsatisfied,
    /// Satisfied with this outcome.
    Done(Outcome),
}

impl Disposition {
    /// True once a terminal outcome is set.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

type Listener = Box<dyn FnOnce(&Outcome) + Send>;

struct State {
    outcome: Option<Outcome>,
    listeners: Vec<Listener>,
}

struct Inner {
    request: Message,
    state: Mutex<State>,
    cond: Condvar,
}

/// A single-assignment future for the reply to one request.
///
/// Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct MessageFuture {
    inner: Arc<Inner>,
}

impl MessageFuture {
    /// Create a future for a sealed request.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnassignedXid`] if the request carries the reserved
    /// zero xid.
    pub fn new(request: Message) -> Result<Self> {
        if request.xid() == 0 {
            return Err(CoreError::UnassignedXid);
        }
        Ok(Self {
            inner: Arc::new(Inner {
                request,
                state: Mutex::new(State { outcome: None, listeners: Vec::new() }),
                cond: Condvar::new(),
            }),
        })
    }

    /// The xid this future correlates on.
    #[must_use]
    pub fn xid(&self) -> u32 {
        self.inner.request.xid()
    }

    /// The originating request.
    #[must_use]
    pub fn request(&self) -> &Message {
        &self.inner.request
    }

    /// Satisfy with a reply, or with "accepted, no reply expected" when
    /// `reply` is `None`. Returns whether this call set the outcome (a
    /// second satisfaction attempt is a no-op returning `false`).
    pub fn set_success(&self, reply: Option<Message>) -> bool {
        self.satisfy(match reply {
            Some(m) => Outcome::Success(m),
            None => Outcome::SuccessNoReply,
        })
    }

    /// Satisfy with the peer's error reply.
    pub fn set_failure_reply(&self, error_reply: Message) -> bool {
        self.satisfy(Outcome::PeerError(error_reply))
    }

    /// Satisfy with a local fault.
    pub fn set_failure(&self, fault: CoreError) -> bool {
        self.satisfy(Outcome::Failure(fault))
    }

    fn satisfy(&self, outcome: Outcome) -> bool {
        let mut state = self.inner.state.lock().expect("future lock poisoned");
        if state.outcome.is_some() {
            return false;
        }
        state.outcome = Some(outcome.clone());
        let listeners = std::mem::take(&mut state.listeners);
        drop(state);
        self.inner.cond.notify_all();
        debug!(xid = self.xid(), listeners = listeners.len(), "request future satisfied");
        for l in listeners {
            l(&outcome);
        }
        true
    }

    /// The current state, without blocking.
    #[must_use]
    pub fn result(&self) -> Disposition {
        let state = self.inner.state.lock().expect("future lock poisoned");
        match &state.outcome {
            Some(o) => Disposition::Done(o.clone()),
            None => Disposition::Unsatisfied,
        }
    }

    /// Block until satisfied.
    #[must_use]
    pub fn wait(&self) -> Outcome {
        let mut state = self.inner.state.lock().expect("future lock poisoned");
        loop {
            if let Some(o) = &state.outcome {
                return o.clone();
            }
            state = self.inner.cond.wait(state).expect("future lock poisoned");
        }
    }

    /// Block until satisfied or until `timeout` elapses. A timeout returns
    /// [`Disposition::Unsatisfied`], observationally identical to a future
    /// that was never completed.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Disposition {
        let deadline = std::time::Instant::now() + timeout;
        let mut state = self.inner.state.lock().expect("future lock poisoned");
        loop {
            if let Some(o) = &state.outcome {
                return Disposition::Done(o.clone());
            }
            let now = std::time::Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now).filter(|d| !d.is_zero())
            else {
                return Disposition::Unsatisfied;
            };
            let (guard, _timed_out) =
                self.inner.cond.wait_timeout(state, remaining).expect("future lock poisoned");
            state = guard;
        }
    }

    /// Register a listener. Before satisfaction it is queued and will run
    /// on the satisfier's thread; after satisfaction it runs immediately,
    /// on this thread, without blocking.
    pub fn add_listener(&self, listener: impl FnOnce(&Outcome) + Send + 'static) {
        let mut state = self.inner.state.lock().expect("future lock poisoned");
        match &state.outcome {
            Some(o) => {
                let o = o.clone();
                drop(state);
                listener(&o);
            }
            None => state.listeners.push(Box::new(listener)),
        }
    }
}

impl std::fmt::Debug for MessageFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageFuture")
            .field("xid", &self.xid())
            .field("state", &self.result())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use oflow_proto::{msg::Echo, Body, Message, ProtocolVersion};

    fn request() -> Message {
        Message::seal(ProtocolVersion::V13, Body::EchoRequest(Echo::default())).unwrap()
    }

    fn reply_for(req: &Message) -> Message {
        Message::seal_response(req, Body::EchoReply(Echo::default())).unwrap()
    }

    #[test]
    fn rejects_zero_xid() {
        // sealing never produces xid 0, but a peer's frame can carry one
        let wire = [0x04, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00];
        let mut r = oflow_proto::buffer::Reader::new(&wire);
        let zero_xid_msg = oflow_proto::parse_message(&mut r).unwrap().unwrap();
        assert_eq!(zero_xid_msg.xid(), 0);
        assert_eq!(
            MessageFuture::new(zero_xid_msg).unwrap_err(),
            CoreError::UnassignedXid
        );
        assert!(MessageFuture::new(request()).is_ok());
    }

    #[test]
    fn single_assignment() {
        let req = request();
        let reply = reply_for(&req);
        let fut = MessageFuture::new(req).unwrap();

        assert_eq!(fut.result(), Disposition::Unsatisfied);
        assert!(fut.set_success(Some(reply.clone())));
        assert!(!fut.set_success(None), "second satisfaction must lose");
        assert!(!fut.set_failure(CoreError::Shutdown));
        assert_eq!(fut.result(), Disposition::Done(Outcome::Success(reply)));
    }

    #[test]
    fn timeout_returns_unsatisfied() {
        let fut = MessageFuture::new(request()).unwrap();
        let d = fut.wait_timeout(Duration::from_millis(20));
        assert_eq!(d, Disposition::Unsatisfied);
        // late satisfaction is not an error
        assert!(fut.set_success(None));
        assert_eq!(fut.result(), Disposition::Done(Outcome::SuccessNoReply));
    }

    #[test]
    fn one_blocked_waiter_wakes() {
        let fut = MessageFuture::new(request()).unwrap();
        let waiter = {
            let fut = fut.clone();
            thread::spawn(move || fut.wait())
        };
        thread::sleep(Duration::from_millis(10));
        assert!(fut.set_success(None));
        assert_eq!(waiter.join().unwrap(), Outcome::SuccessNoReply);
    }

    #[test]
    fn three_concurrent_waiters_all_wake() {
        let req = request();
        let reply = reply_for(&req);
        let fut = MessageFuture::new(req).unwrap();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let fut = fut.clone();
                thread::spawn(move || fut.wait())
            })
            .collect();
        thread::sleep(Duration::from_millis(10));
        assert!(fut.set_success(Some(reply.clone())));
        for w in waiters {
            assert_eq!(w.join().unwrap(), Outcome::Success(reply.clone()));
        }
    }

    #[test]
    fn listeners_fire_once_each() {
        static FIRED: AtomicUsize = AtomicUsize::new(0);
        let fut = MessageFuture::new(request()).unwrap();
        fut.add_listener(|_| {
            FIRED.fetch_add(1, Ordering::SeqCst);
        });
        fut.add_listener(|o| {
            assert!(matches!(o, Outcome::SuccessNoReply));
            FIRED.fetch_add(1, Ordering::SeqCst);
        });
        assert!(fut.set_success(None));
        assert_eq!(FIRED.load(Ordering::SeqCst), 2);

        // post-satisfaction registration notifies immediately
        fut.add_listener(|_| {
            FIRED.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(FIRED.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn peer_error_outcome() {
        let req = request();
        let err_reply = Message::seal_response(
            &req,
            Body::Error(oflow_proto::msg::ErrorMsg::Standard {
                err_type: oflow_proto::msg::ErrorType::BadRequest,
                code: 0,
                data: vec![],
            }),
        )
        .unwrap();
        let fut = MessageFuture::new(req).unwrap();
        assert!(fut.set_failure_reply(err_reply.clone()));
        assert_eq!(fut.wait(), Outcome::PeerError(err_reply));
    }
}
