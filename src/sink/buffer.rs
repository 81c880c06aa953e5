//! Per-thread pending-line storage.
//!
//! Each thread owns one map from sink id to the unterminated tail that thread
//! has written to that sink. Nothing here is shared between threads, so the
//! write path never locks. Entries disappear with their thread, and entries
//! whose sink has been dropped are pruned the next time the thread starts a
//! new tail.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct Pending {
    owner: Weak<()>,
    tail: String,
}

thread_local! {
    static PENDING: RefCell<HashMap<u64, Pending>> = RefCell::new(HashMap::new());
}

/// Append `text` to the calling thread's pending tail for sink `id`.
///
/// `owner` is alive exactly as long as the sink.
pub(super) fn append(id: u64, owner: &Arc<()>, text: &str) {
    if text.is_empty() {
        return;
    }
    // Fails only while the thread's locals are being torn down.
    let _ = PENDING.try_with(|pending| {
        let mut pending = pending.borrow_mut();
        if let Some(entry) = pending.get_mut(&id) {
            entry.tail.push_str(text);
            return;
        }
        pending.retain(|_, entry| entry.owner.strong_count() > 0);
        pending.insert(
            id,
            Pending {
                owner: Arc::downgrade(owner),
                tail: text.to_owned(),
            },
        );
    });
}

/// Remove and return the calling thread's pending tail for sink `id`.
///
/// Returns `None` when nothing is pending.
pub(super) fn take(id: u64) -> Option<String> {
    PENDING
        .try_with(|pending| pending.borrow_mut().remove(&id))
        .ok()
        .flatten()
        .map(|entry| entry.tail)
        .filter(|tail| !tail.is_empty())
}

/// Length in bytes of the calling thread's pending tail for sink `id`.
pub(super) fn pending_len(id: u64) -> usize {
    PENDING
        .try_with(|pending| pending.borrow().get(&id).map_or(0, |entry| entry.tail.len()))
        .unwrap_or(0)
}
