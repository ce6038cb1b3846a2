//! Waker management for async coordination.

use std::collections::HashMap;
use std::task::Waker;

/// Wakers registered by suspended processes, keyed by task id.
#[derive(Debug, Default)]
pub(crate) struct WakerRegistry {
    pub(crate) task_wakers: HashMap<u64, Waker>,
}
