//! In-memory notification capture for tests.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use crate::dispatch::{Notification, NotificationDispatcher};
use crate::error::{Error, Result};

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("notification buffer poisoned")
}

/// Dispatcher that buffers notifications instead of delivering them.
///
/// Tests assert on the buffer to verify what the lifecycle announced.
#[derive(Debug, Default)]
pub struct InMemoryDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl InMemoryDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every notification dispatched so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of notifications dispatched so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing was dispatched yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the buffer.
    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl NotificationDispatcher for InMemoryDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<()> {
        let mut sent = self.sent.lock().map_err(poison_err)?;
        sent.push(notification);
        drop(sent);
        Ok(())
    }
}
