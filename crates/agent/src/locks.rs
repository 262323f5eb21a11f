use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async locks, keyed by technician phone number.
///
/// Holding the guard serializes every turn touching that phone's
/// conversation, so a webhook reply and a scheduler tick cannot interleave
/// their read-transition-commit cycles.
#[derive(Default)]
pub struct PhoneLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PhoneLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, phone: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(phone.to_owned()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::PhoneLocks;

    #[tokio::test]
    async fn same_key_serializes_and_different_keys_do_not() {
        let locks = Arc::new(PhoneLocks::new());

        let held = locks.acquire("+15550001111").await;

        // A different key is immediately available.
        let other = locks.acquire("+15550002222").await;
        drop(other);

        // The held key is not.
        let contended = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("+15550001111").await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!contended.is_finished());

        drop(held);
        contended.await.expect("blocked task completes after release");
    }
}
