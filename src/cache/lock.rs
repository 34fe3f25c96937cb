//! Lock helpers that recover from poisoning.
//!
//! Cached data is always reproducible from the content tree, so a panic while
//! a guard was held must not take the cache down with it.

use std::sync::{
    Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use tracing::warn;

fn recover<G>(
    poisoned: PoisonError<G>,
    target: &'static str,
    op: &'static str,
    lock_kind: &'static str,
) -> G {
    warn!(
        op,
        target_module = target,
        lock_kind,
        result = "poisoned_recovered",
        "Recovered from poisoned cache lock"
    );
    poisoned.into_inner()
}

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read()
        .unwrap_or_else(|poisoned| recover(poisoned, target, op, "rwlock.read"))
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write()
        .unwrap_or_else(|poisoned| recover(poisoned, target, op, "rwlock.write"))
}

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock()
        .unwrap_or_else(|poisoned| recover(poisoned, target, op, "mutex.lock"))
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn poisoned_locks_stay_usable() {
        let rw = RwLock::new(1);
        let mutex = Mutex::new(1);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _rw_guard = rw.write().expect("rw lock");
            let _mutex_guard = mutex.lock().expect("mutex");
            panic!("poison both locks");
        }));

        assert!(rw.is_poisoned());
        *rw_write(&rw, "test", "write") += 1;
        assert_eq!(*rw_read(&rw, "test", "read"), 2);
        *mutex_lock(&mutex, "test", "lock") += 1;
        assert_eq!(*mutex_lock(&mutex, "test", "lock"), 2);
    }
}
