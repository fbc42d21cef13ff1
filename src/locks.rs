use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("recovering poisoned mutex");
        poisoned.into_inner()
    })
}

pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!("recovering poisoned rwlock");
        poisoned.into_inner()
    })
}

pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!("recovering poisoned rwlock");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn poisoned_locks_keep_their_data() {
        let mutex = Arc::new(Mutex::new(vec![1]));
        let rwlock = Arc::new(RwLock::new(vec![1]));
        let (m, r) = (mutex.clone(), rwlock.clone());
        let result = std::thread::spawn(move || {
            let _m = m.lock().expect("lock");
            let _r = r.write().expect("write");
            panic!("poison both");
        })
        .join();
        assert!(result.is_err());
        assert!(mutex.is_poisoned());
        assert!(rwlock.is_poisoned());

        lock(&mutex).push(2);
        write(&rwlock).push(2);
        assert_eq!(*lock(&mutex), vec![1, 2]);
        assert_eq!(*read(&rwlock), vec![1, 2]);
    }
}
