use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use openssl::hash::{hash, MessageDigest};

use crate::constants::{
    BAZAAR_MIN_BROADCAST_VERSION, BAZAAR_PACKAGE_DIGEST, MYKET_MIN_BROADCAST_VERSION,
    MYKET_PACKAGE_DIGEST,
};

/// Locks a mutex, recovering the data if a previous holder panicked. The
/// guarded state is plain flags and slots that stay consistent across a
/// panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Lowercase hex MD5 of a store package name, used to identify stores that
/// speak the broadcast protocol.
pub(crate) fn store_package_digest(package: &str) -> Option<String> {
    hash(MessageDigest::md5(), package.as_bytes())
        .ok()
        .map(|digest| hex::encode(&*digest))
}

/// Lowest store version that answers broadcasts, or `None` if the store is
/// not known to support them.
pub(crate) fn broadcast_min_version(store_package: &str) -> Option<i64> {
    match store_package_digest(store_package)?.as_str() {
        MYKET_PACKAGE_DIGEST => Some(MYKET_MIN_BROADCAST_VERSION),
        BAZAAR_PACKAGE_DIGEST => Some(BAZAAR_MIN_BROADCAST_VERSION),
        _ => None,
    }
}
