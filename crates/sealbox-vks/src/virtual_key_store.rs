//! Threshold fan-out over the backing key stores.
//!
//! Every operation issues its per-backend calls concurrently and waits
//! for all of them before deciding the outcome on the multiset of
//! results; an early exit is never taken because `delete` needs the
//! full count.

use std::sync::Arc;

use futures::future::join_all;
use sealbox_crypto::{SecretShare, SecretSharer};
use sealbox_model::{Error, Result};
use zeroize::Zeroizing;

use crate::KeyStore;

pub struct VirtualKeyStore {
    stores: Vec<Arc<dyn KeyStore>>,
    threshold: usize,
    sharer: SecretSharer,
}

impl VirtualKeyStore {
    /// Compose `stores` with the given reconstruction threshold.
    ///
    /// The sharer must be configured for exactly one share per store.
    pub fn new(
        stores: Vec<Arc<dyn KeyStore>>,
        threshold: usize,
        sharer: SecretSharer,
    ) -> Result<Self> {
        if stores.is_empty() || threshold == 0 || threshold > stores.len() {
            return Err(Error::BadConfig(format!(
                "threshold {} is not within 1..={} key stores",
                threshold,
                stores.len()
            )));
        }
        if sharer.share_count() != stores.len() || sharer.threshold() != threshold {
            return Err(Error::BadConfig(
                "secret sharer does not match the key store layout".to_string(),
            ));
        }

        Ok(Self { stores, threshold, sharer })
    }

    /// Split `key` into one share per backend and store them all
    /// concurrently. Succeeds while at least `threshold` creates land;
    /// partial failure is logged, not rolled back — a later read still
    /// reconstructs while the threshold holds.
    pub async fn create(&self, alias: &str, key: &[u8]) -> Result<()> {
        let shares = self.sharer.split(key);

        let writes = self.stores.iter().zip(shares.iter()).map(|(store, share)| async move {
            let blob = serde_json::to_vec(share).map_err(|_| Error::Internal)?;
            store.create(alias, &blob).await
        });

        let mut succeeded = 0;
        let mut last_error = Error::Internal;
        for outcome in join_all(writes).await {
            match outcome {
                Ok(()) => succeeded += 1,
                Err(err) => {
                    tracing::warn!(alias, error = %err, "failed to create share in a key store");
                    last_error = err;
                }
            }
        }

        if succeeded >= self.threshold {
            Ok(())
        } else {
            Err(last_error)
        }
    }

    /// Read shares from all backends concurrently and reconstruct once
    /// at least `threshold` of them are available.
    pub async fn read(&self, alias: &str) -> Result<Zeroizing<Vec<u8>>> {
        let reads = self.stores.iter().map(|store| async move {
            let blob = store.read(alias).await?;
            serde_json::from_slice::<SecretShare>(&blob).map_err(|_| Error::Internal)
        });

        let mut shares = Vec::new();
        let mut last_error = Error::Internal;
        for outcome in join_all(reads).await {
            match outcome {
                Ok(share) => shares.push(share),
                Err(err) => {
                    tracing::warn!(alias, error = %err, "failed to read share from a key store");
                    last_error = err;
                }
            }
        }

        if shares.len() < self.threshold {
            return Err(last_error);
        }

        let key = self.sharer.reconstruct(&shares).map_err(|err| {
            tracing::warn!(alias, error = %err, "share reconstruction failed");
            Error::Internal
        })?;

        Ok(Zeroizing::new(key))
    }

    /// Delete the shares from all backends concurrently. The deletion
    /// has succeeded once fewer than `threshold` shares survive: the
    /// key is unrecoverable even if stragglers linger.
    pub async fn delete(&self, alias: &str) -> Result<()> {
        let deletes = self.stores.iter().map(|store| store.delete(alias));

        let mut deleted = 0;
        let mut last_error = Error::Internal;
        for outcome in join_all(deletes).await {
            match outcome {
                Ok(()) => deleted += 1,
                Err(err) => {
                    tracing::warn!(alias, error = %err, "failed to delete share from a key store");
                    last_error = err;
                }
            }
        }

        let undeleted = self.stores.len() - deleted;
        if undeleted >= self.threshold {
            return Err(last_error);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::InMemoryKeyStore;

    /// Wrapper that can be taken offline, simulating an unavailable
    /// backend.
    struct FallibleKeyStore {
        inner: InMemoryKeyStore,
        available: AtomicBool,
    }

    impl FallibleKeyStore {
        fn new() -> Self {
            Self { inner: InMemoryKeyStore::new(), available: AtomicBool::new(true) }
        }

        fn set_available(&self, available: bool) {
            self.available.store(available, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.available.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(Error::Internal)
            }
        }
    }

    #[async_trait]
    impl KeyStore for FallibleKeyStore {
        async fn create(&self, alias: &str, value: &[u8]) -> Result<()> {
            self.check()?;
            self.inner.create(alias, value).await
        }

        async fn read(&self, alias: &str) -> Result<Vec<u8>> {
            self.check()?;
            self.inner.read(alias).await
        }

        async fn delete(&self, alias: &str) -> Result<()> {
            self.check()?;
            self.inner.delete(alias).await
        }
    }

    fn vks_with_stores(n: usize, k: usize) -> (VirtualKeyStore, Vec<Arc<FallibleKeyStore>>) {
        let stores: Vec<Arc<FallibleKeyStore>> =
            (0..n).map(|_| Arc::new(FallibleKeyStore::new())).collect();
        let dyn_stores: Vec<Arc<dyn KeyStore>> =
            stores.iter().map(|s| Arc::clone(s) as Arc<dyn KeyStore>).collect();
        let sharer = SecretSharer::random_field(2048, n, k);
        let vks = VirtualKeyStore::new(dyn_stores, k, sharer).unwrap();
        (vks, stores)
    }

    #[tokio::test]
    async fn test_create_and_read_roundtrip() {
        let (vks, _stores) = vks_with_stores(3, 2);

        vks.create("alias", b"val").await.unwrap();
        let value = vks.read("alias").await.unwrap();
        assert_eq!(value.as_slice(), b"val");
    }

    #[tokio::test]
    async fn test_read_tolerates_up_to_threshold_failures() {
        let (vks, stores) = vks_with_stores(3, 2);
        vks.create("alias", b"val").await.unwrap();

        stores[0].set_available(false);
        let value = vks.read("alias").await.unwrap();
        assert_eq!(value.as_slice(), b"val");

        stores[1].set_available(false);
        assert!(vks.read("alias").await.is_err());
    }

    #[tokio::test]
    async fn test_create_tolerates_up_to_threshold_failures() {
        let (vks, stores) = vks_with_stores(3, 2);

        stores[2].set_available(false);
        vks.create("alias", b"val").await.unwrap();

        let value = vks.read("alias").await.unwrap();
        assert_eq!(value.as_slice(), b"val");
    }

    #[tokio::test]
    async fn test_create_fails_below_threshold() {
        let (vks, stores) = vks_with_stores(3, 2);

        stores[0].set_available(false);
        stores[1].set_available(false);
        assert!(vks.create("alias", b"val").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_succeeds_once_key_is_unrecoverable() {
        let (vks, stores) = vks_with_stores(3, 2);
        vks.create("alias", b"val").await.unwrap();

        // One backend keeps its share, but one share cannot reconstruct.
        stores[0].set_available(false);
        vks.delete("alias").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_fails_while_key_remains_recoverable() {
        let (vks, stores) = vks_with_stores(3, 2);
        vks.create("alias", b"val").await.unwrap();

        stores[0].set_available(false);
        stores[1].set_available(false);
        assert!(vks.delete("alias").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_alias_fails() {
        let (vks, _stores) = vks_with_stores(3, 2);
        assert!(vks.delete("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_alias_rejected() {
        let (vks, _stores) = vks_with_stores(3, 2);

        vks.create("alias", b"first").await.unwrap();
        assert_eq!(vks.create("alias", b"second").await, Err(Error::AlreadyExists));
    }

    #[test]
    fn test_bad_layout_rejected() {
        let stores: Vec<Arc<dyn KeyStore>> = vec![Arc::new(InMemoryKeyStore::new())];

        let sharer = SecretSharer::random_field(512, 1, 1);
        assert!(VirtualKeyStore::new(vec![], 1, sharer.clone()).is_err());

        let sharer = SecretSharer::random_field(512, 1, 1);
        assert!(VirtualKeyStore::new(stores.clone(), 2, sharer).is_err());

        let sharer = SecretSharer::random_field(512, 3, 2);
        assert!(VirtualKeyStore::new(stores, 1, sharer).is_err());
    }
}
