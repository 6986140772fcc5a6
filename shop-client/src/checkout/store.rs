//! Pending checkouts on disk, one JSON file per reservation id

use std::fs;
use std::path::{Path, PathBuf};

use super::state::PendingCheckout;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct PendingStore {
    dir: PathBuf,
}

impl PendingStore {
    pub fn open(dir: impl Into<PathBuf>) -> ClientResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, reservation_id: &str) -> ClientResult<PathBuf> {
        let safe = !reservation_id.is_empty()
            && reservation_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(ClientError::InvalidResponse(format!(
                "unusable reservation id: {reservation_id:?}"
            )));
        }
        Ok(self.dir.join(format!("{reservation_id}.json")))
    }

    /// Write through a temp file so a crash never leaves half a record
    pub fn save(&self, pending: &PendingCheckout) -> ClientResult<()> {
        let path = self.path_for(&pending.reservation_id)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(pending)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn remove(&self, reservation_id: &str) -> ClientResult<()> {
        let path = self.path_for(reservation_id)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load(&self, reservation_id: &str) -> ClientResult<Option<PendingCheckout>> {
        let path = self.path_for(reservation_id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Newest unexpired checkout; expired and unreadable entries are deleted
    pub fn resume(&self, now: i64) -> ClientResult<Option<PendingCheckout>> {
        let mut newest: Option<PendingCheckout> = None;

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let pending = match fs::read(&path)
                .map_err(ClientError::from)
                .and_then(|b| serde_json::from_slice::<PendingCheckout>(&b).map_err(Into::into))
            {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable checkout state");
                    discard(&path);
                    continue;
                }
            };

            if pending.is_expired(now) {
                tracing::debug!(reservation_id = %pending.reservation_id, "Discarding expired checkout");
                discard(&path);
                continue;
            }

            if newest
                .as_ref()
                .is_none_or(|n| pending.expires_at > n.expires_at)
            {
                newest = Some(pending);
            }
        }

        Ok(newest)
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove checkout state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::checkout::{CheckoutRequest, CustomerInfo, ReserveItem};
    use shared::models::GatewayKind;

    fn pending(id: &str, expires_at: i64) -> PendingCheckout {
        PendingCheckout {
            reservation_id: id.into(),
            payment_url: format!("https://pay.test/{id}"),
            amount: Decimal::from(1800),
            currency: "NGN".into(),
            gateway: GatewayKind::Paystack,
            expires_at,
            form: CheckoutRequest {
                customer: CustomerInfo {
                    email: "ada@example.com".into(),
                    customer_name: "Ada".into(),
                    phone: "0801".into(),
                    address: "Lagos".into(),
                },
                items: vec![ReserveItem {
                    product_id: "lamp".into(),
                    quantity: 2,
                }],
                gateway: None,
            },
        }
    }

    #[test]
    fn test_save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::open(dir.path()).unwrap();
        let p = pending("tx-1", 10_000);

        store.save(&p).unwrap();
        assert_eq!(store.load("tx-1").unwrap(), Some(p));

        store.remove("tx-1").unwrap();
        assert_eq!(store.load("tx-1").unwrap(), None);
        // Removing twice is fine
        store.remove("tx-1").unwrap();
    }

    #[test]
    fn test_resume_picks_newest_unexpired() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::open(dir.path()).unwrap();
        store.save(&pending("old", 1_000)).unwrap();
        store.save(&pending("a", 5_000)).unwrap();
        store.save(&pending("b", 9_000)).unwrap();

        let resumed = store.resume(2_000).unwrap().unwrap();
        assert_eq!(resumed.reservation_id, "b");
        // Expired entry is gone from disk
        assert_eq!(store.load("old").unwrap(), None);
        assert!(store.load("a").unwrap().is_some());
    }

    #[test]
    fn test_resume_discards_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        assert_eq!(store.resume(0).unwrap(), None);
        assert!(!dir.path().join("broken.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = PendingStore::open(dir.path()).unwrap();
        assert!(store.save(&pending("../escape", 1)).is_err());
        assert!(store.remove("").is_err());
    }
}
