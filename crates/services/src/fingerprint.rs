use std::sync::Arc;

use bite_core::model::Fingerprint;
use storage::repository::{KeyValueStore, keys};
use tokio::sync::OnceCell;
use tracing::warn;

/// Anonymous, locally cached identity used to attribute likes and feedback.
pub struct FingerprintService {
    kv: Arc<dyn KeyValueStore>,
    cached: OnceCell<Fingerprint>,
}

impl FingerprintService {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            cached: OnceCell::new(),
        }
    }

    /// Return the stored fingerprint, generating and caching one on first use.
    ///
    /// If it cannot be persisted, the generated value still holds for this
    /// process.
    pub async fn get_or_create(&self) -> Fingerprint {
        self.cached
            .get_or_init(|| async {
                match self.kv.load(keys::FINGERPRINT).await {
                    Ok(Some(raw)) => {
                        if let Some(existing) = Fingerprint::new(raw) {
                            return existing;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => warn!("failed to read fingerprint: {err}"),
                }

                let fresh = generate();
                if let Err(err) = self.kv.save(keys::FINGERPRINT, fresh.as_str()).await {
                    warn!("failed to persist fingerprint: {err}");
                }
                fresh
            })
            .await
            .clone()
    }
}

fn generate() -> Fingerprint {
    let bytes: [u8; 8] = rand::random();
    Fingerprint::from_random_bytes(&bytes)
}
