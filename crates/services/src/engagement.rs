//! Likes and feedback. Every call degrades to `false`/`None` on failure so a
//! broken or missing remote store never blocks playback.

use std::sync::Arc;

use bite_core::Clock;
use bite_core::model::{Feedback, ItemId, Like, Rating};
use storage::repository::{EngagementRepository, StorageError};
use tracing::warn;

use crate::fingerprint::FingerprintService;

#[derive(Clone)]
pub struct EngagementService {
    clock: Clock,
    repo: Option<Arc<dyn EngagementRepository>>,
    fingerprint: Arc<FingerprintService>,
}

impl EngagementService {
    #[must_use]
    pub fn new(
        clock: Clock,
        repo: Option<Arc<dyn EngagementRepository>>,
        fingerprint: Arc<FingerprintService>,
    ) -> Self {
        Self {
            clock,
            repo,
            fingerprint,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.repo.is_some()
    }

    /// Like `item_id`. Liking twice is treated as success.
    pub async fn like(&self, item_id: &ItemId) -> bool {
        let Some(repo) = self.repo.as_ref() else {
            return false;
        };
        let like = Like {
            item_id: item_id.clone(),
            fingerprint: self.fingerprint.get_or_create().await,
            created_at: self.clock.now(),
        };
        match repo.insert_like(&like).await {
            Ok(()) | Err(StorageError::Conflict) => true,
            Err(err) => {
                warn!(item = %item_id, "like failed: {err}");
                false
            }
        }
    }

    /// Remove this viewer's like. Returns `true` if the call succeeded.
    pub async fn unlike(&self, item_id: &ItemId) -> bool {
        let Some(repo) = self.repo.as_ref() else {
            return false;
        };
        let fingerprint = self.fingerprint.get_or_create().await;
        match repo.delete_like(item_id, &fingerprint).await {
            Ok(_) => true,
            Err(err) => {
                warn!(item = %item_id, "unlike failed: {err}");
                false
            }
        }
    }

    pub async fn has_liked(&self, item_id: &ItemId) -> Option<bool> {
        let likes = self.likes(item_id).await?;
        let fingerprint = self.fingerprint.get_or_create().await;
        Some(likes.iter().any(|like| like.fingerprint == fingerprint))
    }

    pub async fn like_count(&self, item_id: &ItemId) -> Option<usize> {
        self.likes(item_id).await.map(|likes| likes.len())
    }

    /// Submit a rating with an optional comment.
    pub async fn submit_feedback(
        &self,
        item_id: &ItemId,
        rating: Rating,
        comment: Option<String>,
    ) -> bool {
        let Some(repo) = self.repo.as_ref() else {
            return false;
        };
        let feedback = Feedback::new(
            item_id.clone(),
            self.fingerprint.get_or_create().await,
            rating,
            comment,
            self.clock.now(),
        );
        match repo.insert_feedback(&feedback).await {
            Ok(()) => true,
            Err(err) => {
                warn!(item = %item_id, "feedback submission failed: {err}");
                false
            }
        }
    }

    async fn likes(&self, item_id: &ItemId) -> Option<Vec<Like>> {
        let repo = self.repo.as_ref()?;
        match repo.list_likes(item_id).await {
            Ok(likes) => Some(likes),
            Err(err) => {
                warn!(item = %item_id, "loading likes failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bite_core::model::Fingerprint;
    use bite_core::time::fixed_clock;
    use storage::repository::{InMemoryEngagement, InMemoryStore};

    struct Offline;

    #[async_trait]
    impl EngagementRepository for Offline {
        async fn insert_like(&self, _like: &Like) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
        async fn delete_like(
            &self,
            _item_id: &ItemId,
            _fingerprint: &Fingerprint,
        ) -> Result<bool, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
        async fn list_likes(&self, _item_id: &ItemId) -> Result<Vec<Like>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
        async fn insert_feedback(&self, _feedback: &Feedback) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
        async fn list_feedback(&self, _item_id: &ItemId) -> Result<Vec<Feedback>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
        async fn list_all_likes(&self) -> Result<Vec<Like>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
        async fn list_all_feedback(&self) -> Result<Vec<Feedback>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    fn service(repo: Option<Arc<dyn EngagementRepository>>) -> EngagementService {
        let fingerprint = Arc::new(FingerprintService::new(Arc::new(InMemoryStore::new())));
        EngagementService::new(fixed_clock(), repo, fingerprint)
    }

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn like_is_idempotent_and_reversible() {
        let svc = service(Some(Arc::new(InMemoryEngagement::new())));
        assert!(svc.like(&id("a")).await);
        assert!(svc.like(&id("a")).await);
        assert_eq!(svc.like_count(&id("a")).await, Some(1));
        assert_eq!(svc.has_liked(&id("a")).await, Some(true));

        assert!(svc.unlike(&id("a")).await);
        assert_eq!(svc.has_liked(&id("a")).await, Some(false));
    }

    #[tokio::test]
    async fn feedback_is_recorded() {
        let repo = Arc::new(InMemoryEngagement::new());
        let svc = service(Some(repo.clone()));
        assert!(
            svc.submit_feedback(&id("a"), Rating::new(4).unwrap(), Some("nice".into()))
                .await
        );
        let rows = repo.list_feedback(&id("a")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].comment.as_deref(), Some("nice"));
    }

    #[tokio::test]
    async fn failures_degrade_to_false_and_none() {
        let svc = service(Some(Arc::new(Offline)));
        assert!(!svc.like(&id("a")).await);
        assert!(!svc.unlike(&id("a")).await);
        assert_eq!(svc.like_count(&id("a")).await, None);
        assert!(
            !svc.submit_feedback(&id("a"), Rating::new(1).unwrap(), None)
                .await
        );
    }

    #[tokio::test]
    async fn disabled_without_repository() {
        let svc = service(None);
        assert!(!svc.enabled());
        assert!(!svc.like(&id("a")).await);
        assert_eq!(svc.has_liked(&id("a")).await, None);
    }
}
