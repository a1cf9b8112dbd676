use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bite_core::model::{Feedback, ItemId};
use storage::repository::{EngagementRepository, StorageError};
use tracing::warn;

/// Engagement totals for a single item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    pub item_id: ItemId,
    pub likes: usize,
    pub feedback_count: usize,
    pub average_rating: Option<f64>,
}

/// Admin overview across every item.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsReport {
    /// Sorted by likes, then feedback count, descending.
    pub items: Vec<ItemSummary>,
    pub total_likes: usize,
    pub total_feedback: usize,
    pub unique_viewers: usize,
    /// Newest first.
    pub recent_comments: Vec<Feedback>,
}

/// Read-only aggregation over the likes and feedback tables.
#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn EngagementRepository>,
    recent_limit: usize,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(repo: Arc<dyn EngagementRepository>) -> Self {
        Self {
            repo,
            recent_limit: 10,
        }
    }

    #[must_use]
    pub fn with_recent_limit(mut self, recent_limit: usize) -> Self {
        self.recent_limit = recent_limit;
        self
    }

    /// Build the overview; `None` when the store cannot be read.
    pub async fn report(&self) -> Option<AnalyticsReport> {
        match self.build_report().await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!("analytics unavailable: {err}");
                None
            }
        }
    }

    pub async fn item_summary(&self, item_id: &ItemId) -> Option<ItemSummary> {
        let likes = self.repo.list_likes(item_id).await;
        let feedback = self.repo.list_feedback(item_id).await;
        match (likes, feedback) {
            (Ok(likes), Ok(feedback)) => Some(ItemSummary {
                item_id: item_id.clone(),
                likes: likes.len(),
                feedback_count: feedback.len(),
                average_rating: average_rating(&feedback),
            }),
            (Err(err), _) | (_, Err(err)) => {
                warn!(item = %item_id, "item analytics unavailable: {err}");
                None
            }
        }
    }

    async fn build_report(&self) -> Result<AnalyticsReport, StorageError> {
        let likes = self.repo.list_all_likes().await?;
        let feedback = self.repo.list_all_feedback().await?;

        let mut like_counts: BTreeMap<&ItemId, usize> = BTreeMap::new();
        let mut viewers = BTreeSet::new();
        for like in &likes {
            *like_counts.entry(&like.item_id).or_default() += 1;
            viewers.insert(like.fingerprint.as_str());
        }

        let mut feedback_by_item: BTreeMap<&ItemId, Vec<Feedback>> = BTreeMap::new();
        for row in &feedback {
            feedback_by_item
                .entry(&row.item_id)
                .or_default()
                .push(row.clone());
            viewers.insert(row.fingerprint.as_str());
        }

        let ids: BTreeSet<&ItemId> = like_counts
            .keys()
            .chain(feedback_by_item.keys())
            .copied()
            .collect();
        let mut items: Vec<ItemSummary> = ids
            .into_iter()
            .map(|item_id| {
                let rows = feedback_by_item.get(item_id).map_or(&[][..], Vec::as_slice);
                ItemSummary {
                    item_id: item_id.clone(),
                    likes: like_counts.get(item_id).copied().unwrap_or(0),
                    feedback_count: rows.len(),
                    average_rating: average_rating(rows),
                }
            })
            .collect();
        items.sort_by(|a, b| {
            b.likes
                .cmp(&a.likes)
                .then(b.feedback_count.cmp(&a.feedback_count))
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        let mut recent_comments: Vec<Feedback> = feedback
            .iter()
            .filter(|row| row.comment.is_some())
            .cloned()
            .collect();
        recent_comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_comments.truncate(self.recent_limit);

        Ok(AnalyticsReport {
            items,
            total_likes: likes.len(),
            total_feedback: feedback.len(),
            unique_viewers: viewers.len(),
            recent_comments,
        })
    }
}

fn average_rating(rows: &[Feedback]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let sum: u32 = rows.iter().map(|row| u32::from(row.rating.value())).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = rows.len() as f64;
    Some(f64::from(sum) / count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bite_core::model::{Fingerprint, Like, Rating};
    use bite_core::time::fixed_now;
    use chrono::Duration;
    use storage::repository::InMemoryEngagement;

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn fp(raw: &str) -> Fingerprint {
        Fingerprint::new(raw).unwrap()
    }

    async fn seeded() -> Arc<InMemoryEngagement> {
        let repo = Arc::new(InMemoryEngagement::new());
        for (item, viewer) in [("a", "v1"), ("a", "v2"), ("b", "v1")] {
            repo.insert_like(&Like {
                item_id: id(item),
                fingerprint: fp(viewer),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        }
        let rows = [
            ("b", "v3", 5, Some("great"), 0),
            ("b", "v1", 2, None, 1),
            ("c", "v2", 4, Some("ok"), 2),
        ];
        for (item, viewer, rating, comment, minutes) in rows {
            repo.insert_feedback(&Feedback::new(
                id(item),
                fp(viewer),
                Rating::new(rating).unwrap(),
                comment.map(String::from),
                fixed_now() + Duration::minutes(minutes),
            ))
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn report_aggregates_per_item() {
        let report = AnalyticsService::new(seeded().await).report().await.unwrap();
        assert_eq!(report.total_likes, 3);
        assert_eq!(report.total_feedback, 3);
        assert_eq!(report.unique_viewers, 3);

        let order: Vec<&str> = report.items.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);

        let b = &report.items[1];
        assert_eq!(b.likes, 1);
        assert_eq!(b.feedback_count, 2);
        assert!((b.average_rating.unwrap() - 3.5).abs() < f64::EPSILON);
        assert_eq!(report.items[0].average_rating, None);

        let comments: Vec<_> = report
            .recent_comments
            .iter()
            .filter_map(|row| row.comment.as_deref())
            .collect();
        assert_eq!(comments, vec!["ok", "great"]);
    }

    #[tokio::test]
    async fn recent_limit_truncates() {
        let report = AnalyticsService::new(seeded().await)
            .with_recent_limit(1)
            .report()
            .await
            .unwrap();
        assert_eq!(report.recent_comments.len(), 1);
    }

    #[tokio::test]
    async fn item_summary_for_unknown_item_is_empty() {
        let summary = AnalyticsService::new(seeded().await)
            .item_summary(&id("zzz"))
            .await
            .unwrap();
        assert_eq!(summary.likes, 0);
        assert_eq!(summary.average_rating, None);
    }
}
