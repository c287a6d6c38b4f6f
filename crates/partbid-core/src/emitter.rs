//! Notification and activity-log side effects.
//!
//! Side effects are best-effort: a failed write is logged and swallowed so it
//! never undoes or fails the primary operation that triggered it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{ActivityLog, Id, NewActivity, NewNotification, Notification};
use crate::store::FeedStore;

#[derive(Clone)]
pub struct Emitter {
    feed: Arc<dyn FeedStore>,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

impl Emitter {
    pub fn new(feed: Arc<dyn FeedStore>) -> Self {
        Self { feed }
    }

    /// Write one notification. Failures are logged, never returned.
    pub async fn notify(&self, draft: NewNotification) -> Option<Notification> {
        let user_id = draft.user_id;
        match self.feed.create_notification(draft).await {
            Ok(n) => {
                debug!(notification_id = n.id, user_id, "Notification created");
                Some(n)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to create notification");
                None
            }
        }
    }

    /// Send the same notice to several users.
    pub async fn notify_all(
        &self,
        user_ids: impl IntoIterator<Item = Id>,
        build: impl Fn(Id) -> NewNotification,
    ) {
        for user_id in user_ids {
            self.notify(build(user_id)).await;
        }
    }

    /// Append one activity entry. Failures are logged, never returned.
    pub async fn log(&self, draft: NewActivity) -> Option<ActivityLog> {
        let (user_id, action) = (draft.user_id, draft.action.clone());
        match self.feed.append_activity(draft).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(user_id, action = %action, error = %e, "Failed to log activity");
                None
            }
        }
    }

    pub async fn get(&self, id: Id) -> Result<Option<Notification>> {
        Ok(self.feed.get_notification(id).await?)
    }

    pub async fn notifications(&self, user_id: Id) -> Result<Vec<Notification>> {
        Ok(self.feed.list_notifications(user_id).await?)
    }

    pub async fn mark_read(&self, id: Id) -> Result<Notification> {
        self.feed
            .mark_notification_read(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Notification {id}")))
    }

    pub async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityLog>> {
        Ok(self.feed.list_activity(limit).await?)
    }

    pub async fn user_activity(&self, user_id: Id, limit: usize) -> Result<Vec<ActivityLog>> {
        Ok(self.feed.list_user_activity(user_id, limit).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::{EntityKind, NotificationKind};
    use crate::store::{MemoryStore, StoreError, StoreResult};

    /// Feed store whose every call fails.
    pub(crate) struct BrokenFeed;

    #[async_trait]
    impl FeedStore for BrokenFeed {
        async fn create_notification(&self, _: NewNotification) -> StoreResult<Notification> {
            Err(StoreError::Unavailable("feed offline".into()))
        }

        async fn get_notification(&self, _: Id) -> StoreResult<Option<Notification>> {
            Err(StoreError::Unavailable("feed offline".into()))
        }

        async fn list_notifications(&self, _: Id) -> StoreResult<Vec<Notification>> {
            Err(StoreError::Unavailable("feed offline".into()))
        }

        async fn mark_notification_read(&self, _: Id) -> StoreResult<Option<Notification>> {
            Err(StoreError::Unavailable("feed offline".into()))
        }

        async fn append_activity(&self, _: NewActivity) -> StoreResult<ActivityLog> {
            Err(StoreError::Unavailable("feed offline".into()))
        }

        async fn list_activity(&self, _: usize) -> StoreResult<Vec<ActivityLog>> {
            Err(StoreError::Unavailable("feed offline".into()))
        }

        async fn list_user_activity(&self, _: Id, _: usize) -> StoreResult<Vec<ActivityLog>> {
            Err(StoreError::Unavailable("feed offline".into()))
        }
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let emitter = Emitter::new(Arc::new(BrokenFeed));
        let notice = NewNotification::new(1, NotificationKind::Info, "t", "m");
        assert!(emitter.notify(notice).await.is_none());
        assert!(
            emitter
                .log(NewActivity::new(1, "Auction created", EntityKind::Auction, 1))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn notify_all_reaches_each_user() {
        let emitter = Emitter::new(Arc::new(MemoryStore::new()));
        emitter
            .notify_all([3, 4], |user| {
                NewNotification::new(user, NotificationKind::Info, "Auction opened", "")
                    .about(EntityKind::Auction, 9)
            })
            .await;

        for user in [3, 4] {
            let mine = emitter.notifications(user).await.unwrap();
            assert_eq!(mine.len(), 1);
            assert_eq!(mine[0].related_id, Some(9));
        }
    }

    #[tokio::test]
    async fn mark_read_reports_missing() {
        let emitter = Emitter::new(Arc::new(MemoryStore::new()));
        assert!(matches!(emitter.mark_read(5).await, Err(Error::NotFound(_))));

        let n = emitter
            .notify(NewNotification::new(1, NotificationKind::Success, "t", "m"))
            .await
            .unwrap();
        assert!(emitter.mark_read(n.id).await.unwrap().is_read);
    }
}
