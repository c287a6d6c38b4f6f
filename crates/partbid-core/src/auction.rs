//! Auction lifecycle: creation, status transitions, field edits, invitations.
//!
//! Status moves freely between draft, active and closed; completed is
//! terminal and reachable only through bid acceptance.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::models::{
    Auction, AuctionBundle, AuctionPatch, AuctionStatus, Bid, EntityKind, Id, Invitation,
    NewActivity, NewAuction, NewAuctionItem, NewNotification, NotificationKind, require_text,
    validate_window,
};
use crate::permissions::{Operation, PermissionEngine};
use crate::store::Store;
use crate::visibility::Viewer;

/// Statuses an auction may be activated or closed from.
const OPEN_STATES: [AuctionStatus; 3] = [
    AuctionStatus::Draft,
    AuctionStatus::Active,
    AuctionStatus::Closed,
];

#[derive(Clone)]
pub struct AuctionLifecycle {
    store: Arc<dyn Store>,
    emitter: Emitter,
    engine: Arc<PermissionEngine>,
}

impl AuctionLifecycle {
    pub fn new(store: Arc<dyn Store>, emitter: Emitter, engine: Arc<PermissionEngine>) -> Self {
        Self {
            store,
            emitter,
            engine,
        }
    }

    /// Create a draft auction with its items and invitations.
    ///
    /// Every invited supplier must exist and be active. Duplicate ids are
    /// collapsed. Each invited supplier's user is notified.
    #[instrument(skip(self, draft, items, supplier_ids), fields(user_id = caller.user_id))]
    pub async fn create(
        &self,
        caller: &Viewer,
        draft: NewAuction,
        items: Vec<NewAuctionItem>,
        supplier_ids: Vec<Id>,
    ) -> Result<AuctionBundle> {
        self.engine.check(Operation::CreateAuction, caller.role)?;
        draft.validate()?;
        for item in &items {
            item.validate()?;
        }
        for &supplier_id in &supplier_ids {
            let supplier = self
                .store
                .get_supplier(supplier_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("Supplier {supplier_id}")))?;
            if !supplier.active {
                return Err(Error::validation(format!(
                    "supplier {} is inactive and cannot be invited",
                    supplier.company_name
                )));
            }
        }

        let bundle = self
            .store
            .create_auction(caller.user_id, draft, items, supplier_ids)
            .await?;
        let auction = &bundle.auction;
        info!(
            auction_id = auction.id,
            code = %auction.code,
            items = bundle.items.len(),
            invited = bundle.invitations.len(),
            "Auction created"
        );

        let invited = self
            .supplier_users(bundle.invitations.iter().map(|i| i.supplier_id).collect::<Vec<_>>())
            .await;
        self.emitter
            .notify_all(invited, |user_id| {
                NewNotification::new(
                    user_id,
                    NotificationKind::Info,
                    "New auction invitation",
                    format!("You are invited to bid on auction: {}", auction.title),
                )
                .about(EntityKind::Auction, auction.id)
            })
            .await;
        self.emitter
            .log(
                NewActivity::new(caller.user_id, "Auction created", EntityKind::Auction, auction.id)
                    .with_details(format!("Created auction: {}", auction.title)),
            )
            .await;

        Ok(bundle)
    }

    /// Open an auction for bidding. Rejected once the auction is completed.
    #[instrument(skip(self), fields(user_id = caller.user_id))]
    pub async fn activate(&self, caller: &Viewer, auction_id: Id) -> Result<Auction> {
        self.engine.check(Operation::ActivateAuction, caller.role)?;
        let auction = self.transition(auction_id, AuctionStatus::Active).await?;
        info!(auction_id, "Auction activated");

        self.announce(
            &auction,
            "Auction open for bidding",
            format!("Auction {} is now accepting bids", auction.code),
        )
        .await;
        self.emitter
            .log(
                NewActivity::new(
                    caller.user_id,
                    "Auction activated",
                    EntityKind::Auction,
                    auction_id,
                )
                .with_details(format!("Activated auction: {}", auction.title)),
            )
            .await;
        Ok(auction)
    }

    /// Stop accepting bids. Rejected once the auction is completed, so a
    /// completed auction keeps its winner.
    #[instrument(skip(self), fields(user_id = caller.user_id))]
    pub async fn close(&self, caller: &Viewer, auction_id: Id) -> Result<Auction> {
        self.engine.check(Operation::CloseAuction, caller.role)?;
        let auction = self.transition(auction_id, AuctionStatus::Closed).await?;
        info!(auction_id, "Auction closed");

        self.announce(
            &auction,
            "Auction closed",
            format!("Auction {} is no longer accepting bids", auction.code),
        )
        .await;
        self.emitter
            .log(
                NewActivity::new(caller.user_id, "Auction closed", EntityKind::Auction, auction_id)
                    .with_details(format!("Closed auction: {}", auction.title)),
            )
            .await;
        Ok(auction)
    }

    /// Mark `bid_id` as the winner and complete its auction.
    ///
    /// Repeating the call for the current winner returns the unchanged pair.
    pub(crate) async fn complete(&self, bid_id: Id) -> Result<(Bid, Auction)> {
        let (bid, auction) = self.store.accept_bid(bid_id).await?;
        info!(auction_id = auction.id, bid_id, "Auction completed");
        Ok((bid, auction))
    }

    /// Edit descriptive fields. Status and winner are not editable here.
    #[instrument(skip(self, patch), fields(user_id = caller.user_id))]
    pub async fn update_fields(
        &self,
        caller: &Viewer,
        auction_id: Id,
        patch: AuctionPatch,
    ) -> Result<Auction> {
        self.engine.check(Operation::UpdateAuction, caller.role)?;
        if patch.is_empty() {
            return Err(Error::validation("no fields to update"));
        }
        let current = self.require(auction_id).await?;

        let mut merged = current.clone();
        patch.clone().apply(&mut merged);
        require_text("title", &merged.title)?;
        validate_window(merged.start_date, merged.end_date)?;

        let updated = self
            .store
            .update_auction(auction_id, patch)
            .await?
            .ok_or_else(|| Error::not_found(format!("Auction {auction_id}")))?;
        self.emitter
            .log(
                NewActivity::new(caller.user_id, "Auction updated", EntityKind::Auction, auction_id)
                    .with_details(format!("Updated auction: {}", current.title)),
            )
            .await;
        Ok(updated)
    }

    /// Invite one more supplier to an auction that is not yet completed.
    #[instrument(skip(self), fields(user_id = caller.user_id))]
    pub async fn invite(
        &self,
        caller: &Viewer,
        auction_id: Id,
        supplier_id: Id,
    ) -> Result<Invitation> {
        self.engine.check(Operation::InviteSupplier, caller.role)?;
        let auction = self.require(auction_id).await?;
        if auction.status == AuctionStatus::Completed {
            return Err(Error::invalid_state(format!(
                "auction {} is already completed",
                auction.code
            )));
        }
        let supplier = self
            .store
            .get_supplier(supplier_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Supplier {supplier_id}")))?;
        if !supplier.active {
            return Err(Error::validation(format!(
                "supplier {} is inactive and cannot be invited",
                supplier.company_name
            )));
        }

        let invitation = self.store.invite_supplier(auction_id, supplier_id).await?;
        info!(auction_id, supplier_id, "Supplier invited");

        self.emitter
            .notify(
                NewNotification::new(
                    supplier.user_id,
                    NotificationKind::Info,
                    "New auction invitation",
                    format!("You are invited to bid on auction: {}", auction.title),
                )
                .about(EntityKind::Auction, auction_id),
            )
            .await;
        self.emitter
            .log(
                NewActivity::new(
                    caller.user_id,
                    "Supplier invited",
                    EntityKind::Auction,
                    auction_id,
                )
                .with_details(format!(
                    "Invited {} to auction: {}",
                    supplier.company_name, auction.title
                )),
            )
            .await;
        Ok(invitation)
    }

    pub(crate) async fn require(&self, auction_id: Id) -> Result<Auction> {
        self.store
            .get_auction(auction_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Auction {auction_id}")))
    }

    async fn transition(&self, auction_id: Id, to: AuctionStatus) -> Result<Auction> {
        self.store
            .transition_auction(auction_id, to, &OPEN_STATES)
            .await?
            .ok_or_else(|| Error::not_found(format!("Auction {auction_id}")))
    }

    /// Notify every invited supplier of an auction.
    async fn announce(&self, auction: &Auction, title: &str, message: String) {
        let invited = match self.store.list_invitations(auction.id).await {
            Ok(invitations) => invitations,
            Err(e) => {
                warn!(auction_id = auction.id, error = %e, "Failed to load invitations");
                return;
            }
        };
        let users = self
            .supplier_users(invited.iter().map(|i| i.supplier_id).collect::<Vec<_>>())
            .await;
        self.emitter
            .notify_all(users, |user_id| {
                NewNotification::new(user_id, NotificationKind::Info, title, message.clone())
                    .about(EntityKind::Auction, auction.id)
            })
            .await;
    }

    /// Resolve supplier ids to their user ids for notification. Lookup
    /// failures only drop the affected recipients.
    pub(crate) async fn supplier_users(
        &self,
        supplier_ids: impl IntoIterator<Item = Id>,
    ) -> Vec<Id> {
        let mut users = Vec::new();
        for supplier_id in supplier_ids {
            match self.store.get_supplier(supplier_id).await {
                Ok(Some(supplier)) => users.push(supplier.user_id),
                Ok(None) => {}
                Err(e) => warn!(supplier_id, error = %e, "Failed to resolve supplier"),
            }
        }
        users
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::{AuctionType, NewSupplier, NewUser, Role};
    use crate::store::{FeedStore, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        lifecycle: AuctionLifecycle,
        manager: Viewer,
        suppliers: Vec<(Id, Id)>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let manager = store
            .create_user(NewUser {
                username: "manager".into(),
                email: "manager@example.com".into(),
                password_hash: String::new(),
                full_name: "Manager".into(),
                role: Role::Manager,
                company_name: None,
            })
            .await
            .unwrap();
        let mut suppliers = Vec::new();
        for name in ["acme", "globex"] {
            let (user, supplier) = store
                .create_supplier_account(
                    NewUser {
                        username: name.into(),
                        email: format!("{name}@example.com"),
                        password_hash: String::new(),
                        full_name: name.into(),
                        role: Role::Supplier,
                        company_name: Some(name.into()),
                    },
                    NewSupplier {
                        company_name: name.into(),
                        ..NewSupplier::default()
                    },
                )
                .await
                .unwrap();
            suppliers.push((supplier.id, user.id));
        }
        let lifecycle = AuctionLifecycle::new(
            store.clone(),
            Emitter::new(store.clone()),
            Arc::new(PermissionEngine::new()),
        );
        Fixture {
            store,
            lifecycle,
            manager: Viewer::buyer(manager.id, Role::Manager),
            suppliers,
        }
    }

    fn draft() -> NewAuction {
        let now = Utc::now();
        NewAuction {
            title: "Brake discs".into(),
            description: "Front axle".into(),
            auction_type: AuctionType::Standard,
            start_date: now,
            end_date: now + Duration::days(7),
            specification: None,
        }
    }

    fn item() -> NewAuctionItem {
        NewAuctionItem {
            part_number: "BD-12345".into(),
            name: "Brake disc".into(),
            quantity: 50,
            unit_of_measure: "pcs".into(),
            estimated_price: Some(5000),
            description: None,
            required_by: None,
        }
    }

    #[tokio::test]
    async fn create_notifies_invited_suppliers() {
        let f = fixture().await;
        let bundle = f
            .lifecycle
            .create(&f.manager, draft(), vec![item()], vec![f.suppliers[0].0])
            .await
            .unwrap();
        assert_eq!(bundle.auction.status, AuctionStatus::Draft);

        let inbox = f.store.list_notifications(f.suppliers[0].1).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].related_id, Some(bundle.auction.id));
        assert!(f.store.list_notifications(f.suppliers[1].1).await.unwrap().is_empty());

        let log = f.store.list_activity(10).await.unwrap();
        assert_eq!(log[0].action, "Auction created");
    }

    #[tokio::test]
    async fn create_requires_buyer_role() {
        let f = fixture().await;
        let supplier = Viewer {
            user_id: f.suppliers[0].1,
            role: Role::Supplier,
            supplier_id: Some(f.suppliers[0].0),
        };
        let err = f
            .lifecycle
            .create(&supplier, draft(), vec![item()], Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert!(f.store.list_auctions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_bad_shape() {
        let f = fixture().await;
        let mut bad = draft();
        bad.end_date = bad.start_date - Duration::days(1);
        let err = f
            .lifecycle
            .create(&f.manager, bad, Vec::new(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = f
            .lifecycle
            .create(&f.manager, draft(), Vec::new(), vec![99])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(f.store.list_auctions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_moves_until_completed() {
        let f = fixture().await;
        let id = f
            .lifecycle
            .create(&f.manager, draft(), vec![item()], Vec::new())
            .await
            .unwrap()
            .auction
            .id;

        let closed = f.lifecycle.close(&f.manager, id).await.unwrap();
        assert_eq!(closed.status, AuctionStatus::Closed);
        let reopened = f.lifecycle.activate(&f.manager, id).await.unwrap();
        assert_eq!(reopened.status, AuctionStatus::Active);

        let missing = f.lifecycle.activate(&f.manager, 404).await.unwrap_err();
        assert!(matches!(missing, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn update_validates_merged_record() {
        let f = fixture().await;
        let id = f
            .lifecycle
            .create(&f.manager, draft(), Vec::new(), Vec::new())
            .await
            .unwrap()
            .auction
            .id;

        let blank = AuctionPatch {
            title: Some("   ".into()),
            ..AuctionPatch::default()
        };
        let err = f.lifecycle.update_fields(&f.manager, id, blank).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let ok = AuctionPatch {
            title: Some("Rear brake discs".into()),
            ..AuctionPatch::default()
        };
        let updated = f.lifecycle.update_fields(&f.manager, id, ok).await.unwrap();
        assert_eq!(updated.title, "Rear brake discs");
        assert_eq!(updated.status, AuctionStatus::Draft);
    }

    #[tokio::test]
    async fn invite_adds_supplier_once() {
        let f = fixture().await;
        let id = f
            .lifecycle
            .create(&f.manager, draft(), Vec::new(), vec![f.suppliers[0].0])
            .await
            .unwrap()
            .auction
            .id;

        f.lifecycle
            .invite(&f.manager, id, f.suppliers[1].0)
            .await
            .unwrap();
        let err = f
            .lifecycle
            .invite(&f.manager, id, f.suppliers[1].0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(f.store.list_invitations(id).await.unwrap().len(), 2);
    }
}
