//! The `Marketplace` facade: every operation the HTTP layer calls.
//!
//! Callers pass an authenticated [`Viewer`]; role gates and visibility are
//! applied here or in the lifecycle managers, never by the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::accounts::{Account, Accounts, Registration};
use crate::auction::AuctionLifecycle;
use crate::bid::{BidDecision, BidLifecycle, BidSubmission};
use crate::config::MarketConfig;
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::models::{
    ActivityLog, Auction, AuctionBundle, AuctionItem, AuctionPatch, AuctionStatus, Bid,
    BidWithItems, Id, Invitation, NewAuction, NewAuctionItem, Notification, Supplier, User,
};
use crate::permissions::{Operation, PermissionEngine};
use crate::stats::{self, Stats};
use crate::store::{FeedStore, MemoryStore, Store};
use crate::visibility::{self, Viewer};

/// Auction creation request: the auction fields plus its items and the
/// suppliers to invite.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionRequest {
    #[serde(flatten)]
    pub auction: NewAuction,
    #[serde(default)]
    pub items: Vec<NewAuctionItem>,
    #[serde(default)]
    pub supplier_ids: Vec<Id>,
}

/// One auction as a given viewer may see it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction: Auction,
    pub items: Vec<AuctionItem>,
    /// Empty unless the viewer is a buyer.
    pub invitations: Vec<Invitation>,
    /// Cheapest first.
    pub bids: Vec<BidWithItems>,
}

pub struct Marketplace {
    store: Arc<dyn Store>,
    engine: Arc<PermissionEngine>,
    emitter: Emitter,
    accounts: Accounts,
    auctions: AuctionLifecycle,
    bids: BidLifecycle,
    activity_limit: usize,
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("activity_limit", &self.activity_limit)
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;

    /// Build over one store that also holds notifications and activity.
    pub fn new<S: Store + 'static>(store: Arc<S>) -> Self {
        Self::from_parts(store.clone(), store, PermissionEngine::new())
    }

    /// In-memory marketplace configured from the `market` config section.
    pub fn from_config(config: &MarketConfig) -> Self {
        let store = Arc::new(MemoryStore::with_code_prefix(&config.auction_code_prefix));
        Self::new(store).with_activity_limit(config.activity_limit)
    }

    /// Build with side effects routed to a separate feed store.
    pub fn from_parts(
        store: Arc<dyn Store>,
        feed: Arc<dyn FeedStore>,
        engine: PermissionEngine,
    ) -> Self {
        let engine = Arc::new(engine);
        let emitter = Emitter::new(feed);
        let accounts = Accounts::new(store.clone(), emitter.clone(), engine.clone());
        let auctions = AuctionLifecycle::new(store.clone(), emitter.clone(), engine.clone());
        let bids = BidLifecycle::new(
            store.clone(),
            emitter.clone(),
            engine.clone(),
            auctions.clone(),
        );
        Self {
            store,
            engine,
            emitter,
            accounts,
            auctions,
            bids,
            activity_limit: Self::DEFAULT_ACTIVITY_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_activity_limit(mut self, limit: usize) -> Self {
        self.activity_limit = limit;
        self
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn permissions(&self) -> &PermissionEngine {
        &self.engine
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.accounts.get_user_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.accounts.get_user_by_email(email).await
    }

    pub async fn get_user(&self, user_id: Id) -> Result<Option<User>> {
        self.accounts.get_user(user_id).await
    }

    pub async fn get_supplier_by_user_id(&self, user_id: Id) -> Result<Option<Supplier>> {
        self.accounts.get_supplier_by_user_id(user_id).await
    }

    pub async fn viewer(&self, user: &User) -> Result<Viewer> {
        self.accounts.viewer(user).await
    }

    /// Create an account on behalf of an admin.
    pub async fn create_user(
        &self,
        caller: &Viewer,
        registration: Registration,
    ) -> Result<Account> {
        self.accounts.create_user_as(caller, registration).await
    }

    pub async fn sign_up(&self, registration: Registration) -> Result<Account> {
        self.accounts.sign_up(registration).await
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        self.accounts.authenticate(username, password).await
    }

    pub async fn logout(&self, caller: &Viewer) {
        self.accounts.record_logout(caller.user_id).await;
    }

    pub async fn list_users(&self, caller: &Viewer) -> Result<Vec<User>> {
        self.accounts.list_users(caller).await
    }

    pub async fn set_user_active(
        &self,
        caller: &Viewer,
        user_id: Id,
        active: bool,
    ) -> Result<User> {
        self.accounts.set_user_active(caller, user_id, active).await
    }

    pub async fn list_suppliers(&self, caller: &Viewer) -> Result<Vec<Supplier>> {
        self.accounts.list_suppliers(caller).await
    }

    pub async fn get_supplier(&self, caller: &Viewer, supplier_id: Id) -> Result<Supplier> {
        self.accounts.get_supplier(caller, supplier_id).await
    }

    pub async fn rate_supplier(
        &self,
        caller: &Viewer,
        supplier_id: Id,
        rating: i32,
    ) -> Result<Supplier> {
        self.accounts.rate_supplier(caller, supplier_id, rating).await
    }

    // =========================================================================
    // Auctions
    // =========================================================================

    pub async fn create_auction(
        &self,
        caller: &Viewer,
        request: AuctionRequest,
    ) -> Result<AuctionBundle> {
        self.auctions
            .create(caller, request.auction, request.items, request.supplier_ids)
            .await
    }

    /// Auction with items, invitations and bids, filtered for the viewer.
    ///
    /// A supplier that is not invited may not open the auction at all.
    #[instrument(skip(self), fields(user_id = caller.user_id))]
    pub async fn get_auction_detail(
        &self,
        caller: &Viewer,
        auction_id: Id,
    ) -> Result<AuctionDetail> {
        let auction = self.auctions.require(auction_id).await?;
        let invitations = self.store.list_invitations(auction_id).await?;
        if !visibility::can_see_auction(&self.engine, caller, auction_id, &invitations) {
            return Err(Error::denied(format!(
                "auction {} is not visible to this user",
                auction.code
            )));
        }

        let items = self.store.list_auction_items(auction_id).await?;
        let all_bids = self.store.list_bids(auction_id).await?;
        let mut bids = visibility::bids(&self.engine, caller, all_bids);
        bids.sort_by_key(|b| (b.total_amount, b.id));

        let mut with_items = Vec::with_capacity(bids.len());
        for bid in bids {
            let items = self.store.list_bid_items(bid.id).await?;
            with_items.push(BidWithItems { bid, items });
        }

        Ok(AuctionDetail {
            auction,
            items,
            invitations: visibility::invitations(&self.engine, caller, invitations),
            bids: with_items,
        })
    }

    pub async fn list_auctions(
        &self,
        caller: &Viewer,
        status: Option<AuctionStatus>,
    ) -> Result<Vec<Auction>> {
        let auctions = self.store.list_auctions(status).await?;
        let invitations = self.invitations_of(caller).await?;
        Ok(visibility::auctions(&self.engine, caller, auctions, &invitations))
    }

    pub async fn update_auction_fields(
        &self,
        caller: &Viewer,
        auction_id: Id,
        patch: AuctionPatch,
    ) -> Result<Auction> {
        self.auctions.update_fields(caller, auction_id, patch).await
    }

    pub async fn activate_auction(&self, caller: &Viewer, auction_id: Id) -> Result<Auction> {
        self.auctions.activate(caller, auction_id).await
    }

    pub async fn close_auction(&self, caller: &Viewer, auction_id: Id) -> Result<Auction> {
        self.auctions.close(caller, auction_id).await
    }

    pub async fn invite_supplier(
        &self,
        caller: &Viewer,
        auction_id: Id,
        supplier_id: Id,
    ) -> Result<Invitation> {
        self.auctions.invite(caller, auction_id, supplier_id).await
    }

    pub async fn respond_to_invitation(
        &self,
        caller: &Viewer,
        auction_id: Id,
        accept: bool,
    ) -> Result<Invitation> {
        self.bids
            .respond_to_invitation(caller, auction_id, accept)
            .await
    }

    // =========================================================================
    // Bids
    // =========================================================================

    pub async fn submit_bid(
        &self,
        caller: &Viewer,
        auction_id: Id,
        submission: BidSubmission,
    ) -> Result<BidWithItems> {
        self.bids.submit(caller, auction_id, submission).await
    }

    pub async fn decide_bid(
        &self,
        caller: &Viewer,
        bid_id: Id,
        decision: BidDecision,
    ) -> Result<Bid> {
        self.bids.decide(caller, bid_id, decision).await
    }

    // =========================================================================
    // Notifications, activity, stats
    // =========================================================================

    pub async fn list_notifications(&self, caller: &Viewer) -> Result<Vec<Notification>> {
        self.emitter.notifications(caller.user_id).await
    }

    /// Mark one of the caller's own notifications read.
    pub async fn mark_notification_read(
        &self,
        caller: &Viewer,
        notification_id: Id,
    ) -> Result<Notification> {
        let notification = self
            .emitter
            .get(notification_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Notification {notification_id}")))?;
        if notification.user_id != caller.user_id {
            return Err(Error::denied("notification belongs to another user"));
        }
        self.emitter.mark_read(notification_id).await
    }

    /// Recent activity: the whole log for buyers, the caller's own entries
    /// for everyone else. `limit` defaults to the configured size.
    pub async fn list_activity_logs(
        &self,
        caller: &Viewer,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityLog>> {
        let limit = limit.unwrap_or(self.activity_limit);
        if self.engine.allows(Operation::ViewActivity, caller.role) {
            self.emitter.recent_activity(limit).await
        } else {
            self.emitter.user_activity(caller.user_id, limit).await
        }
    }

    /// Dashboard counters over what the caller can see.
    pub async fn compute_stats(&self, caller: &Viewer) -> Result<Stats> {
        let auctions = self.list_auctions(caller, None).await?;
        let bids = if self.engine.allows(Operation::ViewAllBids, caller.role) {
            self.store.list_all_bids().await?
        } else if let Some(supplier_id) = caller.supplier_id {
            self.store.list_bids_by_supplier(supplier_id).await?
        } else {
            Vec::new()
        };
        Ok(stats::compute(&auctions, &bids))
    }

    /// Invitations relevant to listing auctions for this viewer.
    async fn invitations_of(&self, caller: &Viewer) -> Result<Vec<Invitation>> {
        match caller.supplier_id {
            Some(supplier_id) if !self.engine.allows(Operation::ViewAllAuctions, caller.role) => {
                Ok(self.store.list_supplier_invitations(supplier_id).await?)
            }
            _ => Ok(Vec::new()),
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }
}
