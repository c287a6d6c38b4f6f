//! Repository abstraction for `PartBid` entities.
//!
//! [`Store`] exposes create/get/list/update per entity type plus the few
//! composite units of work that must be all-or-nothing (auction with items
//! and invitations, supplier account, bid with items, bid acceptance).
//! Identifier generation lives behind this boundary. [`MemoryStore`] is the
//! in-process implementation; a persistent backend implements the same
//! traits.

mod memory;


use async_trait::async_trait;

use crate::models::{
    ActivityLog, Auction, AuctionBundle, AuctionItem, AuctionPatch, AuctionStatus, Bid, BidItem,
    BidStatus, BidWithItems, Id, Invitation, InvitationStatus, NewActivity, NewAuction,
    NewAuctionItem, NewNotification, NewSupplier, NewUser, Notification, PricedBid, Supplier,
    SupplierPatch, User, UserPatch,
};

pub use memory::MemoryStore;

/// Store errors. Absent ids on plain reads and updates are `Ok(None)`, not
/// errors; `NotFound` is reserved for references inside composite writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A guarded transition found the record in a status it may not leave.
    #[error("Stale state: {0}")]
    StaleState(String),

    /// A composite write found the caller lacks the relationship it needs.
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Notification and activity-log persistence.
///
/// Split from [`Store`] so side-effect writes can be routed separately from
/// the primary records.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn create_notification(&self, draft: NewNotification) -> StoreResult<Notification>;

    async fn get_notification(&self, id: Id) -> StoreResult<Option<Notification>>;

    /// Notifications for a user, newest first.
    async fn list_notifications(&self, user_id: Id) -> StoreResult<Vec<Notification>>;

    async fn mark_notification_read(&self, id: Id) -> StoreResult<Option<Notification>>;

    async fn append_activity(&self, draft: NewActivity) -> StoreResult<ActivityLog>;

    /// Most recent activity entries, newest first.
    async fn list_activity(&self, limit: usize) -> StoreResult<Vec<ActivityLog>>;

    async fn list_user_activity(&self, user_id: Id, limit: usize)
    -> StoreResult<Vec<ActivityLog>>;
}

/// Primary entity persistence.
#[async_trait]
pub trait Store: FeedStore {
    // =========================================================================
    // Users and suppliers
    // =========================================================================

    /// Create a user. Username and email are unique case-insensitively.
    async fn create_user(&self, draft: NewUser) -> StoreResult<User>;

    /// Create a supplier-role user together with its supplier record.
    async fn create_supplier_account(
        &self,
        user: NewUser,
        supplier: NewSupplier,
    ) -> StoreResult<(User, Supplier)>;

    async fn get_user(&self, id: Id) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: Id, patch: UserPatch) -> StoreResult<Option<User>>;

    async fn get_supplier(&self, id: Id) -> StoreResult<Option<Supplier>>;

    async fn find_supplier_by_user(&self, user_id: Id) -> StoreResult<Option<Supplier>>;

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>>;

    async fn update_supplier(&self, id: Id, patch: SupplierPatch)
    -> StoreResult<Option<Supplier>>;

    // =========================================================================
    // Auctions, items and invitations
    // =========================================================================

    /// Create an auction with its items and invitations in one unit of work.
    ///
    /// Every supplier id must resolve; duplicates are collapsed.
    async fn create_auction(
        &self,
        created_by: Id,
        draft: NewAuction,
        items: Vec<NewAuctionItem>,
        supplier_ids: Vec<Id>,
    ) -> StoreResult<AuctionBundle>;

    async fn get_auction(&self, id: Id) -> StoreResult<Option<Auction>>;

    async fn find_auction_by_code(&self, code: &str) -> StoreResult<Option<Auction>>;

    /// Auctions in insertion order, optionally restricted to one status.
    async fn list_auctions(&self, status: Option<AuctionStatus>) -> StoreResult<Vec<Auction>>;

    async fn update_auction(&self, id: Id, patch: AuctionPatch) -> StoreResult<Option<Auction>>;

    /// Move an auction to `to` if its current status is one of `allowed_from`.
    async fn transition_auction(
        &self,
        id: Id,
        to: AuctionStatus,
        allowed_from: &[AuctionStatus],
    ) -> StoreResult<Option<Auction>>;

    async fn get_auction_item(&self, id: Id) -> StoreResult<Option<AuctionItem>>;

    async fn list_auction_items(&self, auction_id: Id) -> StoreResult<Vec<AuctionItem>>;

    /// Invite one more supplier. `Conflict` if the pair already exists.
    async fn invite_supplier(&self, auction_id: Id, supplier_id: Id) -> StoreResult<Invitation>;

    async fn list_invitations(&self, auction_id: Id) -> StoreResult<Vec<Invitation>>;

    async fn list_supplier_invitations(&self, supplier_id: Id) -> StoreResult<Vec<Invitation>>;

    async fn find_invitation(
        &self,
        auction_id: Id,
        supplier_id: Id,
    ) -> StoreResult<Option<Invitation>>;

    async fn set_invitation_status(
        &self,
        id: Id,
        status: InvitationStatus,
    ) -> StoreResult<Option<Invitation>>;

    // =========================================================================
    // Bids
    // =========================================================================

    /// Create a pending bid and its priced items in one unit of work.
    ///
    /// Fails with `StaleState` unless the auction is active and with
    /// `NotPermitted` unless the bidding supplier is invited, both checked
    /// under the same write lock as the insert.
    async fn create_bid(&self, bid: PricedBid) -> StoreResult<BidWithItems>;

    async fn get_bid(&self, id: Id) -> StoreResult<Option<Bid>>;

    async fn list_bids(&self, auction_id: Id) -> StoreResult<Vec<Bid>>;

    async fn list_bids_by_supplier(&self, supplier_id: Id) -> StoreResult<Vec<Bid>>;

    async fn list_all_bids(&self) -> StoreResult<Vec<Bid>>;

    async fn list_bid_items(&self, bid_id: Id) -> StoreResult<Vec<BidItem>>;

    /// Move a bid to `to` if its current status is one of `allowed_from`.
    async fn transition_bid(
        &self,
        id: Id,
        to: BidStatus,
        allowed_from: &[BidStatus],
    ) -> StoreResult<Option<Bid>>;

    /// Accept a pending bid and complete its auction with it as the winner.
    ///
    /// Fails with `StaleState` if the bid is no longer pending or the
    /// auction is draft or already completed with another winner. Re-accepting
    /// the current winner returns the unchanged pair.
    async fn accept_bid(&self, bid_id: Id) -> StoreResult<(Bid, Auction)>;
}
