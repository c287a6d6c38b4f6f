//! In-memory store for `PartBid`.
//!
//! All tables sit behind one `RwLock`: writers are serialised globally,
//! readers proceed concurrently. Every composite operation validates its
//! inputs before its first insert, so under a single write guard it either
//! applies completely or not at all.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{FeedStore, Store, StoreError, StoreResult};
use crate::models::{
    ActivityLog, Auction, AuctionBundle, AuctionItem, AuctionPatch, AuctionStatus, Bid, BidItem,
    BidStatus, BidWithItems, Id, Invitation, InvitationStatus, NewActivity, NewAuction,
    NewAuctionItem, NewNotification, NewSupplier, NewUser, Notification, PricedBid, Supplier,
    SupplierPatch, User, UserPatch,
};

/// One entity collection with its own identifier counter.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<Id, T>,
    next_id: Id,
}

impl<T: Clone> Table<T> {
    const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserve the next identifier. Identifiers are never reused.
    const fn allocate(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, build: impl FnOnce(Id) -> T) -> T {
        let id = self.allocate();
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: Id) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.values().find(|row| pred(row)).cloned()
    }

    /// Rows in insertion order.
    fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|row| pred(row)).cloned().collect()
    }

    fn update(&mut self, id: Id, apply: impl FnOnce(&mut T)) -> Option<T> {
        let row = self.rows.get_mut(&id)?;
        apply(row);
        Some(row.clone())
    }
}

#[derive(Debug)]
struct Tables {
    users: Table<User>,
    suppliers: Table<Supplier>,
    auctions: Table<Auction>,
    auction_items: Table<AuctionItem>,
    invitations: Table<Invitation>,
    bids: Table<Bid>,
    bid_items: Table<BidItem>,
    notifications: Table<Notification>,
    activity: Table<ActivityLog>,
}

impl Tables {
    const fn new() -> Self {
        Self {
            users: Table::new(),
            suppliers: Table::new(),
            auctions: Table::new(),
            auction_items: Table::new(),
            invitations: Table::new(),
            bids: Table::new(),
            bid_items: Table::new(),
            notifications: Table::new(),
            activity: Table::new(),
        }
    }

    fn ensure_unique_user(&self, username: &str, email: &str) -> StoreResult<()> {
        let (username, email) = (username.to_lowercase(), email.to_lowercase());
        for user in self.users.rows.values() {
            if user.username.to_lowercase() == username {
                return Err(StoreError::Conflict("Username already taken".into()));
            }
            if user.email.to_lowercase() == email {
                return Err(StoreError::Conflict("Email already in use".into()));
            }
        }
        Ok(())
    }

    fn insert_user(&mut self, draft: NewUser) -> User {
        self.users.insert(|id| User {
            id,
            username: draft.username,
            email: draft.email,
            password_hash: draft.password_hash,
            full_name: draft.full_name,
            role: draft.role,
            company_name: draft.company_name,
            active: true,
        })
    }

    fn has_invitation(&self, auction_id: Id, supplier_id: Id) -> bool {
        self.invitations
            .rows
            .values()
            .any(|i| i.auction_id == auction_id && i.supplier_id == supplier_id)
    }

    fn insert_invitation(&mut self, auction_id: Id, supplier_id: Id) -> Invitation {
        self.invitations.insert(|id| Invitation {
            id,
            auction_id,
            supplier_id,
            invited_at: Utc::now(),
            status: InvitationStatus::Pending,
        })
    }
}

/// Sort newest first; equal timestamps fall back to the higher id.
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, Id)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

/// Process-local store backing every entity type.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    code_prefix: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_code_prefix("AUC")
    }

    /// Create a store whose auction codes start with `prefix`.
    pub fn with_code_prefix(prefix: impl Into<String>) -> Self {
        Self {
            tables: RwLock::new(Tables::new()),
            code_prefix: prefix.into(),
        }
    }

    fn auction_code(&self, id: Id) -> String {
        format!("{}-{id:05}", self.code_prefix)
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn create_notification(&self, draft: NewNotification) -> StoreResult<Notification> {
        let mut t = self.tables.write().await;
        let (related_type, related_id) = draft.related.unzip();
        Ok(t.notifications.insert(|id| Notification {
            id,
            user_id: draft.user_id,
            title: draft.title,
            message: draft.message,
            kind: draft.kind,
            is_read: false,
            created_at: Utc::now(),
            related_id,
            related_type,
        }))
    }

    async fn get_notification(&self, id: Id) -> StoreResult<Option<Notification>> {
        Ok(self.tables.read().await.notifications.get(id))
    }

    async fn list_notifications(&self, user_id: Id) -> StoreResult<Vec<Notification>> {
        let mut rows = self
            .tables
            .read()
            .await
            .notifications
            .filter(|n| n.user_id == user_id);
        newest_first(&mut rows, |n| (n.created_at, n.id));
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: Id) -> StoreResult<Option<Notification>> {
        let mut t = self.tables.write().await;
        Ok(t.notifications.update(id, |n| n.is_read = true))
    }

    async fn append_activity(&self, draft: NewActivity) -> StoreResult<ActivityLog> {
        let mut t = self.tables.write().await;
        Ok(t.activity.insert(|id| ActivityLog {
            id,
            user_id: draft.user_id,
            action: draft.action,
            entity_type: draft.entity_type,
            entity_id: draft.entity_id,
            details: draft.details,
            created_at: Utc::now(),
        }))
    }

    async fn list_activity(&self, limit: usize) -> StoreResult<Vec<ActivityLog>> {
        let mut rows = self.tables.read().await.activity.filter(|_| true);
        newest_first(&mut rows, |a| (a.created_at, a.id));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn list_user_activity(
        &self,
        user_id: Id,
        limit: usize,
    ) -> StoreResult<Vec<ActivityLog>> {
        let mut rows = self
            .tables
            .read()
            .await
            .activity
            .filter(|a| a.user_id == user_id);
        newest_first(&mut rows, |a| (a.created_at, a.id));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // Users and suppliers
    // =========================================================================

    async fn create_user(&self, draft: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        t.ensure_unique_user(&draft.username, &draft.email)?;
        let user = t.insert_user(draft);
        debug!(user_id = user.id, "User stored");
        Ok(user)
    }

    async fn create_supplier_account(
        &self,
        user: NewUser,
        supplier: NewSupplier,
    ) -> StoreResult<(User, Supplier)> {
        let mut t = self.tables.write().await;
        t.ensure_unique_user(&user.username, &user.email)?;
        let user = t.insert_user(user);
        let user_id = user.id;
        let supplier = t.suppliers.insert(|id| Supplier {
            id,
            user_id,
            company_name: supplier.company_name,
            contact_person: supplier.contact_person,
            phone: supplier.phone,
            address: supplier.address,
            rating: 0,
            active: true,
        });
        debug!(user_id, supplier_id = supplier.id, "Supplier account stored");
        Ok((user, supplier))
    }

    async fn get_user(&self, id: Id) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let needle = username.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .find(|u| u.username.to_lowercase() == needle))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let needle = email.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .find(|u| u.email.to_lowercase() == needle))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().await.users.filter(|_| true))
    }

    async fn update_user(&self, id: Id, patch: UserPatch) -> StoreResult<Option<User>> {
        let mut t = self.tables.write().await;
        Ok(t.users.update(id, |u| {
            if let Some(full_name) = patch.full_name {
                u.full_name = full_name;
            }
            if let Some(role) = patch.role {
                u.role = role;
            }
            if let Some(company) = patch.company_name {
                u.company_name = Some(company);
            }
            if let Some(active) = patch.active {
                u.active = active;
            }
        }))
    }

    async fn get_supplier(&self, id: Id) -> StoreResult<Option<Supplier>> {
        Ok(self.tables.read().await.suppliers.get(id))
    }

    async fn find_supplier_by_user(&self, user_id: Id) -> StoreResult<Option<Supplier>> {
        Ok(self
            .tables
            .read()
            .await
            .suppliers
            .find(|s| s.user_id == user_id))
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        Ok(self.tables.read().await.suppliers.filter(|_| true))
    }

    async fn update_supplier(
        &self,
        id: Id,
        patch: SupplierPatch,
    ) -> StoreResult<Option<Supplier>> {
        let mut t = self.tables.write().await;
        Ok(t.suppliers.update(id, |s| {
            if let Some(company) = patch.company_name {
                s.company_name = company;
            }
            if let Some(contact) = patch.contact_person {
                s.contact_person = contact;
            }
            if let Some(phone) = patch.phone {
                s.phone = phone;
            }
            if let Some(address) = patch.address {
                s.address = Some(address);
            }
            if let Some(rating) = patch.rating {
                s.rating = rating;
            }
            if let Some(active) = patch.active {
                s.active = active;
            }
        }))
    }

    // =========================================================================
    // Auctions, items and invitations
    // =========================================================================

    async fn create_auction(
        &self,
        created_by: Id,
        draft: NewAuction,
        items: Vec<NewAuctionItem>,
        supplier_ids: Vec<Id>,
    ) -> StoreResult<AuctionBundle> {
        let mut t = self.tables.write().await;

        if t.users.get(created_by).is_none() {
            return Err(StoreError::NotFound(format!("User {created_by}")));
        }
        let mut seen = HashSet::new();
        let supplier_ids: Vec<Id> = supplier_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();
        if let Some(missing) = supplier_ids.iter().find(|id| t.suppliers.get(**id).is_none()) {
            return Err(StoreError::NotFound(format!("Supplier {missing}")));
        }

        let auction_id = t.auctions.allocate();
        let auction = Auction {
            id: auction_id,
            title: draft.title,
            description: draft.description,
            code: self.auction_code(auction_id),
            created_by,
            status: AuctionStatus::Draft,
            auction_type: draft.auction_type,
            start_date: draft.start_date,
            end_date: draft.end_date,
            created_at: Utc::now(),
            specification: draft.specification,
            winning_bid_id: None,
        };
        t.auctions.rows.insert(auction_id, auction.clone());

        let items = items
            .into_iter()
            .map(|item| {
                t.auction_items.insert(|id| AuctionItem {
                    id,
                    auction_id,
                    part_number: item.part_number,
                    name: item.name,
                    quantity: item.quantity,
                    unit_of_measure: item.unit_of_measure,
                    estimated_price: item.estimated_price,
                    description: item.description,
                    required_by: item.required_by,
                })
            })
            .collect();

        let invitations = supplier_ids
            .into_iter()
            .map(|supplier_id| t.insert_invitation(auction_id, supplier_id))
            .collect();

        debug!(auction_id, code = %auction.code, "Auction stored");
        Ok(AuctionBundle {
            auction,
            items,
            invitations,
        })
    }

    async fn get_auction(&self, id: Id) -> StoreResult<Option<Auction>> {
        Ok(self.tables.read().await.auctions.get(id))
    }

    async fn find_auction_by_code(&self, code: &str) -> StoreResult<Option<Auction>> {
        Ok(self.tables.read().await.auctions.find(|a| a.code == code))
    }

    async fn list_auctions(&self, status: Option<AuctionStatus>) -> StoreResult<Vec<Auction>> {
        Ok(self
            .tables
            .read()
            .await
            .auctions
            .filter(|a| status.is_none_or(|s| a.status == s)))
    }

    async fn update_auction(&self, id: Id, patch: AuctionPatch) -> StoreResult<Option<Auction>> {
        let mut t = self.tables.write().await;
        Ok(t.auctions.update(id, |a| patch.apply(a)))
    }

    async fn transition_auction(
        &self,
        id: Id,
        to: AuctionStatus,
        allowed_from: &[AuctionStatus],
    ) -> StoreResult<Option<Auction>> {
        let mut t = self.tables.write().await;
        let Some(current) = t.auctions.get(id) else {
            return Ok(None);
        };
        if !allowed_from.contains(&current.status) {
            return Err(StoreError::StaleState(format!(
                "auction {id} is {} and cannot become {to}",
                current.status
            )));
        }
        Ok(t.auctions.update(id, |a| a.status = to))
    }

    async fn get_auction_item(&self, id: Id) -> StoreResult<Option<AuctionItem>> {
        Ok(self.tables.read().await.auction_items.get(id))
    }

    async fn list_auction_items(&self, auction_id: Id) -> StoreResult<Vec<AuctionItem>> {
        Ok(self
            .tables
            .read()
            .await
            .auction_items
            .filter(|i| i.auction_id == auction_id))
    }

    async fn invite_supplier(&self, auction_id: Id, supplier_id: Id) -> StoreResult<Invitation> {
        let mut t = self.tables.write().await;
        if t.auctions.get(auction_id).is_none() {
            return Err(StoreError::NotFound(format!("Auction {auction_id}")));
        }
        if t.suppliers.get(supplier_id).is_none() {
            return Err(StoreError::NotFound(format!("Supplier {supplier_id}")));
        }
        if t.has_invitation(auction_id, supplier_id) {
            return Err(StoreError::Conflict(format!(
                "supplier {supplier_id} is already invited to auction {auction_id}"
            )));
        }
        Ok(t.insert_invitation(auction_id, supplier_id))
    }

    async fn list_invitations(&self, auction_id: Id) -> StoreResult<Vec<Invitation>> {
        Ok(self
            .tables
            .read()
            .await
            .invitations
            .filter(|i| i.auction_id == auction_id))
    }

    async fn list_supplier_invitations(&self, supplier_id: Id) -> StoreResult<Vec<Invitation>> {
        Ok(self
            .tables
            .read()
            .await
            .invitations
            .filter(|i| i.supplier_id == supplier_id))
    }

    async fn find_invitation(
        &self,
        auction_id: Id,
        supplier_id: Id,
    ) -> StoreResult<Option<Invitation>> {
        Ok(self
            .tables
            .read()
            .await
            .invitations
            .find(|i| i.auction_id == auction_id && i.supplier_id == supplier_id))
    }

    async fn set_invitation_status(
        &self,
        id: Id,
        status: InvitationStatus,
    ) -> StoreResult<Option<Invitation>> {
        let mut t = self.tables.write().await;
        Ok(t.invitations.update(id, |i| i.status = status))
    }

    // =========================================================================
    // Bids
    // =========================================================================

    async fn create_bid(&self, bid: PricedBid) -> StoreResult<BidWithItems> {
        let mut t = self.tables.write().await;

        let auction_id = bid.auction_id();
        let supplier_id = bid.supplier_id();
        let Some(auction) = t.auctions.get(auction_id) else {
            return Err(StoreError::NotFound(format!("Auction {auction_id}")));
        };
        if auction.status != AuctionStatus::Active {
            return Err(StoreError::StaleState(format!(
                "auction {} is {} and does not accept bids",
                auction.code, auction.status
            )));
        }
        if !t.has_invitation(auction_id, supplier_id) {
            return Err(StoreError::NotPermitted(format!(
                "supplier {supplier_id} is not invited to auction {}",
                auction.code
            )));
        }
        for (line, _) in bid.lines() {
            let belongs = t
                .auction_items
                .get(line.auction_item_id)
                .is_some_and(|item| item.auction_id == auction_id);
            if !belongs {
                return Err(StoreError::NotFound(format!(
                    "Auction item {} in auction {auction_id}",
                    line.auction_item_id
                )));
            }
        }

        let stored = t.bids.insert(|id| Bid {
            id,
            auction_id,
            supplier_id,
            total_amount: bid.total_amount(),
            delivery_date: bid.delivery_date(),
            note: bid.note().map(str::to_owned),
            status: BidStatus::Pending,
            created_at: Utc::now(),
        });
        let bid_id = stored.id;
        let items = bid
            .lines()
            .iter()
            .map(|(line, line_total)| {
                t.bid_items.insert(|id| BidItem {
                    id,
                    bid_id,
                    auction_item_id: line.auction_item_id,
                    price_per_unit: line.price_per_unit,
                    quantity: line.quantity,
                    total_price: *line_total,
                })
            })
            .collect();

        debug!(bid_id, auction_id, total = stored.total_amount, "Bid stored");
        Ok(BidWithItems { bid: stored, items })
    }

    async fn get_bid(&self, id: Id) -> StoreResult<Option<Bid>> {
        Ok(self.tables.read().await.bids.get(id))
    }

    async fn list_bids(&self, auction_id: Id) -> StoreResult<Vec<Bid>> {
        Ok(self
            .tables
            .read()
            .await
            .bids
            .filter(|b| b.auction_id == auction_id))
    }

    async fn list_bids_by_supplier(&self, supplier_id: Id) -> StoreResult<Vec<Bid>> {
        Ok(self
            .tables
            .read()
            .await
            .bids
            .filter(|b| b.supplier_id == supplier_id))
    }

    async fn list_all_bids(&self) -> StoreResult<Vec<Bid>> {
        Ok(self.tables.read().await.bids.filter(|_| true))
    }

    async fn list_bid_items(&self, bid_id: Id) -> StoreResult<Vec<BidItem>> {
        Ok(self
            .tables
            .read()
            .await
            .bid_items
            .filter(|i| i.bid_id == bid_id))
    }

    async fn transition_bid(
        &self,
        id: Id,
        to: BidStatus,
        allowed_from: &[BidStatus],
    ) -> StoreResult<Option<Bid>> {
        let mut t = self.tables.write().await;
        let Some(current) = t.bids.get(id) else {
            return Ok(None);
        };
        if !allowed_from.contains(&current.status) {
            return Err(StoreError::StaleState(format!(
                "bid {id} is {} and cannot become {to}",
                current.status
            )));
        }
        Ok(t.bids.update(id, |b| b.status = to))
    }

    async fn accept_bid(&self, bid_id: Id) -> StoreResult<(Bid, Auction)> {
        let mut t = self.tables.write().await;

        let bid = t
            .bids
            .get(bid_id)
            .ok_or_else(|| StoreError::NotFound(format!("Bid {bid_id}")))?;
        let auction = t
            .auctions
            .get(bid.auction_id)
            .ok_or_else(|| StoreError::NotFound(format!("Auction {}", bid.auction_id)))?;

        if bid.status == BidStatus::Accepted && auction.winning_bid_id == Some(bid_id) {
            return Ok((bid, auction));
        }
        if bid.status != BidStatus::Pending {
            return Err(StoreError::StaleState(format!(
                "bid {bid_id} is {} and cannot be accepted",
                bid.status
            )));
        }
        match auction.status {
            AuctionStatus::Active | AuctionStatus::Closed => {}
            AuctionStatus::Completed => {
                return Err(StoreError::StaleState(format!(
                    "auction {} already has a winning bid",
                    auction.id
                )));
            }
            AuctionStatus::Draft => {
                return Err(StoreError::StaleState(format!(
                    "auction {} is still a draft",
                    auction.id
                )));
            }
        }

        let bid = t
            .bids
            .update(bid_id, |b| b.status = BidStatus::Accepted)
            .ok_or_else(|| StoreError::NotFound(format!("Bid {bid_id}")))?;
        let auction = t
            .auctions
            .update(auction.id, |a| {
                a.status = AuctionStatus::Completed;
                a.winning_bid_id = Some(bid_id);
            })
            .ok_or_else(|| StoreError::NotFound(format!("Auction {}", auction.id)))?;

        debug!(bid_id, auction_id = auction.id, "Bid accepted, auction completed");
        Ok((bid, auction))
    }
}
