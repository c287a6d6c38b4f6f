//! Bid lifecycle: submission eligibility, pricing and buyer decisions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auction::AuctionLifecycle;
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::models::{
    AuctionStatus, Bid, BidLine, BidStatus, BidWithItems, EntityKind, Id, Invitation,
    InvitationStatus, NewActivity, NewNotification, NotificationKind, PricedBid, Supplier,
};
use crate::permissions::{Operation, PermissionEngine};
use crate::store::Store;
use crate::visibility::Viewer;

/// A buyer's verdict on a pending bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidDecision {
    Accepted,
    Rejected,
}

impl BidDecision {
    pub const fn status(self) -> BidStatus {
        match self {
            Self::Accepted => BidStatus::Accepted,
            Self::Rejected => BidStatus::Rejected,
        }
    }
}

/// A supplier's offer as received from the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidSubmission {
    pub items: Vec<BidLine>,
    pub delivery_date: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct BidLifecycle {
    store: Arc<dyn Store>,
    emitter: Emitter,
    engine: Arc<PermissionEngine>,
    auctions: AuctionLifecycle,
}

impl BidLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        emitter: Emitter,
        engine: Arc<PermissionEngine>,
        auctions: AuctionLifecycle,
    ) -> Self {
        Self {
            store,
            emitter,
            engine,
            auctions,
        }
    }

    /// Submit a bid on behalf of the caller's supplier record.
    ///
    /// Checks run in order: caller has a supplier record, auction exists,
    /// auction is active, caller is invited, then the bid lines themselves.
    /// Nothing is written unless all pass.
    #[instrument(skip(self, submission), fields(user_id = caller.user_id))]
    pub async fn submit(
        &self,
        caller: &Viewer,
        auction_id: Id,
        submission: BidSubmission,
    ) -> Result<BidWithItems> {
        let supplier = self.supplier_of(caller).await?;
        let auction = self.auctions.require(auction_id).await?;
        if auction.status != AuctionStatus::Active {
            return Err(Error::invalid_state(format!(
                "auction {} is {} and does not accept bids",
                auction.code, auction.status
            )));
        }
        if self
            .store
            .find_invitation(auction_id, supplier.id)
            .await?
            .is_none()
        {
            return Err(Error::denied(format!(
                "supplier {} is not invited to auction {}",
                supplier.company_name, auction.code
            )));
        }

        let priced = PricedBid::new(
            auction_id,
            supplier.id,
            submission.delivery_date,
            submission.note,
            &submission.items,
        )?;
        let item_ids: HashSet<Id> = self
            .store
            .list_auction_items(auction_id)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        if let Some((line, _)) = priced
            .lines()
            .iter()
            .find(|(line, _)| !item_ids.contains(&line.auction_item_id))
        {
            return Err(Error::validation(format!(
                "auction item {} does not belong to auction {}",
                line.auction_item_id, auction.code
            )));
        }

        let created = self.store.create_bid(priced).await?;
        let bid = &created.bid;
        info!(
            bid_id = bid.id,
            auction_id,
            supplier_id = supplier.id,
            total = bid.total_amount,
            "Bid submitted"
        );

        self.emitter
            .notify(
                NewNotification::new(
                    auction.created_by,
                    NotificationKind::Info,
                    "New bid received",
                    format!(
                        "Supplier {} submitted a bid on auction {}",
                        supplier.company_name, auction.code
                    ),
                )
                .about(EntityKind::Bid, bid.id),
            )
            .await;
        self.emitter
            .log(
                NewActivity::new(caller.user_id, "Bid created", EntityKind::Bid, bid.id)
                    .with_details(format!("Created bid for auction: {}", auction.title)),
            )
            .await;

        Ok(created)
    }

    /// Accept or reject a pending bid.
    ///
    /// Accepting completes the auction with this bid as the winner; an
    /// auction that already has a winner refuses a second one. Other pending
    /// bids are left as they are. Repeating a decision the bid already
    /// carries returns the bid without further effects.
    #[instrument(skip(self), fields(user_id = caller.user_id))]
    pub async fn decide(&self, caller: &Viewer, bid_id: Id, decision: BidDecision) -> Result<Bid> {
        self.engine.check(Operation::DecideBid, caller.role)?;
        let bid = self
            .store
            .get_bid(bid_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Bid {bid_id}")))?;

        if bid.status == decision.status() {
            return Ok(bid);
        }
        if bid.status != BidStatus::Pending {
            return Err(Error::invalid_state(format!(
                "bid {bid_id} is already {}",
                bid.status
            )));
        }

        match decision {
            BidDecision::Accepted => self.accept(caller, bid).await,
            BidDecision::Rejected => self.reject(caller, bid).await,
        }
    }

    async fn accept(&self, caller: &Viewer, bid: Bid) -> Result<Bid> {
        let (bid, auction) = self.auctions.complete(bid.id).await?;

        for winner in self.auctions.supplier_users([bid.supplier_id]).await {
            self.emitter
                .notify(
                    NewNotification::new(
                        winner,
                        NotificationKind::Success,
                        "Your bid was accepted",
                        format!("Your bid on auction {} was accepted", auction.code),
                    )
                    .about(EntityKind::Bid, bid.id),
                )
                .await;
        }

        let invitations = self
            .store
            .list_invitations(auction.id)
            .await
            .unwrap_or_else(|e| {
                warn!(auction_id = auction.id, error = %e, "Failed to load invitations");
                Vec::new()
            });
        let others: Vec<Id> = invitations
            .into_iter()
            .map(|i| i.supplier_id)
            .filter(|&supplier_id| supplier_id != bid.supplier_id)
            .collect();
        let others = self.auctions.supplier_users(others).await;
        self.emitter
            .notify_all(others, |user_id| {
                NewNotification::new(
                    user_id,
                    NotificationKind::Info,
                    "Auction completed",
                    format!("Auction {} has been completed", auction.code),
                )
                .about(EntityKind::Auction, auction.id)
            })
            .await;

        self.emitter
            .log(
                NewActivity::new(caller.user_id, "Bid accepted", EntityKind::Bid, bid.id)
                    .with_details(format!("Accepted bid for auction: {}", auction.title)),
            )
            .await;
        Ok(bid)
    }

    async fn reject(&self, caller: &Viewer, bid: Bid) -> Result<Bid> {
        let auction = self.auctions.require(bid.auction_id).await?;
        let bid = self
            .store
            .transition_bid(bid.id, BidStatus::Rejected, &[BidStatus::Pending])
            .await?
            .ok_or_else(|| Error::not_found(format!("Bid {}", bid.id)))?;
        info!(bid_id = bid.id, auction_id = auction.id, "Bid rejected");

        for user_id in self.auctions.supplier_users([bid.supplier_id]).await {
            self.emitter
                .notify(
                    NewNotification::new(
                        user_id,
                        NotificationKind::Info,
                        "Your bid was rejected",
                        format!("Your bid on auction {} was rejected", auction.code),
                    )
                    .about(EntityKind::Bid, bid.id),
                )
                .await;
        }
        self.emitter
            .log(
                NewActivity::new(caller.user_id, "Bid rejected", EntityKind::Bid, bid.id)
                    .with_details(format!("Rejected bid for auction: {}", auction.title)),
            )
            .await;
        Ok(bid)
    }

    /// Record the caller's answer to an invitation. Informational only:
    /// bidding eligibility depends on the invitation existing, not on its
    /// status.
    #[instrument(skip(self), fields(user_id = caller.user_id))]
    pub async fn respond_to_invitation(
        &self,
        caller: &Viewer,
        auction_id: Id,
        accept: bool,
    ) -> Result<Invitation> {
        let supplier = self.supplier_of(caller).await?;
        let auction = self.auctions.require(auction_id).await?;
        let invitation = self
            .store
            .find_invitation(auction_id, supplier.id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Invitation of supplier {} to auction {}",
                    supplier.id, auction.code
                ))
            })?;

        let status = if accept {
            InvitationStatus::Accepted
        } else {
            InvitationStatus::Declined
        };
        let updated = self
            .store
            .set_invitation_status(invitation.id, status)
            .await?
            .ok_or_else(|| Error::not_found(format!("Invitation {}", invitation.id)))?;

        let action = if accept {
            "Invitation accepted"
        } else {
            "Invitation declined"
        };
        self.emitter
            .notify(
                NewNotification::new(
                    auction.created_by,
                    NotificationKind::Info,
                    action,
                    format!(
                        "Supplier {} answered the invitation to auction {}",
                        supplier.company_name, auction.code
                    ),
                )
                .about(EntityKind::Auction, auction_id),
            )
            .await;
        self.emitter
            .log(NewActivity::new(caller.user_id, action, EntityKind::Auction, auction_id))
            .await;
        Ok(updated)
    }

    async fn supplier_of(&self, caller: &Viewer) -> Result<Supplier> {
        self.store
            .find_supplier_by_user(caller.user_id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("Supplier record for user {}", caller.user_id))
            })
    }
}
