//! Role-based read projections.
//!
//! Every function here takes records by value and returns the subset the
//! viewer may see. Nothing touches the store.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{Auction, Bid, Id, Invitation, Role};
use crate::permissions::{Operation, PermissionEngine};

/// Who is looking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub user_id: Id,
    pub role: Role,
    /// Supplier record of a supplier-role user, if one exists.
    pub supplier_id: Option<Id>,
}

impl Viewer {
    pub const fn buyer(user_id: Id, role: Role) -> Self {
        Self {
            user_id,
            role,
            supplier_id: None,
        }
    }
}

/// Auctions the viewer may list.
///
/// Suppliers see exactly the auctions they hold an invitation for; a
/// supplier-role user without a supplier record sees none.
pub fn auctions(
    engine: &PermissionEngine,
    viewer: &Viewer,
    auctions: Vec<Auction>,
    invitations: &[Invitation],
) -> Vec<Auction> {
    if engine.allows(Operation::ViewAllAuctions, viewer.role) {
        return auctions;
    }
    let Some(supplier_id) = viewer.supplier_id else {
        return Vec::new();
    };
    let invited: HashSet<Id> = invitations
        .iter()
        .filter(|i| i.supplier_id == supplier_id)
        .map(|i| i.auction_id)
        .collect();
    auctions
        .into_iter()
        .filter(|a| invited.contains(&a.id))
        .collect()
}

/// Whether the viewer may open one auction.
pub fn can_see_auction(
    engine: &PermissionEngine,
    viewer: &Viewer,
    auction_id: Id,
    invitations: &[Invitation],
) -> bool {
    engine.allows(Operation::ViewAllAuctions, viewer.role)
        || viewer.supplier_id.is_some_and(|supplier_id| {
            invitations
                .iter()
                .any(|i| i.auction_id == auction_id && i.supplier_id == supplier_id)
        })
}

/// Bids the viewer may read: everything for buyers, own bids for suppliers.
pub fn bids(engine: &PermissionEngine, viewer: &Viewer, bids: Vec<Bid>) -> Vec<Bid> {
    if engine.allows(Operation::ViewAllBids, viewer.role) {
        return bids;
    }
    match viewer.supplier_id {
        Some(supplier_id) => bids
            .into_iter()
            .filter(|b| b.supplier_id == supplier_id)
            .collect(),
        None => Vec::new(),
    }
}

/// Invitation lists are for buyers only; everyone else gets an empty list.
pub fn invitations(
    engine: &PermissionEngine,
    viewer: &Viewer,
    invitations: Vec<Invitation>,
) -> Vec<Invitation> {
    if engine.allows(Operation::ViewInvitations, viewer.role) {
        invitations
    } else {
        Vec::new()
    }
}
