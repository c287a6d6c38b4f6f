//! Dashboard counters.

use serde::Serialize;

use crate::models::{Auction, AuctionStatus, Bid, BidStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub active_auctions: usize,
    pub completed_auctions: usize,
    pub total_auctions: usize,
    pub bids: BidCounts,
}

/// Count already visibility-filtered auctions and bids.
pub fn compute(auctions: &[Auction], bids: &[Bid]) -> Stats {
    let count = |status| auctions.iter().filter(|a| a.status == status).count();
    let mut counts = BidCounts {
        total: bids.len(),
        ..BidCounts::default()
    };
    for bid in bids {
        match bid.status {
            BidStatus::Pending => counts.pending += 1,
            BidStatus::Accepted => counts.accepted += 1,
            BidStatus::Rejected => counts.rejected += 1,
        }
    }
    Stats {
        active_auctions: count(AuctionStatus::Active),
        completed_auctions: count(AuctionStatus::Completed),
        total_auctions: auctions.len(),
        bids: counts,
    }
}
