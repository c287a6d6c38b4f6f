//! `PartBid` Core Library
//!
//! Business core of the supplier-auction service:
//! - Entity store abstraction and its in-memory implementation
//! - Auction and bid lifecycles with the single-winner rule
//! - Role permissions and supplier visibility filtering
//! - Notification and activity side effects
//! - Configuration resolution and common error types

pub mod accounts;
pub mod auction;
pub mod bid;
pub mod config;
pub mod emitter;
pub mod error;
pub mod market;
pub mod models;
pub mod password;
pub mod permissions;
pub mod seed;
pub mod stats;
pub mod store;
pub mod tracing_init;
pub mod visibility;

pub use accounts::{Account, Registration};
pub use bid::{BidDecision, BidSubmission};
pub use config::Config;
pub use error::{Error, Result};
pub use market::{AuctionDetail, AuctionRequest, Marketplace};
pub use permissions::{Operation, PermissionEngine};
pub use stats::Stats;
pub use store::{FeedStore, MemoryStore, Store, StoreError};
pub use visibility::Viewer;
