//! Data models for `PartBid`.
//!
//! Records reference each other only by id; consumers re-resolve through the
//! store on every access.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Entity identifier. Positive, unique per entity type, never reused.
pub type Id = i64;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(Error::validation(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Supplier,
}

string_enum!(Role { Admin => "admin", Manager => "manager", Supplier => "supplier" });

impl Role {
    /// Admins and managers act on the buying side.
    pub const fn is_buyer(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    #[default]
    Draft,
    Active,
    Closed,
    Completed,
}

string_enum!(AuctionStatus {
    Draft => "draft",
    Active => "active",
    Closed => "closed",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuctionType {
    #[default]
    Standard,
    Urgent,
    Limited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

string_enum!(BidStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

/// Entity types that notifications link back to and activity entries describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Supplier,
    Auction,
    Bid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub company_name: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Id,
    pub user_id: Id,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub address: Option<String>,
    pub rating: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub code: String,
    pub created_by: Id,
    pub status: AuctionStatus,
    pub auction_type: AuctionType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub specification: Option<String>,
    pub winning_bid_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionItem {
    pub id: Id,
    pub auction_id: Id,
    pub part_number: String,
    pub name: String,
    pub quantity: i64,
    pub unit_of_measure: String,
    pub estimated_price: Option<i64>,
    pub description: Option<String>,
    pub required_by: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: Id,
    pub auction_id: Id,
    pub supplier_id: Id,
    pub invited_at: DateTime<Utc>,
    pub status: InvitationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: Id,
    pub auction_id: Id,
    pub supplier_id: Id,
    pub total_amount: i64,
    pub delivery_date: DateTime<Utc>,
    pub note: Option<String>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidItem {
    pub id: Id,
    pub bid_id: Id,
    pub auction_item_id: Id,
    pub price_per_unit: i64,
    pub quantity: i64,
    pub total_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub related_id: Option<Id>,
    pub related_type: Option<EntityKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Id,
    pub user_id: Id,
    pub action: String,
    pub entity_type: EntityKind,
    pub entity_id: Id,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =========================================================================
// Drafts: caller-supplied fields of records the store will create
// =========================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSupplier {
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuction {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub auction_type: AuctionType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub specification: Option<String>,
}

impl NewAuction {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        validate_window(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuctionItem {
    pub part_number: String,
    pub name: String,
    pub quantity: i64,
    pub unit_of_measure: String,
    #[serde(default)]
    pub estimated_price: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required_by: Option<DateTime<Utc>>,
}

impl NewAuctionItem {
    pub fn validate(&self) -> Result<()> {
        require_text("part number", &self.part_number)?;
        require_text("item name", &self.name)?;
        require_text("unit of measure", &self.unit_of_measure)?;
        if self.quantity <= 0 {
            return Err(Error::validation(format!(
                "quantity of '{}' must be positive",
                self.name
            )));
        }
        if self.estimated_price.is_some_and(|p| p < 0) {
            return Err(Error::validation(format!(
                "estimated price of '{}' must not be negative",
                self.name
            )));
        }
        Ok(())
    }
}

/// One priced line of a bid as submitted.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidLine {
    pub auction_item_id: Id,
    pub price_per_unit: i64,
    pub quantity: i64,
}

/// A bid whose line and grand totals have been computed from its lines.
///
/// Fields are private: the only way to obtain one is [`PricedBid::new`], so a
/// total can never be supplied independently of the lines it sums.
#[derive(Debug, Clone)]
pub struct PricedBid {
    auction_id: Id,
    supplier_id: Id,
    delivery_date: DateTime<Utc>,
    note: Option<String>,
    lines: Vec<(BidLine, i64)>,
    total_amount: i64,
}

impl PricedBid {
    /// Price every line (`price_per_unit * quantity`) and sum the bid.
    ///
    /// Rejects empty bids, non-positive prices or quantities, duplicate
    /// auction items and arithmetic overflow.
    pub fn new(
        auction_id: Id,
        supplier_id: Id,
        delivery_date: DateTime<Utc>,
        note: Option<String>,
        lines: &[BidLine],
    ) -> Result<Self> {
        if lines.is_empty() {
            return Err(Error::validation("a bid needs at least one item"));
        }

        let mut seen = HashSet::with_capacity(lines.len());
        let mut priced = Vec::with_capacity(lines.len());
        let mut total_amount: i64 = 0;
        for line in lines {
            if !seen.insert(line.auction_item_id) {
                return Err(Error::validation(format!(
                    "auction item {} is priced more than once",
                    line.auction_item_id
                )));
            }
            if line.price_per_unit <= 0 || line.quantity <= 0 {
                return Err(Error::validation(format!(
                    "price and quantity for auction item {} must be positive",
                    line.auction_item_id
                )));
            }
            let line_total = line
                .price_per_unit
                .checked_mul(line.quantity)
                .ok_or_else(|| Error::validation("bid amount is too large"))?;
            total_amount = total_amount
                .checked_add(line_total)
                .ok_or_else(|| Error::validation("bid amount is too large"))?;
            priced.push((*line, line_total));
        }

        Ok(Self {
            auction_id,
            supplier_id,
            delivery_date,
            note: note.filter(|n| !n.trim().is_empty()),
            lines: priced,
            total_amount,
        })
    }

    pub const fn auction_id(&self) -> Id {
        self.auction_id
    }

    pub const fn supplier_id(&self) -> Id {
        self.supplier_id
    }

    pub const fn delivery_date(&self) -> DateTime<Utc> {
        self.delivery_date
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Lines paired with their computed `total_price`.
    pub fn lines(&self) -> &[(BidLine, i64)] {
        &self.lines
    }

    pub const fn total_amount(&self) -> i64 {
        self.total_amount
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Id,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related: Option<(EntityKind, Id)>,
}

impl NewNotification {
    pub fn new(
        user_id: Id,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            kind,
            related: None,
        }
    }

    /// Link the notification to the entity it is about.
    #[must_use]
    pub const fn about(mut self, kind: EntityKind, id: Id) -> Self {
        self.related = Some((kind, id));
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Id,
    pub action: String,
    pub entity_type: EntityKind,
    pub entity_id: Id,
    pub details: Option<String>,
}

impl NewActivity {
    pub fn new(
        user_id: Id,
        action: impl Into<String>,
        entity_type: EntityKind,
        entity_id: Id,
    ) -> Self {
        Self {
            user_id,
            action: action.into(),
            entity_type,
            entity_id,
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// =========================================================================
// Patches: shallow merges, `None` leaves a field untouched
// =========================================================================

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub company_name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierPatch {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub rating: Option<i32>,
    pub active: Option<bool>,
}

/// Editable auction fields. Status and winner change only through the
/// lifecycle transitions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub auction_type: Option<AuctionType>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub specification: Option<String>,
}

impl AuctionPatch {
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.auction_type.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.specification.is_none()
    }

    /// Apply onto an auction in place.
    pub fn apply(self, auction: &mut Auction) {
        if let Some(title) = self.title {
            auction.title = title;
        }
        if let Some(description) = self.description {
            auction.description = description;
        }
        if let Some(auction_type) = self.auction_type {
            auction.auction_type = auction_type;
        }
        if let Some(start) = self.start_date {
            auction.start_date = start;
        }
        if let Some(end) = self.end_date {
            auction.end_date = end;
        }
        if let Some(spec) = self.specification {
            auction.specification = Some(spec);
        }
    }
}

// =========================================================================
// Composite views
// =========================================================================

/// Everything written by one auction creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionBundle {
    #[serde(flatten)]
    pub auction: Auction,
    pub items: Vec<AuctionItem>,
    pub invitations: Vec<Invitation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidWithItems {
    #[serde(flatten)]
    pub bid: Bid,
    pub items: Vec<BidItem>,
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end < start {
        return Err(Error::validation("end date must not precede start date"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(item: Id, price: i64, qty: i64) -> BidLine {
        BidLine {
            auction_item_id: item,
            price_per_unit: price,
            quantity: qty,
        }
    }

    #[test]
    fn priced_bid_sums_line_totals() {
        let bid = PricedBid::new(
            1,
            2,
            Utc::now(),
            None,
            &[line(10, 5200, 50), line(11, 300, 3)],
        )
        .unwrap();

        let totals: Vec<i64> = bid.lines().iter().map(|(_, t)| *t).collect();
        assert_eq!(totals, vec![260_000, 900]);
        assert_eq!(bid.total_amount(), 260_900);
    }

    #[test]
    fn priced_bid_rejects_bad_lines() {
        let now = Utc::now();
        assert!(PricedBid::new(1, 2, now, None, &[]).is_err());
        assert!(PricedBid::new(1, 2, now, None, &[line(10, 0, 5)]).is_err());
        assert!(PricedBid::new(1, 2, now, None, &[line(10, 5, -1)]).is_err());
        assert!(PricedBid::new(1, 2, now, None, &[line(10, 5, 1), line(10, 6, 1)]).is_err());
        assert!(matches!(
            PricedBid::new(1, 2, now, None, &[line(10, i64::MAX, 2)]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn blank_note_is_dropped() {
        let bid = PricedBid::new(1, 2, Utc::now(), Some("  ".into()), &[line(1, 1, 1)]).unwrap();
        assert!(bid.note().is_none());
    }

    #[test]
    fn statuses_parse_from_lowercase() {
        assert_eq!("accepted".parse::<BidStatus>().unwrap(), BidStatus::Accepted);
        assert_eq!("closed".parse::<AuctionStatus>().unwrap(), AuctionStatus::Closed);
        assert!("won".parse::<BidStatus>().is_err());
        assert_eq!(Role::Manager.to_string(), "manager");
    }

    #[test]
    fn auction_item_requires_positive_quantity() {
        let item = NewAuctionItem {
            part_number: "BD-12345".into(),
            name: "Brake disc".into(),
            quantity: 0,
            unit_of_measure: "pcs".into(),
            estimated_price: Some(5000),
            description: None,
            required_by: None,
        };
        assert!(matches!(item.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn patch_applies_only_given_fields() {
        let now = Utc::now();
        let mut auction = Auction {
            id: 1,
            title: "Brake discs".into(),
            description: "front".into(),
            code: "AUC-00001".into(),
            created_by: 1,
            status: AuctionStatus::Draft,
            auction_type: AuctionType::Standard,
            start_date: now,
            end_date: now,
            created_at: now,
            specification: None,
            winning_bid_id: None,
        };
        AuctionPatch {
            title: Some("Rear brake discs".into()),
            ..AuctionPatch::default()
        }
        .apply(&mut auction);

        assert_eq!(auction.title, "Rear brake discs");
        assert_eq!(auction.description, "front");
    }
}
