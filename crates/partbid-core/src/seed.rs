//! Demo data for a fresh in-memory marketplace.

use chrono::{Duration, Utc};
use tracing::info;

use crate::accounts::Registration;
use crate::error::Result;
use crate::market::{AuctionRequest, Marketplace};
use crate::models::{AuctionType, NewAuction, NewAuctionItem, Role};
use crate::visibility::Viewer;

struct DemoAuction {
    title: &'static str,
    description: &'static str,
    auction_type: AuctionType,
    days_open: i64,
    part_number: &'static str,
    name: &'static str,
    quantity: i64,
    estimated_price: i64,
    required_in_days: i64,
}

const AUCTIONS: [DemoAuction; 3] = [
    DemoAuction {
        title: "Brake disc procurement",
        description: "Brake discs for several car models",
        auction_type: AuctionType::Standard,
        days_open: 7,
        part_number: "BD-12345",
        name: "Front brake disc BMW 3-series",
        quantity: 50,
        estimated_price: 5000,
        required_in_days: 14,
    },
    DemoAuction {
        title: "BMW oil filters",
        description: "Oil filters for BMW vehicles",
        auction_type: AuctionType::Urgent,
        days_open: 3,
        part_number: "OF-54321",
        name: "BMW oil filter",
        quantity: 100,
        estimated_price: 1200,
        required_in_days: 10,
    },
    DemoAuction {
        title: "BOSCH spark plugs",
        description: "BOSCH spark plugs for several car models",
        auction_type: AuctionType::Standard,
        days_open: 10,
        part_number: "SP-98765",
        name: "BOSCH spark plug",
        quantity: 200,
        estimated_price: 500,
        required_in_days: 15,
    },
];

/// (username, email, full name, company)
const SUPPLIERS: [(&str, &str, &str, &str); 3] = [
    ("glavautoz", "info@glavautoz.example", "Ivan Petrov", "GlavAutoParts"),
    ("avtoplus", "info@avtoplus.example", "Anna Sidorova", "AutoParts Plus"),
    ("maxauto", "info@maxauto.example", "Maxim Sokolov", "MaxAuto"),
];

fn account(
    username: &str,
    email: &str,
    password: &str,
    full_name: &str,
    role: Role,
) -> Registration {
    Registration {
        username: username.into(),
        email: email.into(),
        password: password.into(),
        full_name: full_name.into(),
        role,
        company_name: None,
        contact_person: None,
        phone: None,
        address: None,
    }
}

/// Populate an empty marketplace: an admin, a manager, three suppliers and
/// three active auctions inviting every supplier. Does nothing if any user
/// already exists.
pub async fn load_demo_data(market: &Marketplace) -> Result<()> {
    if !market.store().list_users().await?.is_empty() {
        info!("Store already populated, skipping demo data");
        return Ok(());
    }

    let accounts = market.accounts();
    accounts
        .create_user(account(
            "admin",
            "admin@partbid.example",
            "admin123",
            "Admin User",
            Role::Admin,
        ))
        .await?;
    let manager = accounts
        .create_user(account(
            "manager",
            "manager@partbid.example",
            "manager123",
            "Anton Makarov",
            Role::Manager,
        ))
        .await?
        .user;

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (i, (username, email, full_name, company)) in SUPPLIERS.into_iter().enumerate() {
        let mut registration = account(username, email, "supplier123", full_name, Role::Supplier);
        registration.company_name = Some(company.into());
        registration.phone = Some(format!("+7 900 000 00 0{i}"));
        let created = accounts.create_user(registration).await?;
        if let Some(supplier) = created.supplier {
            supplier_ids.push(supplier.id);
        }
    }

    let caller = Viewer::buyer(manager.id, manager.role);
    let now = Utc::now();
    for demo in &AUCTIONS {
        let request = AuctionRequest {
            auction: NewAuction {
                title: demo.title.into(),
                description: demo.description.into(),
                auction_type: demo.auction_type,
                start_date: now,
                end_date: now + Duration::days(demo.days_open),
                specification: Some("See attached specification".into()),
            },
            items: vec![NewAuctionItem {
                part_number: demo.part_number.into(),
                name: demo.name.into(),
                quantity: demo.quantity,
                unit_of_measure: "pcs".into(),
                estimated_price: Some(demo.estimated_price),
                description: None,
                required_by: Some(now + Duration::days(demo.required_in_days)),
            }],
            supplier_ids: supplier_ids.clone(),
        };
        let bundle = market.create_auction(&caller, request).await?;
        market.activate_auction(&caller, bundle.auction.id).await?;
    }

    info!(
        suppliers = supplier_ids.len(),
        auctions = AUCTIONS.len(),
        "Demo data loaded"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::AuctionStatus;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn demo_data_is_loaded_once() {
        let market = Marketplace::new(Arc::new(MemoryStore::new()));
        load_demo_data(&market).await.unwrap();
        load_demo_data(&market).await.unwrap();

        let admin = market.authenticate("admin", "admin123").await.unwrap();
        let viewer = market.viewer(&admin).await.unwrap();
        let auctions = market.list_auctions(&viewer, None).await.unwrap();
        assert_eq!(auctions.len(), 3);
        assert!(auctions.iter().all(|a| a.status == AuctionStatus::Active));
        assert_eq!(market.list_users(&viewer).await.unwrap().len(), 5);

        let supplier = market.authenticate("maxauto", "supplier123").await.unwrap();
        let viewer = market.viewer(&supplier).await.unwrap();
        assert_eq!(market.list_auctions(&viewer, None).await.unwrap().len(), 3);
    }
}
