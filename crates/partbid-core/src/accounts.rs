//! User accounts, credentials and the supplier directory.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::models::{
    EntityKind, Id, NewActivity, NewNotification, NewSupplier, NewUser, NotificationKind, Role,
    Supplier, SupplierPatch, User, UserPatch, require_text,
};
use crate::password;
use crate::permissions::{Operation, PermissionEngine};
use crate::store::Store;
use crate::visibility::Viewer;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_RATING: i32 = 5;

/// Account creation request, shared by self sign-up and admin creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

const fn default_role() -> Role {
    Role::Supplier
}

impl Registration {
    fn validate(&self) -> Result<()> {
        if self.username.trim().chars().count() < MIN_USERNAME_LEN {
            return Err(Error::validation(format!(
                "username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if !self.email.contains('@') {
            return Err(Error::validation("email address is invalid"));
        }
        require_text("full name", &self.full_name)?;
        if self.role == Role::Supplier {
            require_text("company name", self.company_name.as_deref().unwrap_or_default())?;
        }
        Ok(())
    }
}

/// A user together with its supplier record, if it has one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(flatten)]
    pub user: User,
    pub supplier: Option<Supplier>,
}

#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Store>,
    emitter: Emitter,
    engine: Arc<PermissionEngine>,
}

impl Accounts {
    pub fn new(store: Arc<dyn Store>, emitter: Emitter, engine: Arc<PermissionEngine>) -> Self {
        Self {
            store,
            emitter,
            engine,
        }
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.store.find_user_by_username(username).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.store.find_user_by_email(email).await?)
    }

    pub async fn get_user(&self, user_id: Id) -> Result<Option<User>> {
        Ok(self.store.get_user(user_id).await?)
    }

    pub async fn get_supplier_by_user_id(&self, user_id: Id) -> Result<Option<Supplier>> {
        Ok(self.store.find_supplier_by_user(user_id).await?)
    }

    /// Resolve the identity an authenticated user acts under.
    pub async fn viewer(&self, user: &User) -> Result<Viewer> {
        let supplier_id = if user.role == Role::Supplier {
            self.store
                .find_supplier_by_user(user.id)
                .await?
                .map(|s| s.id)
        } else {
            None
        };
        Ok(Viewer {
            user_id: user.id,
            role: user.role,
            supplier_id,
        })
    }

    /// Create an account of any role. A supplier-role account gets its
    /// supplier record in the same unit of work.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn create_user(&self, registration: Registration) -> Result<Account> {
        registration.validate()?;
        let hash = password::hash_password(&registration.password)?;

        let draft = NewUser {
            username: registration.username.trim().to_string(),
            email: registration.email.trim().to_string(),
            password_hash: hash,
            full_name: registration.full_name.trim().to_string(),
            role: registration.role,
            company_name: registration.company_name.clone(),
        };
        let account = if registration.role == Role::Supplier {
            let supplier = NewSupplier {
                company_name: registration.company_name.unwrap_or_default(),
                contact_person: registration
                    .contact_person
                    .unwrap_or_else(|| draft.full_name.clone()),
                phone: registration.phone.unwrap_or_default(),
                address: registration.address,
            };
            let (user, supplier) = self.store.create_supplier_account(draft, supplier).await?;
            Account {
                user,
                supplier: Some(supplier),
            }
        } else {
            Account {
                user: self.store.create_user(draft).await?,
                supplier: None,
            }
        };

        let user = &account.user;
        info!(user_id = user.id, role = %user.role, "User registered");
        self.emitter
            .notify(NewNotification::new(
                user.id,
                NotificationKind::Info,
                "Welcome",
                "Welcome to the PartBid procurement platform!",
            ))
            .await;
        self.emitter
            .log(
                NewActivity::new(user.id, "User registered", EntityKind::User, user.id)
                    .with_details("User registered successfully"),
            )
            .await;
        Ok(account)
    }

    /// Public self-registration. Only supplier accounts can be opened this
    /// way; buyers are created by an admin.
    pub async fn sign_up(&self, registration: Registration) -> Result<Account> {
        if registration.role != Role::Supplier {
            return Err(Error::denied("self sign-up is limited to supplier accounts"));
        }
        self.create_user(registration).await
    }

    /// Admin-initiated account creation.
    pub async fn create_user_as(
        &self,
        caller: &Viewer,
        registration: Registration,
    ) -> Result<Account> {
        self.engine.check(Operation::ManageUsers, caller.role)?;
        self.create_user(registration).await
    }

    /// Verify credentials. Unknown users and wrong passwords are
    /// indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            warn!("Login attempt for unknown user");
            return Err(Error::InvalidCredentials);
        };
        if !password::verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "Failed login attempt");
            return Err(Error::InvalidCredentials);
        }
        if !user.active {
            return Err(Error::denied("account is deactivated"));
        }

        info!(user_id = user.id, "User logged in");
        self.emitter
            .log(
                NewActivity::new(user.id, "User logged in", EntityKind::User, user.id)
                    .with_details("User logged in successfully"),
            )
            .await;
        Ok(user)
    }

    pub async fn record_logout(&self, user_id: Id) {
        info!(user_id, "User logged out");
        self.emitter
            .log(
                NewActivity::new(user_id, "User logged out", EntityKind::User, user_id)
                    .with_details("User logged out successfully"),
            )
            .await;
    }

    pub async fn list_users(&self, caller: &Viewer) -> Result<Vec<User>> {
        self.engine.check(Operation::ManageUsers, caller.role)?;
        Ok(self.store.list_users().await?)
    }

    /// Activate or deactivate an account. A supplier's directory entry
    /// follows its user.
    #[instrument(skip(self), fields(caller_id = caller.user_id))]
    pub async fn set_user_active(
        &self,
        caller: &Viewer,
        user_id: Id,
        active: bool,
    ) -> Result<User> {
        self.engine.check(Operation::ManageUsers, caller.role)?;
        if user_id == caller.user_id && !active {
            return Err(Error::validation("you cannot deactivate your own account"));
        }
        let user = self
            .store
            .update_user(
                user_id,
                UserPatch {
                    active: Some(active),
                    ..UserPatch::default()
                },
            )
            .await?
            .ok_or_else(|| Error::not_found(format!("User {user_id}")))?;

        if let Some(supplier) = self.store.find_supplier_by_user(user_id).await? {
            self.store
                .update_supplier(
                    supplier.id,
                    SupplierPatch {
                        active: Some(active),
                        ..SupplierPatch::default()
                    },
                )
                .await?;
        }

        let action = if active {
            "User activated"
        } else {
            "User deactivated"
        };
        info!(user_id, active, "User status changed");
        self.emitter
            .log(NewActivity::new(caller.user_id, action, EntityKind::User, user_id))
            .await;
        Ok(user)
    }

    /// Active suppliers, for buyers choosing whom to invite.
    pub async fn list_suppliers(&self, caller: &Viewer) -> Result<Vec<Supplier>> {
        self.engine.check(Operation::InviteSupplier, caller.role)?;
        Ok(self
            .store
            .list_suppliers()
            .await?
            .into_iter()
            .filter(|s| s.active)
            .collect())
    }

    /// Buyers may read any supplier; a supplier only its own record.
    pub async fn get_supplier(&self, caller: &Viewer, supplier_id: Id) -> Result<Supplier> {
        let is_own = caller.supplier_id == Some(supplier_id);
        if !is_own {
            self.engine.check(Operation::InviteSupplier, caller.role)?;
        }
        self.store
            .get_supplier(supplier_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Supplier {supplier_id}")))
    }

    #[instrument(skip(self), fields(caller_id = caller.user_id))]
    pub async fn rate_supplier(
        &self,
        caller: &Viewer,
        supplier_id: Id,
        rating: i32,
    ) -> Result<Supplier> {
        self.engine.check(Operation::RateSupplier, caller.role)?;
        if !(0..=MAX_RATING).contains(&rating) {
            return Err(Error::validation(format!(
                "rating must be between 0 and {MAX_RATING}"
            )));
        }
        let supplier = self
            .store
            .update_supplier(
                supplier_id,
                SupplierPatch {
                    rating: Some(rating),
                    ..SupplierPatch::default()
                },
            )
            .await?
            .ok_or_else(|| Error::not_found(format!("Supplier {supplier_id}")))?;

        self.emitter
            .log(
                NewActivity::new(
                    caller.user_id,
                    "Supplier rated",
                    EntityKind::Supplier,
                    supplier_id,
                )
                .with_details(format!("Rated {} with {rating}", supplier.company_name)),
            )
            .await;
        Ok(supplier)
    }
}
