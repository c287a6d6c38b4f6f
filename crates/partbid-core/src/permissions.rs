//! Role-based permission table.
//!
//! Evaluates `(Operation, Role)` pairs against an ordered rule list.
//! Rules are matched in priority order (first match wins); anything not
//! matched is denied.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Role;

/// Role-gated operations of the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateAuction,
    UpdateAuction,
    ActivateAuction,
    CloseAuction,
    InviteSupplier,
    DecideBid,
    /// See the invitation list of any auction.
    ViewInvitations,
    /// See every auction regardless of invitations.
    ViewAllAuctions,
    /// See every bid of an auction, not only one's own.
    ViewAllBids,
    ViewActivity,
    ManageUsers,
    RateSupplier,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateAuction => "create_auction",
            Self::UpdateAuction => "update_auction",
            Self::ActivateAuction => "activate_auction",
            Self::CloseAuction => "close_auction",
            Self::InviteSupplier => "invite_supplier",
            Self::DecideBid => "decide_bid",
            Self::ViewInvitations => "view_invitations",
            Self::ViewAllAuctions => "view_all_auctions",
            Self::ViewAllBids => "view_all_bids",
            Self::ViewActivity => "view_activity",
            Self::ManageUsers => "manage_users",
            Self::RateSupplier => "rate_supplier",
        }
    }
}

/// Action to take when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Allow,
    #[default]
    Deny,
}

/// Which operations a rule covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationPattern {
    Any,
    One(Operation),
}

impl OperationPattern {
    fn matches(&self, op: Operation) -> bool {
        match self {
            Self::Any => true,
            Self::One(o) => *o == op,
        }
    }
}

/// Permission rule definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Rule identifier.
    pub id: String,
    pub role: Role,
    pub operation: OperationPattern,
    pub action: PermissionAction,
    /// Priority (lower = higher priority).
    #[serde(default)]
    pub priority: u32,
}

/// Result of permission evaluation.
#[derive(Debug, Clone, Default)]
pub struct PermissionDecision {
    pub action: PermissionAction,
    /// ID of the rule that matched (if any).
    pub rule_id: Option<String>,
}

impl PermissionDecision {
    pub fn is_allowed(&self) -> bool {
        self.action == PermissionAction::Allow
    }
}

/// Permission engine for evaluating role requests.
#[derive(Debug, Clone)]
pub struct PermissionEngine {
    rules: Vec<PermissionRule>,
}

impl Default for PermissionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionEngine {
    /// Create a new permission engine with the built-in rules.
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Create an engine with custom rules.
    pub fn with_rules(mut rules: Vec<PermissionRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    /// Evaluate an operation for a role.
    pub fn evaluate(&self, op: Operation, role: Role) -> PermissionDecision {
        self.rules
            .iter()
            .find(|rule| rule.role == role && rule.operation.matches(op))
            .map(|rule| PermissionDecision {
                action: rule.action,
                rule_id: Some(rule.id.clone()),
            })
            .unwrap_or_default()
    }

    pub fn allows(&self, op: Operation, role: Role) -> bool {
        self.evaluate(op, role).is_allowed()
    }

    /// Like [`allows`](Self::allows) but as a typed outcome.
    pub fn check(&self, op: Operation, role: Role) -> Result<()> {
        if self.allows(op, role) {
            Ok(())
        } else {
            Err(Error::denied(format!(
                "role {} may not {}",
                role.as_str(),
                op.as_str()
            )))
        }
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }
}

fn rule(
    id: &str,
    role: Role,
    operation: OperationPattern,
    action: PermissionAction,
    priority: u32,
) -> PermissionRule {
    PermissionRule {
        id: id.to_string(),
        role,
        operation,
        action,
        priority,
    }
}

/// Built-in rules: admins may do everything, managers everything except
/// user management, suppliers none of the gated operations.
fn default_rules() -> Vec<PermissionRule> {
    use OperationPattern::{Any, One};
    use PermissionAction::{Allow, Deny};

    vec![
        rule(
            "manager-users-deny",
            Role::Manager,
            One(Operation::ManageUsers),
            Deny,
            10,
        ),
        rule("admin-all", Role::Admin, Any, Allow, 100),
        rule("manager-all", Role::Manager, Any, Allow, 100),
        rule("supplier-none", Role::Supplier, Any, Deny, 100),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUYER_OPS: [Operation; 11] = [
        Operation::CreateAuction,
        Operation::UpdateAuction,
        Operation::ActivateAuction,
        Operation::CloseAuction,
        Operation::InviteSupplier,
        Operation::DecideBid,
        Operation::ViewInvitations,
        Operation::ViewAllAuctions,
        Operation::ViewAllBids,
        Operation::ViewActivity,
        Operation::RateSupplier,
    ];

    #[test]
    fn buyers_may_run_lifecycle_operations() {
        let engine = PermissionEngine::new();
        for op in BUYER_OPS {
            assert!(engine.allows(op, Role::Admin), "admin {op:?}");
            assert!(engine.allows(op, Role::Manager), "manager {op:?}");
        }
    }

    #[test]
    fn suppliers_are_denied_everything_gated() {
        let engine = PermissionEngine::new();
        for op in BUYER_OPS {
            assert!(!engine.allows(op, Role::Supplier), "supplier {op:?}");
        }
        assert!(!engine.allows(Operation::ManageUsers, Role::Supplier));
    }

    #[test]
    fn only_admins_manage_users() {
        let engine = PermissionEngine::new();
        assert!(engine.allows(Operation::ManageUsers, Role::Admin));

        let decision = engine.evaluate(Operation::ManageUsers, Role::Manager);
        assert!(!decision.is_allowed());
        assert_eq!(decision.rule_id.as_deref(), Some("manager-users-deny"));
    }

    #[test]
    fn unmatched_is_denied() {
        let engine = PermissionEngine::with_rules(Vec::new());
        let decision = engine.evaluate(Operation::CreateAuction, Role::Admin);
        assert!(!decision.is_allowed());
        assert!(decision.rule_id.is_none());
        assert!(matches!(
            engine.check(Operation::CreateAuction, Role::Admin),
            Err(Error::PermissionDenied(_))
        ));
    }
}
