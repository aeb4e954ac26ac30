//! Farm ownership authorization.
//!
//! Two deployments coexist: newer schemas track owners in the
//! `farm_owners` bridge table, older ones only have the field's legacy
//! `owner_id` column. The check is resolved into an explicit variant once
//! per request and decided with a pure function.

use uuid::Uuid;

/// Ownership evidence gathered for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipCheck {
    /// Bridge table had rows for the farm; `is_owner` is the membership
    /// result for the requesting user.
    BridgeTable { is_owner: bool },
    /// No bridge rows; fall back to the legacy single-owner column.
    LegacyColumn { owner_id: Option<Uuid> },
}

/// Decide authorization from resolved evidence.
pub fn is_authorized(check: &OwnershipCheck, user_id: Uuid) -> bool {
    match check {
        OwnershipCheck::BridgeTable { is_owner } => *is_owner,
        OwnershipCheck::LegacyColumn { owner_id } => *owner_id == Some(user_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_table_membership_decides() {
        let user = Uuid::new_v4();
        assert!(is_authorized(
            &OwnershipCheck::BridgeTable { is_owner: true },
            user
        ));
        assert!(!is_authorized(
            &OwnershipCheck::BridgeTable { is_owner: false },
            user
        ));
    }

    #[test]
    fn test_legacy_column_matches_user() {
        let user = Uuid::new_v4();
        assert!(is_authorized(
            &OwnershipCheck::LegacyColumn {
                owner_id: Some(user)
            },
            user
        ));
        assert!(!is_authorized(
            &OwnershipCheck::LegacyColumn {
                owner_id: Some(Uuid::new_v4())
            },
            user
        ));
    }

    #[test]
    fn test_legacy_column_without_owner_denies() {
        assert!(!is_authorized(
            &OwnershipCheck::LegacyColumn { owner_id: None },
            Uuid::new_v4()
        ));
    }

    #[test]
    fn test_bridge_rows_trump_legacy_column() {
        // A user named only in the legacy column must not pass once the
        // farm has bridge rows that exclude them.
        let user = Uuid::new_v4();
        let check = OwnershipCheck::BridgeTable { is_owner: false };
        assert!(!is_authorized(&check, user));
    }
}
