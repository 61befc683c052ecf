//! Requisition status enumeration and the role-gated transition table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::{ParseEnumError, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisitionStatus {
    PendingWarehouseReview,
    WarehouseApproved,
    WarehouseFulfilled,
    WarehouseRejected,
    PendingQuote,
    PurchasingApproved,
    PurchasingRejected,
    Cancelled,
    InProcurement,
    Purchased,
    PartiallyReceived,
    FullyReceived,
    Closed,
}

impl RequisitionStatus {
    pub const ALL: [Self; 13] = [
        Self::PendingWarehouseReview,
        Self::WarehouseApproved,
        Self::WarehouseFulfilled,
        Self::WarehouseRejected,
        Self::PendingQuote,
        Self::PurchasingApproved,
        Self::PurchasingRejected,
        Self::Cancelled,
        Self::InProcurement,
        Self::Purchased,
        Self::PartiallyReceived,
        Self::FullyReceived,
        Self::Closed,
    ];

    pub const INITIAL: Self = Self::PendingWarehouseReview;

    pub const TERMINAL: [Self; 4] = [
        Self::WarehouseRejected,
        Self::PurchasingRejected,
        Self::Cancelled,
        Self::Closed,
    ];

    /// Key stored in `requisitions.status`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingWarehouseReview => "pending_warehouse_review",
            Self::WarehouseApproved => "warehouse_approved",
            Self::WarehouseFulfilled => "warehouse_fulfilled",
            Self::WarehouseRejected => "warehouse_rejected",
            Self::PendingQuote => "pending_quote",
            Self::PurchasingApproved => "purchasing_approved",
            Self::PurchasingRejected => "purchasing_rejected",
            Self::Cancelled => "cancelled",
            Self::InProcurement => "in_procurement",
            Self::Purchased => "purchased",
            Self::PartiallyReceived => "partially_received",
            Self::FullyReceived => "fully_received",
            Self::Closed => "closed",
        }
    }

    /// Human label used in mail subjects and rendered documents.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingWarehouseReview => "Pendiente de revision de almacen",
            Self::WarehouseApproved => "Aprobada por almacen",
            Self::WarehouseFulfilled => "Surtida por almacen",
            Self::WarehouseRejected => "Rechazada por almacen",
            Self::PendingQuote => "Pendiente de cotizar",
            Self::PurchasingApproved => "Aprobada por compras",
            Self::PurchasingRejected => "Rechazada por compras",
            Self::Cancelled => "Cancelada",
            Self::InProcurement => "En proceso de compra",
            Self::Purchased => "Comprada",
            Self::PartiallyReceived => "Recibida parcialmente",
            Self::FullyReceived => "Recibida completa",
            Self::Closed => "Cerrada",
        }
    }

    #[must_use]
    pub const fn is_initial(self) -> bool {
        matches!(self, Self::PendingWarehouseReview)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::WarehouseRejected | Self::PurchasingRejected | Self::Cancelled | Self::Closed
        )
    }

    /// Statuses for which a comment explaining the decision is expected.
    #[must_use]
    pub const fn expects_comment(self) -> bool {
        matches!(
            self,
            Self::WarehouseRejected | Self::PurchasingRejected | Self::Cancelled
        )
    }
}

impl fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequisitionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ParseEnumError::new("status", s))
    }
}

/// Statuses `role` may set on a requisition currently in `current`.
///
/// Non-admin sets include `current` itself when the role may act at all, so a
/// comment can be updated without moving the requisition. An empty set means
/// the requisition is view-only for that role.
#[must_use]
pub fn allowed_transitions(role: Role, current: RequisitionStatus) -> BTreeSet<RequisitionStatus> {
    use RequisitionStatus as S;

    let next: &[RequisitionStatus] = match role {
        Role::Admin | Role::Superadmin => return S::ALL.into_iter().collect(),
        Role::Warehouse => match current {
            S::PendingWarehouseReview => &[
                S::WarehouseApproved,
                S::WarehouseFulfilled,
                S::WarehouseRejected,
            ],
            S::Purchased => &[S::PartiallyReceived, S::FullyReceived],
            S::PartiallyReceived => &[S::FullyReceived],
            _ => return BTreeSet::new(),
        },
        Role::Purchasing => match current {
            S::WarehouseApproved => &[S::PendingQuote, S::PurchasingRejected],
            S::PendingQuote => &[S::PurchasingApproved, S::PurchasingRejected, S::Cancelled],
            S::PurchasingApproved => &[S::Purchased, S::Cancelled],
            S::Purchased | S::PartiallyReceived | S::FullyReceived => &[S::Closed],
            _ => return BTreeSet::new(),
        },
        Role::Requester => return BTreeSet::new(),
    };

    std::iter::once(current).chain(next.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequisitionStatus as S;

    fn set(items: &[RequisitionStatus]) -> BTreeSet<RequisitionStatus> {
        items.iter().copied().collect()
    }

    fn expected(role: Role, current: RequisitionStatus) -> BTreeSet<RequisitionStatus> {
        match (role, current) {
            (Role::Admin | Role::Superadmin, _) => S::ALL.into_iter().collect(),
            (Role::Warehouse, S::PendingWarehouseReview) => set(&[
                current,
                S::WarehouseApproved,
                S::WarehouseFulfilled,
                S::WarehouseRejected,
            ]),
            (Role::Warehouse, S::Purchased) => {
                set(&[current, S::PartiallyReceived, S::FullyReceived])
            }
            (Role::Warehouse, S::PartiallyReceived) => set(&[current, S::FullyReceived]),
            (Role::Purchasing, S::WarehouseApproved) => {
                set(&[current, S::PendingQuote, S::PurchasingRejected])
            }
            (Role::Purchasing, S::PendingQuote) => set(&[
                current,
                S::PurchasingApproved,
                S::PurchasingRejected,
                S::Cancelled,
            ]),
            (Role::Purchasing, S::PurchasingApproved) => {
                set(&[current, S::Purchased, S::Cancelled])
            }
            (Role::Purchasing, S::Purchased | S::PartiallyReceived | S::FullyReceived) => {
                set(&[current, S::Closed])
            }
            _ => BTreeSet::new(),
        }
    }

    #[test]
    fn test_table_matches_for_every_role_and_status() {
        for role in Role::ALL {
            for current in S::ALL {
                assert_eq!(
                    allowed_transitions(role, current),
                    expected(role, current),
                    "role {role} from {current}"
                );
            }
        }
    }

    #[test]
    fn test_view_only_states() {
        for current in [
            S::WarehouseApproved,
            S::WarehouseFulfilled,
            S::WarehouseRejected,
            S::FullyReceived,
            S::Closed,
            S::Cancelled,
        ] {
            assert!(allowed_transitions(Role::Warehouse, current).is_empty());
        }
        for current in [S::PurchasingRejected, S::Cancelled, S::Closed] {
            assert!(allowed_transitions(Role::Purchasing, current).is_empty());
        }
        for current in S::ALL {
            assert!(allowed_transitions(Role::Requester, current).is_empty());
        }
    }

    #[test]
    fn test_purchasing_cannot_cancel_after_purchase() {
        let allowed = allowed_transitions(Role::Purchasing, S::Purchased);
        assert!(!allowed.contains(&S::Cancelled));
        assert!(allowed.contains(&S::Closed));
    }

    #[test]
    fn test_status_keys_round_trip() {
        for status in S::ALL {
            assert_eq!(status.as_str().parse::<S>().unwrap(), status);
        }
        assert!("Pendiente".parse::<S>().is_err());
    }

    #[test]
    fn test_exactly_one_initial_status() {
        assert_eq!(S::ALL.iter().filter(|s| s.is_initial()).count(), 1);
        assert!(S::INITIAL.is_initial());
    }

    #[test]
    fn test_terminal_set() {
        for status in S::ALL {
            assert_eq!(status.is_terminal(), S::TERMINAL.contains(&status));
        }
    }
}
