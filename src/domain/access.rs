use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::{Actor, RequisitionStatus, UserId};

/// What an actor may do with one requisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequisitionAccess {
    pub can_edit: bool,
    pub can_delete: bool,
    pub within_edit_window: bool,
}

/// Edit/delete permission for `actor` on a requisition.
///
/// `created_at` and `now` are both UTC without offset. The creator keeps
/// edit and delete rights while the requisition is still in its initial
/// status and `now <= created_at + edit_window`; admins always have them.
/// Requisitions without a creator row can only be changed by admins.
#[must_use]
pub fn requisition_access(
    creator_id: Option<UserId>,
    status: RequisitionStatus,
    created_at: NaiveDateTime,
    actor: &Actor,
    now: NaiveDateTime,
    edit_window: Duration,
) -> RequisitionAccess {
    let within_edit_window = now <= created_at + edit_window;
    let is_owner = creator_id.is_some_and(|id| actor.is_user(id));
    let owner_may_change = is_owner && status.is_initial() && within_edit_window;
    let allowed = owner_may_change || actor.role.is_admin();

    RequisitionAccess {
        can_edit: allowed,
        can_delete: allowed,
        within_edit_window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use chrono::NaiveDate;

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn creator() -> Actor {
        Actor::new(Some(UserId::new(7)), "ana", Role::Requester)
    }

    fn window() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn test_creator_inside_window() {
        let at_limit = created() + Duration::minutes(30);
        let access = requisition_access(
            Some(UserId::new(7)),
            RequisitionStatus::INITIAL,
            created(),
            &creator(),
            at_limit,
            window(),
        );
        assert!(access.can_edit);
        assert!(access.can_delete);
        assert!(access.within_edit_window);
    }

    #[test]
    fn test_creator_after_window() {
        let late = created() + Duration::minutes(31);
        let access = requisition_access(
            Some(UserId::new(7)),
            RequisitionStatus::INITIAL,
            created(),
            &creator(),
            late,
            window(),
        );
        assert!(!access.can_edit);
        assert!(!access.can_delete);
        assert!(!access.within_edit_window);
    }

    #[test]
    fn test_creator_after_status_change() {
        let access = requisition_access(
            Some(UserId::new(7)),
            RequisitionStatus::WarehouseApproved,
            created(),
            &creator(),
            created() + Duration::minutes(1),
            window(),
        );
        assert!(!access.can_edit);
        assert!(access.within_edit_window);
    }

    #[test]
    fn test_owner_needs_initial_status_and_window() {
        let access = requisition_access(
            Some(UserId::new(7)),
            RequisitionStatus::WarehouseApproved,
            created(),
            &creator(),
            created() + Duration::minutes(31),
            window(),
        );
        assert!(!access.can_edit);
        assert!(!access.within_edit_window);

        let admin_creator = Actor::new(Some(UserId::new(7)), "ana", Role::Admin);
        let access = requisition_access(
            Some(UserId::new(7)),
            RequisitionStatus::WarehouseApproved,
            created(),
            &admin_creator,
            created() + Duration::minutes(31),
            window(),
        );
        assert!(access.can_edit);
    }

    #[test]
    fn test_other_user_cannot_edit() {
        let other = Actor::new(Some(UserId::new(8)), "luis", Role::Warehouse);
        let access = requisition_access(
            Some(UserId::new(7)),
            RequisitionStatus::INITIAL,
            created(),
            &other,
            created(),
            window(),
        );
        assert!(!access.can_edit);
        assert!(!access.can_delete);
    }

    #[test]
    fn test_missing_creator_is_admin_only() {
        let access = requisition_access(
            None,
            RequisitionStatus::INITIAL,
            created(),
            &creator(),
            created(),
            window(),
        );
        assert!(!access.can_edit);
        assert!(access.within_edit_window);
    }

    #[test]
    fn test_admin_always_allowed() {
        for role in [Role::Admin, Role::Superadmin] {
            let admin = Actor::new(None, "root", role);
            for status in RequisitionStatus::ALL {
                let access = requisition_access(
                    Some(UserId::new(7)),
                    status,
                    created(),
                    &admin,
                    created() + Duration::days(400),
                    window(),
                );
                assert!(access.can_edit);
                assert!(access.can_delete);
            }
        }
    }
}
