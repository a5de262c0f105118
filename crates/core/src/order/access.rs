//! Who may see and move which orders.

use grocer_shared::Role;
use uuid::Uuid;

use super::status::OrderStatus;

/// The authenticated caller acting on orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderActor {
    /// Caller's user id.
    pub user_id: Uuid,
    /// Caller's role.
    pub role: Role,
    /// Franchise the caller works for, if any.
    pub franchise_id: Option<Uuid>,
}

/// Rows an order listing is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Every order, optionally narrowed to one franchise.
    All {
        /// Optional franchise filter.
        franchise_id: Option<Uuid>,
    },
    /// Orders placed by one customer.
    Customer(Uuid),
    /// Orders routed to one franchise.
    Franchise(Uuid),
    /// Franchise role without a franchise; sees nothing.
    Nothing,
}

impl OrderActor {
    /// Returns true if the caller may read an order.
    #[must_use]
    pub fn can_view(&self, owner_id: Uuid, franchise_id: Option<Uuid>) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Customer => owner_id == self.user_id,
            Role::FranchiseStaff | Role::FranchiseOwner => {
                franchise_id.is_some() && franchise_id == self.franchise_id
            }
        }
    }

    /// Returns true if the caller may request `current -> target`.
    ///
    /// Customers may only cancel their own pending orders. Whether the
    /// transition itself is legal is checked separately.
    #[must_use]
    pub fn can_set_status(
        &self,
        owner_id: Uuid,
        franchise_id: Option<Uuid>,
        current: OrderStatus,
        target: OrderStatus,
    ) -> bool {
        match self.role {
            Role::Customer => {
                owner_id == self.user_id
                    && current == OrderStatus::Pending
                    && target == OrderStatus::Cancelled
            }
            _ => self.can_view(owner_id, franchise_id),
        }
    }

    /// Listing scope; `requested_franchise` only narrows an admin's view.
    #[must_use]
    pub fn list_scope(&self, requested_franchise: Option<Uuid>) -> OrderScope {
        match (self.role, self.franchise_id) {
            (Role::Admin, _) => OrderScope::All {
                franchise_id: requested_franchise,
            },
            (Role::Customer, _) => OrderScope::Customer(self.user_id),
            (_, Some(franchise)) => OrderScope::Franchise(franchise),
            (_, None) => OrderScope::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn actor(role: Role, franchise_id: Option<Uuid>) -> OrderActor {
        OrderActor {
            user_id: Uuid::new_v4(),
            role,
            franchise_id,
        }
    }

    #[test]
    fn test_customer_sees_only_own_orders() {
        let customer = actor(Role::Customer, None);
        assert!(customer.can_view(customer.user_id, Some(Uuid::new_v4())));
        assert!(!customer.can_view(Uuid::new_v4(), None));
        assert_eq!(customer.list_scope(Some(Uuid::new_v4())), OrderScope::Customer(customer.user_id));
    }

    #[test]
    fn test_staff_scoped_to_franchise() {
        let franchise = Uuid::new_v4();
        let staff = actor(Role::FranchiseStaff, Some(franchise));
        assert!(staff.can_view(Uuid::new_v4(), Some(franchise)));
        assert!(!staff.can_view(Uuid::new_v4(), Some(Uuid::new_v4())));
        assert!(!staff.can_view(Uuid::new_v4(), None));
        assert_eq!(staff.list_scope(None), OrderScope::Franchise(franchise));
        assert_eq!(actor(Role::FranchiseOwner, None).list_scope(None), OrderScope::Nothing);
    }

    #[test]
    fn test_admin_filter_passes_through() {
        let admin = actor(Role::Admin, None);
        let franchise = Uuid::new_v4();
        assert!(admin.can_view(Uuid::new_v4(), None));
        assert_eq!(
            admin.list_scope(Some(franchise)),
            OrderScope::All {
                franchise_id: Some(franchise)
            }
        );
    }

    #[rstest]
    #[case(OrderStatus::Pending, OrderStatus::Cancelled, true)]
    #[case(OrderStatus::Pending, OrderStatus::Confirmed, false)]
    #[case(OrderStatus::Confirmed, OrderStatus::Cancelled, false)]
    fn test_customer_status_changes(
        #[case] current: OrderStatus,
        #[case] target: OrderStatus,
        #[case] allowed: bool,
    ) {
        let customer = actor(Role::Customer, None);
        assert_eq!(
            customer.can_set_status(customer.user_id, None, current, target),
            allowed
        );
        assert!(!customer.can_set_status(Uuid::new_v4(), None, OrderStatus::Pending, OrderStatus::Cancelled));
    }

    #[test]
    fn test_owner_moves_franchise_orders() {
        let franchise = Uuid::new_v4();
        let owner = actor(Role::FranchiseOwner, Some(franchise));
        assert!(owner.can_set_status(
            Uuid::new_v4(),
            Some(franchise),
            OrderStatus::Confirmed,
            OrderStatus::Preparing
        ));
        assert!(!owner.can_set_status(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            OrderStatus::Confirmed,
            OrderStatus::Preparing
        ));
    }
}
