use common::UserId;
use domain::{Order, OrderStatus};

/// Filter for order listings.
///
/// Soft-deleted orders are excluded unless `include_deleted` is set. Results
/// are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Only orders owned by this user.
    pub user_id: Option<UserId>,

    /// Only orders in this status.
    pub status: Option<OrderStatus>,

    /// Also return soft-deleted orders.
    pub include_deleted: bool,
}

impl OrderQuery {
    /// Creates a query over every visible order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for one user's visible orders.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by status when one is given.
    pub fn maybe_status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    /// Includes soft-deleted orders.
    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Returns true if `order` satisfies this query.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(user_id) = self.user_id
            && order.user_id() != user_id
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status() != status
        {
            return false;
        }
        self.include_deleted || !order.is_deleted()
    }
}
