use serde::Serialize;
use sqlx::FromRow;

// ============================================================================
// Gift Models (White Elephant entries)
// ============================================================================

/// The columns of a gift entry the exchange needs to draw turns.
#[derive(Debug, Clone, FromRow)]
pub struct Gift {
    pub id: String,
    pub user_id: String,
    pub name: String,
}

/// A single committed turn-order slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnSlot {
    pub gift_id: String,
    pub user_id: String,
    pub gift_name: String,
    pub turn_order: i64,
}
