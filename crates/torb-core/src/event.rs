// Event domain types
//
// EventRecord is what the store persists. EventView is the resolved,
// derived projection: counts and seat states are computed from live
// reservations and never stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::sheet::Rank;

/// Persisted event row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub public: bool,
    pub closed: bool,
    /// Base price; each rank adds its own delta
    pub price: i64,
}

/// Input for creating an event
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub public: bool,
    pub price: i64,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// One seat as seen by a viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SheetView {
    pub num: i64,
    /// Reserved by the viewing user
    #[serde(default, skip_serializing_if = "is_false")]
    pub mine: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reserved: bool,
    /// Unix seconds of the active reservation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<i64>,
}

/// Totals for one rank of an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SheetsView {
    pub total: i64,
    pub remains: i64,
    /// Event base price plus the rank delta
    pub price: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<SheetView>,
}

/// Resolved event with derived availability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct EventView {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub public: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub closed: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub price: i64,
    pub total: i64,
    pub remains: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub sheets: BTreeMap<Rank, SheetsView>,
}

impl EventView {
    /// Projection for public listings: price and flags stripped
    pub fn sanitized(mut self) -> Self {
        self.price = 0;
        self.public = false;
        self.closed = false;
        self
    }

    /// Drop per-seat detail, keeping per-rank totals
    pub fn without_detail(mut self) -> Self {
        for group in self.sheets.values_mut() {
            group.detail.clear();
        }
        self
    }

    /// Bare event header embedded in reservation history
    pub fn snapshot(mut self) -> Self {
        self.sheets.clear();
        self.total = 0;
        self.remains = 0;
        self
    }

    /// Price of a seat of the given rank, if the event has that rank
    pub fn rank_price(&self, rank: Rank) -> Option<i64> {
        self.sheets.get(&rank).map(|g| g.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> EventView {
        let mut sheets = BTreeMap::new();
        sheets.insert(
            Rank::S,
            SheetsView {
                total: 2,
                remains: 1,
                price: 6000,
                detail: vec![
                    SheetView { num: 1, mine: true, reserved: true, reserved_at: Some(10) },
                    SheetView { num: 2, mine: false, reserved: false, reserved_at: None },
                ],
            },
        );
        EventView {
            id: 7,
            title: "concert".to_string(),
            public: true,
            closed: false,
            price: 1000,
            total: 2,
            remains: 1,
            sheets,
        }
    }

    #[test]
    fn test_sanitized_omits_price_and_flags() {
        let value = serde_json::to_value(view().sanitized()).unwrap();
        assert!(value.get("price").is_none());
        assert!(value.get("public").is_none());
        assert!(value.get("closed").is_none());
        assert_eq!(value["remains"], json!(1));
        assert_eq!(value["sheets"]["S"]["price"], json!(6000));
    }

    #[test]
    fn test_seat_detail_serialization() {
        let value = serde_json::to_value(view()).unwrap();
        let detail = &value["sheets"]["S"]["detail"];
        assert_eq!(detail[0], json!({"num": 1, "mine": true, "reserved": true, "reserved_at": 10}));
        assert_eq!(detail[1], json!({"num": 2}));
    }

    #[test]
    fn test_without_detail_and_snapshot() {
        let bare = view().without_detail();
        assert!(bare.sheets[&Rank::S].detail.is_empty());
        assert_eq!(bare.sheets[&Rank::S].remains, 1);

        let snap = view().snapshot();
        assert!(snap.sheets.is_empty());
        assert_eq!(snap.total, 0);
        assert_eq!(snap.price, 1000);
        assert_eq!(view().rank_price(Rank::S), Some(6000));
        assert_eq!(view().rank_price(Rank::A), None);
    }
}
