// Seat ("sheet") domain types
//
// Seats are seeded once and never created or deleted at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::TorbError;

/// Seat tier. Variant order matches the store's text ordering of rank names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum Rank {
    A,
    B,
    C,
    S,
}

impl Rank {
    pub const ALL: [Rank; 4] = [Rank::A, Rank::B, Rank::C, Rank::S];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::S => "S",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = TorbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Rank::A),
            "B" => Ok(Rank::B),
            "C" => Ok(Rank::C),
            "S" => Ok(Rank::S),
            _ => Err(TorbError::InvalidRank),
        }
    }
}

/// A single numbered seat within a rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub id: i64,
    pub rank: Rank,
    pub num: i64,
    /// Price delta added to the event's base price
    pub price: i64,
}

impl Sheet {
    /// Sort key giving the deterministic (rank, number) order
    pub fn order_key(&self) -> (Rank, i64) {
        (self.rank, self.num)
    }
}

/// Seat count and price delta of one rank in the standard seating plan
#[derive(Debug, Clone, Copy)]
pub struct RankLayout {
    pub rank: Rank,
    pub count: i64,
    pub price: i64,
}

/// The standard venue: 1000 seats across four ranks
pub const STANDARD_LAYOUT: [RankLayout; 4] = [
    RankLayout { rank: Rank::S, count: 50, price: 5000 },
    RankLayout { rank: Rank::A, count: 150, price: 3000 },
    RankLayout { rank: Rank::B, count: 300, price: 1000 },
    RankLayout { rank: Rank::C, count: 500, price: 0 },
];

/// Expand a layout into seats with sequential ids, in layout order
pub fn seed_sheets(layout: &[RankLayout]) -> Vec<Sheet> {
    let mut sheets = Vec::new();
    let mut id = 0;
    for tier in layout {
        for num in 1..=tier.count {
            id += 1;
            sheets.push(Sheet {
                id,
                rank: tier.rank,
                num,
                price: tier.price,
            });
        }
    }
    sheets
}
