//! Canonical cart line shape and boundary normalization.
//!
//! Historic clients persisted cart lines in several loosely-typed
//! shapes: `qty` for `quantity`, the food id sometimes at the top
//! level, sometimes only inside the snapshot, sometimes only as the
//! line's own `id`. [`RawCartLine`] accepts all of them and
//! [`normalize_lines`] converts once, where data enters the system, so
//! everything above this module only ever sees [`CartLine`].

use gobi_eats_core::{CartLineId, FoodId, Price};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Minimum quantity of any cart line.
pub const MIN_QUANTITY: u32 = 1;

/// Denormalized catalog snapshot embedded in a cart line for display.
///
/// May go stale relative to the catalog; the backend re-prices at
/// order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSnapshot {
    pub id: FoodId,
    pub food_name: String,
    pub price: Price,
    pub image: String,
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Present only once persisted server-side; `None` marks a
    /// local-only, unsynced line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CartLineId>,
    pub food_id: FoodId,
    pub quantity: u32,
    /// Variant discriminator; part of the line identity.
    #[serde(default)]
    pub selected_size: Option<String>,
    pub food: FoodSnapshot,
}

impl CartLine {
    /// Two lines are the same cart entry when food and size both match.
    #[must_use]
    pub fn same_entry(&self, other: &Self) -> bool {
        self.food_id == other.food_id && self.selected_size == other.selected_size
    }

    /// Matching rule for mutations: by server id when both sides carry
    /// one, otherwise by `(food_id, selected_size)`.
    #[must_use]
    pub fn matches(&self, target: &Self) -> bool {
        match (&self.id, &target.id) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => self.same_entry(target),
        }
    }

    /// Price of this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.food.price.times(self.quantity)
    }

    /// Convert a loosely-shaped line into the canonical shape.
    ///
    /// The food id resolves through the historic fallback chain
    /// (snapshot id, then top-level food id, then the line id itself);
    /// returns `None` when the chain comes up empty.
    #[must_use]
    pub fn from_raw(raw: RawCartLine) -> Option<Self> {
        let RawCartLine {
            id,
            food_id,
            quantity,
            selected_size,
            food,
        } = raw;

        let food = food.unwrap_or_default();
        let food_id = food
            .id
            .clone()
            .or(food_id)
            .or_else(|| id.clone())
            .map(FoodId::new)?;

        let quantity = quantity.map_or(MIN_QUANTITY, |q| q.max(MIN_QUANTITY));

        Some(Self {
            id: id.map(CartLineId::new),
            food_id: food_id.clone(),
            quantity,
            selected_size,
            food: FoodSnapshot {
                id: food_id,
                food_name: food.food_name.unwrap_or_default(),
                price: food.price.unwrap_or(Price::ZERO),
                image: food.image.unwrap_or_default(),
            },
        })
    }
}

/// A cart line as found on the wire or in old persisted carts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartLine {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub food_id: Option<String>,
    #[serde(default, alias = "qty")]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub selected_size: Option<String>,
    #[serde(default)]
    pub food: Option<RawFoodSnapshot>,
}

/// Loosely-typed food snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFoodSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Merge `line` into `lines`: an existing line for the same food and
/// size absorbs the quantity, otherwise the line is appended. Keeps
/// the one-line-per-`(food_id, selected_size)` invariant.
pub fn merge_line(lines: &mut Vec<CartLine>, line: CartLine) {
    if let Some(existing) = lines.iter_mut().find(|l| l.same_entry(&line)) {
        existing.quantity = existing.quantity.saturating_add(line.quantity);
    } else {
        lines.push(line);
    }
}

/// Normalize a batch of raw lines, dropping unresolvable ones and
/// merging duplicates on the way in.
#[must_use]
pub fn normalize_lines(raw: Vec<RawCartLine>) -> Vec<CartLine> {
    let mut lines = Vec::with_capacity(raw.len());
    for raw_line in raw {
        match CartLine::from_raw(raw_line) {
            Some(line) => merge_line(&mut lines, line),
            None => warn!("dropping cart line with no resolvable food id"),
        }
    }
    lines
}

/// Clamp a requested quantity to the permitted floor.
#[must_use]
pub fn clamp_quantity(requested: i64) -> u32 {
    u32::try_from(requested.max(i64::from(MIN_QUANTITY))).unwrap_or(u32::MAX)
}
