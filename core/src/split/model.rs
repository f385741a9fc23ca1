use crate::error::{CoreError, CoreResult};
use crate::receipt::model::Item;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SplitTotals {
    pub total_a: f64,
    pub total_b: f64,
    pub grand_total: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ItemShare {
    pub payer_a: f64,
    pub payer_b: f64,
}

/// One line of the itemized bill as the presentation layer renders it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitRow {
    pub item_id: String,
    pub name: String,
    pub total_price: f64,
    pub payer_a: f64,
    pub payer_b: f64,
    pub remarks: String,
}

/// Items of one session plus the portion of each item assigned to payer B.
///
/// Allocations are keyed by item id and always hold a value for every item;
/// payer A implicitly receives the remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitState {
    items: Arc<[Item]>,
    allocation_to_b: HashMap<String, f64>,
}

impl SplitState {
    pub fn initialize(items: Vec<Item>) -> Self {
        let allocation_to_b = items
            .iter()
            .map(|item| (item.id().to_string(), 0.0))
            .collect();
        Self {
            items: items.into(),
            allocation_to_b,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: &str) -> CoreResult<&Item> {
        self.items
            .iter()
            .find(|item| item.id() == item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))
    }

    pub fn allocation(&self, item_id: &str) -> CoreResult<f64> {
        self.allocation_to_b
            .get(item_id)
            .copied()
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))
    }

    /// Assign `value` of the item's price to payer B, clamped into
    /// `[0, total_price]`. Returns the stored value.
    pub fn set_allocation(&mut self, item_id: &str, value: f64) -> CoreResult<f64> {
        let upper = self.item(item_id)?.allocatable();
        let stored = clamp_allocation(value, upper);
        // item() succeeded, so the entry exists
        if let Some(slot) = self.allocation_to_b.get_mut(item_id) {
            *slot = stored;
        }
        Ok(stored)
    }

    pub fn reset_allocations(&mut self) {
        for v in self.allocation_to_b.values_mut() {
            *v = 0.0;
        }
    }

    pub fn item_share(&self, item_id: &str) -> CoreResult<ItemShare> {
        let item = self.item(item_id)?;
        let payer_b = self.allocation(item_id)?;
        Ok(ItemShare {
            payer_a: item.total_price() - payer_b,
            payer_b,
        })
    }

    pub fn totals(&self) -> SplitTotals {
        let mut grand_total = 0.0;
        let mut total_b = 0.0;
        for item in self.items.iter() {
            grand_total += item.total_price();
            total_b += self.allocation_to_b.get(item.id()).copied().unwrap_or(0.0);
        }
        SplitTotals {
            total_a: grand_total - total_b,
            total_b,
            grand_total,
        }
    }

    pub fn rows(&self) -> Vec<SplitRow> {
        self.items
            .iter()
            .map(|item| {
                let payer_b = self.allocation_to_b.get(item.id()).copied().unwrap_or(0.0);
                SplitRow {
                    item_id: item.id().to_string(),
                    name: item.name().to_string(),
                    total_price: item.total_price(),
                    payer_a: item.total_price() - payer_b,
                    payer_b,
                    remarks: item.remarks().to_string(),
                }
            })
            .collect()
    }
}

fn clamp_allocation(value: f64, upper: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.max(0.0).min(upper)
}
