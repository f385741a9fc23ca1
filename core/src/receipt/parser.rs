use super::model::{Item, ShopGroup};
use crate::error::{CoreError, CoreResult};
use crate::ids::disambiguated_item_id;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum ParseStatus {
    Parsed,
    /// Payload decoded but carried no items.
    NoItems,
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParseOutcome {
    pub items: Vec<Item>,
    pub shop_names: Vec<String>,
    /// Items kept for the grand total whose price is zero or negative.
    pub non_positive_price_ids: Vec<String>,
    pub status: ParseStatus,
}

impl ParseOutcome {
    fn malformed(reason: String) -> Self {
        Self {
            items: Vec::new(),
            shop_names: Vec::new(),
            non_positive_price_ids: Vec::new(),
            status: ParseStatus::Malformed(reason),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.status, ParseStatus::Malformed(_))
    }

    pub fn into_result(self) -> CoreResult<Vec<Item>> {
        match self.status {
            ParseStatus::Malformed(reason) => Err(CoreError::MalformedPayload(reason)),
            _ => Ok(self.items),
        }
    }
}

/// Flatten an analysis payload (array of shop groups) into one ordered item list.
///
/// Never fails: a payload that does not decode yields an empty list with
/// `ParseStatus::Malformed`.
pub fn parse_items(raw: &str) -> ParseOutcome {
    let groups: Vec<ShopGroup> = match serde_json::from_str(raw) {
        Ok(g) => g,
        Err(e) => return ParseOutcome::malformed(e.to_string()),
    };

    let mut items = Vec::new();
    let mut shop_names = Vec::with_capacity(groups.len());
    let mut non_positive_price_ids = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (shop_index, group) in groups.into_iter().enumerate() {
        shop_names.push(group.shop_name);
        for (position, rec) in group.items.into_iter().enumerate() {
            let id = if seen_ids.contains(&rec.id) {
                let base = disambiguated_item_id(&rec.id, shop_index, position);
                let mut candidate = base.clone();
                let mut n = 1;
                while seen_ids.contains(&candidate) {
                    candidate = format!("{}-{}", base, n);
                    n += 1;
                }
                candidate
            } else {
                rec.id.clone()
            };
            seen_ids.insert(id.clone());

            let name = if rec.name.trim().is_empty() {
                format!("item {}", rec.id)
            } else {
                rec.name
            };

            if rec.total_price <= 0.0 {
                non_positive_price_ids.push(id.clone());
            }

            items.push(Item::new(
                id,
                name,
                rec.total_price,
                rec.price,
                rec.buyer_flag,
                rec.remarks,
            ));
        }
    }

    let status = if items.is_empty() {
        ParseStatus::NoItems
    } else {
        ParseStatus::Parsed
    };

    ParseOutcome {
        items,
        shop_names,
        non_positive_price_ids,
        status,
    }
}
