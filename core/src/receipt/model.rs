use serde::{Deserialize, Serialize};

/// One purchased line as returned by the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    pub total_price: f64,
    pub price: f64,
    #[serde(rename = "buyer_f")]
    pub buyer_flag: i64,
    #[serde(default)]
    pub remarks: String,
}

/// One receipt's worth of items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopGroup {
    pub shop_name: String,
    #[serde(rename = "item_info")]
    pub items: Vec<ItemRecord>,
}

/// Normalized item of a split session. The price is fixed at construction;
/// only its allocation between payers changes afterwards.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Item {
    id: String,
    name: String,
    total_price: f64,
    price: f64,
    buyer_flag: i64,
    remarks: String,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        total_price: f64,
        price: f64,
        buyer_flag: i64,
        remarks: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_price,
            price,
            buyer_flag,
            remarks: remarks.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn buyer_flag(&self) -> i64 {
        self.buyer_flag
    }

    pub fn remarks(&self) -> &str {
        &self.remarks
    }

    pub fn has_remarks(&self) -> bool {
        !self.remarks.is_empty()
    }

    /// Upper bound for the payer B allocation of this item.
    pub fn allocatable(&self) -> f64 {
        self.total_price.max(0.0)
    }

    /// Label shortened to `max_chars` characters, ending in an ellipsis when cut.
    pub fn display_name(&self, max_chars: usize) -> String {
        if self.name.chars().count() <= max_chars {
            return self.name.clone();
        }
        let keep = max_chars.saturating_sub(1);
        let mut out: String = self.name.chars().take(keep).collect();
        out.push('…');
        out
    }
}
