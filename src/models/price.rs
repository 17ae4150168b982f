use serde::{Deserialize, Serialize};

use super::detection::identity_key;

/// One entry of a price lookup response.
///
/// `price` stays `None` when the collaborator did not return a usable
/// number; that means "unknown", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub name: String,
    pub set_id: String,
    #[serde(default)]
    pub price: Option<f64>,
}

impl PriceQuote {
    pub fn new(name: impl Into<String>, set_id: impl Into<String>, price: Option<f64>) -> Self {
        Self {
            name: name.into(),
            set_id: set_id.into(),
            price,
        }
    }

    pub fn identity_key(&self) -> String {
        identity_key(&self.name, &self.set_id)
    }

    /// The price if it is a finite, non-negative amount.
    pub fn known_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite() && *p >= 0.0)
    }
}
