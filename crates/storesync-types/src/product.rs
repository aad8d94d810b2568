//! The validated catalog record fetched from the source system.

use serde::{Deserialize, Serialize};

/// One catalog entry as delivered by the source system.
///
/// Parsed once at admission and kept typed through the queue and the
/// processor; the destination writer consumes it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// External product code; stable identity across queue and destination.
    pub natural_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Storefront-facing name, preferred over `display_name` for titles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductRecord {
    /// Minimal record carrying only the natural key.
    ///
    /// Used as a fallback when a stored payload can no longer be decoded.
    #[must_use]
    pub fn bare(natural_key: impl Into<String>) -> Self {
        Self {
            natural_key: natural_key.into(),
            display_name: None,
            web_name: None,
            price: None,
            discount_price: None,
            stock: None,
            description: None,
            long_description: None,
            image_url: None,
        }
    }

    /// Title for the destination content row: web name, then display
    /// name, then the natural key.
    #[must_use]
    pub fn title(&self) -> &str {
        self.web_name
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or(&self.natural_key)
    }

    /// Name recorded alongside the queue row for operator display.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.web_name.as_deref())
            .unwrap_or("(unnamed)")
    }

    /// The price actually persisted to the destination.
    ///
    /// A discount applies only when strictly below the regular price;
    /// otherwise the regular price wins and the discount is ignored.
    #[must_use]
    pub fn effective_price(&self) -> Option<f64> {
        match (self.price, self.discount_price) {
            (Some(regular), Some(discount)) if discount < regular => Some(discount),
            (Some(regular), _) => Some(regular),
            (None, discount) => discount,
        }
    }

    /// Whether the discount should be written as a separate sale price.
    #[must_use]
    pub fn discount_applies(&self) -> bool {
        matches!(
            (self.price, self.discount_price),
            (Some(regular), Some(discount)) if discount < regular
        )
    }

    /// Availability flag derived from the stock quantity.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.unwrap_or(0) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(price: Option<f64>, discount: Option<f64>) -> ProductRecord {
        let mut r = ProductRecord::bare("A1");
        r.price = price;
        r.discount_price = discount;
        r
    }

    #[test]
    fn effective_price_uses_discount_when_lower() {
        assert_eq!(record(Some(10.0), Some(8.0)).effective_price(), Some(8.0));
    }

    #[test]
    fn effective_price_ignores_discount_when_higher() {
        assert_eq!(record(Some(10.0), Some(12.0)).effective_price(), Some(10.0));
    }

    #[test]
    fn effective_price_ignores_discount_when_equal() {
        assert_eq!(record(Some(10.0), Some(10.0)).effective_price(), Some(10.0));
        assert!(!record(Some(10.0), Some(10.0)).discount_applies());
    }

    #[test]
    fn effective_price_without_discount() {
        assert_eq!(record(Some(10.0), None).effective_price(), Some(10.0));
        assert_eq!(record(None, None).effective_price(), None);
    }

    #[test]
    fn title_prefers_web_name() {
        let mut r = ProductRecord::bare("SKU-1");
        assert_eq!(r.title(), "SKU-1");
        r.display_name = Some("Plain".into());
        assert_eq!(r.title(), "Plain");
        r.web_name = Some("Fancy".into());
        assert_eq!(r.title(), "Fancy");
    }

    #[test]
    fn in_stock_from_quantity() {
        let mut r = ProductRecord::bare("A1");
        assert!(!r.in_stock());
        r.stock = Some(0);
        assert!(!r.in_stock());
        r.stock = Some(5);
        assert!(r.in_stock());
    }

    #[test]
    fn serde_defaults_optional_fields() {
        let r: ProductRecord = serde_json::from_str(r#"{"natural_key":"A1"}"#).unwrap();
        assert_eq!(r.natural_key, "A1");
        assert!(r.price.is_none());
        assert!(r.stock.is_none());
    }
}
