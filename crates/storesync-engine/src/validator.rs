//! Pre-admission validation of catalog records.
//!
//! Invalid records never reach the queue; each rejection carries every
//! reason found so operators see the full picture in one ledger row.

use storesync_types::ProductRecord;

/// Longest accepted natural key.
pub const MAX_KEY_LEN: usize = 100;
/// Longest accepted display or web name.
pub const MAX_NAME_LEN: usize = 200;

/// A record that failed validation, with every reason found.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub record: ProductRecord,
    pub reasons: Vec<String>,
}

/// Outcome of validating a fetched batch.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub valid: Vec<ProductRecord>,
    pub invalid: Vec<Rejection>,
}

/// Check one record; an empty vec means it is admissible.
#[must_use]
pub fn validate(record: &ProductRecord) -> Vec<String> {
    let mut reasons = Vec::new();

    let key = record.natural_key.trim();
    if key.is_empty() {
        reasons.push("natural key is required".to_string());
    } else if key.chars().count() > MAX_KEY_LEN {
        reasons.push(format!("natural key exceeds {MAX_KEY_LEN} characters"));
    }

    let has_name = record
        .display_name
        .as_deref()
        .or(record.web_name.as_deref())
        .is_some_and(|n| !n.trim().is_empty());
    if !has_name {
        reasons.push("a display name is required".to_string());
    }

    for name in [record.display_name.as_deref(), record.web_name.as_deref()]
        .into_iter()
        .flatten()
    {
        if name.chars().count() > MAX_NAME_LEN {
            reasons.push(format!("name exceeds {MAX_NAME_LEN} characters"));
            break;
        }
    }

    if let Some(price) = record.price {
        if !price.is_finite() || price < 0.0 {
            reasons.push("price must be a non-negative number".to_string());
        }
    }

    if let Some(stock) = record.stock {
        if stock < 0 {
            reasons.push("stock must be a non-negative number".to_string());
        }
    }

    if let Some(discount) = record.discount_price {
        if !discount.is_finite() || discount < 0.0 {
            reasons.push("discount price must be a non-negative number".to_string());
        } else if let Some(price) = record.price {
            if discount > price {
                reasons.push("discount price exceeds regular price".to_string());
            }
        }
    }

    reasons
}

/// Partition a fetched batch into admissible and rejected records.
#[must_use]
pub fn validate_batch(records: Vec<ProductRecord>) -> Partition {
    let mut partition = Partition::default();
    for record in records {
        let reasons = validate(&record);
        if reasons.is_empty() {
            partition.valid.push(record);
        } else {
            partition.invalid.push(Rejection { record, reasons });
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(key: &str) -> ProductRecord {
        let mut r = ProductRecord::bare(key);
        r.display_name = Some("Widget".into());
        r
    }

    #[test]
    fn valid_record_passes() {
        let mut r = named("A1");
        r.price = Some(10.0);
        r.discount_price = Some(8.0);
        r.stock = Some(3);
        assert!(validate(&r).is_empty());
    }

    #[test]
    fn empty_key_rejected() {
        let r = named("   ");
        assert_eq!(validate(&r), vec!["natural key is required"]);
    }

    #[test]
    fn overlong_key_rejected() {
        let r = named(&"x".repeat(MAX_KEY_LEN + 1));
        assert!(!validate(&r).is_empty());
    }

    #[test]
    fn key_at_limit_accepted() {
        let r = named(&"x".repeat(MAX_KEY_LEN));
        assert!(validate(&r).is_empty());
    }

    #[test]
    fn display_name_required() {
        let bare = ProductRecord::bare("A1");
        assert_eq!(validate(&bare), vec!["a display name is required"]);

        // A description alone does not satisfy the name rule.
        let mut with_desc = ProductRecord::bare("A1");
        with_desc.description = Some("a useful widget".into());
        assert_eq!(validate(&with_desc), vec!["a display name is required"]);

        let mut with_web = ProductRecord::bare("A1");
        with_web.web_name = Some("Widget".into());
        assert!(validate(&with_web).is_empty());
    }

    #[test]
    fn negative_stock_rejected() {
        let mut r = named("A1");
        r.stock = Some(-1);
        assert_eq!(validate(&r), vec!["stock must be a non-negative number"]);
        r.stock = Some(0);
        assert!(validate(&r).is_empty());
    }

    #[test]
    fn overlong_name_rejected() {
        let mut r = named("A1");
        r.display_name = Some("n".repeat(MAX_NAME_LEN + 1));
        assert!(validate(&r)
            .iter()
            .any(|reason| reason.contains("name exceeds")));
    }

    #[test]
    fn negative_price_rejected() {
        let mut r = named("A1");
        r.price = Some(-5.0);
        assert_eq!(validate(&r), vec!["price must be a non-negative number"]);
    }

    #[test]
    fn non_finite_price_rejected() {
        let mut r = named("A1");
        r.price = Some(f64::NAN);
        assert!(!validate(&r).is_empty());
    }

    #[test]
    fn discount_above_price_rejected() {
        let mut r = named("A1");
        r.price = Some(10.0);
        r.discount_price = Some(12.0);
        assert_eq!(validate(&r), vec!["discount price exceeds regular price"]);
    }

    #[test]
    fn discount_equal_to_price_accepted() {
        let mut r = named("A1");
        r.price = Some(10.0);
        r.discount_price = Some(10.0);
        assert!(validate(&r).is_empty());
    }

    #[test]
    fn multiple_reasons_all_collected() {
        let mut r = ProductRecord::bare("");
        r.price = Some(-1.0);
        let reasons = validate(&r);
        assert_eq!(reasons.len(), 3, "got: {reasons:?}");
    }

    #[test]
    fn batch_partitions_valid_and_invalid() {
        let mut bad = named("B1");
        bad.price = Some(-2.0);
        let partition = validate_batch(vec![named("A1"), bad, named("C1")]);
        assert_eq!(partition.valid.len(), 2);
        assert_eq!(partition.invalid.len(), 1);
        assert_eq!(partition.invalid[0].record.natural_key, "B1");
        assert!(!partition.invalid[0].reasons.is_empty());
    }
}
