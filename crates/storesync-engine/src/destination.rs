//! Transactional writer for the destination catalog schema.
//!
//! The destination is a foreign relational layout: a content table
//! (`{prefix}posts`) holding products and attachments, and a key/value
//! attribute table (`{prefix}postmeta`). One work item maps to one
//! transaction; any step failing rolls the whole item back.
//!
//! The step sequence runs against the [`CatalogTx`] seam and never
//! commits; the commit lives solely in
//! [`PgCatalogWriter::write_item`], so a step error always drops the
//! open transaction.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Transaction};

use storesync_types::ProductRecord;

use crate::config::DestinationConfig;
use crate::error::{self, SyncError};

const CONNECT_BACKOFF_MS: u64 = 2_000;

/// Fixed descriptive attributes written for every product.
const FIXED_META: [(&str, &str); 8] = [
    ("_visibility", "visible"),
    ("_manage_stock", "yes"),
    ("_backorders", "no"),
    ("_sold_individually", "no"),
    ("_virtual", "no"),
    ("_downloadable", "no"),
    ("_tax_status", "taxable"),
    ("_tax_class", ""),
];

/// Destination write seam.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Persist one record atomically.
    ///
    /// # Errors
    ///
    /// Returns an error when any write step fails; the destination is
    /// left unchanged for this item.
    async fn write_item(&self, record: &ProductRecord) -> Result<()>;

    /// Verify the destination is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection is unusable.
    async fn health_check(&self) -> Result<()>;
}

/// Primitive catalog operations inside one open transaction.
///
/// Implementations must not commit; the caller owns the transaction
/// boundary.
#[async_trait]
trait CatalogTx {
    async fn find_product(&self, slug: &str) -> Result<Option<i64>>;
    async fn insert_product(
        &self,
        title: &str,
        slug: &str,
        content: &str,
        excerpt: &str,
    ) -> Result<i64>;
    async fn update_product(
        &self,
        entry_id: i64,
        title: &str,
        content: &str,
        excerpt: &str,
    ) -> Result<()>;
    async fn upsert_meta(&self, entry_id: i64, key: &str, value: &str) -> Result<()>;
    async fn find_attachment(&self, url: &str) -> Result<Option<i64>>;
    async fn insert_attachment(&self, title: &str, slug: &str, url: &str) -> Result<i64>;
}

/// The five write steps for one record, in order: content row, fixed
/// attributes, stock, pricing, image. Errors propagate immediately so
/// nothing after a failed step executes.
async fn apply_record<T>(tx: &T, record: &ProductRecord) -> Result<()>
where
    T: CatalogTx + Sync,
{
    let slug = slugify(&record.natural_key);
    let content = record.long_description.as_deref().unwrap_or_default();
    let excerpt = record.description.as_deref().unwrap_or_default();

    let entry_id = match tx.find_product(&slug).await? {
        Some(id) => {
            tx.update_product(id, record.title(), content, excerpt)
                .await?;
            id
        }
        None => {
            tx.insert_product(record.title(), &slug, content, excerpt)
                .await?
        }
    };

    tx.upsert_meta(entry_id, "_sku", &record.natural_key).await?;
    let stock_status = if record.in_stock() {
        "instock"
    } else {
        "outofstock"
    };
    tx.upsert_meta(entry_id, "_stock_status", stock_status)
        .await?;
    for (key, value) in FIXED_META {
        tx.upsert_meta(entry_id, key, value).await?;
    }
    tx.upsert_meta(entry_id, "total_sales", "0").await?;

    tx.upsert_meta(entry_id, "_stock", &record.stock.unwrap_or(0).to_string())
        .await?;

    if let Some(regular) = record.price {
        tx.upsert_meta(entry_id, "_regular_price", &format_price(regular))
            .await?;
    }
    if record.discount_applies() {
        // The active sale; effective price follows the discount.
        if let Some(discount) = record.discount_price {
            tx.upsert_meta(entry_id, "_sale_price", &format_price(discount))
                .await?;
        }
    } else {
        tx.upsert_meta(entry_id, "_sale_price", "").await?;
    }
    if let Some(effective) = record.effective_price() {
        tx.upsert_meta(entry_id, "_price", &format_price(effective))
            .await?;
    }

    if let Some(url) = record.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let attachment_id = match tx.find_attachment(url).await? {
            Some(id) => id,
            None => {
                let attachment_slug = format!("{slug}-image");
                tx.insert_attachment(record.title(), &attachment_slug, url)
                    .await?
            }
        };
        tx.upsert_meta(entry_id, "_thumbnail_id", &attachment_id.to_string())
            .await?;
    }
    Ok(())
}

/// `tokio-postgres` implementation of [`CatalogWriter`].
///
/// The client sits behind an async mutex: items drain sequentially and
/// `transaction()` needs exclusive access.
pub struct PgCatalogWriter {
    client: Mutex<Client>,
    prefix: String,
}

impl PgCatalogWriter {
    /// Connect with bounded linear-backoff retries.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Connectivity`] after the final attempt fails.
    pub async fn connect(config: &DestinationConfig) -> error::Result<Self> {
        let retries = config.connect_retries.max(1);
        let mut last_error = String::new();
        for attempt in 1..=retries {
            match Self::connect_once(config).await {
                Ok(client) => {
                    tracing::info!(
                        host = %config.host,
                        dbname = %config.dbname,
                        attempt,
                        "Connected to destination database"
                    );
                    return Ok(Self {
                        client: Mutex::new(client),
                        prefix: config.table_prefix.clone(),
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(attempt, error = %e, "Destination connection failed");
                    if attempt < retries {
                        let wait = Duration::from_millis(CONNECT_BACKOFF_MS * u64::from(attempt));
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }
        Err(SyncError::Connectivity(format!(
            "destination unreachable after {retries} attempts: {last_error}"
        )))
    }

    async fn connect_once(config: &DestinationConfig) -> Result<Client> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host);
        pg.port(config.port);
        pg.user(&config.user);
        if !config.password.is_empty() {
            pg.password(&config.password);
        }
        pg.dbname(&config.dbname);

        let (client, connection) = pg.connect(NoTls).await.context("connection failed")?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Destination connection error");
            }
        });
        Ok(client)
    }
}

/// [`CatalogTx`] over an open `tokio-postgres` transaction.
struct PgTx<'a, 'c> {
    tx: &'a Transaction<'c>,
    prefix: &'a str,
}

#[async_trait]
impl CatalogTx for PgTx<'_, '_> {
    async fn find_product(&self, slug: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT id FROM {p}posts WHERE post_name = $1 AND post_type = 'product' LIMIT 1",
            p = self.prefix
        );
        let row = self
            .tx
            .query_opt(&sql, &[&slug])
            .await
            .context("content row lookup failed")?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn insert_product(
        &self,
        title: &str,
        slug: &str,
        content: &str,
        excerpt: &str,
    ) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {p}posts \
             (post_title, post_name, post_type, post_status, post_content, post_excerpt, \
              post_date, post_modified) \
             VALUES ($1, $2, 'product', 'publish', $3, $4, now(), now()) RETURNING id",
            p = self.prefix
        );
        let row = self
            .tx
            .query_one(&sql, &[&title, &slug, &content, &excerpt])
            .await
            .context("content row insert failed")?;
        Ok(row.get(0))
    }

    async fn update_product(
        &self,
        entry_id: i64,
        title: &str,
        content: &str,
        excerpt: &str,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {p}posts SET post_title = $1, post_content = $2, post_excerpt = $3, \
             post_modified = now() WHERE id = $4",
            p = self.prefix
        );
        self.tx
            .execute(&sql, &[&title, &content, &excerpt, &entry_id])
            .await
            .context("content row update failed")?;
        Ok(())
    }

    async fn upsert_meta(&self, entry_id: i64, key: &str, value: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {p}postmeta (post_id, meta_key, meta_value) VALUES ($1, $2, $3) \
             ON CONFLICT (post_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value",
            p = self.prefix
        );
        self.tx
            .execute(&sql, &[&entry_id, &key, &value])
            .await
            .with_context(|| format!("attribute upsert failed for {key}"))?;
        Ok(())
    }

    async fn find_attachment(&self, url: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT id FROM {p}posts WHERE guid = $1 AND post_type = 'attachment' LIMIT 1",
            p = self.prefix
        );
        let row = self
            .tx
            .query_opt(&sql, &[&url])
            .await
            .context("attachment lookup failed")?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn insert_attachment(&self, title: &str, slug: &str, url: &str) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {p}posts \
             (post_title, post_name, post_type, post_status, guid, post_date, post_modified) \
             VALUES ($1, $2, 'attachment', 'inherit', $3, now(), now()) RETURNING id",
            p = self.prefix
        );
        let row = self
            .tx
            .query_one(&sql, &[&title, &slug, &url])
            .await
            .context("attachment insert failed")?;
        Ok(row.get(0))
    }
}

#[async_trait]
impl CatalogWriter for PgCatalogWriter {
    async fn write_item(&self, record: &ProductRecord) -> Result<()> {
        let mut client = self.client.lock().await;
        let tx = client
            .transaction()
            .await
            .context("transaction begin failed")?;

        // The only commit. A step error returns here first and the
        // transaction rolls back on drop.
        apply_record(
            &PgTx {
                tx: &tx,
                prefix: &self.prefix,
            },
            record,
        )
        .await?;

        tx.commit().await.context("transaction commit failed")?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let client = self.client.lock().await;
        client
            .query_one("SELECT 1", &[])
            .await
            .context("destination health check failed")?;
        Ok(())
    }
}

/// Derive a URL-safe slug from a natural key or title.
///
/// Lowercases, turns whitespace and separators into single dashes, and
/// strips everything else.
#[must_use]
pub fn slugify(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut pending_dash = false;
    for ch in lower.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    out
}

fn format_price(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let s = format!("{value:.4}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex as StdMutex;

    /// Scripted [`CatalogTx`] that records every operation and can fail
    /// at exactly one of them.
    #[derive(Default)]
    struct ScriptedTx {
        fail_op: Option<String>,
        existing_product: Option<i64>,
        existing_attachment: Option<i64>,
        ops: StdMutex<Vec<String>>,
        metas: StdMutex<Vec<(String, String)>>,
    }

    impl ScriptedTx {
        fn failing_at(op: &str) -> Self {
            Self {
                fail_op: Some(op.to_string()),
                ..Self::default()
            }
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn meta(&self, key: &str) -> Option<String> {
            self.metas
                .lock()
                .unwrap()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }

        fn step(&self, op: &str) -> Result<()> {
            self.ops.lock().unwrap().push(op.to_string());
            if self.fail_op.as_deref() == Some(op) {
                anyhow::bail!("injected failure at {op}")
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CatalogTx for ScriptedTx {
        async fn find_product(&self, _slug: &str) -> Result<Option<i64>> {
            self.step("find_product")?;
            Ok(self.existing_product)
        }

        async fn insert_product(
            &self,
            _title: &str,
            _slug: &str,
            _content: &str,
            _excerpt: &str,
        ) -> Result<i64> {
            self.step("insert_product")?;
            Ok(11)
        }

        async fn update_product(
            &self,
            _entry_id: i64,
            _title: &str,
            _content: &str,
            _excerpt: &str,
        ) -> Result<()> {
            self.step("update_product")
        }

        async fn upsert_meta(&self, _entry_id: i64, key: &str, value: &str) -> Result<()> {
            self.step(&format!("meta:{key}"))?;
            self.metas
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string()));
            Ok(())
        }

        async fn find_attachment(&self, _url: &str) -> Result<Option<i64>> {
            self.step("find_attachment")?;
            Ok(self.existing_attachment)
        }

        async fn insert_attachment(&self, _title: &str, _slug: &str, _url: &str) -> Result<i64> {
            self.step("insert_attachment")?;
            Ok(77)
        }
    }

    fn full_record() -> ProductRecord {
        let mut r = ProductRecord::bare("ART 100");
        r.display_name = Some("Widget".into());
        r.price = Some(10.0);
        r.discount_price = Some(8.0);
        r.stock = Some(5);
        r.description = Some("short".into());
        r.long_description = Some("long".into());
        r.image_url = Some("http://img.local/widget.png".into());
        r
    }

    fn expected_ops() -> Vec<&'static str> {
        vec![
            "find_product",
            "insert_product",
            "meta:_sku",
            "meta:_stock_status",
            "meta:_visibility",
            "meta:_manage_stock",
            "meta:_backorders",
            "meta:_sold_individually",
            "meta:_virtual",
            "meta:_downloadable",
            "meta:_tax_status",
            "meta:_tax_class",
            "meta:total_sales",
            "meta:_stock",
            "meta:_regular_price",
            "meta:_sale_price",
            "meta:_price",
            "find_attachment",
            "insert_attachment",
            "meta:_thumbnail_id",
        ]
    }

    #[tokio::test]
    async fn new_product_runs_all_steps_in_order() {
        let tx = ScriptedTx::default();
        apply_record(&tx, &full_record()).await.unwrap();
        assert_eq!(tx.ops(), expected_ops());
        assert_eq!(tx.meta("_sku").as_deref(), Some("ART 100"));
        assert_eq!(tx.meta("_stock").as_deref(), Some("5"));
        assert_eq!(tx.meta("_stock_status").as_deref(), Some("instock"));
        assert_eq!(tx.meta("_thumbnail_id").as_deref(), Some("77"));
    }

    #[tokio::test]
    async fn fault_at_any_step_halts_the_sequence() {
        for (position, op) in expected_ops().into_iter().enumerate() {
            let tx = ScriptedTx::failing_at(op);
            let err = apply_record(&tx, &full_record()).await.unwrap_err();
            assert!(err.to_string().contains(op), "got: {err}");

            // Nothing runs past the failing step, so the caller's
            // commit is never reached and the item rolls back whole.
            let ops = tx.ops();
            assert_eq!(ops.len(), position + 1, "failing at {op}");
            assert_eq!(ops.last().map(String::as_str), Some(op));
        }
    }

    #[tokio::test]
    async fn existing_product_is_updated_not_inserted() {
        let tx = ScriptedTx {
            existing_product: Some(5),
            ..ScriptedTx::default()
        };
        apply_record(&tx, &full_record()).await.unwrap();
        let ops = tx.ops();
        assert_eq!(ops[1], "update_product");
        assert!(!ops.iter().any(|op| op == "insert_product"));
    }

    #[tokio::test]
    async fn existing_attachment_is_linked_not_recreated() {
        let tx = ScriptedTx {
            existing_attachment: Some(42),
            ..ScriptedTx::default()
        };
        apply_record(&tx, &full_record()).await.unwrap();
        assert!(!tx.ops().iter().any(|op| op == "insert_attachment"));
        assert_eq!(tx.meta("_thumbnail_id").as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn applicable_discount_written_as_sale_price() {
        let tx = ScriptedTx::default();
        apply_record(&tx, &full_record()).await.unwrap();
        assert_eq!(tx.meta("_regular_price").as_deref(), Some("10"));
        assert_eq!(tx.meta("_sale_price").as_deref(), Some("8"));
        assert_eq!(tx.meta("_price").as_deref(), Some("8"));
    }

    #[tokio::test]
    async fn higher_discount_ignored_and_sale_cleared() {
        let mut record = full_record();
        record.discount_price = Some(12.0);
        let tx = ScriptedTx::default();
        apply_record(&tx, &record).await.unwrap();
        assert_eq!(tx.meta("_sale_price").as_deref(), Some(""));
        assert_eq!(tx.meta("_price").as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn missing_image_skips_attachment_steps() {
        let mut record = full_record();
        record.image_url = None;
        let tx = ScriptedTx::default();
        apply_record(&tx, &record).await.unwrap();
        assert!(!tx.ops().iter().any(|op| op.contains("attachment")));
        assert!(tx.meta("_thumbnail_id").is_none());
    }

    #[tokio::test]
    async fn zero_stock_marked_out_of_stock() {
        let mut record = full_record();
        record.stock = Some(0);
        let tx = ScriptedTx::default();
        apply_record(&tx, &record).await.unwrap();
        assert_eq!(tx.meta("_stock_status").as_deref(), Some("outofstock"));
        assert_eq!(tx.meta("_stock").as_deref(), Some("0"));
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("ART 100-B"), "art-100-b");
        assert_eq!(slugify("  Widget  Deluxe  "), "widget-deluxe");
        assert_eq!(slugify("a_b_c"), "a-b-c");
    }

    #[test]
    fn slugify_strips_non_word_chars() {
        assert_eq!(slugify("Caffè (250g)"), "caffè-250g");
        assert_eq!(slugify("50% off!"), "50-off");
    }

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("a -- b"), "a-b");
        assert_eq!(slugify("--edge--"), "edge");
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(10.0), "10");
        assert_eq!(format_price(9.5), "9.5");
        assert_eq!(format_price(9.99), "9.99");
        assert_eq!(format_price(0.125), "0.125");
    }
}
