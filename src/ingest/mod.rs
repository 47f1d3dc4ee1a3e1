pub mod feed;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::{params, Connection};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use feed::FeedDocument;

#[derive(Debug)]
pub enum IngestError {
    IoError(std::io::Error),
    ParsingError(String),
    DatabaseError(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::IoError(err) => write!(f, "IO error: {}", err),
            IngestError::ParsingError(msg) => write!(f, "Parsing error: {}", msg),
            IngestError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::IoError(err)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::ParsingError(err.to_string())
    }
}

impl From<duckdb::Error> for IngestError {
    fn from(err: duckdb::Error) -> Self {
        IngestError::DatabaseError(err.to_string())
    }
}

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub created: usize,
    pub skipped: usize,
}

#[derive(Debug)]
struct ParsedInvoice {
    vendor_name: String,
    customer_name: String,
    customer_address: Option<String>,
    invoice_number: String,
    date: NaiveDateTime,
    due_date: NaiveDateTime,
    amount: f64,
    status: String,
    line_items: Vec<ParsedLineItem>,
}

#[derive(Debug)]
struct ParsedLineItem {
    description: String,
    quantity: i64,
    price: f64,
    category: String,
}

/// Reads the extraction feed file and imports every usable document.
pub fn seed_from_file(conn: &Connection, path: &Path) -> Result<SeedSummary, IngestError> {
    let content = std::fs::read_to_string(path)?;
    let documents: Vec<Value> = serde_json::from_str(&content)?;

    if documents.is_empty() {
        return Err(IngestError::ParsingError("data file is empty".to_string()));
    }
    info!("Found {} documents in feed file", documents.len());

    import_documents(conn, &documents)
}

/// Clears the invoice tables, then walks the feed. Documents that fail a
/// guard or an insert are skipped and counted, never fatal.
pub fn import_documents(conn: &Connection, documents: &[Value]) -> Result<SeedSummary, IngestError> {
    clear_existing(conn)?;

    let mut summary = SeedSummary::default();

    for doc in documents {
        let doc_id = doc
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or("<no id>")
            .to_string();

        let parsed = match parse_document(doc) {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!("Skipping document {}: {}", doc_id, reason);
                summary.skipped += 1;
                continue;
            }
        };

        match insert_invoice(conn, &parsed) {
            Ok(_) => summary.created += 1,
            Err(e) => {
                warn!("Failed to store document {}: {}", doc_id, e);
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn clear_existing(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(
        r#"
        DELETE FROM "Payment";
        DELETE FROM "LineItem";
        DELETE FROM "Invoice";
        DELETE FROM "Vendor";
        DELETE FROM "Customer";
        "#,
    )
}

fn parse_document(doc: &Value) -> Result<ParsedInvoice, String> {
    let doc: FeedDocument =
        serde_json::from_value(doc.clone()).map_err(|e| format!("malformed document: {}", e))?;

    let data = doc
        .extracted_data
        .and_then(|d| d.llm_data)
        .ok_or("missing llmData")?;

    let items = data
        .line_items
        .and_then(|block| block.value.items)
        .ok_or("missing lineItems")?
        .value;

    let vendor_name = data
        .vendor
        .and_then(|v| v.value.vendor_name)
        .map(|w| w.value)
        .ok_or("missing vendor name")?;

    let customer = data.customer.ok_or("missing customer")?.value;
    let customer_name = customer
        .customer_name
        .map(|w| w.value)
        .ok_or("missing customer name")?;
    let customer_address = customer.customer_address.map(|w| w.value);

    let invoice = data.invoice.ok_or("missing invoice")?.value;
    let invoice_number = invoice
        .invoice_id
        .map(|w| w.value)
        .ok_or("missing invoice number")?;

    let amount = data
        .summary
        .and_then(|s| s.value.invoice_total)
        .map(|w| w.value)
        .ok_or("missing invoice total")?;

    let date = invoice
        .invoice_date
        .and_then(|w| parse_feed_date(&w.value))
        .ok_or("missing or unparseable invoice date")?;

    // Due date falls back to the invoice date when the payment block is absent
    let due_date = data
        .payment
        .and_then(|p| p.value.due_date)
        .and_then(|w| parse_feed_date(&w.value))
        .unwrap_or(date);

    let status = match doc.status.ok_or("missing status")? {
        s if s == "processed" => "Pending".to_string(),
        s => s,
    };

    let line_items = items
        .into_iter()
        .map(|item| {
            let description = item
                .description
                .map(|w| w.value)
                .unwrap_or_else(|| "N/A".to_string());
            let quantity = item.quantity.map(|w| w.value).unwrap_or(1.0) as i64;
            let price = item
                .unit_price
                .or(item.total_price)
                .map(|w| w.value)
                .unwrap_or(0.0);
            let category = categorize(&description).to_string();
            ParsedLineItem {
                description,
                quantity,
                price,
                category,
            }
        })
        .collect();

    Ok(ParsedInvoice {
        vendor_name,
        customer_name,
        customer_address,
        invoice_number,
        date,
        due_date,
        amount,
        status,
        line_items,
    })
}

/// Feed dates show up as plain dates, timestamps or RFC 3339 strings.
fn parse_feed_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    None
}

/// Keyword bucketing copied from the dashboard's spend-by-category logic.
pub fn categorize(description: &str) -> &'static str {
    let desc = description.to_lowercase();
    if desc.contains("software") || desc.contains("saas") || desc.contains("license") {
        return "Software";
    }
    if desc.contains("consulting") || desc.contains("legal") || desc.contains("hr") {
        return "Services";
    }
    if desc.contains("office") || desc.contains("supplies") {
        return "Office Supplies";
    }
    if desc.contains("cloud") || desc.contains("aws") || desc.contains("gcp") {
        return "IT/Cloud";
    }
    "General"
}

fn upsert_vendor(conn: &Connection, name: &str) -> Result<i64, duckdb::Error> {
    match conn.query_row(
        "SELECT id FROM \"Vendor\" WHERE name = ?",
        params![name],
        |row| row.get(0),
    ) {
        Ok(id) => Ok(id),
        Err(duckdb::Error::QueryReturnedNoRows) => conn.query_row(
            "INSERT INTO \"Vendor\" (name) VALUES (?) RETURNING id",
            params![name],
            |row| row.get(0),
        ),
        Err(e) => Err(e),
    }
}

fn upsert_customer(
    conn: &Connection,
    name: &str,
    address: Option<&str>,
) -> Result<i64, duckdb::Error> {
    match conn.query_row(
        "SELECT id FROM \"Customer\" WHERE name = ?",
        params![name],
        |row| row.get(0),
    ) {
        Ok(id) => {
            if let Some(address) = address {
                conn.execute(
                    "UPDATE \"Customer\" SET address = ? WHERE id = ?",
                    params![address, id],
                )?;
            }
            Ok(id)
        }
        Err(duckdb::Error::QueryReturnedNoRows) => conn.query_row(
            "INSERT INTO \"Customer\" (name, address) VALUES (?, ?) RETURNING id",
            params![name, address],
            |row| row.get(0),
        ),
        Err(e) => Err(e),
    }
}

fn insert_invoice(conn: &Connection, invoice: &ParsedInvoice) -> Result<i64, duckdb::Error> {
    let vendor_id = upsert_vendor(conn, &invoice.vendor_name)?;
    let customer_id = upsert_customer(
        conn,
        &invoice.customer_name,
        invoice.customer_address.as_deref(),
    )?;

    let invoice_id: i64 = conn.query_row(
        "INSERT INTO \"Invoice\" \
         (invoice_number, date, due_date, amount, status, \"vendorId\", \"customerId\") \
         VALUES (?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?, ?, ?, ?) RETURNING id",
        params![
            invoice.invoice_number,
            invoice.date.format("%Y-%m-%d %H:%M:%S").to_string(),
            invoice.due_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            invoice.amount,
            invoice.status,
            vendor_id,
            customer_id,
        ],
        |row| row.get(0),
    )?;

    for item in &invoice.line_items {
        conn.execute(
            "INSERT INTO \"LineItem\" \
             (description, quantity, price, category, \"invoiceId\") \
             VALUES (?, ?, ?, ?, ?)",
            params![
                item.description,
                item.quantity,
                item.price,
                item.category,
                invoice_id,
            ],
        )?;
    }

    Ok(invoice_id)
}
