//! Serde model for the extraction feed: every leaf the extractor produced is
//! wrapped in a `{ "value": ... }` envelope, and any block may be missing.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Wrapped<T> {
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub struct FeedDocument {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "extractedData", default)]
    pub extracted_data: Option<ExtractedData>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractedData {
    #[serde(rename = "llmData", default)]
    pub llm_data: Option<LlmData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmData {
    #[serde(default)]
    pub vendor: Option<Wrapped<VendorBlock>>,
    #[serde(default)]
    pub customer: Option<Wrapped<CustomerBlock>>,
    #[serde(default)]
    pub invoice: Option<Wrapped<InvoiceBlock>>,
    #[serde(default)]
    pub payment: Option<Wrapped<PaymentBlock>>,
    #[serde(default)]
    pub summary: Option<Wrapped<SummaryBlock>>,
    #[serde(default)]
    pub line_items: Option<Wrapped<LineItemsBlock>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorBlock {
    #[serde(default)]
    pub vendor_name: Option<Wrapped<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBlock {
    #[serde(default)]
    pub customer_name: Option<Wrapped<String>>,
    #[serde(default)]
    pub customer_address: Option<Wrapped<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceBlock {
    #[serde(rename = "invoiceId", default)]
    pub invoice_id: Option<Wrapped<String>>,
    #[serde(default)]
    pub invoice_date: Option<Wrapped<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBlock {
    #[serde(default)]
    pub due_date: Option<Wrapped<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryBlock {
    #[serde(default)]
    pub invoice_total: Option<Wrapped<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct LineItemsBlock {
    #[serde(default)]
    pub items: Option<Wrapped<Vec<FeedLineItem>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedLineItem {
    #[serde(default)]
    pub description: Option<Wrapped<String>>,
    #[serde(default)]
    pub quantity: Option<Wrapped<f64>>,
    #[serde(default)]
    pub unit_price: Option<Wrapped<f64>>,
    #[serde(default)]
    pub total_price: Option<Wrapped<f64>>,
}
