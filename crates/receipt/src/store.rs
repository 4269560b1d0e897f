//! Receipt persistence client.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::ReceiptFields;

/// Error type for receipt backend operations.
#[derive(Debug)]
pub struct ReceiptError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ReceiptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ReceiptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl ReceiptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// The wire shape the persistence backend accepts.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    pub purchase_date: String,
    pub store_name: String,
    pub item_name: String,
    pub item_quantity: String,
    pub item_unit: String,
    pub total_amount: String,
    pub category: String,
    pub purpose: String,
}

impl ReceiptRecord {
    /// Every field must be filled in before saving; the backend does not
    /// accept partial rows.
    pub fn from_fields(fields: &ReceiptFields) -> Result<Self, ReceiptError> {
        let record = Self {
            purchase_date: fields.purchase_date.clone(),
            store_name: fields.store_name.clone(),
            item_name: fields.item_name.clone(),
            item_quantity: fields.item_quantity.clone(),
            item_unit: fields.item_unit.clone(),
            total_amount: fields.total_amount.clone(),
            category: fields.category.clone(),
            purpose: fields.purpose.clone(),
        };

        let complete = [
            &record.purchase_date,
            &record.store_name,
            &record.item_name,
            &record.item_quantity,
            &record.item_unit,
            &record.total_amount,
            &record.category,
            &record.purpose,
        ]
        .iter()
        .all(|f| !f.is_empty());

        if !complete {
            return Err(ReceiptError::new("All receipt fields must be filled in"));
        }
        Ok(record)
    }
}

#[derive(Debug, Deserialize)]
struct SaveReply {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// The most recent saved rows, as a ready-to-render table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReceiptTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct ReceiptClient {
    base_url: String,
    http: reqwest::Client,
}

impl ReceiptClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    pub async fn save(&self, record: &ReceiptRecord) -> Result<(), ReceiptError> {
        debug!("saving receipt from {}", record.store_name);
        let resp = self
            .http
            .post(self.url("/save-data"))
            .json(record)
            .send()
            .await
            .map_err(|e| ReceiptError::with_source("Save request failed", e))?;

        if !resp.status().is_success() {
            return Err(ReceiptError::new(format!(
                "Save HTTP error: {}",
                resp.status()
            )));
        }

        let reply = resp
            .json::<SaveReply>()
            .await
            .map_err(|e| ReceiptError::with_source("Malformed save reply", e))?;

        if reply.status == "ok" {
            Ok(())
        } else {
            Err(ReceiptError::new(
                reply.message.unwrap_or_else(|| "Save rejected".to_string()),
            ))
        }
    }

    pub async fn latest(&self) -> Result<ReceiptTable, ReceiptError> {
        let resp = self
            .http
            .get(self.url("/latest-receipts"))
            .send()
            .await
            .map_err(|e| ReceiptError::with_source("Latest-receipts request failed", e))?;

        if !resp.status().is_success() {
            return Err(ReceiptError::new(format!(
                "Latest-receipts HTTP error: {}",
                resp.status()
            )));
        }

        resp.json::<ReceiptTable>()
            .await
            .map_err(|e| ReceiptError::with_source("Malformed latest-receipts reply", e))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{ReceiptRecord, ReceiptTable, SaveReply};
    use crate::extract::ReceiptFields;

    fn complete_fields() -> ReceiptFields {
        ReceiptFields {
            purchase_date: "2026-08-29".to_string(),
            store_name: "セブンイレブン岡崎店".to_string(),
            item_name: "乾電池".to_string(),
            total_amount: "880".to_string(),
            item_quantity: "2".to_string(),
            item_unit: "個".to_string(),
            category: "消耗品費".to_string(),
            purpose: "在庫補充".to_string(),
        }
    }

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let record = ReceiptRecord::from_fields(&complete_fields()).expect("complete");
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["purchaseDate"], "2026-08-29");
        assert_eq!(json["storeName"], "セブンイレブン岡崎店");
        assert_eq!(json["itemUnit"], "個");
        assert_eq!(json["totalAmount"], "880");
    }

    #[test]
    fn incomplete_fields_are_rejected_before_sending() {
        let mut fields = complete_fields();
        fields.purpose = String::new();
        assert!(ReceiptRecord::from_fields(&fields).is_err());
    }

    #[test]
    fn save_reply_parses_status_and_message() {
        let ok: SaveReply = serde_json::from_str(r#"{"status": "ok"}"#).expect("parse");
        assert_eq!(ok.status, "ok");
        assert_eq!(ok.message, None);

        let failed: SaveReply =
            serde_json::from_str(r#"{"status": "error", "message": "シートが見つかりません"}"#)
                .expect("parse");
        assert_eq!(failed.message.as_deref(), Some("シートが見つかりません"));
    }

    #[test]
    fn latest_table_parses_headers_and_rows() {
        let json = r#"{
            "headers": ["購入日", "店名", "金額"],
            "rows": [["2026-08-29", "本屋", "1200"], ["2026-08-28", "文具店", "300"]]
        }"#;
        let table: ReceiptTable = serde_json::from_str(json).expect("parse");
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.rows[1][1], "文具店");
    }
}
