//! Structured field extraction from free text.
//!
//! The extraction backend wraps a language model: it answers with prose
//! `content` that embeds one JSON object carrying locale-keyed receipt
//! fields, plus the per-call model cost. The parser takes the span from the
//! first `{` to the last `}` and reads the known keys, coercing numbers to
//! strings. Enumerated fields are validated against fixed whitelists; an
//! out-of-vocabulary value becomes empty rather than an error, so the user
//! can correct it in the form.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::store::ReceiptError;

/// Units the quantity field accepts.
pub const VALID_UNITS: [&str; 3] = ["個", "式", "人"];

/// The fixed chart of account titles a receipt may be booked under.
pub const ACCOUNT_TITLES: [&str; 19] = [
    "租税公課",
    "外注工賃",
    "減価償却費",
    "繰延資産の償却費",
    "貸倒金",
    "地代家賃",
    "利子割引料",
    "荷造運賃",
    "水道光熱費",
    "旅費交通費",
    "通信費",
    "広告宣伝費",
    "接待交際費",
    "損害保険料",
    "修繕費",
    "消耗品費",
    "新聞図書費",
    "固定資産の損失",
    "雑費",
];

/// Purposes the expense form accepts.
pub const VALID_PURPOSES: [&str; 4] = ["打ち合わせ", "差入れ", "在庫補充", "ガソリン代として"];

/// Receipt fields extracted from free text, already validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptFields {
    pub purchase_date: String,
    pub store_name: String,
    pub item_name: String,
    pub total_amount: String,
    pub item_quantity: String,
    pub item_unit: String,
    pub category: String,
    pub purpose: String,
}

/// Extraction result: the fields plus the model cost reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub fields: ReceiptFields,
    pub cost_jpy: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    gpt_cost_jpy: Option<f64>,
}

pub struct ExtractionClient {
    base_url: String,
    http: reqwest::Client,
}

impl ExtractionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Send free text to the extraction backend and parse the embedded
    /// JSON object out of its reply.
    pub async fn extract(&self, text: &str) -> Result<Extraction, ReceiptError> {
        let resp = self
            .http
            .post(format!("{}/chat", self.base_url.trim_end_matches('/')))
            .form(&[("message", text)])
            .send()
            .await
            .map_err(|e| ReceiptError::with_source("Extraction request failed", e))?;

        if !resp.status().is_success() {
            return Err(ReceiptError::new(format!(
                "Extraction HTTP error: {}",
                resp.status()
            )));
        }

        let reply = resp
            .json::<ChatReply>()
            .await
            .map_err(|e| ReceiptError::with_source("Malformed extraction reply", e))?;

        let content = reply.content.unwrap_or_default();
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let fields = parse_fields(&content, &today)?;

        Ok(Extraction {
            fields,
            cost_jpy: reply.gpt_cost_jpy,
        })
    }
}

/// Parse receipt fields from prose containing one JSON object.
///
/// `today` fills in the purchase date when the model omitted it.
pub fn parse_fields(content: &str, today: &str) -> Result<ReceiptFields, ReceiptError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ReceiptError::new("Reply contains no JSON object"));
    };
    if end < start {
        return Err(ReceiptError::new("Reply contains no JSON object"));
    }

    let value: Value = serde_json::from_str(&content[start..=end])
        .map_err(|e| ReceiptError::with_source("Embedded JSON did not parse", e))?;

    let field = |key: &str| coerce_text(value.get(key));

    let purchase_date = match field("購入日") {
        date if date.is_empty() => today.to_string(),
        date => date,
    };
    let item_unit = keep_if_listed(field("単位"), &VALID_UNITS);
    let category = keep_if_listed(field("勘定科目"), &ACCOUNT_TITLES);
    let purpose = keep_if_listed(field("目的"), &VALID_PURPOSES);

    if !category.is_empty() {
        debug!("auto-selected account title: {category}");
    }

    Ok(ReceiptFields {
        purchase_date,
        store_name: field("店名"),
        item_name: field("品名"),
        total_amount: field("金額"),
        item_quantity: field("個数"),
        item_unit,
        category,
        purpose,
    })
}

fn keep_if_listed(value: String, allowed: &[&str]) -> String {
    if allowed.contains(&value.as_str()) {
        value
    } else {
        String::new()
    }
}

/// The model is inconsistent about numbers vs. strings for amounts and
/// quantities; the form wants text either way.
fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::parse_fields;

    const TODAY: &str = "2026-08-29";

    #[test]
    fn fields_are_read_from_json_embedded_in_prose() {
        let content = r#"抽出結果は以下の通りです。
{"購入日": "2026-08-28", "店名": "セブンイレブン岡崎店", "品名": "乾電池",
 "金額": 880, "個数": "2", "単位": "個", "勘定科目": "消耗品費", "目的": "在庫補充"}
ご確認ください。"#;
        let fields = parse_fields(content, TODAY).expect("parse");
        assert_eq!(fields.purchase_date, "2026-08-28");
        assert_eq!(fields.store_name, "セブンイレブン岡崎店");
        assert_eq!(fields.total_amount, "880"); // number coerced to text
        assert_eq!(fields.item_unit, "個");
        assert_eq!(fields.category, "消耗品費");
        assert_eq!(fields.purpose, "在庫補充");
    }

    #[test]
    fn missing_purchase_date_defaults_to_today() {
        let fields = parse_fields(r#"{"店名": "ガソリンスタンド"}"#, TODAY).expect("parse");
        assert_eq!(fields.purchase_date, TODAY);
        assert_eq!(fields.item_name, "");
    }

    #[test]
    fn out_of_vocabulary_enums_become_empty() {
        let content = r#"{"単位": "箱", "勘定科目": "遊興費", "目的": "なんとなく"}"#;
        let fields = parse_fields(content, TODAY).expect("parse");
        assert_eq!(fields.item_unit, "");
        assert_eq!(fields.category, "");
        assert_eq!(fields.purpose, "");
    }

    #[test]
    fn reply_without_any_json_object_is_an_error() {
        assert!(parse_fields("情報を抽出できませんでした。", TODAY).is_err());
    }

    #[test]
    fn span_extends_from_first_to_last_brace() {
        // Nested objects must survive the span cut.
        let content = r#"前置き {"店名": "本屋", "補足": {"棚": "雑誌"}} 後置き"#;
        let fields = parse_fields(content, TODAY).expect("parse");
        assert_eq!(fields.store_name, "本屋");
    }

    #[test]
    fn broken_embedded_json_is_an_error() {
        assert!(parse_fields(r#"結果: {"店名": "本屋""#, TODAY).is_err());
    }
}
