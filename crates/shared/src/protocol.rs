use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, BeneficiaryId, BeneficiarySummary, Currency, TemplateId, TransferId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeneficiaryQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Default for BeneficiaryQuery {
    fn default() -> Self {
        Self {
            search: None,
            is_active: true,
            page: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeneficiaryPage {
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    pub results: Vec<BeneficiarySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateLoadRequest {
    pub template_id: TemplateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator_account_id: Option<AccountId>,
    pub execution_date: NaiveDate,
}

/// A pre-filled transfer: a template-load item, an invoice-derived transfer
/// or an entry of a drafts file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftSeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TransferId>,
    pub beneficiary: BeneficiaryId,
    #[serde(default)]
    pub beneficiary_name: String,
    #[serde(default)]
    pub beneficiary_account_number: String,
    pub amount: String,
    #[serde(default)]
    pub currency: Currency,
    pub execution_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remittance_info: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferCreatePayload {
    pub beneficiary: BeneficiaryId,
    pub amount: String,
    pub currency: Currency,
    pub execution_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remittance_info: Option<String>,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub originator_account: Option<AccountId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedTransfer {
    pub id: TransferId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateXmlRequest {
    pub transfer_ids: Vec<TransferId>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub xml: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}
