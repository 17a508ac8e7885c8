use std::fmt;

use rust_decimal::Decimal;
use shared::{
    domain::{BeneficiaryId, BeneficiarySummary, Currency, TransferId},
    protocol::DraftSeed,
};
use uuid::Uuid;

use crate::error::ListError;

/// Client-generated key of a row the server has not seen yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalKey(String);

impl LocalKey {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a row in the list: a local key until the server assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Draft(LocalKey),
    Persisted(TransferId),
}

impl RowKey {
    pub fn server_id(&self) -> Option<TransferId> {
        match self {
            RowKey::Draft(_) => None,
            RowKey::Persisted(id) => Some(*id),
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, RowKey::Persisted(_))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Draft(key) => write!(f, "draft:{key}"),
            RowKey::Persisted(id) => write!(f, "transfer:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficiaryRef {
    pub id: BeneficiaryId,
    pub name: String,
    pub account_number: String,
}

impl BeneficiaryRef {
    pub fn is_resolved(&self) -> bool {
        self.id.0 > 0
    }
}

impl From<&BeneficiarySummary> for BeneficiaryRef {
    fn from(value: &BeneficiarySummary) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            account_number: value.account_number.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTransfer {
    key: RowKey,
    pub beneficiary: BeneficiaryRef,
    pub amount: String,
    pub currency: Currency,
    pub execution_date: String,
    pub remittance_info: Option<String>,
    order: u32,
}

impl DraftTransfer {
    pub fn new(
        beneficiary: BeneficiaryRef,
        amount: impl Into<String>,
        currency: Currency,
        execution_date: impl Into<String>,
    ) -> Self {
        Self {
            key: RowKey::Draft(LocalKey::generate()),
            beneficiary,
            amount: amount.into(),
            currency,
            execution_date: execution_date.into(),
            remittance_info: None,
            order: 0,
        }
    }

    pub fn with_remittance_info(mut self, info: impl Into<String>) -> Self {
        self.remittance_info = Some(info.into());
        self
    }

    /// Builds a row from a seed; seeds without an id get a fresh local key.
    pub fn from_seed(seed: DraftSeed) -> Self {
        let key = match seed.id {
            Some(id) => RowKey::Persisted(id),
            None => RowKey::Draft(LocalKey::generate()),
        };
        Self {
            key,
            beneficiary: BeneficiaryRef {
                id: seed.beneficiary,
                name: seed.beneficiary_name,
                account_number: seed.beneficiary_account_number,
            },
            amount: seed.amount,
            currency: seed.currency,
            execution_date: seed.execution_date,
            remittance_info: seed.remittance_info,
            order: 0,
        }
    }

    pub fn to_seed(&self) -> DraftSeed {
        DraftSeed {
            id: self.key.server_id(),
            beneficiary: self.beneficiary.id,
            beneficiary_name: self.beneficiary.name.clone(),
            beneficiary_account_number: self.beneficiary.account_number.clone(),
            amount: self.amount.clone(),
            currency: self.currency,
            execution_date: self.execution_date.clone(),
            remittance_info: self.remittance_info.clone(),
        }
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn server_id(&self) -> Option<TransferId> {
        self.key.server_id()
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub(crate) fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    /// Attaches the server id. A row keeps the first id it was given.
    pub fn assign_server_id(&mut self, id: TransferId) -> Result<(), ListError> {
        match &self.key {
            RowKey::Persisted(existing) if *existing == id => Ok(()),
            RowKey::Persisted(existing) => Err(ListError::ServerIdReassigned {
                existing: *existing,
                attempted: id,
            }),
            RowKey::Draft(_) => {
                self.key = RowKey::Persisted(id);
                Ok(())
            }
        }
    }

    pub fn parsed_amount(&self) -> Option<Decimal> {
        parse_amount(&self.amount)
    }
}

/// Parses user-typed amounts: surrounding and grouping spaces are ignored and
/// a decimal comma is accepted.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok()
}

/// Fixed-point wire form of an amount, two decimals.
pub fn normalize_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
