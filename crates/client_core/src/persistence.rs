//! Saving a transfer list: validation, batch create and id merge-back.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    domain::{AccountId, TransferId},
    error::FieldErrors,
    protocol::{GenerateXmlRequest, GeneratedXml, TransferCreatePayload},
};
use tracing::{info, warn};

use crate::{
    api::TransferApi,
    draft::{normalize_amount, DraftTransfer},
    error::{ApiFailure, SaveError},
    list::TransferList,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Ids assigned in this save, in list order.
    pub created: Vec<TransferId>,
    pub already_persisted: usize,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub save: SaveOutcome,
    pub xml: GeneratedXml,
}

/// Checks every row in displayed order. Messages number rows from 1.
pub fn validate(list: &TransferList) -> Vec<String> {
    if list.is_empty() {
        return vec!["Add at least one transfer before saving.".to_string()];
    }

    let mut errors = Vec::new();
    for (index, row) in list.displayed().enumerate() {
        let n = index + 1;
        // Checked at the precision it is sent with.
        match row.parsed_amount().map(|amount| amount.round_dp(2)) {
            Some(amount) if amount > Decimal::ZERO => {}
            _ => errors.push(format!("Row {n}: amount must be a positive number")),
        }
        let date = row.execution_date.trim();
        if date.is_empty() {
            errors.push(format!("Row {n}: execution date is required"));
        } else if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            errors.push(format!("Row {n}: execution date must be a YYYY-MM-DD date"));
        }
        if !row.beneficiary.is_resolved() {
            errors.push(format!("Row {n}: beneficiary is not selected"));
        }
    }
    errors
}

/// Create payloads for rows without a server id, paired with their list positions.
pub fn create_payloads(
    rows: &[DraftTransfer],
    originator_account: Option<AccountId>,
) -> Vec<(usize, TransferCreatePayload)> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| !row.key().is_persisted())
        .map(|(position, row)| {
            let amount = row
                .parsed_amount()
                .map(normalize_amount)
                .unwrap_or_else(|| row.amount.trim().to_string());
            let payload = TransferCreatePayload {
                beneficiary: row.beneficiary.id,
                amount,
                currency: row.currency,
                execution_date: row.execution_date.trim().to_string(),
                remittance_info: row
                    .remittance_info
                    .as_deref()
                    .map(str::trim)
                    .filter(|info| !info.is_empty())
                    .map(str::to_string),
                order: row.order(),
                originator_account,
            };
            (position, payload)
        })
        .collect()
}

/// Flattens per-request-row field errors, numbering rows by their list position.
fn row_error_messages(errors: &[FieldErrors], positions: &[usize]) -> Vec<String> {
    let mut out = Vec::new();
    for (request_index, fields) in errors.iter().enumerate() {
        let row = positions
            .get(request_index)
            .map_or(request_index + 1, |position| position + 1);
        for (field, messages) in fields {
            for message in messages {
                out.push(format!("{row}. {field}: {message}"));
            }
        }
    }
    out
}

/// Read side of a bridge's in-flight flag, for UI code that does not own the bridge.
#[derive(Debug, Clone)]
pub struct PendingHandle(Arc<AtomicBool>);

impl PendingHandle {
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Holds the flag up for one request. Dropping a cancelled future clears it too.
struct PendingGuard(Arc<AtomicBool>);

impl PendingGuard {
    fn raise(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self(Arc::clone(flag))
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PersistenceBridge {
    api: Arc<dyn TransferApi>,
    pending: Arc<AtomicBool>,
}

impl PersistenceBridge {
    pub fn new(api: Arc<dyn TransferApi>) -> Self {
        Self {
            api,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a save or export request is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn pending_handle(&self) -> PendingHandle {
        PendingHandle(Arc::clone(&self.pending))
    }

    /// Persists every row that has no server id yet.
    ///
    /// The list is only touched on success: rows gain their server ids in place
    /// and keep their displayed order. Any failure leaves it as it was.
    pub async fn save(
        &mut self,
        list: &mut TransferList,
        default_account_id: Option<AccountId>,
    ) -> Result<SaveOutcome, SaveError> {
        let errors = validate(list);
        if !errors.is_empty() {
            warn!(errors = errors.len(), "transfer list failed validation");
            return Err(SaveError::Validation(errors));
        }

        let mut working = list.clone();
        working.prepare_for_save();

        let to_create = create_payloads(working.rows(), default_account_id);
        let already_persisted = working.len() - to_create.len();
        if to_create.is_empty() {
            *list = working;
            return Ok(SaveOutcome {
                created: Vec::new(),
                already_persisted,
            });
        }

        let (positions, payloads): (Vec<usize>, Vec<TransferCreatePayload>) =
            to_create.into_iter().unzip();
        info!(
            transfers = payloads.len(),
            already_persisted, "creating transfers"
        );

        let response = {
            let _pending = PendingGuard::raise(&self.pending);
            self.api.create_transfers(&payloads).await
        };

        let created = match response {
            Ok(created) => created,
            Err(ApiFailure::FieldErrors(rows)) => {
                let messages = row_error_messages(&rows, &positions);
                warn!(errors = messages.len(), "server rejected transfers");
                return Err(if messages.is_empty() {
                    SaveError::Server("the server rejected the transfers".to_string())
                } else {
                    SaveError::Rejected(messages)
                });
            }
            Err(err) => {
                warn!(error = %err, "transfer batch create failed");
                return Err(err.into());
            }
        };

        if created.len() != positions.len() {
            warn!(
                sent = positions.len(),
                received = created.len(),
                "batch create response does not match request"
            );
            return Err(SaveError::ResponseMismatch {
                sent: positions.len(),
                received: created.len(),
            });
        }

        let mut rows = working.rows().to_vec();
        for (&position, record) in positions.iter().zip(&created) {
            if let Err(err) = rows[position].assign_server_id(record.id) {
                warn!(error = %err, "could not merge server id");
                return Err(SaveError::Server(err.to_string()));
            }
        }
        working.replace_persisted(rows);
        *list = working;

        let created: Vec<TransferId> = created.into_iter().map(|record| record.id).collect();
        info!(created = created.len(), "transfers persisted");
        Ok(SaveOutcome {
            created,
            already_persisted,
        })
    }

    /// Requests XML for a fully persisted list.
    pub async fn generate_xml(
        &mut self,
        list: &TransferList,
        batch_name: &str,
    ) -> Result<GeneratedXml, SaveError> {
        if !list.all_persisted() {
            return Err(SaveError::NotPersisted);
        }
        let request = GenerateXmlRequest {
            transfer_ids: list.displayed().filter_map(DraftTransfer::server_id).collect(),
            name: batch_name.trim().to_string(),
        };

        let response = {
            let _pending = PendingGuard::raise(&self.pending);
            self.api.generate_xml(&request).await
        };

        let xml = response.map_err(SaveError::from)?;
        info!(
            transfers = request.transfer_ids.len(),
            batch = %request.name,
            "generated transfer xml"
        );
        Ok(xml)
    }

    /// Saves, then generates XML once every row has a server id.
    pub async fn save_and_generate(
        &mut self,
        list: &mut TransferList,
        default_account_id: Option<AccountId>,
        batch_name: &str,
    ) -> Result<ExportOutcome, SaveError> {
        let save = self.save(list, default_account_id).await?;
        let xml = self.generate_xml(list, batch_name).await?;
        Ok(ExportOutcome { save, xml })
    }
}

#[cfg(test)]
#[path = "tests/persistence_tests.rs"]
mod tests;
