use super::*;
use async_trait::async_trait;
use shared::{
    domain::{BeneficiaryId, Currency},
    protocol::{BeneficiaryPage, BeneficiaryQuery, CreatedTransfer, DraftSeed, TemplateLoadRequest},
};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use crate::{
    draft::{BeneficiaryRef, RowKey},
    ordering::{SortDirection, SortField},
};

enum CreateReply {
    Ids(Vec<i64>),
    FieldErrors(Vec<FieldErrors>),
    Message(String),
}

struct TestTransferApi {
    reply: CreateReply,
    create_calls: Arc<Mutex<Vec<Vec<TransferCreatePayload>>>>,
    xml_requests: Arc<Mutex<Vec<GenerateXmlRequest>>>,
    /// When set, create calls signal the first notify and wait on the second.
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl TestTransferApi {
    fn new(reply: CreateReply) -> Self {
        Self {
            reply,
            create_calls: Arc::new(Mutex::new(Vec::new())),
            xml_requests: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    fn gated(reply: CreateReply) -> (Self, Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let mut api = Self::new(reply);
        api.gate = Some((entered.clone(), release.clone()));
        (api, entered, release)
    }
}

#[async_trait]
impl TransferApi for TestTransferApi {
    async fn search_beneficiaries(
        &self,
        _query: &BeneficiaryQuery,
    ) -> Result<BeneficiaryPage, ApiFailure> {
        Err(ApiFailure::Message("not used".to_string()))
    }

    async fn load_template(
        &self,
        _request: &TemplateLoadRequest,
    ) -> Result<Vec<DraftSeed>, ApiFailure> {
        Err(ApiFailure::Message("not used".to_string()))
    }

    async fn create_transfers(
        &self,
        transfers: &[TransferCreatePayload],
    ) -> Result<Vec<CreatedTransfer>, ApiFailure> {
        self.create_calls.lock().await.push(transfers.to_vec());
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        match &self.reply {
            CreateReply::Ids(ids) => Ok(ids
                .iter()
                .map(|&id| CreatedTransfer {
                    id: TransferId(id),
                    order: None,
                })
                .collect()),
            CreateReply::FieldErrors(rows) => Err(ApiFailure::FieldErrors(rows.clone())),
            CreateReply::Message(message) => Err(ApiFailure::Message(message.clone())),
        }
    }

    async fn generate_xml(&self, request: &GenerateXmlRequest) -> Result<GeneratedXml, ApiFailure> {
        self.xml_requests.lock().await.push(request.clone());
        Ok(GeneratedXml {
            batch_id: Some(5),
            filename: Some(format!("{}.xml", request.name)),
            xml: "<HUFTransactions/>".to_string(),
            generated_at: None,
        })
    }
}

fn row(name: &str, amount: &str) -> DraftTransfer {
    DraftTransfer::new(
        BeneficiaryRef {
            id: BeneficiaryId(3),
            name: name.to_string(),
            account_number: "11773016-11111018".to_string(),
        },
        amount,
        Currency::Huf,
        "2026-10-22",
    )
}

fn persisted(name: &str, amount: &str, id: i64) -> DraftTransfer {
    let mut row = row(name, amount);
    row.assign_server_id(TransferId(id)).expect("assign id");
    row
}

fn snapshot(list: &TransferList) -> (Vec<DraftTransfer>, Vec<RowKey>) {
    (list.rows().to_vec(), list.displayed_keys())
}

#[tokio::test]
async fn zero_amount_fails_validation_without_network_call() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(vec![1])));
    let calls = api.create_calls.clone();
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![row("A", "0")]).expect("list");
    let before = snapshot(&list);

    let err = bridge.save(&mut list, None).await.expect_err("validation");
    let messages = err.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Row 1"));
    assert!(messages[0].contains("amount"));
    assert!(calls.lock().await.is_empty());
    assert_eq!(snapshot(&list), before);
}

#[tokio::test]
async fn sub_cent_amounts_fail_validation_without_network_call() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(vec![1, 2, 3])));
    let calls = api.create_calls.clone();
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![
        row("A", "0.004"),
        row("B", "0,001"),
        row("C", "0.006"),
    ])
    .expect("list");
    let before = snapshot(&list);

    let err = bridge.save(&mut list, None).await.expect_err("validation");
    // 0.006 goes out as 0.01 and is accepted.
    assert_eq!(
        err.messages(),
        vec![
            "Row 1: amount must be a positive number".to_string(),
            "Row 2: amount must be a positive number".to_string(),
        ]
    );
    assert!(calls.lock().await.is_empty());
    assert_eq!(snapshot(&list), before);
}

#[tokio::test]
async fn empty_list_and_missing_fields_are_reported_per_row() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(Vec::new())));
    let mut bridge = PersistenceBridge::new(api);

    let mut empty = TransferList::new();
    let err = bridge.save(&mut empty, None).await.expect_err("empty");
    assert!(matches!(err, SaveError::Validation(_)));

    let mut unresolved = row("B", "10");
    unresolved.beneficiary.id = BeneficiaryId(0);
    let mut no_date = row("C", "10");
    no_date.execution_date = " ".to_string();
    let mut bad_date = row("D", "10");
    bad_date.execution_date = "22/10/2026".to_string();
    let mut list = TransferList::from_rows(vec![
        row("A", "10"),
        unresolved,
        no_date,
        bad_date,
        row("E", "-5"),
    ])
    .expect("list");

    let err = bridge.save(&mut list, None).await.expect_err("invalid");
    assert_eq!(
        err.messages(),
        vec![
            "Row 2: beneficiary is not selected".to_string(),
            "Row 3: execution date is required".to_string(),
            "Row 4: execution date must be a YYYY-MM-DD date".to_string(),
            "Row 5: amount must be a positive number".to_string(),
        ]
    );
}

#[tokio::test]
async fn successful_save_attaches_server_ids_in_place() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(vec![77])));
    let calls = api.create_calls.clone();
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![row("A", "1500,5")]).expect("list");

    let outcome = bridge
        .save(&mut list, Some(AccountId(2)))
        .await
        .expect("save");

    assert_eq!(outcome.created, vec![TransferId(77)]);
    assert_eq!(outcome.already_persisted, 0);
    assert_eq!(list.rows()[0].key(), &RowKey::Persisted(TransferId(77)));
    assert_eq!(list.rows()[0].beneficiary.name, "A");
    assert!(!bridge.is_pending());

    let calls = calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        vec![TransferCreatePayload {
            beneficiary: BeneficiaryId(3),
            amount: "1500.50".to_string(),
            currency: Currency::Huf,
            execution_date: "2026-10-22".to_string(),
            remittance_info: None,
            order: 0,
            originator_account: Some(AccountId(2)),
        }]
    );
}

#[tokio::test]
async fn mixed_list_keeps_order_and_only_creates_drafts() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(vec![101, 102])));
    let calls = api.create_calls.clone();
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![
        row("new-1", "10"),
        persisted("old", "20", 50),
        row("new-2", "30"),
    ])
    .expect("list");
    let names_before: Vec<_> = list
        .displayed()
        .map(|row| row.beneficiary.name.clone())
        .collect();

    let outcome = bridge.save(&mut list, None).await.expect("save");
    assert_eq!(outcome.created, vec![TransferId(101), TransferId(102)]);
    assert_eq!(outcome.already_persisted, 1);

    let after: Vec<_> = list
        .displayed()
        .map(|row| (row.beneficiary.name.clone(), row.server_id()))
        .collect();
    assert_eq!(
        after,
        vec![
            ("new-1".to_string(), Some(TransferId(101))),
            ("old".to_string(), Some(TransferId(50))),
            ("new-2".to_string(), Some(TransferId(102))),
        ]
    );
    assert_eq!(
        after.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
        names_before
    );

    let orders: Vec<u32> = calls.lock().await[0].iter().map(|p| p.order).collect();
    assert_eq!(orders, vec![0, 2]);
}

#[tokio::test]
async fn sorted_list_is_saved_in_displayed_order() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(vec![1, 2])));
    let calls = api.create_calls.clone();
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![row("big", "900"), row("small", "100")])
        .expect("list");
    list.sort_by(SortField::Amount, SortDirection::Ascending);

    bridge.save(&mut list, None).await.expect("save");

    let sent: Vec<(String, u32)> = calls.lock().await[0]
        .iter()
        .map(|p| (p.amount.clone(), p.order))
        .collect();
    assert_eq!(
        sent,
        vec![("100.00".to_string(), 0), ("900.00".to_string(), 1)]
    );
    let shown: Vec<_> = list.displayed().map(|row| row.server_id()).collect();
    assert_eq!(shown, vec![Some(TransferId(1)), Some(TransferId(2))]);
}

#[tokio::test]
async fn server_field_errors_leave_the_list_unchanged() {
    // Sorted descending by name the request is [C, A]; only C is rejected.
    let mut first = FieldErrors::new();
    first.insert(
        "amount".to_string(),
        vec!["Ensure this value is less than 1000000000.".to_string()],
    );
    let api = Arc::new(TestTransferApi::new(CreateReply::FieldErrors(vec![
        first,
        FieldErrors::new(),
    ])));
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![
        row("A", "10"),
        persisted("B", "20", 9),
        row("C", "99999999999"),
    ])
    .expect("list");
    list.sort_by(SortField::BeneficiaryName, SortDirection::Descending);
    let before = snapshot(&list);

    let err = bridge.save(&mut list, None).await.expect_err("rejected");
    assert!(matches!(err, SaveError::Rejected(_)));
    assert_eq!(
        err.messages(),
        vec!["1. amount: Ensure this value is less than 1000000000.".to_string()]
    );
    assert_eq!(snapshot(&list), before);
}

#[tokio::test]
async fn server_message_and_short_response_leave_the_list_unchanged() {
    let mut list = TransferList::from_rows(vec![row("A", "10"), row("B", "20")]).expect("list");
    let before = snapshot(&list);

    let mut bridge = PersistenceBridge::new(Arc::new(TestTransferApi::new(CreateReply::Message(
        "Originator account is locked.".to_string(),
    ))));
    let err = bridge.save(&mut list, None).await.expect_err("message");
    assert_eq!(err.messages(), vec!["Originator account is locked.".to_string()]);
    assert_eq!(snapshot(&list), before);

    let mut bridge =
        PersistenceBridge::new(Arc::new(TestTransferApi::new(CreateReply::Ids(vec![1]))));
    let err = bridge.save(&mut list, None).await.expect_err("mismatch");
    assert!(matches!(
        err,
        SaveError::ResponseMismatch {
            sent: 2,
            received: 1
        }
    ));
    assert_eq!(snapshot(&list), before);
}

#[tokio::test]
async fn fully_persisted_list_skips_the_create_call() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(Vec::new())));
    let calls = api.create_calls.clone();
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![persisted("A", "5", 1)]).expect("list");

    let outcome = bridge.save(&mut list, None).await.expect("save");
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.already_persisted, 1);
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn export_requests_xml_for_all_rows_after_save() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(vec![11])));
    let xml_requests = api.xml_requests.clone();
    let mut bridge = PersistenceBridge::new(api);
    let mut list =
        TransferList::from_rows(vec![persisted("A", "5", 10), row("B", "6")]).expect("list");

    let outcome = bridge
        .save_and_generate(&mut list, None, " October payroll ")
        .await
        .expect("export");
    assert_eq!(outcome.xml.xml, "<HUFTransactions/>");
    assert_eq!(outcome.save.created, vec![TransferId(11)]);

    let requests = xml_requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].transfer_ids, vec![TransferId(10), TransferId(11)]);
    assert_eq!(requests[0].name, "October payroll");
}

#[tokio::test]
async fn xml_is_not_requested_for_unsaved_rows() {
    let api = Arc::new(TestTransferApi::new(CreateReply::Ids(Vec::new())));
    let xml_requests = api.xml_requests.clone();
    let mut bridge = PersistenceBridge::new(api);
    let list = TransferList::from_rows(vec![row("A", "5")]).expect("list");

    let err = bridge
        .generate_xml(&list, "batch")
        .await
        .expect_err("not persisted");
    assert!(matches!(err, SaveError::NotPersisted));
    assert!(xml_requests.lock().await.is_empty());
}

#[tokio::test]
async fn field_errors_are_numbered_by_list_row() {
    let mut rejected = FieldErrors::new();
    rejected.insert(
        "execution_date".to_string(),
        vec!["Date is a bank holiday.".to_string()],
    );
    let api = Arc::new(TestTransferApi::new(CreateReply::FieldErrors(vec![
        FieldErrors::new(),
        rejected,
    ])));
    let mut bridge = PersistenceBridge::new(api);
    let mut list = TransferList::from_rows(vec![
        row("new-1", "10"),
        persisted("old", "20", 50),
        row("new-2", "30"),
    ])
    .expect("list");

    let err = bridge.save(&mut list, None).await.expect_err("rejected");
    assert_eq!(
        err.messages(),
        vec!["3. execution_date: Date is a bank holiday.".to_string()]
    );
}

#[tokio::test]
async fn pending_handle_tracks_the_in_flight_create() {
    let (api, entered, release) = TestTransferApi::gated(CreateReply::Ids(vec![7]));
    let mut bridge = PersistenceBridge::new(Arc::new(api));
    let handle = bridge.pending_handle();
    let mut list = TransferList::from_rows(vec![row("A", "10")]).expect("list");
    assert!(!handle.is_pending());

    {
        let save = bridge.save(&mut list, None);
        tokio::pin!(save);
        tokio::select! {
            _ = &mut save => panic!("save finished before the backend answered"),
            _ = entered.notified() => {}
        }
        assert!(handle.is_pending());

        release.notify_one();
        save.await.expect("save");
    }

    assert!(!handle.is_pending());
    assert!(!bridge.is_pending());
    assert_eq!(list.rows()[0].server_id(), Some(TransferId(7)));
}

#[tokio::test]
async fn abandoned_save_clears_pending_and_keeps_the_list() {
    let (api, _entered, _release) = TestTransferApi::gated(CreateReply::Ids(vec![7]));
    let mut bridge = PersistenceBridge::new(Arc::new(api));
    let mut list = TransferList::from_rows(vec![row("A", "10")]).expect("list");
    let before = snapshot(&list);

    let result =
        tokio::time::timeout(Duration::from_millis(20), bridge.save(&mut list, None)).await;
    assert!(result.is_err());

    assert!(!bridge.is_pending());
    assert!(!bridge.pending_handle().is_pending());
    assert_eq!(snapshot(&list), before);
}
