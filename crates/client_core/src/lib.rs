//! Client side of the transfer XML generator: the draft transfer list editor
//! and the bridge that persists it through the backend API.

pub mod api;
pub mod config;
pub mod draft;
pub mod editor;
pub mod error;
pub mod list;
pub mod ordering;
pub mod persistence;

pub use api::{HttpTransferApi, TransferApi};
pub use draft::{BeneficiaryRef, DraftTransfer, LocalKey, RowKey};
pub use editor::{EditState, EditableField, InlineEditor, StagedEdit};
pub use error::{ApiFailure, ListError, SaveError};
pub use list::TransferList;
pub use ordering::{SortDirection, SortField, SortSpec};
pub use persistence::{ExportOutcome, PendingHandle, PersistenceBridge, SaveOutcome};
