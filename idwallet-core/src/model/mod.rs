//! Wallet data model

pub mod credential;
pub mod did;
pub mod entity;
pub mod keys;
pub mod notification;
pub mod state;

pub use credential::{CredentialRecord, IssuerData, VerifiableCredential};
pub use did::Did;
pub use entity::{Entity, EntityDirectory};
pub use notification::{NotificationExtra, NotificationRecord, NotificationType};
pub use state::{AppState, ApplicationState};
