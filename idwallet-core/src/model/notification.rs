//! Notification records persisted by the wallet

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::{CredentialRecord, IssuerData};

/// Kind of a notification.
///
/// Protocol kinds serialize as their WACI message type URI; wallet-internal
/// kinds use short names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "https://didcomm.org/issue-credential/3.0/offer-credential")]
    OfferCredential,
    #[serde(rename = "https://didcomm.org/issue-credential/3.0/issue-credential")]
    IssueCredential,
    #[serde(rename = "https://didcomm.org/present-proof/3.0/request-presentation")]
    RequestPresentation,
    #[serde(rename = "https://didcomm.org/present-proof/3.0/ack")]
    PresentationAck,
    #[serde(rename = "https://didcomm.org/report-problem/2.0/problem-report")]
    ProblemReport,
    #[serde(rename = "init-did")]
    InitDid,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OfferCredential => {
                "https://didcomm.org/issue-credential/3.0/offer-credential"
            }
            NotificationType::IssueCredential => {
                "https://didcomm.org/issue-credential/3.0/issue-credential"
            }
            NotificationType::RequestPresentation => {
                "https://didcomm.org/present-proof/3.0/request-presentation"
            }
            NotificationType::PresentationAck => "https://didcomm.org/present-proof/3.0/ack",
            NotificationType::ProblemReport => {
                "https://didcomm.org/report-problem/2.0/problem-report"
            }
            NotificationType::InitDid => "init-did",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload needed to replay the postponed flow when a notification is read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Vec<CredentialRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<IssuerData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Original protocol message, re-submitted to the engine on read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl NotificationExtra {
    pub fn issued(credentials: Vec<CredentialRecord>, issuer: IssuerData) -> Self {
        Self {
            credentials: Some(credentials),
            issuer: Some(issuer),
            ..Default::default()
        }
    }

    pub fn acknowledgement(status: Option<String>, code: Option<String>) -> Self {
        Self {
            status,
            code,
            ..Default::default()
        }
    }

    pub fn invitation(issuer: IssuerData, message: Value) -> Self {
        Self {
            issuer: Some(issuer),
            message: Some(message),
            ..Default::default()
        }
    }
}

/// A wallet notification, stored verbatim in the `notifications` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Localization key of the title
    pub title: String,
    /// Localization key of the body
    pub body: String,
    pub read: bool,
    #[serde(default)]
    pub extra: NotificationExtra,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_wire_names() {
        assert_eq!(
            serde_json::to_value(NotificationType::PresentationAck).unwrap(),
            json!("https://didcomm.org/present-proof/3.0/ack")
        );
        let parsed: NotificationType = serde_json::from_value(json!("init-did")).unwrap();
        assert_eq!(parsed, NotificationType::InitDid);

        for kind in [
            NotificationType::OfferCredential,
            NotificationType::IssueCredential,
            NotificationType::RequestPresentation,
            NotificationType::PresentationAck,
            NotificationType::ProblemReport,
            NotificationType::InitDid,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn test_record_uses_type_field() {
        let record = NotificationRecord {
            id: "n1".to_string(),
            kind: NotificationType::InitDid,
            title: "notifications.init-did.title".to_string(),
            body: "notifications.init-did.body".to_string(),
            read: false,
            extra: NotificationExtra::default(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], json!("init-did"));
        assert_eq!(value["extra"], json!({}));
    }
}
