//! Credential and issuer records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw verifiable credential document, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifiableCredential(pub Value);

impl VerifiableCredential {
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    /// The credential's `id` property, when it has one
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn document(&self) -> &Value {
        &self.0
    }
}

/// A credential plus the issuer-provided rendering hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub data: VerifiableCredential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Value>,
}

impl CredentialRecord {
    pub fn new(data: VerifiableCredential) -> Self {
        Self {
            data,
            display: None,
            styles: None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.data.id()
    }
}

/// Issuer or verifier as described in an exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IssuerData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Best label for display: name, then id
    pub fn label(&self) -> Option<&str> {
        self.name.as_deref().or(self.id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credential_id() {
        let vc = VerifiableCredential::new(json!({"id": "urn:uuid:1", "type": ["VerifiableCredential"]}));
        assert_eq!(vc.id(), Some("urn:uuid:1"));
        assert_eq!(VerifiableCredential::new(json!({})).id(), None);
    }

    #[test]
    fn test_issuer_keeps_unknown_fields() {
        let issuer: IssuerData =
            serde_json::from_value(json!({"id": "did:x:1", "logo": "https://l"})).unwrap();
        assert_eq!(issuer.label(), Some("did:x:1"));
        assert_eq!(issuer.extra.get("logo"), Some(&json!("https://l")));

        let back = serde_json::to_value(&issuer).unwrap();
        assert_eq!(back, json!({"id": "did:x:1", "logo": "https://l"}));
    }
}
