//! Test fixtures for wallet data

use serde_json::json;

use crate::engine::CredentialApplication;
use crate::events::CredentialArrival;
use crate::model::{CredentialRecord, Entity, IssuerData, VerifiableCredential};

/// Directory entry with only a title
pub fn entity(title: &str) -> Entity {
    Entity {
        id: None,
        title: title.to_string(),
        subtitle: None,
        description: None,
        link: None,
        contact: None,
        style: None,
    }
}

pub fn issuer() -> IssuerData {
    IssuerData {
        id: Some("did:quarkid:zksync:EiIssuer".to_string()),
        ..IssuerData::named("Gobierno de la Ciudad")
    }
}

/// Credential record with id `urn:uuid:{id}`
pub fn credential(id: &str) -> CredentialRecord {
    CredentialRecord {
        data: VerifiableCredential::new(json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": format!("urn:uuid:{}", id),
            "type": ["VerifiableCredential"],
            "issuer": "did:quarkid:zksync:EiIssuer",
            "credentialSubject": { "givenName": "Ada" }
        })),
        display: Some(json!({ "title": { "text": "Credencial" } })),
        styles: None,
    }
}

pub fn arrival(message_id: &str) -> CredentialArrival {
    CredentialArrival {
        credentials: vec![credential(message_id)],
        issuer: issuer(),
        message_id: message_id.to_string(),
    }
}

/// Credential application; `offers` adds a credential to receive
pub fn application(message_id: &str, offers: bool) -> CredentialApplication {
    CredentialApplication {
        message_id: message_id.to_string(),
        message: json!({
            "id": message_id,
            "type": "https://didcomm.org/present-proof/3.0/request-presentation"
        }),
        inputs: vec![json!({ "id": "dni", "constraints": {} })],
        issuer: issuer(),
        credentials_to_receive: if offers {
            vec![credential("offered")]
        } else {
            Vec::new()
        },
    }
}
