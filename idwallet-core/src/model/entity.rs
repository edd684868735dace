//! Issuer/verifier directory entries

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A known issuer or verifier shown in the wallet directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
}

/// Shape of the directory document served at the entities URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityDirectory {
    #[serde(default)]
    pub service: Vec<Entity>,
}
