//! Storage namespaces and keys used by the wallet

/// Namespace holding wallet-owned records and onboarding flags
pub const APPLICATION_NAMESPACE: &str = "application";
/// Namespace owned by the protocol engine (keys, DIDs)
pub const AGENT_NAMESPACE: &str = "agent";
/// Engine-owned credential store
pub const VC_NAMESPACE: &str = "vc";
/// Engine-owned WACI exchange state
pub const WACI_NAMESPACE: &str = "waci";
/// Engine-owned OpenID exchange state
pub const OPENID_NAMESPACE: &str = "openid";

/// Persisted notification list, newest first
pub const NOTIFICATIONS: &str = "notifications";
/// Message ids already surfaced as deferred notifications
pub const ALREADY_SEEN_NOTIFICATIONS: &str = "alreadySeenNotifications";

/// Onboarding checklist flags
pub const INTRODUCTION: &str = "introduction";
pub const WITH_DID: &str = "withDid";
pub const CONFIRMED_DID: &str = "confirmedDid";
pub const TUTORIAL: &str = "tutorial";

/// PIN hash, secure namespace only
pub const PIN: &str = "pin";
