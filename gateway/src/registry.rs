//! Process-wide map from SenderCompID to session.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};

use fixwire::parser;
use matchbook::Market;

use crate::session::Session;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The resolving message failed framing validation; nothing about it
    /// can be trusted, so no session is looked up or created.
    #[error("invalid message")]
    InvalidMessage,

    #[error("message carries no sender comp id")]
    MissingSender,
}

/// Sessions are created on the first validated message from a new
/// SenderCompID and never removed until teardown.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    market: Arc<Market>,
}

impl SessionRegistry {
    pub fn new(market: Arc<Market>) -> SessionRegistry {
        info!("session registry init");
        SessionRegistry {
            sessions: DashMap::new(),
            market,
        }
    }

    /// Resolves a framed message to its sender's session, creating one on
    /// first contact. Lookup-or-create is atomic per sender id.
    pub fn lookup(&self, message: &str) -> Result<Arc<Session>, RegistryError> {
        if !parser::is_message_valid(message) {
            return Err(RegistryError::InvalidMessage);
        }
        let sender = parser::parse_sender(message)
            .filter(|sender| !sender.is_empty())
            .ok_or(RegistryError::MissingSender)?;

        let session = self
            .sessions
            .entry(sender.to_string())
            .or_insert_with(|| {
                let declared = parser::parse_seq_num(message).unwrap_or(0);
                debug!(sender, declared, "creating session");
                Session::new(sender.to_string(), declared, Arc::clone(&self.market))
            });

        Ok(Arc::clone(session.value()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Deactivates every session (joining its workers) and clears the map.
    pub fn destroy(&self) {
        info!("session registry destroy");
        for entry in self.sessions.iter() {
            entry.value().deactivate();
        }
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixwire::messages::{build_header, build_logon, build_trailer, EncryptMethod, MsgType};

    fn logon_message(sender: &str, seq: u64) -> String {
        let payload = build_logon(EncryptMethod::None, 0);
        let mut msg = build_header(MsgType::Logon, payload.len(), sender, "FERX", seq);
        msg.push_str(&payload);
        let trailer = build_trailer(&msg);
        msg.push_str(&trailer);
        msg
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(Market::open()))
    }

    #[test]
    fn same_sender_resolves_to_same_session() {
        let registry = registry();

        let first = registry.lookup(&logon_message("ACME", 1)).unwrap();
        let second = registry.lookup(&logon_message("ACME", 2)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(first.sender_comp_id(), "ACME");
    }

    #[test]
    fn distinct_senders_get_distinct_sessions() {
        let registry = registry();

        let acme = registry.lookup(&logon_message("ACME", 1)).unwrap();
        let wayne = registry.lookup(&logon_message("WAYNE", 1)).unwrap();

        assert!(!Arc::ptr_eq(&acme, &wayne));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn invalid_message_is_refused() {
        let registry = registry();

        // Chop the trailer so the checksum check fails.
        let mut msg = logon_message("ACME", 1);
        msg.truncate(msg.len() - 2);

        assert_eq!(
            registry.lookup(&msg).unwrap_err(),
            RegistryError::InvalidMessage
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_sender_is_refused() {
        let registry = registry();

        // Valid framing but an empty 49 field.
        let payload = build_logon(EncryptMethod::None, 0);
        let header = build_header(MsgType::Logon, payload.len(), "", "FERX", 1);
        let mut msg = header;
        msg.push_str(&payload);
        let trailer = build_trailer(&msg);
        msg.push_str(&trailer);

        assert_eq!(
            registry.lookup(&msg).unwrap_err(),
            RegistryError::MissingSender
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn destroy_clears_the_map() {
        let registry = registry();
        registry.lookup(&logon_message("ACME", 1)).unwrap();

        registry.destroy();
        assert!(registry.is_empty());
    }
}
