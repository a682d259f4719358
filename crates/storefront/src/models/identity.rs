//! Verified caller identity.

use serde::Serialize;

use carlot_core::SubjectId;

/// The caller behind a verified credential.
///
/// Produced by the token authenticator, attached to the request extensions by
/// the access gate, and dropped with the request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject_id: SubjectId,
}

impl Identity {
    #[must_use]
    pub fn new(subject_id: impl Into<SubjectId>) -> Self {
        Self {
            subject_id: subject_id.into(),
        }
    }
}
