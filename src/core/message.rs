use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TranscriptRole {
    User,
    Assistant,
    AppInfo,
    AppWarning,
    AppError,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
            TranscriptRole::AppInfo => "app/info",
            TranscriptRole::AppWarning => "app/warning",
            TranscriptRole::AppError => "app/error",
        }
    }

    pub fn to_api_role(self) -> Option<&'static str> {
        match self {
            TranscriptRole::User => Some("user"),
            TranscriptRole::Assistant => Some("assistant"),
            _ => None,
        }
    }

    pub fn from_api_role(role: &str) -> Result<Self, String> {
        Self::try_from(role)
    }

    pub fn is_user(self) -> bool {
        self == TranscriptRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TranscriptRole::Assistant
    }

    /// App-authored entries render in the transcript but are never
    /// transmitted to the remote API.
    pub fn is_app(self) -> bool {
        matches!(
            self,
            TranscriptRole::AppInfo | TranscriptRole::AppWarning | TranscriptRole::AppError
        )
    }
}

impl AsRef<str> for TranscriptRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for TranscriptRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(TranscriptRole::User),
            // The backend stores assistant turns under either name
            "assistant" | "ai" => Ok(TranscriptRole::Assistant),
            "app/info" => Ok(TranscriptRole::AppInfo),
            "app/warning" => Ok(TranscriptRole::AppWarning),
            "app/error" => Ok(TranscriptRole::AppError),
            _ => Err(format!("invalid transcript role: {value}")),
        }
    }
}

impl TryFrom<String> for TranscriptRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<TranscriptRole> for String {
    fn from(value: TranscriptRole) -> Self {
        value.as_str().to_string()
    }
}

/// Transcript entries start out with a locally issued identifier and adopt
/// the server-issued one once the remote service has confirmed the message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryId {
    Local(u64),
    Server(String),
}

impl EntryId {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, EntryId::Server(_))
    }
}

/// File attached to an entry, shown by name under its message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
}

/// One message bubble in a conversation.
///
/// While a response is streaming in, the assistant entry carries the
/// `streaming` flag and its text grows in place; the flag is cleared when
/// the stream completes, errors, or is cancelled.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub chat_id: Option<String>,
    pub role: TranscriptRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    pub streaming: bool,
}

impl TranscriptEntry {
    pub fn new(
        id: EntryId,
        chat_id: Option<String>,
        role: TranscriptRole,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            chat_id,
            role,
            text: text.into(),
            created_at: Utc::now(),
            attachments: Vec::new(),
            streaming: false,
        }
    }

    pub fn user(id: EntryId, chat_id: Option<String>, text: impl Into<String>) -> Self {
        Self::new(id, chat_id, TranscriptRole::User, text)
    }

    /// An assistant entry in its transient, still-streaming state.
    pub fn assistant_streaming(id: EntryId, chat_id: Option<String>) -> Self {
        let mut entry = Self::new(id, chat_id, TranscriptRole::Assistant, "");
        entry.streaming = true;
        entry
    }

    pub fn app_info(id: EntryId, text: impl Into<String>) -> Self {
        Self::new(id, None, TranscriptRole::AppInfo, text)
    }

    pub fn app_warning(id: EntryId, text: impl Into<String>) -> Self {
        Self::new(id, None, TranscriptRole::AppWarning, text)
    }

    pub fn app_error(id: EntryId, text: impl Into<String>) -> Self {
        Self::new(id, None, TranscriptRole::AppError, text)
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub fn is_app(&self) -> bool {
        self.role.is_app()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_strings() {
        for role in [
            TranscriptRole::User,
            TranscriptRole::Assistant,
            TranscriptRole::AppInfo,
            TranscriptRole::AppWarning,
            TranscriptRole::AppError,
        ] {
            assert_eq!(TranscriptRole::try_from(role.as_str()), Ok(role));
        }
    }

    #[test]
    fn backend_ai_alias_maps_to_assistant() {
        assert_eq!(
            TranscriptRole::from_api_role("ai"),
            Ok(TranscriptRole::Assistant)
        );
    }

    #[test]
    fn app_roles_have_no_api_role() {
        assert_eq!(TranscriptRole::AppError.to_api_role(), None);
        assert_eq!(TranscriptRole::User.to_api_role(), Some("user"));
    }

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(TranscriptRole::try_from("app/unknown").is_err());
    }

    #[test]
    fn streaming_entries_start_empty_and_transient() {
        let entry = TranscriptEntry::assistant_streaming(EntryId::Local(1), None);
        assert!(entry.streaming);
        assert!(entry.text.is_empty());
        assert!(!entry.id.is_confirmed());
    }
}
