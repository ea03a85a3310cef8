//! The ingest procedures exposed by the gateway.

use std::fmt;

/// Reserved control fields of the attribution procedure.
pub const ATTRIBUTION_FILE_NAME: &str = "_firebaseFunction_fileName";
pub const ATTRIBUTION_FOLDER_PREFIX: &str = "_firebaseFunction_folderPrefix";

/// Reserved control fields of the event procedure.
pub const EVENT_FOLDER_PREFIX: &str = "folderPrefix";
pub const EVENT_USER_PSEUDO_ID: &str = "userPseudoID";
pub const EVENT_APP_ID: &str = "appId";

/// Explicit payload field (`event` and `raw` only). When present and not
/// `null`, its value is persisted and every other non-reserved top-level
/// field is discarded.
pub const PAYLOAD_FIELD: &str = "payload";

/// One callable procedure, each with its own reserved fields and path layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestVariant {
    /// `{folderPrefix}/{date}/{fileName}_{epochMillis}.json`, no write probe.
    Attribution,
    /// `{folderPrefix}/{date}/{appId}/{USERID}-{timestamp}.json`, probed.
    Event,
    /// `{rawPrefix}/{date}/{uuid}.json`, probed.
    Raw,
}

impl IngestVariant {
    /// Keys removed from the caller's object before it is persisted.
    pub fn reserved_keys(self) -> &'static [&'static str] {
        match self {
            Self::Attribution => &[ATTRIBUTION_FILE_NAME, ATTRIBUTION_FOLDER_PREFIX],
            Self::Event => &[
                EVENT_FOLDER_PREFIX,
                EVENT_USER_PSEUDO_ID,
                EVENT_APP_ID,
                PAYLOAD_FIELD,
            ],
            Self::Raw => &[PAYLOAD_FIELD],
        }
    }

    /// Whether the value under [`PAYLOAD_FIELD`] replaces the remaining fields.
    pub fn accepts_explicit_payload(self) -> bool {
        !matches!(self, Self::Attribution)
    }

    /// Whether a write probe runs before the real write.
    pub fn probes_write_access(self) -> bool {
        !matches!(self, Self::Attribution)
    }

    /// Callable procedure name, also used as the route path.
    pub fn procedure(self) -> &'static str {
        match self {
            Self::Attribution => "saveAttributionData",
            Self::Event => "saveEventData",
            Self::Raw => "saveRawData",
        }
    }
}

impl fmt::Display for IngestVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.procedure())
    }
}
