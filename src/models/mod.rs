//! Request-scoped data models of the ingestion flow.
//!
//! Nothing here outlives a single call: the caller's JSON is turned into a
//! `SanitizedRequest`, resolved into an `ObjectPath`, written, and answered
//! with an `IngestReceipt`.

pub mod object_path;
pub mod receipt;
pub mod request;
pub mod variant;
