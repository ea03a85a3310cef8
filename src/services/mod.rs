//! Ingestion core: validation, path resolution, write authorization,
//! object writing, and the storage backends they run against.

pub mod clock;
pub mod cloud_backend;
pub mod ingest_service;
pub mod local_backend;
pub mod object_writer;
pub mod path_resolver;
pub mod storage_backend;
#[cfg(test)]
pub(crate) mod test_support;
pub mod validator;
pub mod write_authorizer;
