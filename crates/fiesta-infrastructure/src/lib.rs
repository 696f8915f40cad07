pub mod credential_service;
pub mod paths;
pub mod storage;

pub use crate::credential_service::FileCredentialProvider;
pub use crate::paths::FiestaPaths;
pub use crate::storage::{ConfigStorage, SecretStorage};
