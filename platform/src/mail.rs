//! Outbound email.

use async_trait::async_trait;
use kahukura_types::Email;
use serde::{Deserialize, Serialize};

use crate::PlatformError;

/// A data export attached to an email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataExport {
    pub file_name: String,
    /// JSON document.
    pub contents: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_code(&self, email: &Email, code: u32) -> Result<(), PlatformError>;

    async fn send_data_export(&self, email: &Email, export: &DataExport) -> Result<(), PlatformError>;
}
