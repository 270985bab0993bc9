use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{TokenRecord, TokenRepository};
use crate::error::AppError;

/// In-process token store. Same single-record semantics as the
/// PostgreSQL table; contents are lost on restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    record: RwLock<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: TokenRecord) -> Self {
        Self {
            record: RwLock::new(Some(record)),
        }
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenStore {
    async fn load(&self) -> Result<Option<TokenRecord>, AppError> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, record: &TokenRecord) -> Result<(), AppError> {
        *self.record.write().await = Some(record.clone());
        Ok(())
    }

    async fn delete(&self) -> Result<(), AppError> {
        *self.record.write().await = None;
        Ok(())
    }
}
