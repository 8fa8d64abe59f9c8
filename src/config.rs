// src/config.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_MEMO_LEN: usize = 256;

fn default_max_memo_len() -> usize {
    DEFAULT_MAX_MEMO_LEN
}

/// Deployment settings of one token ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Identity of the deployed ledger. Only it may create new symbols.
    pub contract: Uuid,
    /// Longest memo accepted, in bytes.
    #[serde(default = "default_max_memo_len")]
    pub max_memo_len: usize,
}

impl TokenConfig {
    pub fn new(contract: Uuid) -> Self {
        Self {
            contract,
            max_memo_len: DEFAULT_MAX_MEMO_LEN,
        }
    }

    pub fn with_max_memo_len(mut self, max_memo_len: usize) -> Self {
        self.max_memo_len = max_memo_len;
        self
    }
}
