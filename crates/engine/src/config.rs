use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_IMPORT_ROWS: usize = 200;
pub const DEFAULT_RECENT_HISTORY_LIMIT: usize = 5;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Tunables for [`crate::LeadService`]. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Imports with more data rows than this are rejected whole.
    pub max_import_rows: usize,
    /// History entries returned alongside a viewed record.
    pub recent_history_limit: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_import_rows: DEFAULT_MAX_IMPORT_ROWS,
            recent_history_limit: DEFAULT_RECENT_HISTORY_LIMIT,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl ServiceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
