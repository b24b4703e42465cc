/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rows per page when neither the view nor the caller picks a size.
    pub default_page_size: i64,
    /// Maximum candidate rows preloaded for single-select relationship
    /// pickers.
    pub picker_row_cap: i64,
    /// Entries per page when browsing the audit trail.
    pub audit_page_size: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            picker_row_cap: 100,
            audit_page_size: 50,
        }
    }
}
