pub mod freshness_cache;
pub mod grading_ledger;
pub mod results_export;
pub mod snapshot;

pub use freshness_cache::{ArchiveCacheEntry, ArchiveFreshnessCache};
pub use grading_ledger::{GradingLedger, LedgerEntry, StudentRecord};
pub use results_export::{export_assignment_results, ExportedResults};
