pub mod atr;
pub mod clustering;
pub mod combine;
pub mod diagnostics;
pub mod engine;
pub mod tolerance;
pub mod weights;

pub use atr::{max_latest_atr, rolling_atr};
pub use clustering::{cluster, group_prices, GroupingStrategy, SeriesOrigin};
pub use combine::combine;
pub use diagnostics::{diagnose, RangeDiagnostics};
pub use engine::{analyze, AnalysisReport, ToleranceSummary};
pub use tolerance::{ToleranceConfig, ToleranceMode, ToleranceModel};
pub use weights::TimeframeWeighter;
