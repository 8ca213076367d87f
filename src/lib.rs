// Library interface for SleepRS modules
// This allows integration tests and benches to access the core functionality

pub mod advice;
pub mod advisor;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod reminder;
pub mod store;

// Re-export commonly used types for convenience
pub use models::*;
pub use advice::{AdvicePayload, AdviceSource, AnalysisResult, SchedulePlan, SleepIssue};
pub use advisor::{AdvisorReport, SleepAdvisor};
pub use metrics::{TrackerStats, WeeklyMetrics};
pub use provider::{AdviceProvider, GeminiProvider, ProviderReply};
pub use store::{JsonFileStore, MemoryStore, RecordStore};
pub use export::ExportFormat;
pub use config::AppConfig;
pub use error::{SleepRsError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};
