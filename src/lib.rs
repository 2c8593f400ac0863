pub mod analytics;
pub mod config;
pub mod csv_parser;
pub mod error;
pub mod logging;
pub mod post;
pub mod reporter;
pub mod sample;
pub mod session;

pub use analytics::{Aggregator, AnalyticsData, AnalyticsOptions, TimeBucket};
pub use config::Config;
pub use csv_parser::{CsvParser, CsvSource, ParseOutcome, RowIssue, SourceStatus};
pub use error::PulseError;
pub use post::{Engagement, Post, SentimentLabel};
pub use reporter::{ReportFormat, Reporter};
pub use sample::SampleGenerator;
pub use session::{Dashboard, DataSource};

pub type Result<T> = std::result::Result<T, PulseError>;
