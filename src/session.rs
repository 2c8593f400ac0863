use crate::analytics::{Aggregator, AnalyticsData};
use crate::config::Config;
use crate::csv_parser::{CsvParser, RowIssue};
use crate::post::Post;
use crate::sample::SampleGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the posts currently held by a [`Dashboard`] came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    None,
    Upload { name: String },
    Sample,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::None => f.write_str("no data"),
            DataSource::Upload { name } => write!(f, "upload ({})", name),
            DataSource::Sample => f.write_str("sample data"),
        }
    }
}

/// In-memory interaction state behind the dashboard: the loaded posts, the
/// analytics derived from them and at most one user-visible error.
///
/// Every successful load replaces the posts and recomputes the analytics from
/// scratch. A failed load only sets the error; whatever was loaded before
/// stays on screen.
pub struct Dashboard {
    parser: CsvParser,
    aggregator: Aggregator,
    generator: SampleGenerator,
    posts: Vec<Post>,
    analytics: Option<AnalyticsData>,
    skipped: Vec<RowIssue>,
    error: Option<String>,
    source: DataSource,
}

impl Dashboard {
    pub fn new(config: &Config) -> crate::Result<Self> {
        Ok(Self {
            parser: CsvParser::new(&config.csv)?,
            aggregator: Aggregator::new((&config.analytics).into()),
            generator: SampleGenerator::new(&config.sample),
            posts: Vec::new(),
            analytics: None,
            skipped: Vec::new(),
            error: None,
            source: DataSource::None,
        })
    }

    /// Handle an uploaded file's contents.
    pub fn load_csv(&mut self, name: &str, content: &str) -> Option<&AnalyticsData> {
        match self.parser.parse_str(content) {
            Ok(outcome) => {
                tracing::info!(
                    file = name,
                    posts = outcome.posts.len(),
                    skipped = outcome.skipped.len(),
                    "loaded upload"
                );
                self.skipped = outcome.skipped;
                self.replace_posts(
                    outcome.posts,
                    DataSource::Upload {
                        name: name.to_string(),
                    },
                );
            }
            Err(e) => {
                tracing::warn!(file = name, error = %e, "upload rejected");
                self.error = Some(e.to_string());
            }
        }
        self.analytics.as_ref()
    }

    pub fn load_sample(&mut self) -> &AnalyticsData {
        self.load_sample_at(Utc::now())
    }

    pub fn load_sample_at(&mut self, reference: DateTime<Utc>) -> &AnalyticsData {
        let posts = self.generator.generate(reference);
        self.skipped.clear();
        self.replace_posts(posts, DataSource::Sample)
    }

    pub fn reset(&mut self) {
        self.posts.clear();
        self.analytics = None;
        self.skipped.clear();
        self.error = None;
        self.source = DataSource::None;
    }

    fn replace_posts(&mut self, posts: Vec<Post>, source: DataSource) -> &AnalyticsData {
        let analytics = self.aggregator.aggregate(&posts);
        self.posts = posts;
        self.source = source;
        self.error = None;
        self.analytics.insert(analytics)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn analytics(&self) -> Option<&AnalyticsData> {
        self.analytics.as_ref()
    }

    pub fn skipped_rows(&self) -> &[RowIssue] {
        &self.skipped
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn has_data(&self) -> bool {
        !self.posts.is_empty()
    }
}
