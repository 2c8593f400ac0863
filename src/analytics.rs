use crate::config::AnalyticsConfig;
use crate::post::{Post, SentimentLabel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

const HOUR_SECS: i64 = 3_600;
const DAY_SECS: i64 = 86_400;
const WEEK_SECS: i64 = 7 * DAY_SECS;
/// 1970-01-05, the first Monday after the Unix epoch.
const FIRST_MONDAY_SECS: i64 = 4 * DAY_SECS;

/// Granularity of the time series, always in UTC.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Hour,
    #[default]
    Day,
    /// ISO week starting on Monday.
    Week,
}

impl TimeBucket {
    pub fn bucket_start(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let secs = timestamp.timestamp();
        let start = match self {
            TimeBucket::Hour => secs - secs.rem_euclid(HOUR_SECS),
            TimeBucket::Day => secs - secs.rem_euclid(DAY_SECS),
            TimeBucket::Week => secs - (secs - FIRST_MONDAY_SECS).rem_euclid(WEEK_SECS),
        };
        DateTime::from_timestamp(start, 0).unwrap_or(timestamp)
    }

    pub fn label(&self, start: DateTime<Utc>) -> String {
        match self {
            TimeBucket::Hour => start.format("%Y-%m-%d %H:00").to_string(),
            TimeBucket::Day => start.format("%Y-%m-%d").to_string(),
            TimeBucket::Week => start.format("%G-W%V").to_string(),
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeBucket::Hour => "hour",
            TimeBucket::Day => "day",
            TimeBucket::Week => "week",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentBreakdown {
    pub fn record(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Negative => self.negative += 1,
        }
    }

    pub fn count(&self, label: SentimentLabel) -> usize {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    pub fn percentages(&self) -> SentimentPercentages {
        let total = self.total();
        SentimentPercentages {
            positive: percentage(self.positive, total),
            neutral: percentage(self.neutral, total),
            negative: percentage(self.negative, total),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentPercentages {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

/// One entry of a brand or topic ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub name: String,
    pub count: usize,
    /// Share of all posts, 0-100.
    pub percentage: f64,
    pub average_score: f64,
    pub breakdown: SentimentBreakdown,
    pub total_engagement: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub bucket_start: DateTime<Utc>,
    pub label: String,
    pub count: usize,
    pub average_score: f64,
    pub breakdown: SentimentBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementSummary {
    pub total_likes: u64,
    pub total_shares: u64,
    pub total_comments: u64,
    pub total: u64,
    pub average_likes: f64,
    pub average_shares: f64,
    pub average_comments: f64,
    pub average_total: f64,
    pub most_engaging_post: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Read-only summary derived from a post collection. Always recomputed
/// wholesale from the posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsData {
    pub total_posts: usize,
    pub sentiment_breakdown: SentimentBreakdown,
    pub sentiment_percentages: SentimentPercentages,
    /// Mean of all post scores; 0 for an empty collection.
    pub average_score: f64,
    pub top_brands: Vec<CategoryStats>,
    pub top_topics: Vec<CategoryStats>,
    pub time_series: Vec<TimeSeriesPoint>,
    pub bucket: TimeBucket,
    pub engagement: EngagementSummary,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsOptions {
    pub top_n: usize,
    pub bucket: TimeBucket,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self::from(&AnalyticsConfig::default())
    }
}

impl From<&AnalyticsConfig> for AnalyticsOptions {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            top_n: config.top_n,
            bucket: config.bucket,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    count: usize,
    score_sum: f64,
    breakdown: SentimentBreakdown,
    engagement: u64,
}

impl Tally {
    fn add(&mut self, post: &Post) {
        self.count += 1;
        self.score_sum += post.score;
        self.breakdown.record(post.sentiment);
        self.engagement = self.engagement.saturating_add(post.engagement.total());
    }

    fn average_score(&self) -> f64 {
        mean(self.score_sum, self.count).clamp(-1.0, 1.0)
    }
}

/// Turns a post collection into [`AnalyticsData`]. Pure: no I/O, no state
/// carried between calls.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    options: AnalyticsOptions,
}

impl Aggregator {
    pub fn new(options: AnalyticsOptions) -> Self {
        Self { options }
    }

    pub fn aggregate(&self, posts: &[Post]) -> AnalyticsData {
        let total_posts = posts.len();

        let mut sentiment_breakdown = SentimentBreakdown::default();
        let mut score_sum = 0.0;
        for post in posts {
            sentiment_breakdown.record(post.sentiment);
            score_sum += post.score;
        }

        let top_brands = self.rank(posts, total_posts, |post| post.brand.as_str());
        let top_topics = self.rank(posts, total_posts, |post| post.topic.as_str());

        tracing::debug!(
            total_posts,
            brands = top_brands.len(),
            topics = top_topics.len(),
            bucket = %self.options.bucket,
            "aggregated posts"
        );

        AnalyticsData {
            total_posts,
            sentiment_breakdown,
            sentiment_percentages: sentiment_breakdown.percentages(),
            average_score: mean(score_sum, total_posts).clamp(-1.0, 1.0),
            top_brands,
            top_topics,
            time_series: self.time_series(posts),
            bucket: self.options.bucket,
            engagement: engagement_summary(posts),
            date_range: date_range(posts),
        }
    }

    /// Top-N groups by post count, ties broken by name.
    fn rank<'a, F>(&self, posts: &'a [Post], total_posts: usize, key: F) -> Vec<CategoryStats>
    where
        F: Fn(&'a Post) -> &'a str,
    {
        let mut groups: HashMap<&str, Tally> = HashMap::new();
        for post in posts {
            groups.entry(key(post)).or_default().add(post);
        }

        let mut ranked: Vec<CategoryStats> = groups
            .into_iter()
            .map(|(name, tally)| CategoryStats {
                name: name.to_string(),
                count: tally.count,
                percentage: percentage(tally.count, total_posts),
                average_score: tally.average_score(),
                breakdown: tally.breakdown,
                total_engagement: tally.engagement,
            })
            .collect();

        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        ranked.truncate(self.options.top_n);
        ranked
    }

    fn time_series(&self, posts: &[Post]) -> Vec<TimeSeriesPoint> {
        let bucket = self.options.bucket;
        let mut buckets: BTreeMap<DateTime<Utc>, Tally> = BTreeMap::new();
        for post in posts {
            buckets
                .entry(bucket.bucket_start(post.timestamp))
                .or_default()
                .add(post);
        }

        buckets
            .into_iter()
            .map(|(start, tally)| TimeSeriesPoint {
                bucket_start: start,
                label: bucket.label(start),
                count: tally.count,
                average_score: tally.average_score(),
                breakdown: tally.breakdown,
            })
            .collect()
    }
}

fn engagement_summary(posts: &[Post]) -> EngagementSummary {
    let mut summary = EngagementSummary::default();
    let mut best: Option<(&Post, u64)> = None;
    // u64 totals saturate, so averages come from f64 sums
    let (mut likes, mut shares, mut comments) = (0.0, 0.0, 0.0);

    for post in posts {
        let engagement = &post.engagement;
        summary.total_likes = summary.total_likes.saturating_add(engagement.likes);
        summary.total_shares = summary.total_shares.saturating_add(engagement.shares);
        summary.total_comments = summary.total_comments.saturating_add(engagement.comments);
        likes += engagement.likes as f64;
        shares += engagement.shares as f64;
        comments += engagement.comments as f64;

        let total = engagement.total();
        // first post wins ties
        if best.map_or(true, |(_, best_total)| total > best_total) {
            best = Some((post, total));
        }
    }

    let count = posts.len();
    summary.total = summary
        .total_likes
        .saturating_add(summary.total_shares)
        .saturating_add(summary.total_comments);
    summary.average_likes = mean(likes, count);
    summary.average_shares = mean(shares, count);
    summary.average_comments = mean(comments, count);
    summary.average_total = mean(likes + shares + comments, count);
    summary.most_engaging_post = best.map(|(post, _)| post.id.clone());
    summary
}

fn date_range(posts: &[Post]) -> Option<DateRange> {
    let start = posts.iter().map(|p| p.timestamp).min()?;
    let end = posts.iter().map(|p| p.timestamp).max()?;
    Some(DateRange { start, end })
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl AnalyticsData {
    pub fn is_empty(&self) -> bool {
        self.total_posts == 0
    }

    pub fn print_summary(&self) {
        println!("📊 Sentiment Analytics Summary");
        println!("=============================");

        println!("\n📝 Posts:");
        println!("  Total posts: {}", self.total_posts);
        if let Some(range) = &self.date_range {
            println!(
                "  Date range: {} → {}",
                range.start.format("%Y-%m-%d %H:%M"),
                range.end.format("%Y-%m-%d %H:%M")
            );
        }

        println!("\n💬 Sentiment:");
        for label in SentimentLabel::ALL {
            let share = match label {
                SentimentLabel::Positive => self.sentiment_percentages.positive,
                SentimentLabel::Neutral => self.sentiment_percentages.neutral,
                SentimentLabel::Negative => self.sentiment_percentages.negative,
            };
            println!(
                "  {:<9} {:>6} ({:.1}%)",
                label,
                self.sentiment_breakdown.count(label),
                share
            );
        }
        println!("  Average score: {:+.3}", self.average_score);

        println!("\n🏷️  Top brands:");
        for (i, brand) in self.top_brands.iter().enumerate() {
            println!(
                "  {}. {}: {} posts ({:.1}%), avg {:+.2}",
                i + 1,
                brand.name,
                brand.count,
                brand.percentage,
                brand.average_score
            );
        }

        println!("\n🧵 Top topics:");
        for (i, topic) in self.top_topics.iter().enumerate() {
            println!(
                "  {}. {}: {} posts ({:.1}%), avg {:+.2}",
                i + 1,
                topic.name,
                topic.count,
                topic.percentage,
                topic.average_score
            );
        }

        println!("\n❤️  Engagement:");
        println!(
            "  Likes: {} (avg {:.1}), shares: {} (avg {:.1}), comments: {} (avg {:.1})",
            self.engagement.total_likes,
            self.engagement.average_likes,
            self.engagement.total_shares,
            self.engagement.average_shares,
            self.engagement.total_comments,
            self.engagement.average_comments
        );

        println!(
            "\n📈 Time series ({} buckets per {}):",
            self.time_series.len(),
            self.bucket
        );
        for point in self.time_series.iter().take(10) {
            println!(
                "  {} {:>5} posts, avg {:+.2}",
                point.label, point.count, point.average_score
            );
        }
        if self.time_series.len() > 10 {
            println!("  … {} more", self.time_series.len() - 10);
        }
    }
}
