use crate::config::CsvConfig;
use crate::error::PulseError;
use crate::post::{Engagement, Post, SentimentLabel};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;

pub const DEFAULT_TOPIC: &str = "general";

const CSV_HEADER: [&str; 10] = [
    "id",
    "timestamp",
    "text",
    "sentiment",
    "score",
    "brand",
    "topic",
    "likes",
    "shares",
    "comments",
];

/// Outcome of parsing one or more CSV inputs: the valid posts plus every row
/// that was rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub posts: Vec<Post>,
    pub skipped: Vec<RowIssue>,
    /// Per-input results, filled by [`CsvParser::parse_sources`].
    #[serde(default)]
    pub sources: Vec<SourceStatus>,
}

/// How one input fared in a multi-input parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub name: String,
    pub posts: usize,
    pub skipped: usize,
    /// Set when the input contributed nothing.
    pub error: Option<String>,
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIssue {
    /// Input the row came from, when several inputs were parsed together.
    pub source: Option<String>,
    /// 1-based line on which the record starts.
    pub line: u64,
    pub reason: String,
}

/// A named chunk of CSV text, e.g. the contents of an uploaded file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub name: String,
    pub content: String,
}

impl CsvSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Timestamp,
    Text,
    Sentiment,
    Score,
    Brand,
    Topic,
    Likes,
    Shares,
    Comments,
}

impl Field {
    fn from_header(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim_start_matches('\u{feff}')
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");

        let field = match normalized.as_str() {
            "id" | "post_id" => Field::Id,
            "timestamp" | "date" | "created_at" | "time" => Field::Timestamp,
            "text" | "content" | "message" | "body" => Field::Text,
            "sentiment" | "label" | "sentiment_label" => Field::Sentiment,
            "score" | "sentiment_score" | "polarity" => Field::Score,
            "brand" | "company" => Field::Brand,
            "topic" | "category" => Field::Topic,
            "likes" | "favorites" => Field::Likes,
            "shares" | "retweets" | "reposts" => Field::Shares,
            "comments" | "replies" => Field::Comments,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug)]
struct ColumnMap {
    id: usize,
    timestamp: usize,
    text: usize,
    score: usize,
    brand: usize,
    sentiment: Option<usize>,
    topic: Option<usize>,
    likes: Option<usize>,
    shares: Option<usize>,
    comments: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> crate::Result<Self> {
        let mut found: Vec<(Field, usize)> = Vec::new();
        for (index, header) in headers.iter().enumerate() {
            if let Some(field) = Field::from_header(header) {
                // first occurrence wins
                if !found.iter().any(|(f, _)| *f == field) {
                    found.push((field, index));
                }
            }
        }

        let lookup = |field: Field| found.iter().find(|(f, _)| *f == field).map(|(_, i)| *i);

        let required = [
            (Field::Id, "id"),
            (Field::Timestamp, "timestamp"),
            (Field::Text, "text"),
            (Field::Score, "score"),
            (Field::Brand, "brand"),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(field, _)| lookup(*field).is_none())
            .map(|(_, name)| *name)
            .collect();

        match (
            lookup(Field::Id),
            lookup(Field::Timestamp),
            lookup(Field::Text),
            lookup(Field::Score),
            lookup(Field::Brand),
        ) {
            (Some(id), Some(timestamp), Some(text), Some(score), Some(brand)) => Ok(Self {
                id,
                timestamp,
                text,
                score,
                brand,
                sentiment: lookup(Field::Sentiment),
                topic: lookup(Field::Topic),
                likes: lookup(Field::Likes),
                shares: lookup(Field::Shares),
                comments: lookup(Field::Comments),
            }),
            _ => Err(PulseError::no_valid_data(format!(
                "missing required column(s): {}",
                missing.join(", ")
            ))),
        }
    }
}

pub struct CsvParser {
    delimiter: u8,
    trim: bool,
    hashtag: Regex,
}

impl CsvParser {
    pub fn new(config: &CsvConfig) -> crate::Result<Self> {
        let delimiter = u8::try_from(config.delimiter).map_err(|_| {
            PulseError::Config(format!("delimiter '{}' is not a single byte", config.delimiter))
        })?;

        Ok(Self {
            delimiter,
            trim: config.trim,
            hashtag: Regex::new(r"#([A-Za-z0-9_]+)")?,
        })
    }

    /// Parse raw CSV text into validated posts.
    ///
    /// Malformed rows are skipped and reported in [`ParseOutcome::skipped`].
    /// Fails with [`PulseError::NoValidData`] when the input is empty, lacks a
    /// required column, or no row survives validation.
    pub fn parse_str(&self, input: &str) -> crate::Result<ParseOutcome> {
        if input.trim().is_empty() {
            return Err(PulseError::no_valid_data("the input is empty"));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(if self.trim { Trim::All } else { Trim::None })
            .from_reader(input.as_bytes());

        let headers = reader.headers()?.clone();
        let columns = ColumnMap::from_headers(&headers)?;
        tracing::debug!(?columns, "resolved CSV columns");

        let mut outcome = ParseOutcome::default();
        let mut rows = 0usize;

        for result in reader.records() {
            rows += 1;
            match result {
                Ok(record) if record.iter().all(|field| field.trim().is_empty()) => {
                    rows -= 1;
                }
                Ok(record) => {
                    let line = record.position().map_or(0, |p| p.line());
                    match self.parse_record(&record, &headers, &columns) {
                        Ok(post) => outcome.posts.push(post),
                        Err(reason) => outcome.skipped.push(RowIssue {
                            source: None,
                            line,
                            reason,
                        }),
                    }
                }
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line());
                    outcome.skipped.push(RowIssue {
                        source: None,
                        line,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for issue in &outcome.skipped {
            tracing::warn!(line = issue.line, reason = %issue.reason, "skipping malformed row");
        }

        if outcome.posts.is_empty() {
            let reason = if rows == 0 {
                "the file contains a header but no data rows".to_string()
            } else {
                format!("all {} row(s) were invalid", rows)
            };
            return Err(PulseError::no_valid_data(reason));
        }

        tracing::debug!(
            valid = outcome.posts.len(),
            skipped = outcome.skipped.len(),
            "parsed CSV input"
        );
        Ok(outcome)
    }

    /// Parse several inputs in parallel and concatenate them in input order.
    ///
    /// Inputs without valid data are recorded in [`ParseOutcome::sources`]
    /// and left out. The batch only fails when none of them produced a post.
    pub fn parse_sources(&self, sources: &[CsvSource]) -> crate::Result<ParseOutcome> {
        if sources.is_empty() {
            return Err(PulseError::no_valid_data("no input was provided"));
        }

        let results: Vec<(&CsvSource, crate::Result<ParseOutcome>)> = sources
            .par_iter()
            .map(|source| (source, self.parse_str(&source.content)))
            .collect();

        let total = results.len();
        let mut combined = ParseOutcome::default();
        let mut last_error = None;

        for (source, result) in results {
            match result {
                Ok(mut outcome) => {
                    tracing::debug!(
                        source = %source.name,
                        posts = outcome.posts.len(),
                        "parsed input"
                    );
                    for issue in &mut outcome.skipped {
                        issue.source = Some(source.name.clone());
                    }
                    combined.sources.push(SourceStatus {
                        name: source.name.clone(),
                        posts: outcome.posts.len(),
                        skipped: outcome.skipped.len(),
                        error: None,
                    });
                    combined.posts.append(&mut outcome.posts);
                    combined.skipped.append(&mut outcome.skipped);
                }
                Err(e) => {
                    tracing::warn!(source = %source.name, error = %e, "input rejected");
                    combined.sources.push(SourceStatus {
                        name: source.name.clone(),
                        posts: 0,
                        skipped: 0,
                        error: Some(e.to_string()),
                    });
                    last_error = Some(e);
                }
            }
        }

        if combined.posts.is_empty() {
            return Err(match last_error {
                Some(e) if total == 1 => e,
                _ => {
                    let failures = combined
                        .sources
                        .iter()
                        .filter_map(|s| s.error.as_ref().map(|e| format!("{}: {}", s.name, e)))
                        .collect::<Vec<_>>()
                        .join("; ");
                    PulseError::no_valid_data(format!(
                        "none of the {} input(s) contained valid rows ({})",
                        total, failures
                    ))
                }
            });
        }

        Ok(combined)
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        headers: &StringRecord,
        columns: &ColumnMap,
    ) -> Result<Post, String> {
        if record.len() != headers.len() {
            return Err(format!(
                "expected {} fields but found {}",
                headers.len(),
                record.len()
            ));
        }

        let get = |index: usize| record.get(index).unwrap_or("").trim();
        let get_opt = |index: Option<usize>| index.map(get).filter(|v| !v.is_empty());

        let id = get(columns.id);
        if id.is_empty() {
            return Err("id is empty".to_string());
        }

        let brand = get(columns.brand);
        if brand.is_empty() {
            return Err("brand is empty".to_string());
        }

        let raw_timestamp = get(columns.timestamp);
        let timestamp = parse_timestamp(raw_timestamp)
            .ok_or_else(|| format!("unrecognised timestamp '{}'", raw_timestamp))?;

        let score = parse_score(get(columns.score))?;

        let sentiment = match get_opt(columns.sentiment) {
            Some(raw) => raw.parse::<SentimentLabel>()?,
            None => SentimentLabel::from_score(score),
        };

        let text = get(columns.text).to_string();

        let topic = match get_opt(columns.topic) {
            Some(topic) => topic.to_string(),
            None => self.topic_from_text(&text),
        };

        let engagement = Engagement::new(
            parse_count("likes", get_opt(columns.likes))?,
            parse_count("shares", get_opt(columns.shares))?,
            parse_count("comments", get_opt(columns.comments))?,
        );

        Ok(Post {
            id: id.to_string(),
            timestamp,
            text,
            sentiment,
            score,
            brand: brand.to_string(),
            topic,
            engagement,
        })
    }

    fn topic_from_text(&self, text: &str) -> String {
        self.hashtag
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string())
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn parse_score(raw: &str) -> Result<f64, String> {
    let score = raw
        .parse::<f64>()
        .map_err(|_| format!("score '{}' is not a number", raw))?;

    if !score.is_finite() || !(-1.0..=1.0).contains(&score) {
        return Err(format!("score {} is outside [-1, 1]", raw));
    }

    Ok(score)
}

fn parse_count(name: &str, raw: Option<&str>) -> Result<u64, String> {
    match raw {
        None => Ok(0),
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| format!("{} '{}' is not a non-negative integer", name, value)),
    }
}

/// Write posts as CSV in the column layout [`CsvParser`] reads back.
pub fn write_posts<W: Write>(posts: &[Post], writer: W) -> crate::Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for post in posts {
        writer.write_record([
            post.id.clone(),
            post.timestamp.to_rfc3339(),
            post.text.clone(),
            post.sentiment.to_string(),
            post.score.to_string(),
            post.brand.clone(),
            post.topic.clone(),
            post.engagement.likes.to_string(),
            post.engagement.shares.to_string(),
            post.engagement.comments.to_string(),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn posts_to_csv(posts: &[Post]) -> crate::Result<String> {
    let mut buffer = Vec::new();
    write_posts(posts, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parser() -> CsvParser {
        CsvParser::new(&CsvConfig::default()).unwrap()
    }

    #[test]
    fn test_parses_well_formed_rows() {
        let input = indoc! {r#"
            id,timestamp,text,sentiment,score,brand,topic,likes,shares,comments
            1,2024-03-01T10:00:00Z,Love the new phone,positive,0.8,Acme,product,10,2,1
            2,2024-03-01 11:30:00,"Delivery was late, again",negative,-0.6,Globex,shipping,3,0,4
        "#};

        let outcome = parser().parse_str(input).unwrap();
        assert_eq!(outcome.posts.len(), 2);
        assert!(outcome.skipped.is_empty());

        let second = &outcome.posts[1];
        assert_eq!(second.text, "Delivery was late, again");
        assert_eq!(second.sentiment, SentimentLabel::Negative);
        assert_eq!(
            second.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap()
        );
        assert_eq!(second.engagement, Engagement::new(3, 0, 4));
    }

    #[test]
    fn test_skips_and_reports_malformed_rows() {
        let input = indoc! {r#"
            id,timestamp,text,sentiment,score,brand,topic,likes,shares,comments
            1,2024-03-01,ok,positive,0.5,Acme,product,1,1,1
            2,not-a-date,bad time,positive,0.5,Acme,product,1,1,1
            3,2024-03-01,bad score,positive,1.5,Acme,product,1,1,1
            4,2024-03-01,too few fields
            5,2024-03-01,bad label,ecstatic,0.2,Acme,product,1,1,1
            6,2024-03-01,negative likes,neutral,0.0,Acme,product,-3,1,1
            ,2024-03-01,no id,neutral,0.0,Acme,product,1,1,1
            8,2024-03-01,no brand,neutral,0.0,,product,1,1,1
        "#};

        let outcome = parser().parse_str(input).unwrap();
        assert_eq!(outcome.posts.len(), 1);
        assert_eq!(outcome.skipped.len(), 7);

        let lines: Vec<u64> = outcome.skipped.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6, 7, 8, 9]);
        assert!(outcome.skipped[0].reason.contains("timestamp"));
        assert!(outcome.skipped[1].reason.contains("outside"));
        assert!(outcome.skipped[2].reason.contains("fields"));
        assert!(outcome.skipped[3].reason.contains("ecstatic"));
        assert!(outcome.skipped[4].reason.contains("likes"));
        assert!(outcome.skipped[5].reason.contains("id"));
        assert!(outcome.skipped[6].reason.contains("brand"));
    }

    #[test]
    fn test_max_counts_parse_and_aggregate() {
        let input = indoc! {"
            id,timestamp,text,score,brand,likes,shares
            1,2024-01-01,x,0.1,Acme,18446744073709551615,1
            2,2024-01-02,y,0.2,Acme,10000000000000000000,0
            3,2024-01-03,z,0.3,Acme,10000000000000000000,0
        "};

        let outcome = parser().parse_str(input).unwrap();
        assert_eq!(outcome.posts[0].engagement.likes, u64::MAX);

        let analytics = crate::analytics::Aggregator::default().aggregate(&outcome.posts);
        assert_eq!(analytics.engagement.total_likes, u64::MAX);
        assert_eq!(analytics.engagement.total, u64::MAX);
        assert_eq!(analytics.top_brands[0].total_engagement, u64::MAX);
    }

    #[test]
    fn test_empty_input_is_no_valid_data() {
        for input in ["", "   \n\n"] {
            let err = parser().parse_str(input).unwrap_err();
            assert!(err.is_no_valid_data(), "unexpected error: {}", err);
        }
    }

    #[test]
    fn test_header_only_is_no_valid_data() {
        let err = parser()
            .parse_str("id,timestamp,text,score,brand\n")
            .unwrap_err();
        assert!(err.is_no_valid_data());
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn test_fully_invalid_rows_is_no_valid_data() {
        let input = indoc! {"
            id,timestamp,text,score,brand
            1,yesterday,x,0.1,Acme
            2,2024-01-01,y,abc,Acme
        "};
        let err = parser().parse_str(input).unwrap_err();
        assert!(err.is_no_valid_data());
        assert!(err.to_string().contains("all 2 row(s) were invalid"));
    }

    #[test]
    fn test_missing_required_columns() {
        let err = parser().parse_str("id,text,brand\n1,hello,Acme\n").unwrap_err();
        assert!(err.is_no_valid_data());
        let message = err.to_string();
        assert!(message.contains("timestamp"));
        assert!(message.contains("score"));
    }

    #[test]
    fn test_header_aliases_and_derived_fields() {
        let input = indoc! {r#"
            Post ID,Created-At,Content,Sentiment Score,Company,Retweets
            a1,1709287200,Big launch today #Launch and more #news,0.4,Acme,7
            a2,2024-03-01,meh,-0.02,Acme,
        "#};

        let outcome = parser().parse_str(input).unwrap();
        let first = &outcome.posts[0];
        assert_eq!(first.id, "a1");
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(first.sentiment, SentimentLabel::Positive);
        assert_eq!(first.topic, "launch");
        assert_eq!(first.engagement.shares, 7);

        let second = &outcome.posts[1];
        assert_eq!(second.sentiment, SentimentLabel::Neutral);
        assert_eq!(second.topic, DEFAULT_TOPIC);
        assert_eq!(second.engagement, Engagement::default());
    }

    #[test]
    fn test_custom_delimiter() {
        let config = CsvConfig {
            delimiter: ';',
            trim: true,
        };
        let parser = CsvParser::new(&config).unwrap();
        let outcome = parser
            .parse_str("id;timestamp;text;score;brand\n1;2024-01-01;a, b;0.3;Acme\n")
            .unwrap();
        assert_eq!(outcome.posts[0].text, "a, b");
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let input = concat!(
            "id,timestamp,text,score,brand\n",
            "\n",
            "1,2024-01-01,a,0.3,Acme\n",
            "   \n",
            "\n",
            "  \t \n",
            "2,2024-01-02,b,-0.3,Acme\n",
            " , ,,, \n",
        );
        let outcome = parser().parse_str(input).unwrap();
        assert_eq!(outcome.posts.len(), 2);
        assert!(outcome.skipped.is_empty());

        let untrimmed = CsvParser::new(&CsvConfig {
            delimiter: ',',
            trim: false,
        })
        .unwrap();
        let outcome = untrimmed.parse_str(input).unwrap();
        assert_eq!(outcome.posts.len(), 2);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_whitespace_rows_do_not_count_as_data() {
        let err = parser()
            .parse_str("id,timestamp,text,score,brand\n   \n\t\n")
            .unwrap_err();
        assert!(err.is_no_valid_data());
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn test_parse_sources_concatenates_in_order() {
        let sources = vec![
            CsvSource::new(
                "a.csv",
                "id,timestamp,text,score,brand\n1,2024-01-01,a,0.1,Acme\n",
            ),
            CsvSource::new("broken.csv", "nothing useful here\n"),
            CsvSource::new(
                "b.csv",
                indoc! {"
                    id,timestamp,text,score,brand
                    2,2024-01-02,b,0.2,Globex
                    x,bad,c,0.2,Globex
                "},
            ),
        ];

        let outcome = parser().parse_sources(&sources).unwrap();
        let ids: Vec<&str> = outcome.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].source.as_deref(), Some("b.csv"));

        let statuses: Vec<(&str, usize, usize, bool)> = outcome
            .sources
            .iter()
            .map(|s| (s.name.as_str(), s.posts, s.skipped, s.is_ok()))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("a.csv", 1, 0, true),
                ("broken.csv", 0, 0, false),
                ("b.csv", 1, 1, true),
            ]
        );
        assert!(outcome.sources[1]
            .error
            .as_deref()
            .unwrap()
            .contains("No valid data"));
    }

    #[test]
    fn test_parse_sources_fails_when_all_inputs_fail() {
        let sources = vec![
            CsvSource::new("a.csv", ""),
            CsvSource::new("b.csv", "id,timestamp,text,score,brand\n"),
        ];
        let err = parser().parse_sources(&sources).unwrap_err();
        assert!(err.is_no_valid_data());
        let message = err.to_string();
        assert!(message.contains("none of the 2 input(s)"));
        assert!(message.contains("a.csv: "));
        assert!(message.contains("b.csv: "));
    }

    #[test]
    fn test_written_csv_parses_back() {
        let posts = parser()
            .parse_str(indoc! {r#"
                id,timestamp,text,sentiment,score,brand,topic,likes,shares,comments
                1,2024-03-01T10:00:00Z,"Quotes ""in"", commas",positive,0.123456789,Acme,p,10,2,1
            "#})
            .unwrap()
            .posts;

        let csv = posts_to_csv(&posts).unwrap();
        let reparsed = parser().parse_str(&csv).unwrap().posts;
        assert_eq!(reparsed, posts);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("1709287200"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("March 1st"), None);
    }
}
