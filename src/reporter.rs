use crate::{
    analytics::{AnalyticsData, CategoryStats, TimeBucket},
    csv_parser::RowIssue,
    error::PulseError,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const JSON_REPORT: &str = "analytics_report.json";
pub const HTML_REPORT: &str = "analytics_report.html";
pub const MARKDOWN_SUMMARY: &str = "analytics_summary.md";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Html,
    Markdown,
    #[default]
    All,
}

impl ReportFormat {
    fn includes(&self, other: ReportFormat) -> bool {
        *self == ReportFormat::All || *self == other
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub analytics: AnalyticsData,
    pub skipped_rows: Vec<RowIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub source: String,
    pub version: String,
    pub analysis_duration_ms: u128,
    pub bucket: TimeBucket,
}

pub struct Reporter;

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_report(
        &self,
        analytics: &AnalyticsData,
        skipped_rows: &[RowIssue],
        source: &str,
        duration_ms: u128,
    ) -> Report {
        Report {
            metadata: ReportMetadata {
                generated_at: chrono::Utc::now().to_rfc3339(),
                source: source.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                analysis_duration_ms: duration_ms,
                bucket: analytics.bucket,
            },
            analytics: analytics.clone(),
            skipped_rows: skipped_rows.to_vec(),
        }
    }

    pub fn export_report(
        &self,
        report: &Report,
        output_dir: &Path,
        format: ReportFormat,
    ) -> crate::Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir).map_err(|source| PulseError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let mut exported_files = Vec::new();

        if format.includes(ReportFormat::Json) {
            let json_path = output_dir.join(JSON_REPORT);
            write_file(&json_path, &serde_json::to_string_pretty(report)?)?;
            exported_files.push(json_path);
        }

        if format.includes(ReportFormat::Html) {
            let html_path = output_dir.join(HTML_REPORT);
            write_file(&html_path, &self.generate_html_report(report))?;
            exported_files.push(html_path);
        }

        if format.includes(ReportFormat::Markdown) {
            let md_path = output_dir.join(MARKDOWN_SUMMARY);
            write_file(&md_path, &self.generate_markdown_summary(report))?;
            exported_files.push(md_path);
        }

        tracing::debug!(files = exported_files.len(), dir = %output_dir.display(), "exported report");
        Ok(exported_files)
    }

    pub fn generate_html_report(&self, report: &Report) -> String {
        let analytics = &report.analytics;
        let breakdown = &analytics.sentiment_breakdown;
        let percentages = &analytics.sentiment_percentages;

        let mut html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sentiment Analytics Report - {}</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }}
        .header {{ border-bottom: 2px solid #333; padding-bottom: 20px; }}
        .section {{ margin: 30px 0; }}
        .metric {{ display: inline-block; margin: 10px 20px 10px 0; padding: 10px; background: #f5f5f5; border-radius: 5px; }}
        .bar {{ height: 14px; display: inline-block; vertical-align: middle; }}
        .positive {{ background: #28a745; }}
        .neutral {{ background: #adb5bd; }}
        .negative {{ background: #ff6b6b; }}
        table {{ border-collapse: collapse; margin-top: 10px; }}
        th, td {{ border: 1px solid #ddd; padding: 6px 12px; text-align: left; }}
        th {{ background: #f5f5f5; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>Sentiment Analytics Report</h1>
        <p><strong>Source:</strong> {}</p>
        <p><strong>Generated:</strong> {}</p>
        <p><strong>Analysis Duration:</strong> {}ms</p>
    </div>

    <div class="section">
        <h2>Overview</h2>
        <div class="metric"><strong>Total Posts:</strong> {}</div>
        <div class="metric"><strong>Average Score:</strong> {:+.3}</div>
        <div class="metric"><strong>Total Engagement:</strong> {}</div>
    </div>

    <div class="section">
        <h2>Sentiment Breakdown</h2>
        <div>
            <span class="bar positive" style="width: {:.1}%"></span><span class="bar neutral" style="width: {:.1}%"></span><span class="bar negative" style="width: {:.1}%"></span>
        </div>
        <table>
            <tr><th>Sentiment</th><th>Posts</th><th>Share</th></tr>
            <tr><td>Positive</td><td>{}</td><td>{:.1}%</td></tr>
            <tr><td>Neutral</td><td>{}</td><td>{:.1}%</td></tr>
            <tr><td>Negative</td><td>{}</td><td>{:.1}%</td></tr>
        </table>
    </div>
"#,
            escape_html(&report.metadata.source),
            escape_html(&report.metadata.source),
            report.metadata.generated_at,
            report.metadata.analysis_duration_ms,
            analytics.total_posts,
            analytics.average_score,
            analytics.engagement.total,
            percentages.positive,
            percentages.neutral,
            percentages.negative,
            breakdown.positive,
            percentages.positive,
            breakdown.neutral,
            percentages.neutral,
            breakdown.negative,
            percentages.negative,
        );

        html.push_str(&self.ranking_table_html("Top Brands", "Brand", &analytics.top_brands));
        html.push_str(&self.ranking_table_html("Top Topics", "Topic", &analytics.top_topics));

        html.push_str(&format!(
            "\n    <div class=\"section\">\n        <h2>Posts per {}</h2>\n        <table>\n            <tr><th>Period</th><th>Posts</th><th>Positive</th><th>Neutral</th><th>Negative</th><th>Avg Score</th></tr>\n",
            analytics.bucket
        ));
        for point in &analytics.time_series {
            html.push_str(&format!(
                "            <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:+.2}</td></tr>\n",
                point.label,
                point.count,
                point.breakdown.positive,
                point.breakdown.neutral,
                point.breakdown.negative,
                point.average_score
            ));
        }
        html.push_str("        </table>\n    </div>\n");

        if !report.skipped_rows.is_empty() {
            html.push_str(&format!(
                "\n    <div class=\"section\">\n        <h2>Skipped Rows ({})</h2>\n        <ul>\n",
                report.skipped_rows.len()
            ));
            for issue in &report.skipped_rows {
                html.push_str(&format!(
                    "            <li>{}line {}: {}</li>\n",
                    issue
                        .source
                        .as_deref()
                        .map(|s| format!("{} ", escape_html(s)))
                        .unwrap_or_default(),
                    issue.line,
                    escape_html(&issue.reason)
                ));
            }
            html.push_str("        </ul>\n    </div>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn ranking_table_html(&self, title: &str, column: &str, entries: &[CategoryStats]) -> String {
        let mut html = format!(
            "\n    <div class=\"section\">\n        <h2>{}</h2>\n        <table>\n            <tr><th>#</th><th>{}</th><th>Posts</th><th>Share</th><th>Avg Score</th><th>Engagement</th></tr>\n",
            title, column
        );
        for (i, entry) in entries.iter().enumerate() {
            html.push_str(&format!(
                "            <tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:+.2}</td><td>{}</td></tr>\n",
                i + 1,
                escape_html(&entry.name),
                entry.count,
                entry.percentage,
                entry.average_score,
                entry.total_engagement
            ));
        }
        html.push_str("        </table>\n    </div>\n");
        html
    }

    pub fn generate_markdown_summary(&self, report: &Report) -> String {
        let analytics = &report.analytics;

        let mut md = format!(
            "# Sentiment Analytics Summary\n\n**Source:** {}\n**Generated:** {}\n**Analysis Duration:** {}ms\n\n",
            escape_markdown(&report.metadata.source),
            report.metadata.generated_at,
            report.metadata.analysis_duration_ms
        );

        md.push_str("## Overview\n\n");
        md.push_str(&format!("- **Total Posts:** {}\n", analytics.total_posts));
        md.push_str(&format!("- **Average Score:** {:+.3}\n", analytics.average_score));
        md.push_str(&format!(
            "- **Positive:** {} ({:.1}%)\n",
            analytics.sentiment_breakdown.positive, analytics.sentiment_percentages.positive
        ));
        md.push_str(&format!(
            "- **Neutral:** {} ({:.1}%)\n",
            analytics.sentiment_breakdown.neutral, analytics.sentiment_percentages.neutral
        ));
        md.push_str(&format!(
            "- **Negative:** {} ({:.1}%)\n",
            analytics.sentiment_breakdown.negative, analytics.sentiment_percentages.negative
        ));
        md.push_str(&format!(
            "- **Engagement:** {} likes, {} shares, {} comments\n\n",
            analytics.engagement.total_likes,
            analytics.engagement.total_shares,
            analytics.engagement.total_comments
        ));

        md.push_str("## Top Brands\n\n");
        push_ranking_markdown(&mut md, &analytics.top_brands);

        md.push_str("## Top Topics\n\n");
        push_ranking_markdown(&mut md, &analytics.top_topics);

        md.push_str(&format!("## Posts per {}\n\n", analytics.bucket));
        md.push_str("| Period | Posts | Avg Score |\n|---|---:|---:|\n");
        for point in &analytics.time_series {
            md.push_str(&format!(
                "| {} | {} | {:+.2} |\n",
                point.label, point.count, point.average_score
            ));
        }
        md.push('\n');

        if !report.skipped_rows.is_empty() {
            md.push_str(&format!("## Skipped Rows ({})\n\n", report.skipped_rows.len()));
            for issue in &report.skipped_rows {
                md.push_str(&format!(
                    "- line {}: {}\n",
                    issue.line,
                    escape_markdown(&issue.reason)
                ));
            }
        }

        md
    }
}

fn push_ranking_markdown(md: &mut String, entries: &[CategoryStats]) {
    for (i, entry) in entries.iter().enumerate() {
        md.push_str(&format!(
            "{}. **{}:** {} posts ({:.1}%), avg score {:+.2}\n",
            i + 1,
            escape_markdown(&entry.name),
            entry.count,
            entry.percentage,
            entry.average_score
        ));
    }
    md.push('\n');
}

fn write_file(path: &Path, content: &str) -> crate::Result<()> {
    fs::write(path, content).map_err(|source| PulseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '|' | '#') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Aggregator;
    use crate::post::{Engagement, Post, SentimentLabel};
    use chrono::{TimeZone, Utc};

    fn report() -> Report {
        let posts = vec![Post {
            id: "1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap(),
            text: "hi".to_string(),
            sentiment: SentimentLabel::Positive,
            score: 0.5,
            brand: "<Acme & Co>".to_string(),
            topic: "product".to_string(),
            engagement: Engagement::new(3, 1, 1),
        }];
        let analytics = Aggregator::default().aggregate(&posts);
        let skipped = vec![RowIssue {
            source: Some("feed.csv".to_string()),
            line: 4,
            reason: "score 'x' is not a number".to_string(),
        }];
        Reporter::new().generate_report(&analytics, &skipped, "feed.csv", 12)
    }

    #[test]
    fn test_html_escapes_user_text() {
        let html = Reporter::new().generate_html_report(&report());
        assert!(html.contains("&lt;Acme &amp; Co&gt;"));
        assert!(!html.contains("<Acme"));
        assert!(html.contains("Skipped Rows (1)"));
        assert!(html.contains("2024-02-01"));
    }

    #[test]
    fn test_markdown_summary_sections() {
        let md = Reporter::new().generate_markdown_summary(&report());
        assert!(md.starts_with("# Sentiment Analytics Summary"));
        assert!(md.contains("- **Total Posts:** 1"));
        assert!(md.contains("## Posts per day"));
        assert!(md.contains("\\<Acme & Co\\>"));
        assert!(md.contains("- line 4:"));
    }

    #[test]
    fn test_export_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let files = Reporter::new()
            .export_report(&report(), &out, ReportFormat::All)
            .unwrap();

        assert_eq!(files.len(), 3);
        for file in &files {
            assert!(file.exists());
        }

        let json = std::fs::read_to_string(out.join(JSON_REPORT)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["analytics"]["total_posts"], 1);
        assert_eq!(value["metadata"]["bucket"], "day");
        assert_eq!(value["skipped_rows"][0]["line"], 4);
    }

    #[test]
    fn test_export_single_format() {
        let dir = tempfile::tempdir().unwrap();
        let files = Reporter::new()
            .export_report(&report(), dir.path(), ReportFormat::Markdown)
            .unwrap();
        assert_eq!(files, vec![dir.path().join(MARKDOWN_SUMMARY)]);
    }
}
