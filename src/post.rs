use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scores strictly above this are positive when no label is supplied.
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Scores strictly below this are negative when no label is supplied.
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

/// One social-media mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub sentiment: SentimentLabel,
    /// Polarity in [-1, 1].
    pub score: f64,
    pub brand: String,
    pub topic: String,
    pub engagement: Engagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    pub fn from_score(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "pos" => Ok(SentimentLabel::Positive),
            "neutral" | "neu" => Ok(SentimentLabel::Neutral),
            "negative" | "neg" => Ok(SentimentLabel::Negative),
            other => Err(format!("unknown sentiment label '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
}

impl Engagement {
    pub fn new(likes: u64, shares: u64, comments: u64) -> Self {
        Self {
            likes,
            shares,
            comments,
        }
    }

    /// Saturates at `u64::MAX` instead of overflowing.
    pub fn total(&self) -> u64 {
        self.likes
            .saturating_add(self.shares)
            .saturating_add(self.comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_score_thresholds() {
        assert_eq!(SentimentLabel::from_score(0.8), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.05), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.05), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.3), SentimentLabel::Negative);
    }

    #[test]
    fn test_label_parsing_is_case_insensitive() {
        assert_eq!("Positive".parse(), Ok(SentimentLabel::Positive));
        assert_eq!(" NEG ".parse(), Ok(SentimentLabel::Negative));
        assert_eq!("neu".parse(), Ok(SentimentLabel::Neutral));
        assert!("meh".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn test_engagement_total() {
        assert_eq!(Engagement::new(10, 4, 3).total(), 17);
        assert_eq!(Engagement::default().total(), 0);
    }

    #[test]
    fn test_engagement_total_saturates() {
        assert_eq!(Engagement::new(u64::MAX, 1, 1).total(), u64::MAX);
        assert_eq!(Engagement::new(u64::MAX / 2, u64::MAX / 2, 5).total(), u64::MAX);
    }
}
