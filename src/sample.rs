//! Synthetic post data for demo mode.
//!
//! Produces a believable mix of brands, topics, sentiment and engagement
//! without any external input. Seeded generators are fully reproducible.

use crate::config::{SampleConfig, MAX_SAMPLE_DAYS};
use crate::post::{Engagement, Post, SentimentLabel};
use chrono::{DateTime, Utc};
use rand::prelude::*;

pub const BRANDS: [&str; 6] = [
    "Acme",
    "Globex",
    "Initech",
    "Umbrella",
    "Hooli",
    "Soylent",
];

pub const TOPICS: [&str; 6] = [
    "product",
    "support",
    "pricing",
    "shipping",
    "campaign",
    "sustainability",
];

const POSITIVE_TEMPLATES: [&str; 4] = [
    "Really impressed with {brand} and their {topic} lately",
    "{brand} nailed it again, the {topic} is fantastic",
    "Huge thanks to {brand}, loving the {topic}",
    "Best experience I've had with {brand} {topic} so far",
];

const NEUTRAL_TEMPLATES: [&str; 4] = [
    "Anyone else following the {brand} {topic} news?",
    "Saw an update from {brand} about {topic} today",
    "Not sure what to think about {brand} {topic} yet",
    "{brand} posted something about {topic}",
];

const NEGATIVE_TEMPLATES: [&str; 4] = [
    "Pretty disappointed with {brand} {topic} this week",
    "{brand} really dropped the ball on {topic}",
    "Still waiting on {brand} to fix their {topic}",
    "Worst {topic} experience, come on {brand}",
];

/// Generator of synthetic posts.
pub struct SampleGenerator {
    /// Random number generator
    rng: StdRng,
    /// Every batch restarts from this seed when set
    seed: Option<u64>,
    /// Number of posts per batch
    count: usize,
    /// Posts are spread over this many days before the reference time
    days: i64,
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self::new(&SampleConfig::default())
    }
}

impl SampleGenerator {
    /// Seeded when the config carries a seed, entropy-seeded otherwise.
    pub fn new(config: &SampleConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            seed: config.seed,
            count: config.count,
            days: config.days.clamp(1, MAX_SAMPLE_DAYS),
        }
    }

    pub fn with_seed(seed: u64, count: usize, days: i64) -> Self {
        Self::new(&SampleConfig {
            count,
            seed: Some(seed),
            days,
        })
    }

    /// Generate one batch of posts ending at `reference`, ordered by time.
    ///
    /// A seeded generator returns the same batch for the same reference on
    /// every call.
    pub fn generate(&mut self, reference: DateTime<Utc>) -> Vec<Post> {
        if let Some(seed) = self.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        let span_secs = self.days * 86_400;
        let reference_secs = reference.timestamp();

        let mut posts: Vec<Post> = (0..self.count)
            .map(|_| {
                let offset = self.rng.gen_range(0..span_secs);
                let timestamp =
                    DateTime::from_timestamp(reference_secs - offset, 0).unwrap_or(reference);
                self.generate_post(timestamp)
            })
            .collect();

        posts.sort_by_key(|post| post.timestamp);
        for (i, post) in posts.iter_mut().enumerate() {
            post.id = format!("sample-{:04}", i + 1);
        }

        tracing::debug!(count = posts.len(), days = self.days, "generated sample posts");
        posts
    }

    fn generate_post(&mut self, timestamp: DateTime<Utc>) -> Post {
        let brand = BRANDS[self.rng.gen_range(0..BRANDS.len())];
        let topic = TOPICS[self.rng.gen_range(0..TOPICS.len())];
        let sentiment = self.random_label();
        let score = self.score_for(sentiment);

        Post {
            id: String::new(),
            timestamp,
            text: self.generate_text(sentiment, brand, topic),
            sentiment,
            score,
            brand: brand.to_string(),
            topic: topic.to_string(),
            engagement: self.random_engagement(),
        }
    }

    fn random_label(&mut self) -> SentimentLabel {
        let roll: f64 = self.rng.gen();
        if roll < 0.45 {
            SentimentLabel::Positive
        } else if roll < 0.70 {
            SentimentLabel::Neutral
        } else {
            SentimentLabel::Negative
        }
    }

    /// Score consistent with the label, rounded to two decimals.
    fn score_for(&mut self, label: SentimentLabel) -> f64 {
        let raw: f64 = match label {
            SentimentLabel::Positive => self.rng.gen_range(0.1..=1.0),
            SentimentLabel::Neutral => self.rng.gen_range(-0.05..=0.05),
            SentimentLabel::Negative => self.rng.gen_range(-1.0..=-0.1),
        };
        ((raw * 100.0).round() / 100.0).clamp(-1.0, 1.0)
    }

    fn generate_text(&mut self, label: SentimentLabel, brand: &str, topic: &str) -> String {
        let templates = match label {
            SentimentLabel::Positive => &POSITIVE_TEMPLATES,
            SentimentLabel::Neutral => &NEUTRAL_TEMPLATES,
            SentimentLabel::Negative => &NEGATIVE_TEMPLATES,
        };
        let template = templates[self.rng.gen_range(0..templates.len())];
        format!(
            "{} #{}",
            template.replace("{brand}", brand).replace("{topic}", topic),
            topic
        )
    }

    /// Heavy-tailed engagement: most posts get a handful of reactions, a few
    /// get hundreds.
    fn random_engagement(&mut self) -> Engagement {
        let base = self.rng.gen_range(1.0_f64..10.0);
        let likes = (base.powi(2) * self.rng.gen_range(1.0..5.0)) as u64;
        let shares = (likes as f64 * self.rng.gen_range(0.1..0.5)) as u64;
        let comments = (likes as f64 * self.rng.gen_range(0.05..0.2)) as u64;
        Engagement::new(likes, shares, comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = SampleGenerator::with_seed(7, 50, 30).generate(reference());
        let b = SampleGenerator::with_seed(7, 50, 30).generate(reference());
        assert_eq!(a, b);

        let c = SampleGenerator::with_seed(8, 50, 30).generate(reference());
        assert_ne!(a, c);
    }

    #[test]
    fn test_seeded_generator_repeats_across_calls() {
        let mut generator = SampleGenerator::with_seed(7, 30, 30);
        let first = generator.generate(reference());
        let second = generator.generate(reference());
        assert_eq!(first, second);
    }

    #[test]
    fn test_days_are_clamped() {
        let posts = SampleGenerator::with_seed(2, 20, i64::MAX).generate(reference());
        assert_eq!(posts.len(), 20);

        let earliest = reference() - chrono::Duration::days(MAX_SAMPLE_DAYS);
        assert!(posts.iter().all(|p| p.timestamp > earliest));

        let posts = SampleGenerator::with_seed(2, 20, -4).generate(reference());
        let earliest = reference() - chrono::Duration::days(1);
        assert!(posts.iter().all(|p| p.timestamp > earliest));
    }

    #[test]
    fn test_generates_requested_count_within_window() {
        let posts = SampleGenerator::with_seed(1, 200, 14).generate(reference());
        assert_eq!(posts.len(), 200);

        let earliest = reference() - chrono::Duration::days(14);
        for post in &posts {
            assert!(post.timestamp <= reference());
            assert!(post.timestamp > earliest);
        }
        assert!(posts.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_scores_agree_with_labels() {
        let posts = SampleGenerator::with_seed(3, 300, 30).generate(reference());
        for post in &posts {
            assert!((-1.0..=1.0).contains(&post.score));
            match post.sentiment {
                SentimentLabel::Positive => assert!(post.score > 0.0),
                SentimentLabel::Negative => assert!(post.score < 0.0),
                SentimentLabel::Neutral => assert!(post.score.abs() <= 0.05),
            }
        }
    }

    #[test]
    fn test_text_mentions_brand_and_topic_hashtag() {
        let posts = SampleGenerator::with_seed(11, 40, 30).generate(reference());
        for post in &posts {
            assert!(post.text.contains(&post.brand));
            assert!(post.text.ends_with(&format!("#{}", post.topic)));
            assert!(BRANDS.contains(&post.brand.as_str()));
            assert!(TOPICS.contains(&post.topic.as_str()));
        }
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let posts = SampleGenerator::with_seed(5, 12, 30).generate(reference());
        assert_eq!(posts[0].id, "sample-0001");
        assert_eq!(posts[11].id, "sample-0012");
    }

    #[test]
    fn test_zero_count_yields_no_posts() {
        let posts = SampleGenerator::with_seed(5, 0, 30).generate(reference());
        assert!(posts.is_empty());
    }
}
