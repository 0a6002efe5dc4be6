//! The single-quoted `'reply','thumbnail','video'` reply format.
//!
//! The pipeline never enforces this shape; these helpers exist for clients,
//! logging and tests that need to tell the two reply shapes apart.

use thiserror::Error;
use url::Url;

pub const SEGMENT_SEPARATOR: &str = "','";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recommendation {
    pub reply: String,
    pub thumbnail_url: Url,
    pub video_url: Url,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecommendationError {
    #[error("recommendation must be wrapped in single quotes")]
    NotQuoted,
    #[error("recommendation must have exactly 3 segments, found {0}")]
    SegmentCount(usize),
    #[error("recommendation segment `{0}` is empty")]
    EmptySegment(&'static str),
    #[error("recommendation {segment} is not a valid url: {value}")]
    InvalidUrl { segment: &'static str, value: String },
}

impl Recommendation {
    pub fn parse(text: &str) -> Result<Self, RecommendationError> {
        let inner = text
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
            .ok_or(RecommendationError::NotQuoted)?;

        let segments = inner.split(SEGMENT_SEPARATOR).collect::<Vec<_>>();
        if segments.len() != 3 {
            return Err(RecommendationError::SegmentCount(segments.len()));
        }

        let reply = non_empty("reply", segments[0])?;
        let thumbnail_url = parse_url("thumbnail", segments[1])?;
        let video_url = parse_url("video", segments[2])?;

        Ok(Self { reply: reply.to_string(), thumbnail_url, video_url })
    }
}

fn non_empty<'a>(segment: &'static str, value: &'a str) -> Result<&'a str, RecommendationError> {
    if value.trim().is_empty() {
        return Err(RecommendationError::EmptySegment(segment));
    }
    Ok(value)
}

fn parse_url(segment: &'static str, value: &str) -> Result<Url, RecommendationError> {
    let value = non_empty(segment, value)?;
    let url = Url::parse(value).map_err(|_| RecommendationError::InvalidUrl {
        segment,
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(RecommendationError::InvalidUrl { segment, value: value.to_string() }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyShape {
    Prose { words: usize },
    Recommendation(Recommendation),
    MalformedRecommendation(RecommendationError),
}

impl ReplyShape {
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('\'') && trimmed.contains(SEGMENT_SEPARATOR) {
            return match Recommendation::parse(trimmed) {
                Ok(recommendation) => Self::Recommendation(recommendation),
                Err(error) => Self::MalformedRecommendation(error),
            };
        }

        Self::Prose { words: trimmed.split_whitespace().count() }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Prose { .. } => "prose",
            Self::Recommendation(_) => "recommendation",
            Self::MalformedRecommendation(_) => "malformed_recommendation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Recommendation, RecommendationError, ReplyShape};

    const TRIPLE: &str = "'Try this deep dive on sleep.','https://i.ytimg.com/vi/abc123/maxresdefault.jpg','https://www.youtube.com/watch?v=abc123'";

    #[test]
    fn well_formed_triple_parses_into_three_segments() {
        let recommendation = Recommendation::parse(TRIPLE).expect("triple should parse");

        assert_eq!(recommendation.reply, "Try this deep dive on sleep.");
        assert_eq!(recommendation.thumbnail_url.host_str(), Some("i.ytimg.com"));
        assert_eq!(recommendation.video_url.query(), Some("v=abc123"));
        assert_eq!(TRIPLE.split("','").count(), 3);
    }

    #[test]
    fn empty_video_url_is_rejected() {
        let error = Recommendation::parse("'Watch this','https://img.example/x.jpg',''")
            .expect_err("empty url must fail");
        assert_eq!(error, RecommendationError::EmptySegment("video"));
    }

    #[test]
    fn non_url_thumbnail_is_rejected() {
        let error = Recommendation::parse("'Watch this','no thumbnail','https://youtu.be/x'")
            .expect_err("bad url must fail");
        assert!(matches!(error, RecommendationError::InvalidUrl { segment: "thumbnail", .. }));
    }

    #[test]
    fn extra_segments_are_rejected() {
        let error = Recommendation::parse("'a','https://a.example','https://b.example','c'")
            .expect_err("four segments must fail");
        assert_eq!(error, RecommendationError::SegmentCount(4));
    }

    #[test]
    fn prose_is_classified_with_word_count() {
        let shape = ReplyShape::classify("We have several videos about sleep and recovery.");
        assert_eq!(shape, ReplyShape::Prose { words: 8 });
        assert_eq!(shape.label(), "prose");
    }

    #[test]
    fn triple_is_classified_as_recommendation() {
        let shape = ReplyShape::classify(TRIPLE);
        assert_eq!(shape.label(), "recommendation");
    }
}
