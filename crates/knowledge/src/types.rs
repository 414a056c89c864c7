//! Core types for the knowledge base.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// A single record of the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,

    /// Accepts `YYYY-MM-DD` or any timestamp starting with it
    #[serde(default, deserialize_with = "deserialize_event_date")]
    pub event_date: Option<NaiveDate>,

    #[serde(default)]
    pub image_url: String,

    /// Comma-separated labels
    #[serde(default)]
    pub tags: String,

    #[serde(default)]
    pub source_url: String,

    /// Dense embedding; accepts a JSON array or a string holding one
    #[serde(default, deserialize_with = "deserialize_vector")]
    pub vector: Option<Vec<f32>>,
}

impl Document {
    /// Whether the document takes part in vector retrieval.
    pub fn has_vector(&self) -> bool {
        self.vector.as_ref().is_some_and(|v| !v.is_empty())
    }

    /// Title, content and tags joined for lexical matching.
    pub fn haystack(&self) -> String {
        format!("{} {} {}", self.title, self.content, self.tags)
    }

    pub fn year(&self) -> Option<i32> {
        self.event_date.map(|d| d.year())
    }

    /// Content length after collapsing whitespace, in characters.
    pub fn article_len(&self) -> usize {
        self.content.split_whitespace().map(|w| w.chars().count() + 1).sum::<usize>().saturating_sub(1)
    }
}

fn deserialize_event_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_event_date))
}

/// Parse the date part of `YYYY-MM-DD[...]`; anything else is undated.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVector {
    Floats(Vec<f32>),
    Encoded(String),
}

fn deserialize_vector<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawVector> = Option::deserialize(deserializer)?;
    let vector = match raw {
        Some(RawVector::Floats(v)) => Some(v),
        Some(RawVector::Encoded(s)) => serde_json::from_str::<Vec<f32>>(&s).ok(),
        None => None,
    };
    Ok(vector.filter(|v| !v.is_empty()))
}

/// A document paired with its per-request scores.
#[derive(Debug, Clone)]
pub struct Hit {
    pub doc: Arc<Document>,
    pub cosine_sim: f32,
    pub tag_sim: f32,
    pub token_overlap: usize,
    /// Accumulated score; adjusted by intent weights and boosts
    pub score: f32,
}

impl Hit {
    pub fn id(&self) -> i64 {
        self.doc.id
    }
}

/// Top-of-list entry reported in diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingDebug {
    pub id: i64,
    pub title: String,
    pub score: f32,
    pub sim: f32,
    pub tag_sim: f32,
    pub overlap: usize,
}

impl From<&Hit> for RankingDebug {
    fn from(hit: &Hit) -> Self {
        Self {
            id: hit.doc.id,
            title: hit.doc.title.clone(),
            score: round3(hit.score),
            sim: round3(hit.cosine_sim),
            tag_sim: round3(hit.tag_sim),
            overlap: hit.token_overlap,
        }
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Aggregate counts of the current snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStats {
    pub documents: usize,
    pub vectorized: usize,
    pub generation: u64,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// One row of the chronological listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub title: String,
    pub date: Option<NaiveDate>,
    pub image_url: String,
}
