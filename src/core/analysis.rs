//! Feedback analysis.
//!
//! Buckets free-text comments into fixed keyword categories, classifies
//! sentiment from the rating with a lexicon fallback, and counts frequent
//! stemmed keywords. Everything here is pure: the same documents always yield
//! the same analysis, and an empty slice yields a zeroed one.

use crate::core::feedback::Feedback;
use rust_stemmers::{Algorithm, Stemmer};
use serde::Serialize;
use std::collections::HashMap;

/// How many categories are reported.
const TOP_CATEGORIES: usize = 5;
/// How many keywords are reported.
const TOP_KEYWORDS: usize = 10;

struct Category {
    name: &'static str,
    keywords: &'static [&'static str],
}

const FOOD: &[&str] = &["food", "meal", "catering", "taste", "quality", "menu"];
const ORGANIZATION: &[&str] = &[
    "organiz",
    "arrang",
    "planning",
    "schedule",
    "timing",
    "management",
];
const STAFF: &[&str] = &["staff", "service", "attitude", "helpful", "rude", "friendly"];
const FACILITIES: &[&str] = &[
    "facility", "toilet", "parking", "seating", "ac", "lighting", "comfort",
];
const VALUE: &[&str] = &["price", "cost", "value", "expensive", "cheap", "worth", "money"];
const CROWD: &[&str] = &["crowd", "queue", "waiting", "line", "space", "overcrowd"];

const ISSUE_CATEGORIES: &[Category] = &[
    Category {
        name: "Food Quality",
        keywords: FOOD,
    },
    Category {
        name: "Venue/Location",
        keywords: &["venue", "location", "place", "space", "area", "room", "hall"],
    },
    Category {
        name: "Organization",
        keywords: ORGANIZATION,
    },
    Category {
        name: "Staff Behavior",
        keywords: STAFF,
    },
    Category {
        name: "Event Content",
        keywords: &[
            "content",
            "activity",
            "program",
            "entertainment",
            "performance",
            "show",
        ],
    },
    Category {
        name: "Facilities",
        keywords: FACILITIES,
    },
    Category {
        name: "Value for Money",
        keywords: VALUE,
    },
    Category {
        name: "Crowd Management",
        keywords: CROWD,
    },
];

const SUGGESTION_CATEGORIES: &[Category] = &[
    Category {
        name: "Better Organization",
        keywords: ORGANIZATION,
    },
    Category {
        name: "Improved Food Quality",
        keywords: FOOD,
    },
    Category {
        name: "Enhanced Facilities",
        keywords: FACILITIES,
    },
    Category {
        name: "More Activities",
        keywords: &[
            "activity",
            "entertainment",
            "program",
            "content",
            "performance",
        ],
    },
    Category {
        name: "Better Staff Training",
        keywords: STAFF,
    },
    Category {
        name: "Improved Value",
        keywords: VALUE,
    },
    Category {
        name: "Better Crowd Control",
        keywords: CROWD,
    },
];

/// A comment counts towards suggestions only if one of its tokens contains one
/// of these.
const INTENT_MARKERS: &[&str] = &[
    "should",
    "could",
    "need",
    "better",
    "more",
    "improve",
    "enhance",
    "add",
    "change",
    "different",
    "alternative",
    "next time",
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we",
    "they", "me", "him", "her", "us", "them",
];

/// AFINN-165 word polarities, one `word<TAB>score` per line.
const AFINN_165: &str = include_str!("lexicon/afinn-165.txt");

/// Words that flip the polarity of everything after them in a comment.
const NEGATORS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "none", "nobody", "nothing", "nowhere",
];

/// A category with its aggregate score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueCount {
    /// Category name
    pub issue: &'static str,
    pub count: usize,
}

/// A suggestion category with its aggregate score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionCount {
    /// Suggestion category name
    pub suggestion: &'static str,
    pub count: usize,
}

/// A stemmed keyword with its frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    /// Stemmed form
    pub word: String,
    pub count: usize,
}

/// Documents per sentiment class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// Aggregate view over a set of feedback documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAnalysis {
    /// Number of documents analyzed
    pub total_feedback: usize,
    /// Mean rating rounded to two decimals
    pub average_rating: f64,
    /// Rating of 4 or more
    pub positive_feedback: usize,
    /// Rating of 2 or less
    pub negative_feedback: usize,
    /// Rating of exactly 3
    pub neutral_feedback: usize,
    /// Top five issue categories
    pub common_issues: Vec<IssueCount>,
    /// Top five suggestion categories, from comments that ask for a change
    pub improvement_suggestions: Vec<SuggestionCount>,
    pub sentiment_analysis: SentimentCounts,
    /// Ten most frequent keywords
    pub top_keywords: Vec<KeywordCount>,
}

/// Sentiment of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Stateless analyzer holding the stemmer and the stemmed lexicon.
pub struct FeedbackAnalyzer {
    stemmer: Stemmer,
    lexicon: HashMap<String, i32>,
}

impl Default for FeedbackAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits on anything that is not alphanumeric or `_`, lower-casing tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Sorts by count, highest first, keeping first-seen order among ties.
fn top<T>(mut counts: Vec<(T, usize)>, limit: usize) -> Vec<(T, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

impl FeedbackAnalyzer {
    /// Builds an English analyzer.
    #[must_use]
    pub fn new() -> Self {
        let stemmer = Stemmer::create(Algorithm::English);
        // Phrases never match a single token. Later entries win stem collisions.
        let lexicon = AFINN_165
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .filter(|(word, _)| !word.contains(' '))
            .filter_map(|(word, score)| {
                score
                    .trim()
                    .parse::<i32>()
                    .ok()
                    .map(|score| (stemmer.stem(word).into_owned(), score))
            })
            .collect();
        Self { stemmer, lexicon }
    }

    fn stem_all(&self, tokens: &[String]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| self.stemmer.stem(t).into_owned())
            .collect()
    }

    /// Score of one comment for one category: one point per stemmed token that
    /// contains a stemmed keyword, plus one per keyword found verbatim in the
    /// comment.
    fn category_score(&self, comment: &str, stemmed: &[String], category: &Category) -> usize {
        let keyword_stems: Vec<_> = category
            .keywords
            .iter()
            .map(|k| self.stemmer.stem(k))
            .collect();
        let token_hits = stemmed
            .iter()
            .filter(|token| keyword_stems.iter().any(|k| token.contains(&**k)))
            .count();
        let phrase_hits = category
            .keywords
            .iter()
            .filter(|k| comment.contains(*k))
            .count();
        token_hits + phrase_hits
    }

    /// Aggregate score per category, in the order categories first score
    /// across the comments.
    fn score_categories<'c>(
        &self,
        comments: &[(&str, Vec<String>)],
        categories: &'c [Category],
    ) -> Vec<(&'c str, usize)> {
        let mut totals: Vec<(&str, usize)> = Vec::new();
        for (comment, stemmed) in comments {
            for category in categories {
                let score = self.category_score(comment, stemmed, category);
                if score == 0 {
                    continue;
                }
                match totals.iter_mut().find(|(name, _)| *name == category.name) {
                    Some(total) => total.1 += score,
                    None => totals.push((category.name, score)),
                }
            }
        }
        totals
    }

    /// Sign of the comment's lexicon polarity. After a negator every scored
    /// word counts with the opposite sign.
    #[must_use]
    pub fn text_polarity(&self, comment: &str) -> i32 {
        let mut negator = 1;
        let mut score = 0;
        for token in tokenize(comment) {
            if NEGATORS.contains(&token.as_str()) {
                negator = -1;
            } else if let Some(value) = self.lexicon.get(&*self.stemmer.stem(&token)) {
                score += negator * value;
            }
        }
        score.signum()
    }

    /// Rating decides when it is not neutral; otherwise the comment's polarity.
    #[must_use]
    pub fn sentiment(&self, doc: &Feedback) -> Sentiment {
        let by_rating = match doc.rating {
            r if r >= 4 => 1,
            r if r <= 2 => -1,
            _ => 0,
        };
        let combined = if by_rating == 0 {
            doc.comment
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map_or(0, |c| self.text_polarity(c))
        } else {
            by_rating
        };
        match combined.signum() {
            1 => Sentiment::Positive,
            -1 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    fn top_keywords(&self, comments: &[(&str, Vec<String>)]) -> Vec<KeywordCount> {
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for token in comments.iter().flat_map(|(_, stemmed)| stemmed) {
            if token.chars().count() <= 3
                || STOP_WORDS.contains(&token.as_str())
                || token.chars().all(|c| c.is_ascii_digit())
            {
                continue;
            }
            match index.get(token) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(token.clone(), order.len());
                    order.push((token.clone(), 1));
                }
            }
        }
        top(order, TOP_KEYWORDS)
            .into_iter()
            .map(|(word, count)| KeywordCount { word, count })
            .collect()
    }

    /// Analyzes a set of documents.
    #[must_use]
    pub fn analyze(&self, docs: &[Feedback]) -> FeedbackAnalysis {
        if docs.is_empty() {
            return FeedbackAnalysis::default();
        }

        let total = docs.len();
        let rating_sum: i64 = docs.iter().map(|d| i64::from(d.rating)).sum();
        #[allow(clippy::cast_precision_loss)]
        let average = rating_sum as f64 / total as f64;
        let positive = docs.iter().filter(|d| d.rating >= 4).count();
        let negative = docs.iter().filter(|d| d.rating <= 2).count();

        let lowered: Vec<String> = docs
            .iter()
            .filter_map(|d| d.comment.as_deref())
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        let comments: Vec<(&str, Vec<String>)> = lowered
            .iter()
            .map(|c| (c.as_str(), self.stem_all(&tokenize(c))))
            .collect();

        let with_intent: Vec<(&str, Vec<String>)> = comments
            .iter()
            .filter(|(comment, _)| {
                tokenize(comment)
                    .iter()
                    .any(|token| INTENT_MARKERS.iter().any(|m| token.contains(m)))
            })
            .cloned()
            .collect();

        let mut sentiments = SentimentCounts::default();
        for doc in docs {
            match self.sentiment(doc) {
                Sentiment::Positive => sentiments.positive += 1,
                Sentiment::Negative => sentiments.negative += 1,
                Sentiment::Neutral => sentiments.neutral += 1,
            }
        }

        FeedbackAnalysis {
            total_feedback: total,
            average_rating: (average * 100.0).round() / 100.0,
            positive_feedback: positive,
            negative_feedback: negative,
            neutral_feedback: total - positive - negative,
            common_issues: top(
                self.score_categories(&comments, ISSUE_CATEGORIES),
                TOP_CATEGORIES,
            )
            .into_iter()
            .map(|(issue, count)| IssueCount { issue, count })
            .collect(),
            improvement_suggestions: top(
                self.score_categories(&with_intent, SUGGESTION_CATEGORIES),
                TOP_CATEGORIES,
            )
            .into_iter()
            .map(|(suggestion, count)| SuggestionCount { suggestion, count })
            .collect(),
            sentiment_analysis: sentiments,
            top_keywords: self.top_keywords(&comments),
        }
    }
}

/// Analyzes documents with a fresh [`FeedbackAnalyzer`].
#[must_use]
pub fn analyze_feedback(docs: &[Feedback]) -> FeedbackAnalysis {
    FeedbackAnalyzer::new().analyze(docs)
}
