//! Reply quality scoring
//!
//! Binary heuristic: too-short replies score 0; a reply using any of the
//! intent's expected words scores 1; otherwise replies of five or more words
//! score 1. Scoring is pure and cannot fail.

use callbot_core::{Intent, QualityScore, Sentiment};

use crate::keywords::{CategoryTable, QUALITY_TABLE};

/// Replies shorter than this (in characters, after trimming) score 0
pub const MIN_REPLY_CHARS: usize = 10;

/// Word count that passes the length fallback
pub const MIN_REPLY_WORDS: usize = 5;

#[derive(Debug, Clone)]
pub struct QualityScorer {
    table: CategoryTable<Intent>,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self {
            table: QUALITY_TABLE.clone(),
        }
    }

    pub fn with_table(table: CategoryTable<Intent>) -> Self {
        Self { table }
    }

    /// Score `reply`; transcript and sentiment are accepted for future heuristics
    pub fn score(
        &self,
        _transcript: &str,
        reply: &str,
        intent: Intent,
        _sentiment: Sentiment,
    ) -> QualityScore {
        let reply = reply.trim();
        if reply.chars().count() < MIN_REPLY_CHARS {
            return QualityScore::POOR;
        }

        if self
            .table
            .get(intent)
            .is_some_and(|keywords| keywords.matches(reply))
        {
            return QualityScore::GOOD;
        }

        if reply.split_whitespace().count() >= MIN_REPLY_WORDS {
            QualityScore::GOOD
        } else {
            QualityScore::POOR
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(reply: &str, intent: Intent) -> QualityScore {
        QualityScorer::new().score("", reply, intent, Sentiment::Neutral)
    }

    #[test]
    fn test_short_reply_is_poor_for_every_intent() {
        for intent in [
            Intent::Pricing,
            Intent::ProductAvailability,
            Intent::DeliveryStatus,
            Intent::Refund,
            Intent::Complaint,
            Intent::Faq,
        ] {
            assert_eq!(score("قیمت", intent), QualityScore::POOR);
        }
    }

    #[test]
    fn test_keyword_hit() {
        assert_eq!(score("قیمت آن ۲۰۰ تومان", Intent::Pricing), QualityScore::GOOD);
        assert_eq!(
            score("درخواست مرجوعی ثبت شد", Intent::Refund),
            QualityScore::GOOD
        );
    }

    #[test]
    fn test_word_count_fallback() {
        // no refund keyword, five words
        assert_eq!(
            score("لطفا کمی صبر کنید همکاران تماس می‌گیرند", Intent::Refund),
            QualityScore::GOOD
        );
        // no keyword, fewer than five words
        assert_eq!(score("بله حتما انجام میشود", Intent::Refund), QualityScore::POOR);
    }

    #[test]
    fn test_trimming_applies_before_length_check() {
        assert_eq!(score("          سلام          ", Intent::Faq), QualityScore::POOR);
    }
}
