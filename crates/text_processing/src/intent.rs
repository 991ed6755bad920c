//! Intent detection
//!
//! Single pass over the ordered intent table; the first category with any
//! matching keyword wins and nothing is scored or ranked. No match is `Faq`.

use callbot_core::Intent;

use crate::keywords::{CategoryTable, INTENT_TABLE};

/// Lexical intent detector
#[derive(Debug, Clone)]
pub struct IntentDetector {
    table: CategoryTable<Intent>,
}

impl IntentDetector {
    pub fn new() -> Self {
        Self {
            table: INTENT_TABLE.clone(),
        }
    }

    /// Use a custom table (categories are scanned in the table's order)
    pub fn with_table(table: CategoryTable<Intent>) -> Self {
        Self { table }
    }

    pub fn detect(&self, transcript: &str) -> Intent {
        self.table.first_match(transcript).unwrap_or(Intent::Faq)
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::MatchMode;

    #[test]
    fn test_pricing() {
        let detector = IntentDetector::new();
        assert_eq!(detector.detect("قیمت این محصول چقدر است"), Intent::Pricing);
    }

    #[test]
    fn test_complaint_without_earlier_category() {
        let detector = IntentDetector::new();
        assert_eq!(
            detector.detect("این محصول خراب است و من عصبانی هستم"),
            Intent::Complaint
        );
    }

    #[test]
    fn test_first_match_wins_over_later_categories() {
        let detector = IntentDetector::new();
        // complaint and pricing keywords together: pricing precedes complaint
        assert_eq!(
            detector.detect("محصول خراب است، هزینه تعمیر چقدر است؟"),
            Intent::Pricing
        );
        // availability precedes delivery
        assert_eq!(
            detector.detect("این کالا موجود است و زمان ارسال کی است"),
            Intent::ProductAvailability
        );
    }

    #[test]
    fn test_refund_phrase() {
        let detector = IntentDetector::new();
        assert_eq!(detector.detect("می‌خواهم کالا را پس دادن کنم"), Intent::Refund);
        assert_eq!(detector.detect("درخواست تعویض دارم"), Intent::Refund);
    }

    #[test]
    fn test_no_match_is_faq() {
        let detector = IntentDetector::new();
        assert_eq!(detector.detect("سلام وقت بخیر"), Intent::Faq);
        assert_eq!(detector.detect(""), Intent::Faq);
    }

    #[test]
    fn test_custom_table_order() {
        let table = CategoryTable::from_lists(
            &[(Intent::Complaint, &["خراب"]), (Intent::Pricing, &["قیمت"])],
            MatchMode::Word,
        );
        let detector = IntentDetector::with_table(table);
        assert_eq!(detector.detect("قیمت کالای خراب"), Intent::Complaint);
    }
}
