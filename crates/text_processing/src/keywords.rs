//! Keyword tables and lexical matching
//!
//! All lexical decisions (sentiment, intent, reply quality) are lookups into
//! ordered `category → keywords` tables. Adding a category or keyword only
//! touches the table data below.
//!
//! Text and keywords are normalized first: Arabic yeh/kaf are folded into
//! their Persian forms and Latin letters are lowercased. Word matching uses
//! Unicode word boundaries (UAX #29); ZWNJ is part of a word, so "هزینه‌ای"
//! stays one token. Multi-word keywords match as contiguous token runs.

use callbot_core::{Intent, Sentiment};
use once_cell::sync::Lazy;
use unicode_segmentation::UnicodeSegmentation;

/// How a keyword is compared against text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Whole words only ("هست" does not match "هستم")
    Word,
    /// Raw substring containment, for stem lists
    Substring,
}

/// Fold Arabic code points to Persian and lowercase ASCII
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{064A}' | '\u{0649}' => '\u{06CC}', // ي ى → ی
            '\u{0643}' => '\u{06A9}',              // ك → ک
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Normalized word tokens of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .unicode_words()
        .map(str::to_string)
        .collect()
}

/// A set of keywords for one category
#[derive(Debug, Clone)]
pub struct KeywordSet {
    mode: MatchMode,
    /// Normalized keyword text, for substring mode
    raw: Vec<String>,
    /// Tokenized keywords, for word mode
    phrases: Vec<Vec<String>>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<String> = keywords
            .into_iter()
            .map(|k| normalize(k.as_ref().trim()))
            .filter(|k| !k.is_empty())
            .collect();
        let phrases = raw
            .iter()
            .map(|k| k.unicode_words().map(str::to_string).collect::<Vec<_>>())
            .filter(|p| !p.is_empty())
            .collect();
        Self { mode, raw, phrases }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// True when any keyword occurs in `text`
    pub fn matches(&self, text: &str) -> bool {
        match self.mode {
            MatchMode::Word => self.matches_tokens(&tokenize(text)),
            MatchMode::Substring => {
                let text = normalize(text);
                self.raw.iter().any(|k| text.contains(k.as_str()))
            },
        }
    }

    /// Word-mode check against pre-tokenized text
    pub fn matches_tokens(&self, tokens: &[String]) -> bool {
        self.phrases.iter().any(|phrase| {
            tokens
                .windows(phrase.len())
                .any(|window| window.iter().zip(phrase).all(|(t, k)| t == k))
        })
    }
}

/// Ordered category → keyword table; iteration order is the tie-break
#[derive(Debug, Clone)]
pub struct CategoryTable<C> {
    entries: Vec<(C, KeywordSet)>,
}

impl<C: Copy> CategoryTable<C> {
    pub fn new(entries: Vec<(C, KeywordSet)>) -> Self {
        Self { entries }
    }

    /// Build a table from plain keyword lists
    pub fn from_lists(lists: &[(C, &[&str])], mode: MatchMode) -> Self {
        Self::new(
            lists
                .iter()
                .map(|(category, keywords)| (*category, KeywordSet::new(keywords.iter(), mode)))
                .collect(),
        )
    }

    /// First category with any matching keyword
    pub fn first_match(&self, text: &str) -> Option<C> {
        let tokens = tokenize(text);
        self.entries
            .iter()
            .find(|(_, set)| match set.mode() {
                MatchMode::Word => set.matches_tokens(&tokens),
                MatchMode::Substring => set.matches(text),
            })
            .map(|(category, _)| *category)
    }

    pub fn get(&self, category: C) -> Option<&KeywordSet>
    where
        C: PartialEq,
    {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, set)| set)
    }

    pub fn categories(&self) -> impl Iterator<Item = C> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }
}

// -----------------------------------------------------------------------------
// Tables
// -----------------------------------------------------------------------------

// Sentiment and intent keywords match whole tokens. Short keywords such as
// "هست" and "بد" would otherwise fire inside "هستم" and "بدون". The cost is
// that colloquial suffixed forms ("قیمتش", "خرابه", "ناراضیم") do not match;
// list such a form explicitly to catch it.
const NEGATIVE: &[&str] = &["بد", "ناراضی", "عصبانی"];
const POSITIVE: &[&str] = &["خوشحال", "راضی", "خوب"];

/// Sentiment keywords; negative is listed first so it wins ties
pub static SENTIMENT_TABLE: Lazy<CategoryTable<Sentiment>> = Lazy::new(|| {
    CategoryTable::from_lists(
        &[(Sentiment::Negative, NEGATIVE), (Sentiment::Positive, POSITIVE)],
        MatchMode::Word,
    )
});

/// Intent keywords in precedence order
pub static INTENT_TABLE: Lazy<CategoryTable<Intent>> = Lazy::new(|| {
    CategoryTable::from_lists(
        &[
            (Intent::Pricing, &["قیمت", "هزینه", "چقدر", "هزینه‌ای"]),
            (
                Intent::ProductAvailability,
                &["موجودی", "در دسترس", "موجود", "دارید", "هست", "یافت", "پیدا"],
            ),
            (
                Intent::DeliveryStatus,
                &["ارسال", "تحویل", "رسیدن", "زمان", "کمتر"],
            ),
            (
                Intent::Refund,
                &["مرجوعی", "بازگشت وجه", "پس دادن", "تعویض"],
            ),
            (Intent::Complaint, &["شکایت", "مشکل", "خراب", "نقص", "بد"]),
        ],
        MatchMode::Word,
    )
});

/// Words a good reply is expected to use, per intent
///
/// These are stems ("مرجوع" should hit "مرجوعی"), so they match as substrings.
pub static QUALITY_TABLE: Lazy<CategoryTable<Intent>> = Lazy::new(|| {
    CategoryTable::from_lists(
        &[
            (Intent::Pricing, &["قیمت", "هزینه", "تعرفه", "ریال", "تومان"]),
            (
                Intent::ProductAvailability,
                &["موجود", "موجودی", "در دسترس"],
            ),
            (
                Intent::DeliveryStatus,
                &["ارسال", "پیگیری", "تحویل", "رهگیری"],
            ),
            (Intent::Refund, &["مرجوع", "بازگشت", "استرداد"]),
            (Intent::Complaint, &["پشتیبانی", "مشکل", "عیب", "شکایت"]),
            (Intent::Faq, &["سوال", "پاسخ", "راهنما"]),
        ],
        MatchMode::Substring,
    )
});
