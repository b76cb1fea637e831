use unicode_normalization::UnicodeNormalization;

/// Weighted token fed into the hashing encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedToken {
    pub token: String,
    pub weight: f32,
}

impl WeightedToken {
    pub fn new(token: impl Into<String>, weight: f32) -> Self {
        Self {
            token: token.into(),
            weight,
        }
    }
}

/// Words carrying no signal on their own. Includes the fixed profile template words so
/// that two profiles do not look alike just because they share the template.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "for", "from", "i", "in",
    "is", "it", "learn", "me", "my", "of", "on", "or", "so", "teach", "the", "to", "want",
    "with",
];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '+' || c == '#'
}

/// Split NFKC-normalized, lowercased text into content words.
///
/// `+` and `#` stay inside words so that "C++" and "C#" survive as distinct skills.
pub fn words(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect::<String>().to_lowercase();
    normalized
        .split(|c: char| !is_word_char(c))
        .filter(|w| !w.is_empty())
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Token format:
/// - `w:<word>`          unigram, weight 1.0
/// - `b:<word>_<word>`   adjacent content-word bigram, weight `bigram_weight`
pub fn tokenize_text(text: &str, bigram_weight: f32) -> Vec<WeightedToken> {
    let words = words(text);
    let mut tokens = Vec::with_capacity(words.len() * 2);

    for word in &words {
        tokens.push(WeightedToken::new(format!("w:{word}"), 1.0));
    }

    if bigram_weight > 0.0 {
        for pair in words.windows(2) {
            tokens.push(WeightedToken::new(
                format!("b:{}_{}", pair[0], pair[1]),
                bigram_weight,
            ));
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_template_words_and_punctuation() {
        let w = words("Chef. I can teach: Cooking, Rust. I want to learn: Go");
        assert_eq!(w, vec!["chef", "cooking", "rust", "go"]);
    }

    #[test]
    fn keeps_symbol_skills_distinct() {
        let w = words("I can teach: C++, C#, C");
        assert_eq!(w, vec!["c++", "c#", "c"]);
    }

    #[test]
    fn fullwidth_input_is_normalized() {
        let w = words("ＲＵＳＴ");
        assert_eq!(w, vec!["rust"]);
    }

    #[test]
    fn emits_bigrams_only_when_weighted() {
        let with = tokenize_text("machine learning", 0.5);
        assert!(with.iter().any(|t| t.token == "b:machine_learning" && t.weight == 0.5));

        let without = tokenize_text("machine learning", 0.0);
        assert!(without.iter().all(|t| t.token.starts_with("w:")));
    }
}
