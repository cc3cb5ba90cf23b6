//! Voice-output formatting.
//!
//! Long analysis text is cut down before it is spoken and jargon is replaced
//! with plain words. The pipeline is: strip markdown (if enabled), truncate,
//! then apply substitutions in table order.

use serde::{Deserialize, Serialize};

/// How over-long text is shortened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Never truncate.
    Unlimited,
    /// Text longer than `limit` characters keeps its first `keep` characters
    /// followed by `suffix`.
    HardCutoff {
        limit: usize,
        keep: usize,
        suffix: String,
    },
    /// Like `HardCutoff`, but cuts after the last sentence end within the
    /// first `keep` characters. Falls back to a hard cut if there is none.
    SentenceAware {
        limit: usize,
        keep: usize,
        suffix: String,
    },
    /// Text with more than `max_words` words keeps that many, joined by
    /// single spaces, followed by `suffix`.
    WordLimit { max_words: usize, suffix: String },
}

impl Default for TruncationPolicy {
    /// Over 500 characters keeps the first 400 plus a dashboard hint.
    fn default() -> Self {
        Self::HardCutoff {
            limit: 500,
            keep: 400,
            suffix: "... Para mais detalhes, acesse o dashboard.".to_string(),
        }
    }
}

impl TruncationPolicy {
    /// Turns a hard cutoff into a sentence-aware one with the same limits.
    #[must_use]
    pub fn sentence_aware(self) -> Self {
        match self {
            Self::HardCutoff {
                limit,
                keep,
                suffix,
            } => Self::SentenceAware {
                limit,
                keep,
                suffix,
            },
            other => other,
        }
    }

    /// Shortens `text` according to the policy.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::Unlimited => text.to_string(),
            Self::HardCutoff {
                limit,
                keep,
                suffix,
            } => {
                if text.chars().count() <= *limit {
                    return text.to_string();
                }
                format!("{}{suffix}", prefix_chars(text, *keep))
            }
            Self::SentenceAware {
                limit,
                keep,
                suffix,
            } => {
                if text.chars().count() <= *limit {
                    return text.to_string();
                }
                let head = prefix_chars(text, *keep);
                let cut = head
                    .rfind(['.', '!', '?'])
                    .map_or(head, |idx| &head[..=idx]);
                format!("{cut}{suffix}")
            }
            Self::WordLimit { max_words, suffix } => {
                let words: Vec<&str> = text.split_whitespace().collect();
                if words.len() <= *max_words {
                    return text.to_string();
                }
                format!("{}{suffix}", words[..*max_words].join(" "))
            }
        }
    }
}

fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn strip_markdown(text: &str) -> String {
    text.replace("**", "").replace('*', "")
}

/// Formats analysis text for speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceFormatter {
    policy: TruncationPolicy,
    substitutions: Vec<(String, String)>,
    strip_markdown: bool,
    substitute_before_limit: bool,
}

impl VoiceFormatter {
    #[must_use]
    pub fn new(policy: TruncationPolicy) -> Self {
        Self {
            policy,
            substitutions: Vec::new(),
            strip_markdown: false,
            substitute_before_limit: false,
        }
    }

    /// Replaces every occurrence of `from` with `to`.
    #[must_use]
    pub fn with_substitution(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.substitutions.push((from.into(), to.into()));
        self
    }

    /// Removes `*` emphasis markers before anything else.
    #[must_use]
    pub fn with_markdown_stripped(mut self) -> Self {
        self.strip_markdown = true;
        self
    }

    /// Applies substitutions before the length limit instead of after, so
    /// the limit counts the spoken words.
    #[must_use]
    pub fn with_substitutions_before_limit(mut self) -> Self {
        self.substitute_before_limit = true;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &TruncationPolicy {
        &self.policy
    }

    /// Data-verification preset: over 500 characters keeps 400 plus a
    /// dashboard hint; CRM, API and R$ are spelled out.
    #[must_use]
    pub fn data_verification() -> Self {
        Self::data_verification_with(TruncationPolicy::default())
    }

    /// Data-verification substitutions with a caller-chosen policy.
    #[must_use]
    pub fn data_verification_with(policy: TruncationPolicy) -> Self {
        Self::new(policy)
            .with_substitution("CRM", "sistema de vendas")
            .with_substitution("API", "sistema")
            .with_substitution("R$", "reais")
    }

    /// Market-analysis preset: markdown removed, symbols spelled out,
    /// Portuguese openers translated, capped at 200 words.
    #[must_use]
    pub fn market_analysis() -> Self {
        Self::new(TruncationPolicy::WordLimit {
            max_words: 200,
            suffix: "... For more detailed insights, please ask for specific aspects of the analysis."
                .to_string(),
        })
        .with_markdown_stripped()
        .with_substitutions_before_limit()
        .with_substitution("&", "and")
        .with_substitution("%", "percent")
        .with_substitution("#", "number")
        .with_substitution("Com base na análise", "Based on my analysis")
        .with_substitution("Recomendo", "I recommend")
        .with_substitution("Sugiro", "I suggest")
    }

    /// Runs the formatting pipeline: strip, limit, substitute. With
    /// [`Self::with_substitutions_before_limit`] the last two swap.
    #[must_use]
    pub fn format(&self, text: &str) -> String {
        let text = if self.strip_markdown {
            strip_markdown(text)
        } else {
            text.to_string()
        };
        if self.substitute_before_limit {
            self.policy.apply(&self.substitute(text))
        } else {
            self.substitute(self.policy.apply(&text))
        }
    }

    fn substitute(&self, mut text: String) -> String {
        for (from, to) in &self.substitutions {
            text = text.replace(from.as_str(), to);
        }
        text
    }
}

impl Default for VoiceFormatter {
    fn default() -> Self {
        Self::data_verification()
    }
}
