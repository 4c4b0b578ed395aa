/// Score returned for a query containing an out-of-vocabulary word.
pub const OOV_SCORE: f32 = -1000.0;

/// Tokens with a special meaning to the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedTokens {
    /// Unknown word, always at vocabulary index 0
    pub unk: String,
    /// Sentence start, used to pad short contexts
    pub start: String,
    /// Sentence end
    pub end: String,
}

impl Default for ReservedTokens {
    fn default() -> Self {
        Self {
            unk: String::from("<unk>"),
            start: String::from("<s>"),
            end: String::from("</s>"),
        }
    }
}

impl ReservedTokens {
    pub fn contains(&self, token: &str) -> bool {
        token == self.unk || token == self.start || token == self.end
    }
}

/// Settings fixed for the lifetime of a `Scorer`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    pub reserved: ReservedTokens,
    /// log10 score given to out-of-vocabulary queries
    pub oov_score: f32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            reserved: ReservedTokens::default(),
            oov_score: OOV_SCORE,
        }
    }
}
