use anyhow::Result;
use rustfst::{Label, StateId};
use std::path::Path;

use crate::config::ReservedTokens;

/// Vocabulary index of out-of-vocabulary words.
pub const OOV_INDEX: Label = 0;

/// Conditioning context of a language model query.  The value is only
/// meaningful to the model that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LmState(pub StateId);

/// Back-off N-Gram language model, queried one word at a time.
pub trait LanguageModel: Send + Sync {
    /// Load a model from a file.
    fn load(path: &Path, reserved: &ReservedTokens) -> Result<Self>
    where
        Self: Sized;

    /// Highest N-Gram order.
    fn order(&self) -> usize;

    /// All words known to the model, indexed by vocabulary index.
    /// Index 0 is the unknown word.
    fn vocabulary(&self) -> &[String];

    /// Vocabulary index of a word, or `OOV_INDEX`.
    fn index(&self, word: &str) -> Label;

    /// Empty context, with no implicit sentence start.
    fn null_context(&self) -> LmState;

    /// log10 probability of `word` following `state`, and the state
    /// reached by appending it.
    fn score(&self, state: &LmState, word: Label) -> Result<(f32, LmState)>;
}
