use rustfst::fst_impls::VectorFst;
use rustfst::semirings::TropicalWeight;

/// rustfst does not define this but we will
pub type StdVectorFst = VectorFst<TropicalWeight>;

/// Output strings of the decoding alphabet
pub mod alphabet;
/// Reading ARPA language model files
pub mod arpa;
/// Reserved tokens and scorer settings
pub mod config;
/// Vocabulary acceptors for constrained decoding
pub mod dictionary;
/// Language model interface
pub mod lm;
/// N-Gram models as FSTs
pub mod model;
/// Language model scoring for beam search hypotheses
pub mod scorer;
/// Prefix trees of beam search hypotheses
pub mod trie;
/// Vocabulary inspection and text splitting
pub mod vocab;

pub use alphabet::Alphabet;
pub use config::{ReservedTokens, ScorerConfig, OOV_SCORE};
pub use dictionary::compile_dictionary;
pub use lm::{LanguageModel, LmState, OOV_INDEX};
pub use model::NGramModel;
pub use scorer::Scorer;
pub use trie::{PrefixTree, PrefixTrie, Stop, ROOT_SYMBOL};
