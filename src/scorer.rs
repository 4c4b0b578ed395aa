use anyhow::{anyhow, Context, Result};
use rustfst::prelude::*;
use std::iter::repeat;
use std::path::Path;

use crate::alphabet::Alphabet;
use crate::config::ScorerConfig;
use crate::dictionary::compile_dictionary;
use crate::lm::{LanguageModel, OOV_INDEX};
use crate::model::NGramModel;
use crate::trie::{PrefixTree, Stop};
use crate::vocab::{is_character_based, split_utf8, split_words};
use crate::StdVectorFst;

/// Language model scoring for a CTC prefix beam search.
///
/// The weights are not applied here; the decoder combines
/// `alpha * lm_score + beta * word_count` with its own scores.
pub struct Scorer {
    /// Language model weight
    pub alpha: f32,
    /// Word insertion bonus
    pub beta: f32,
    config: ScorerConfig,
    model: Box<dyn LanguageModel>,
    max_order: usize,
    character_based: bool,
    alphabet: Alphabet,
    /// Vocabulary constraint, built by `fill_dictionary`
    dictionary: Option<StdVectorFst>,
}

impl Scorer {
    /// Load an ARPA model with the default reserved tokens.
    pub fn new<P: AsRef<Path>>(alpha: f32, beta: f32, lm_path: P) -> Result<Self> {
        Self::with_config(alpha, beta, lm_path, ScorerConfig::default())
    }

    /// Load an ARPA model with custom reserved tokens and OOV score.
    pub fn with_config<P: AsRef<Path>>(
        alpha: f32,
        beta: f32,
        lm_path: P,
        config: ScorerConfig,
    ) -> Result<Self> {
        let lm_path = lm_path.as_ref();
        if !lm_path.is_file() {
            return Err(anyhow!("Invalid language model file {}", lm_path.display()));
        }
        let model = NGramModel::load(lm_path, &config.reserved)
            .with_context(|| format!("Failed to load language model {}", lm_path.display()))?;
        Self::from_model(alpha, beta, Box::new(model), config)
    }

    /// Wrap an already loaded language model.
    pub fn from_model(
        alpha: f32,
        beta: f32,
        model: Box<dyn LanguageModel>,
        config: ScorerConfig,
    ) -> Result<Self> {
        let max_order = model.order();
        if max_order == 0 {
            return Err(anyhow!("Language model has order 0"));
        }
        let character_based = is_character_based(model.vocabulary(), &config.reserved);
        log::info!(
            "Loaded {}-gram language model, {} words, {}",
            max_order,
            model.vocabulary().len(),
            if character_based {
                "character based"
            } else {
                "word based"
            }
        );
        Ok(Self {
            alpha,
            beta,
            config,
            model,
            max_order,
            character_based,
            alphabet: Alphabet::default(),
            dictionary: None,
        })
    }

    pub fn reset_params(&mut self, alpha: f32, beta: f32) {
        self.alpha = alpha;
        self.beta = beta;
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    pub fn is_character_based(&self) -> bool {
        self.character_based
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &[String] {
        self.model.vocabulary()
    }

    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn dictionary(&self) -> Option<&StdVectorFst> {
        self.dictionary.as_ref()
    }

    /// Install the output strings of the decoding alphabet.
    pub fn set_char_map<S: Into<String>>(&mut self, char_list: impl IntoIterator<Item = S>) {
        self.alphabet = Alphabet::new(char_list);
    }

    /// log10 probability of the last word given the preceding ones.
    ///
    /// Scoring starts from the null context, so no sentence start is
    /// implied.  Any out-of-vocabulary word gives the OOV score.
    pub fn conditional_log_prob<S: AsRef<str>>(&self, words: &[S]) -> Result<f32> {
        let mut state = self.model.null_context();
        let mut cond_prob = 0.0;
        for word in words {
            let index = self.model.index(word.as_ref());
            if index == OOV_INDEX {
                return Ok(self.config.oov_score);
            }
            let (logprob, next) = self.model.score(&state, index)?;
            cond_prob = logprob;
            state = next;
        }
        Ok(cond_prob)
    }

    /// log10 probability of a whole sentence, padded with sentence
    /// start and end tokens.
    pub fn sentence_log_prob<S: AsRef<str>>(&self, words: &[S]) -> Result<f32> {
        let start = &self.config.reserved.start;
        let padding = if words.is_empty() {
            self.max_order
        } else {
            self.max_order - 1
        };
        let sentence: Vec<&str> = repeat(start.as_str())
            .take(padding)
            .chain(words.iter().map(|w| w.as_ref()))
            .chain([self.config.reserved.end.as_str()])
            .collect();
        self.full_sequence_log_prob(&sentence)
    }

    /// Sum of the conditional log10 probabilities of every window of
    /// `max_order` words.
    pub fn full_sequence_log_prob<S: AsRef<str>>(&self, words: &[S]) -> Result<f32> {
        if words.len() < self.max_order {
            return Err(anyhow!(
                "Need at least {} words to score, got {}",
                self.max_order,
                words.len()
            ));
        }
        let mut score = 0.0;
        for ngram in words.windows(self.max_order) {
            score += self.conditional_log_prob(ngram)?;
        }
        Ok(score)
    }

    /// Concatenate the strings for symbol IDs.
    pub fn labels_to_string(&self, labels: &[Label]) -> Result<String> {
        self.alphabet.labels_to_string(labels)
    }

    /// Split decoded symbols into language model tokens.
    pub fn split_labels(&self, labels: &[Label]) -> Result<Vec<String>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }
        let text = self.labels_to_string(labels)?;
        if self.character_based {
            Ok(split_utf8(&text))
        } else {
            Ok(split_words(&text, " "))
        }
    }

    /// Build the N-Gram ending at `prefix`, oldest token first.
    ///
    /// Word-based models take one word per step, skipping over the
    /// space before it.  Character-based models take one symbol per
    /// step.  If the root is reached first the N-Gram is padded with
    /// sentence start tokens.
    pub fn make_ngram<T: PrefixTree>(&self, tree: &T, prefix: T::Node) -> Result<Vec<String>> {
        let stop = if self.character_based {
            Stop::Steps(1)
        } else {
            Stop::Boundary {
                symbol: self.alphabet.space_id(),
                count: 1,
            }
        };
        let mut ngram = Vec::with_capacity(self.max_order);
        let mut current = prefix;
        for order in 0..self.max_order {
            let (path, stopped) = tree.collect_path(current, stop);
            ngram.push(self.alphabet.labels_to_string(path.iter().rev())?);
            let next = if tree.is_root(stopped) {
                None
            } else if self.character_based {
                Some(stopped)
            } else {
                tree.parent(stopped)
            };
            match next {
                Some(node) => current = node,
                None => {
                    let start = &self.config.reserved.start;
                    ngram.extend(repeat(start.clone()).take(self.max_order - order - 1));
                    break;
                }
            }
        }
        ngram.reverse();
        Ok(ngram)
    }

    /// Compile the vocabulary into an acceptor over the alphabet,
    /// replacing any previous one.  Returns the number of words in it.
    pub fn fill_dictionary(&mut self, add_space: bool) -> Result<usize> {
        let reserved = &self.config.reserved;
        let words = self
            .model
            .vocabulary()
            .iter()
            .filter(|word| !reserved.contains(word));
        let (dictionary, count) = compile_dictionary(words, &self.alphabet, add_space)?;
        log::info!(
            "Dictionary has {} of {} words, {} states",
            count,
            self.model.vocabulary().len(),
            dictionary.num_states()
        );
        self.dictionary = Some(dictionary);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReservedTokens, OOV_SCORE};
    use crate::dictionary::symbol_label;
    use crate::lm::LmState;
    use crate::trie::PrefixTrie;
    use std::thread;

    /// Gives every known word a log10 probability of -1.
    struct ConstantModel {
        order: usize,
        vocabulary: Vec<String>,
    }

    impl ConstantModel {
        fn boxed(order: usize, words: &[&str]) -> Box<dyn LanguageModel> {
            let vocabulary = ["<unk>", "<s>", "</s>"]
                .iter()
                .chain(words)
                .map(|w| w.to_string())
                .collect();
            Box::new(Self { order, vocabulary })
        }
    }

    impl LanguageModel for ConstantModel {
        fn load(_path: &Path, _reserved: &ReservedTokens) -> Result<Self> {
            Err(anyhow!("ConstantModel cannot be loaded"))
        }

        fn order(&self) -> usize {
            self.order
        }

        fn vocabulary(&self) -> &[String] {
            &self.vocabulary
        }

        fn index(&self, word: &str) -> Label {
            self.vocabulary
                .iter()
                .position(|w| w == word)
                .map_or(OOV_INDEX, |i| i as Label)
        }

        fn null_context(&self) -> LmState {
            LmState(0)
        }

        fn score(&self, state: &LmState, _word: Label) -> Result<(f32, LmState)> {
            Ok((-1.0, LmState(state.0 + 1)))
        }
    }

    fn constant_scorer(order: usize, words: &[&str]) -> Scorer {
        Scorer::from_model(0.5, 1.5, ConstantModel::boxed(order, words), ScorerConfig::default())
            .unwrap()
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    fn spell(scorer: &Scorer, text: &str) -> Vec<Label> {
        scorer.alphabet().string_to_labels(text).unwrap()
    }

    #[test]
    fn it_fails_on_missing_models() {
        assert!(Scorer::new(0.5, 1.5, "testdata/nonexistent.arpa").is_err());
        assert!(Scorer::new(0.5, 1.5, "testdata").is_err());
    }

    #[test]
    fn it_classifies_models() {
        let scorer = Scorer::new(0.5, 1.5, "testdata/ab.arpa").unwrap();
        assert!(scorer.is_character_based());
        assert_eq!(scorer.max_order(), 2);
        let scorer = Scorer::new(0.5, 1.5, "testdata/cat.arpa").unwrap();
        assert!(!scorer.is_character_based());
        assert_eq!(scorer.max_order(), 3);
    }

    #[test]
    fn it_resets_params() {
        let mut scorer = constant_scorer(2, &["a"]);
        assert_eq!((scorer.alpha, scorer.beta), (0.5, 1.5));
        scorer.reset_params(2.0, -1.0);
        assert_eq!((scorer.alpha, scorer.beta), (2.0, -1.0));
        assert_eq!(scorer.max_order(), 2);
    }

    #[test]
    fn it_counts_windows() {
        let scorer = constant_scorer(2, &["a", "b"]);
        // <s> a b </s>
        assert_close(scorer.sentence_log_prob(&["a", "b"]).unwrap(), -3.0);
        // <s> <s> </s>
        assert_close(scorer.sentence_log_prob::<&str>(&[]).unwrap(), -2.0);
        let scorer = constant_scorer(3, &["a", "b"]);
        // <s> <s> a b </s>
        assert_close(scorer.sentence_log_prob(&["a", "b"]).unwrap(), -3.0);
    }

    #[test]
    fn it_short_circuits_oov() {
        let scorer = constant_scorer(2, &["a", "b"]);
        assert_eq!(scorer.conditional_log_prob(&["a", "c"]).unwrap(), OOV_SCORE);
        assert_eq!(scorer.conditional_log_prob(&["c", "a"]).unwrap(), OOV_SCORE);
        assert_eq!(scorer.conditional_log_prob(&["<unk>"]).unwrap(), OOV_SCORE);
        // (<s> a) (a c) (c b) (b </s>)
        assert_close(
            scorer.sentence_log_prob(&["a", "c", "b"]).unwrap(),
            -1.0 + OOV_SCORE + OOV_SCORE - 1.0,
        );
    }

    #[test]
    fn it_uses_configured_oov_score() {
        let config = ScorerConfig {
            oov_score: -50.0,
            ..ScorerConfig::default()
        };
        let scorer =
            Scorer::from_model(0.5, 1.5, ConstantModel::boxed(2, &["a"]), config).unwrap();
        assert_eq!(scorer.conditional_log_prob(&["a", "z"]).unwrap(), -50.0);
    }

    #[test]
    fn it_checks_sequence_length() {
        let scorer = constant_scorer(3, &["a", "b"]);
        assert!(scorer.full_sequence_log_prob(&["a", "b"]).is_err());
        assert_close(scorer.full_sequence_log_prob(&["a", "b", "a"]).unwrap(), -1.0);
        assert_close(
            scorer.full_sequence_log_prob(&["a", "b", "a", "b"]).unwrap(),
            -2.0,
        );
    }

    #[test]
    fn it_scores_sentences() {
        let scorer = Scorer::new(0.5, 1.5, "testdata/ab.arpa").unwrap();
        assert_close(
            scorer.conditional_log_prob(&["<s>", "a"]).unwrap(),
            -0.30103,
        );
        assert_close(
            scorer.sentence_log_prob(&["a", "b"]).unwrap(),
            -0.30103 - 0.39794 - 0.22185,
        );
        let empty = scorer.sentence_log_prob::<String>(&[]).unwrap();
        let padded = scorer.full_sequence_log_prob(&["<s>", "<s>", "</s>"]).unwrap();
        assert_eq!(empty, padded);
        assert_close(empty, -0.30103 - 99.0 - 0.30103 - 0.69897);
    }

    #[test]
    fn it_makes_word_ngrams() {
        let mut scorer = constant_scorer(3, &["cat", "at"]);
        scorer.set_char_map([" ", "a", "c", "t"]);
        let mut trie = PrefixTrie::new();
        let node = trie.insert_path(&spell(&scorer, "cat at"));
        assert_eq!(
            scorer.make_ngram(&trie, node).unwrap(),
            vec!["<s>", "cat", "at"]
        );
        let node = trie.insert_path(&spell(&scorer, "at cat at"));
        assert_eq!(
            scorer.make_ngram(&trie, node).unwrap(),
            vec!["at", "cat", "at"]
        );
        let node = trie.insert_path(&spell(&scorer, "cat"));
        assert_eq!(
            scorer.make_ngram(&trie, node).unwrap(),
            vec!["<s>", "<s>", "cat"]
        );
    }

    #[test]
    fn it_makes_character_ngrams() {
        let mut scorer = constant_scorer(5, &["a", "b"]);
        scorer.set_char_map(["a", "b", " "]);
        let mut trie = PrefixTrie::new();
        let node = trie.insert_path(&[0]);
        assert_eq!(
            scorer.make_ngram(&trie, node).unwrap(),
            vec!["<s>", "<s>", "<s>", "<s>", "a"]
        );
        let node = trie.insert_path(&[0, 1, 0]);
        assert_eq!(
            scorer.make_ngram(&trie, node).unwrap(),
            vec!["<s>", "<s>", "a", "b", "a"]
        );
        let node = trie.insert_path(&[1, 1, 0, 1, 0, 0]);
        assert_eq!(
            scorer.make_ngram(&trie, node).unwrap(),
            vec!["b", "a", "b", "a", "a"]
        );
    }

    #[test]
    fn it_scores_prefixes() {
        let mut scorer = Scorer::new(0.5, 1.5, "testdata/cat.arpa").unwrap();
        scorer.set_char_map([" ", "a", "c", "e", "h", "s", "t"]);
        let mut trie = PrefixTrie::new();
        let node = trie.insert_path(&spell(&scorer, "the cat sat"));
        let ngram = scorer.make_ngram(&trie, node).unwrap();
        assert_eq!(ngram, vec!["the", "cat", "sat"]);
        assert_close(scorer.conditional_log_prob(&ngram).unwrap(), -0.05);
        // <s> cat: backoff(<s>) + P(cat), then the "cat sat" bigram
        let node = trie.insert_path(&spell(&scorer, "cat sat"));
        let ngram = scorer.make_ngram(&trie, node).unwrap();
        assert_eq!(ngram, vec!["<s>", "cat", "sat"]);
        assert_close(scorer.conditional_log_prob(&ngram).unwrap(), -0.4);
        let node = trie.insert_path(&spell(&scorer, "the hat"));
        let ngram = scorer.make_ngram(&trie, node).unwrap();
        assert_eq!(scorer.conditional_log_prob(&ngram).unwrap(), OOV_SCORE);
    }

    #[test]
    fn it_needs_an_alphabet() {
        let scorer = constant_scorer(2, &["a"]);
        let mut trie = PrefixTrie::new();
        let node = trie.insert_path(&[0]);
        assert!(scorer.make_ngram(&trie, node).is_err());
    }

    #[test]
    fn it_splits_labels() {
        let mut scorer = Scorer::new(0.5, 1.5, "testdata/cat.arpa").unwrap();
        scorer.set_char_map([" ", "a", "c", "e", "h", "s", "t"]);
        let labels = spell(&scorer, "the  cat ");
        assert_eq!(scorer.split_labels(&labels).unwrap(), vec!["the", "cat"]);
        assert_eq!(scorer.labels_to_string(&labels).unwrap(), "the  cat ");
        assert!(scorer.split_labels(&[]).unwrap().is_empty());

        let mut scorer = Scorer::new(0.5, 1.5, "testdata/ab.arpa").unwrap();
        scorer.set_char_map(["a", "b"]);
        assert_eq!(scorer.split_labels(&[0, 1, 1]).unwrap(), vec!["a", "b", "b"]);
    }

    #[test]
    fn it_fills_the_dictionary() {
        let mut scorer = Scorer::new(0.5, 1.5, "testdata/cat.arpa").unwrap();
        assert!(scorer.dictionary().is_none());
        scorer.set_char_map([" ", "a", "c", "e", "h", "s", "t"]);
        assert_eq!(scorer.fill_dictionary(false).unwrap(), 3);

        // Without "h" and "e", only "cat" and "sat" can be spelled
        scorer.set_char_map([" ", "a", "c", "s", "t"]);
        assert_eq!(scorer.fill_dictionary(true).unwrap(), 2);
        let dictionary = scorer.dictionary().unwrap();
        let start = dictionary.start().unwrap();
        let trs = dictionary.get_trs(start).unwrap();
        let mut first: Vec<Label> = trs.trs().iter().map(|tr| tr.ilabel).collect();
        first.sort();
        assert_eq!(first, vec![symbol_label(2), symbol_label(3)]);
    }

    #[test]
    fn it_scores_concurrently() {
        let scorer = Scorer::new(0.5, 1.5, "testdata/cat.arpa").unwrap();
        let sentences = [
            vec!["the", "cat", "sat"],
            vec!["cat", "sat"],
            vec!["the", "dog"],
            vec![],
        ];
        let expected: Vec<f32> = sentences
            .iter()
            .map(|s| scorer.sentence_log_prob(s).unwrap())
            .collect();
        let scorer = &scorer;
        thread::scope(|scope| {
            let handles: Vec<_> = sentences
                .iter()
                .map(|s| scope.spawn(move || scorer.sentence_log_prob(s).unwrap()))
                .collect();
            for (handle, expected) in handles.into_iter().zip(expected) {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
