use anyhow::{anyhow, Result};
use rustfst::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::arpa::{read_arpa_file, Arpa, ArpaEntry};
use crate::config::ReservedTokens;
use crate::lm::{LanguageModel, LmState, OOV_INDEX};
use crate::StdVectorFst;

/// Used when the model has no unigram for the unknown word
const DEFAULT_UNK_LOGPROB: f32 = -100.0;

/// Map N-Gram histories to the states representing them
type HistoryMap = HashMap<Vec<Label>, StateId>;

/// Back-off N-Gram model represented as an FST.
///
/// Each state is a history.  Word arcs carry the negated log10
/// probability of the word and lead to the longest history which is a
/// suffix of the extended context.  Epsilon arcs carry the negated
/// back-off weight and lead to the next shorter history.
#[derive(Debug)]
pub struct NGramModel {
    /// Underlying FST
    fst: StdVectorFst,
    /// Highest order in the model
    hi_order: usize,
    /// ID of the empty history (unigram state)
    backoff: StateId,
    /// Words and their labels
    syms: Arc<SymbolTable>,
    /// Words indexed by label, with the unknown word at 0
    vocabulary: Vec<String>,
    /// log10 probability of the unknown word
    unk_logprob: f32,
}

/// Find the longest suffix of `context` which is a known history.
fn longest_suffix(histories: &HistoryMap, context: &[Label]) -> Option<StateId> {
    (0..=context.len()).find_map(|i| histories.get(&context[i..]).copied())
}

impl NGramModel {
    /// Build the FST for a parsed ARPA model.
    pub fn from_arpa(arpa: &Arpa, reserved: &ReservedTokens) -> Result<Self> {
        let hi_order = arpa.order();
        let unigrams = arpa
            .ngrams
            .first()
            .ok_or_else(|| anyhow!("Model has no unigrams"))?;
        let mut syms = SymbolTable::new();
        let mut vocabulary = vec![reserved.unk.clone()];
        let mut unk_logprob = DEFAULT_UNK_LOGPROB;
        for entry in unigrams {
            let word = &entry.words[0];
            if *word == reserved.unk {
                unk_logprob = entry.logprob;
            } else if syms.contains_symbol(word) {
                log::warn!("Ignoring duplicate unigram {}", word);
            } else {
                syms.add_symbol(word.as_str());
                vocabulary.push(word.clone());
            }
        }

        let backoff: StateId = 0;
        let mut fst = StdVectorFst::new();
        fst.add_state();
        let mut histories = HistoryMap::new();
        histories.insert(Vec::new(), backoff);
        // N-Gram which reaches a given state
        let mut state_ngrams = vec![Vec::new()];
        let mut backoffs = vec![0.0];
        let mut ngrams = Vec::<(Vec<Label>, &ArpaEntry)>::new();
        let mut skipped = 0;
        for (k, entries) in arpa.ngrams.iter().enumerate() {
            let order = k + 1;
            for entry in entries {
                // Unknown words are scored separately, and label 0 is epsilon
                let labels: Option<Vec<Label>> = entry
                    .words
                    .iter()
                    .map(|w| syms.get_label(w).filter(|&l| l != OOV_INDEX))
                    .collect();
                let labels = match labels {
                    Some(labels) => labels,
                    None => {
                        skipped += 1;
                        continue;
                    }
                };
                if order < hi_order {
                    let s = fst.add_state();
                    histories.insert(labels.clone(), s);
                    state_ngrams.push(labels.clone());
                    backoffs.push(entry.backoff);
                }
                ngrams.push((labels, entry));
            }
        }
        if skipped > 0 {
            log::debug!("{} N-Grams with unknown words not represented", skipped);
        }

        for (s, history) in state_ngrams.iter().enumerate().skip(1) {
            let s = s as StateId;
            let target = longest_suffix(&histories, &history[1..]).unwrap_or(backoff);
            fst.add_tr(
                s,
                Tr::new(EPS_LABEL, EPS_LABEL, -backoffs[s as usize], target),
            )?;
        }
        for (labels, entry) in ngrams.iter() {
            let (history, word) = labels.split_at(labels.len() - 1);
            let origin = match histories.get(history) {
                Some(&origin) => origin,
                None => {
                    log::warn!("No history for N-Gram {:?}, skipping", entry.words);
                    continue;
                }
            };
            let destination = longest_suffix(&histories, labels).unwrap_or(backoff);
            fst.add_tr(
                origin,
                Tr::new(word[0], word[0], -entry.logprob, destination),
            )?;
        }
        fst.set_start(backoff)?;
        tr_sort(&mut fst, ILabelCompare {});
        let syms = Arc::new(syms);
        fst.set_input_symbols(Arc::clone(&syms));
        fst.set_output_symbols(Arc::clone(&syms));

        log::debug!(
            "Built {}-gram model with {} states and {} words",
            hi_order,
            fst.num_states(),
            vocabulary.len()
        );
        Ok(Self {
            fst,
            hi_order,
            backoff,
            syms,
            vocabulary,
            unk_logprob,
        })
    }

    pub fn fst(&self) -> &StdVectorFst {
        &self.fst
    }
}

impl LanguageModel for NGramModel {
    fn load(path: &Path, reserved: &ReservedTokens) -> Result<Self> {
        let arpa = read_arpa_file(path)?;
        Self::from_arpa(&arpa, reserved)
    }

    fn order(&self) -> usize {
        self.hi_order
    }

    fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    fn index(&self, word: &str) -> Label {
        self.syms.get_label(word).unwrap_or(OOV_INDEX)
    }

    fn null_context(&self) -> LmState {
        LmState(self.backoff)
    }

    fn score(&self, state: &LmState, word: Label) -> Result<(f32, LmState)> {
        let mut state_id = state.0;
        let mut cost = 0.0;
        loop {
            let trs = self.fst.get_trs(state_id)?;
            let trs = trs.trs();
            if word != EPS_LABEL {
                if let Ok(idx) = trs.binary_search_by_key(&word, |tr| tr.ilabel) {
                    let tr = &trs[idx];
                    return Ok((-(cost + *tr.weight.value()), LmState(tr.nextstate)));
                }
            }
            match trs.first() {
                Some(tr) if tr.ilabel == EPS_LABEL => {
                    cost += *tr.weight.value();
                    state_id = tr.nextstate;
                }
                _ => return Ok((self.unk_logprob - cost, LmState(self.backoff))),
            }
        }
    }
}
