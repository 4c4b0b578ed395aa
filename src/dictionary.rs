use anyhow::{anyhow, Result};
use rustfst::algorithms::determinize::determinize;
use rustfst::algorithms::rm_epsilon::rm_epsilon;
use rustfst::algorithms::union::union;
use rustfst::prelude::*;
use rustfst::utils::acceptor;

use crate::alphabet::Alphabet;
use crate::StdVectorFst;

/// FST label for a symbol ID.  Labels are shifted by one since label 0
/// is epsilon.
pub fn symbol_label(id: Label) -> Label {
    id + 1
}

/// Convert a word to FST labels, optionally followed by a space.
/// Returns `None` if the word cannot be spelled with the alphabet.
fn word_labels(word: &str, alphabet: &Alphabet, add_space: bool) -> Option<Vec<Label>> {
    if word.is_empty() {
        return None;
    }
    let mut labels: Vec<Label> = alphabet
        .string_to_labels(word)?
        .into_iter()
        .map(symbol_label)
        .collect();
    if add_space {
        labels.push(symbol_label(alphabet.space_id()?));
    }
    Some(labels)
}

/// Compile words into a deterministic, minimal acceptor over the
/// alphabet.
///
/// Words containing symbols outside the alphabet are skipped.  Returns
/// the acceptor and the number of words it contains.
pub fn compile_dictionary<I, S>(
    words: I,
    alphabet: &Alphabet,
    add_space: bool,
) -> Result<(StdVectorFst, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if add_space && alphabet.space_id().is_none() {
        return Err(anyhow!("Cannot add spaces: alphabet has no space symbol"));
    }
    let mut dictionary = StdVectorFst::new();
    let start = dictionary.add_state();
    dictionary.set_start(start)?;
    let mut count = 0;
    for word in words {
        let word = word.as_ref();
        match word_labels(word, alphabet, add_space) {
            Some(labels) => {
                let word_fst: StdVectorFst = acceptor(&labels, TropicalWeight::one());
                union(&mut dictionary, &word_fst)?;
                count += 1;
            }
            None => log::debug!("Skipping {:?}, not in alphabet", word),
        }
    }

    // Union leaves epsilon arcs behind, which must go before
    // determinizing.  Downstream decoding follows a single arc per
    // symbol.
    rm_epsilon(&mut dictionary)?;
    let mut dictionary: StdVectorFst = determinize(&dictionary)?;
    minimize(&mut dictionary)?;
    Ok((dictionary, count))
}
