use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

/// One entry of an ARPA file.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpaEntry {
    /// Words of the N-Gram, oldest first
    pub words: Vec<String>,
    /// log10 conditional probability of the last word
    pub logprob: f32,
    /// log10 back-off weight of the N-Gram as a history
    pub backoff: f32,
}

/// Contents of an ARPA file, with `ngrams[k]` holding the (k+1)-grams.
#[derive(Debug, Clone, Default)]
pub struct Arpa {
    pub ngrams: Vec<Vec<ArpaEntry>>,
}

impl Arpa {
    /// Highest N-Gram order.
    pub fn order(&self) -> usize {
        self.ngrams.len()
    }
}

enum Section {
    Preamble,
    Data,
    NGrams(usize),
    End,
}

fn parse_entry(line: &str, order: usize) -> Result<ArpaEntry> {
    let mut fields = line.split_whitespace();
    let logprob: f32 = fields
        .next()
        .ok_or_else(|| anyhow!("Empty {}-gram entry", order))?
        .parse()?;
    let words: Vec<String> = fields.by_ref().take(order).map(String::from).collect();
    if words.len() != order {
        return Err(anyhow!("Expected {} words in {:?}", order, line));
    }
    let backoff: f32 = match fields.next() {
        Some(backoff) => backoff.parse()?,
        None => 0.0,
    };
    if fields.next().is_some() {
        return Err(anyhow!("Trailing fields in {:?}", line));
    }
    Ok(ArpaEntry {
        words,
        logprob,
        backoff,
    })
}

/// Parse an ARPA back-off language model.
pub fn read_arpa<R: BufRead>(reader: R) -> Result<Arpa> {
    let mut section = Section::Preamble;
    let mut has_header = false;
    let mut counts = Vec::<usize>::new();
    let mut arpa = Arpa::default();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let context = || format!("line {}", lineno + 1);
        if line == "\\data\\" {
            has_header = true;
            section = Section::Data;
            continue;
        }
        if line == "\\end\\" {
            section = Section::End;
            break;
        }
        if let Some(header) = line.strip_prefix('\\') {
            if !has_header {
                return Err(anyhow!("Section {} before \\data\\ header", line))
                    .with_context(context);
            }
            let order: usize = header
                .strip_suffix("-grams:")
                .ok_or_else(|| anyhow!("Unknown section {:?}", line))
                .and_then(|n| Ok(n.parse()?))
                .with_context(context)?;
            if order != arpa.ngrams.len() + 1 {
                return Err(anyhow!("Section {} out of order", line)).with_context(context);
            }
            arpa.ngrams.push(Vec::with_capacity(
                counts.get(order - 1).copied().unwrap_or(0),
            ));
            section = Section::NGrams(order);
            continue;
        }
        match section {
            Section::Preamble => {}
            Section::Data => {
                let (_, count) = line
                    .strip_prefix("ngram ")
                    .and_then(|spec| spec.split_once('='))
                    .ok_or_else(|| anyhow!("Bad count line {:?}", line))
                    .with_context(context)?;
                counts.push(count.trim().parse().with_context(context)?);
            }
            Section::NGrams(order) => {
                let entry = parse_entry(line, order).with_context(context)?;
                arpa.ngrams[order - 1].push(entry);
            }
            Section::End => {}
        }
    }
    if !has_header {
        return Err(anyhow!("Missing \\data\\ header"));
    }
    if !matches!(section, Section::End) {
        return Err(anyhow!("Missing \\end\\ marker"));
    }
    if arpa.ngrams.is_empty() {
        return Err(anyhow!("No N-Grams found"));
    }
    if counts.len() != arpa.ngrams.len() {
        return Err(anyhow!(
            "Header lists {} orders but {} sections were found",
            counts.len(),
            arpa.ngrams.len()
        ));
    }
    for (k, (entries, count)) in arpa.ngrams.iter().zip(counts.iter()).enumerate() {
        if entries.len() != *count {
            log::warn!(
                "ARPA header announces {} {}-grams but {} were read",
                count,
                k + 1,
                entries.len()
            );
        }
    }
    Ok(arpa)
}

/// Read an ARPA file from disk.
pub fn read_arpa_file(path: &Path) -> Result<Arpa> {
    let fh = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    read_arpa(BufReader::new(fh)).with_context(|| format!("Cannot parse {}", path.display()))
}
