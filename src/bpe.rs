use crate::vocab::Vocab;
use crate::{utf8, utok};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// GPT-2 pre-segmentation: contraction suffixes, letter runs, digit runs,
/// other-symbol runs, whitespace runs, tried in that order.
const SPLIT_PATTERN: &str = r"'s|'t|'re|'ve|'m|'ll|'d|[[:alpha:]]+|[0-9]+|[^\s[:alnum:]]+|\s+";

fn splitter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SPLIT_PATTERN).expect("valid pre-tokenize pattern"))
}

/// Rank-driven pair merging within pre-segmented chunks.
pub(crate) fn tokenize(
    vocab: &Vocab,
    ranks: &HashMap<(String, String), u32>,
    text: &str,
) -> Vec<utok> {
    let mut output = Vec::new();
    if text.is_empty() {
        return output;
    }

    // byte-level vocabularies carry no merge list; every codepoint maps alone
    if ranks.is_empty() && vocab.vocab_size() < 256 {
        vocab.push_codepoint_ids(text, &mut output);
        return output;
    }

    for word in pre_tokenize(text) {
        if word.is_empty() {
            continue;
        }
        if let Some(id) = vocab.token_to_id(word) {
            output.push(id);
            continue;
        }

        let mut chars = Vec::new();
        split_codepoints(word, &mut chars);
        if chars.is_empty() {
            continue;
        }
        let mut pieces: Vec<String> = chars.into_iter().map(str::to_string).collect();

        while pieces.len() > 1 {
            let mut best: Option<(u32, usize)> = None;
            for j in 0..pieces.len() - 1 {
                let Some(&rank) = ranks.get(&(pieces[j].clone(), pieces[j + 1].clone())) else {
                    continue;
                };
                // only a strictly lower rank displaces the current candidate
                if best.map_or(true, |(r, _)| rank < r) {
                    best = Some((rank, j));
                }
            }
            let Some((_, at)) = best else {
                break;
            };
            let merged = format!("{}{}", pieces[at], pieces[at + 1]);
            pieces.remove(at + 1);
            pieces[at] = merged;
        }

        for piece in &pieces {
            match vocab.token_to_id(piece) {
                Some(id) => output.push(id),
                None => vocab.push_codepoint_ids(piece, &mut output),
            }
        }
    }
    output
}

fn pre_tokenize(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut words = Vec::new();
    let mut matched = 0;
    for m in splitter().find_iter(text) {
        if !m.is_empty() {
            words.push(m.as_str());
        }
        matched += m.len();
    }
    // residual text the match iteration never covered, one codepoint at a time
    if matched < text.len() {
        if let Some(rest) = text.get(matched..) {
            split_codepoints(rest, &mut words);
        }
    }
    // no matches at all: take the whole input one codepoint at a time
    if words.is_empty() {
        split_codepoints(text, &mut words);
    }
    words
}

fn split_codepoints<'a>(text: &'a str, out: &mut Vec<&'a str>) {
    let bytes = text.as_bytes();
    let mut offs = 0;
    while offs < bytes.len() {
        let len = utf8::codepoint_len(&bytes[offs..]);
        if len == 0 {
            offs += 1;
            continue;
        }
        if let Some(piece) = text.get(offs..offs + len) {
            out.push(piece);
        }
        offs += len;
    }
}
