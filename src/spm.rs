use crate::vocab::Vocab;
use crate::{utf8, utok};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const NONE: i32 = -1;

/// One span of the input under the current partition, linked to its
/// neighbours by arena indices. `len == 0` marks a tombstone: the span was
/// merged away but the slot stays so queued indices remain valid.
struct Symbol {
    prev: i32,
    next: i32,
    start: usize,
    len: usize,
}

/// Candidate merge of two adjacent symbols. `size` is the combined byte
/// length at push time; endpoints whose lengths no longer sum to it are
/// stale and the entry is dropped on pop.
struct Bigram {
    left: i32,
    right: i32,
    score: f32,
    size: usize,
}

impl Ord for Bigram {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: higher score first, then the smaller left index.
        // scores tie by IEEE equality, so -0.0 ties with 0.0; total_cmp
        // only orders unequal scores
        if self.score == other.score {
            other.left.cmp(&self.left)
        } else {
            self.score.total_cmp(&other.score)
        }
    }
}

impl PartialOrd for Bigram {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Bigram {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Bigram {}

/// Greedy highest-score bigram merging over codepoint spans.
pub(crate) fn tokenize(vocab: &Vocab, scores: &[f32], text: &str) -> Vec<utok> {
    let mut output = Vec::new();
    if text.is_empty() || scores.is_empty() {
        if !text.is_empty() {
            if let Some(unk) = vocab.unk_id() {
                output.push(unk);
            }
        }
        return output;
    }

    let bytes = text.as_bytes();
    let mut symbols = Vec::with_capacity(text.len());
    let mut offs = 0;
    while offs < bytes.len() {
        let len = utf8::codepoint_len(&bytes[offs..]);
        if len == 0 {
            offs += 1;
            continue;
        }
        symbols.push(Symbol {
            prev: symbols.len() as i32 - 1,
            next: NONE,
            start: offs,
            len,
        });
        offs += len;
    }
    if symbols.is_empty() {
        return output;
    }
    let last = symbols.len() - 1;
    for i in 0..last {
        symbols[i].next = i as i32 + 1;
    }

    let mut queue = BinaryHeap::new();
    for i in 0..last {
        try_add_bigram(&mut queue, &symbols, vocab, scores, text, i as i32, i as i32 + 1);
    }

    while let Some(bigram) = queue.pop() {
        let (li, ri) = (bigram.left as usize, bigram.right as usize);
        if li >= symbols.len() || ri >= symbols.len() {
            continue;
        }
        if symbols[li].len == 0
            || symbols[ri].len == 0
            || symbols[li].len + symbols[ri].len != bigram.size
        {
            // stale: the partition changed since this entry was queued
            continue;
        }

        symbols[li].len += symbols[ri].len;
        symbols[ri].len = 0;
        symbols[li].next = symbols[ri].next;
        let next = symbols[li].next;
        if next != NONE {
            symbols[next as usize].prev = bigram.left;
        }

        let prev = symbols[li].prev;
        try_add_bigram(&mut queue, &symbols, vocab, scores, text, prev, bigram.left);
        try_add_bigram(&mut queue, &symbols, vocab, scores, text, bigram.left, next);
    }

    let mut i = 0;
    while i != NONE {
        let sym = &symbols[i as usize];
        if sym.len > 0 {
            if let Some(piece) = text.get(sym.start..sym.start + sym.len) {
                match vocab.token_to_id(piece) {
                    Some(id) => output.push(id),
                    None => vocab.push_codepoint_ids(piece, &mut output),
                }
            }
        }
        i = sym.next;
    }
    output
}

fn try_add_bigram(
    queue: &mut BinaryHeap<Bigram>,
    symbols: &[Symbol],
    vocab: &Vocab,
    scores: &[f32],
    text: &str,
    left: i32,
    right: i32,
) {
    if left == NONE || right == NONE {
        return;
    }
    let (Some(l), Some(r)) = (symbols.get(left as usize), symbols.get(right as usize)) else {
        return;
    };
    if l.len == 0 || r.len == 0 {
        return;
    }
    let Some(piece) = text.get(l.start..l.start + l.len + r.len) else {
        return;
    };
    if let Some(id) = vocab.token_to_id(piece) {
        if let Some(&score) = scores.get(id as usize) {
            queue.push(Bigram {
                left,
                right,
                score,
                size: piece.len(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::{MetaValue, Metadata};
    use crate::utok;
    use crate::vocab::{Vocab, KEY_SCORES, KEY_TOKENS, KEY_UNK_ID};

    fn vocab(tokens: &[&str], scores: &[f32], unk: Option<u32>) -> Vocab {
        let mut md = Metadata::new();
        md.set(KEY_TOKENS, MetaValue::str_array(tokens.iter().copied()));
        md.set(KEY_SCORES, MetaValue::f32_array(scores.iter().copied()));
        if let Some(unk) = unk {
            md.set(KEY_UNK_ID, unk);
        }
        Vocab::load(&md).unwrap()
    }

    #[test]
    fn tie_break_prefers_leftmost() {
        let v = vocab(&["a", "b", "ab", "ba"], &[0.0, 0.0, 1.0, 1.0], None);
        assert_eq!(v.tokenize("aba", false, false), vec![2, 0]);
    }

    #[test]
    fn signed_zero_scores_still_tie() {
        // -0.0 equals 0.0; the position tie-break decides, not the zero's sign
        let v = vocab(&["a", "b", "c", "ab", "bc"], &[0.0, 0.0, 0.0, -0.0, 0.0], None);
        assert_eq!(v.tokenize("abc", false, false), vec![3, 2]);
    }

    #[test]
    fn higher_score_merges_first() {
        let v = vocab(&["x", "y", "z", "xy", "yz"], &[0.0, 0.0, 0.0, 5.0, 1.0], None);
        assert_eq!(v.tokenize("xyz", false, false), vec![3, 2]);
    }

    #[test]
    fn greedy_chain_merges() {
        let v = vocab(&["a", "aa", "aaa", "aaaa"], &[0.0, 1.0, 2.0, 3.0], None);
        assert_eq!(v.tokenize("aaaa", false, false), vec![3]);
    }

    #[test]
    fn stale_entry_by_size_is_discarded() {
        // "bc" outbids "ab"; the queued "ab" then sees b's length changed
        let v = vocab(
            &["a", "b", "c", "ab", "bc"],
            &[0.0, 0.0, 0.0, 1.0, 3.0],
            None,
        );
        assert_eq!(v.tokenize("abc", false, false), vec![0, 4]);
    }

    #[test]
    fn stale_entry_by_tombstone_is_discarded() {
        // "ab" merges first, tombstoning b; the queued "bc" must be skipped
        let v = vocab(
            &["a", "b", "c", "ab", "bc", "abc"],
            &[0.0, 0.0, 0.0, 2.0, 1.0, 5.0],
            None,
        );
        assert_eq!(v.tokenize("abc", false, false), vec![5]);
    }

    #[test]
    fn unknown_substitution() {
        // substitution does not range-check the unk id
        let v = vocab(&["a", "b"], &[0.0, 0.0], Some(2));
        assert_eq!(v.tokenize("ac", false, false), vec![0, 2]);
    }

    #[test]
    fn unmapped_codepoints_drop_without_unknown() {
        let v = vocab(&["a", "b"], &[0.0, 0.0], None);
        assert_eq!(v.tokenize("ac", false, false), vec![0]);
        assert_eq!(v.tokenize("c", false, false), Vec::<utok>::new());
    }

    #[test]
    fn multibyte_codepoints_merge() {
        let v = vocab(&["é", "t", "ét"], &[0.0, 0.0, 1.0], None);
        assert_eq!(v.tokenize("ét", false, false), vec![2]);
    }

    #[test]
    fn missing_scores_collapse_to_unknown() {
        let mut md = Metadata::new();
        md.set(KEY_TOKENS, MetaValue::str_array(["a"]));
        md.set(KEY_UNK_ID, 0u32);
        let v = Vocab::load(&md).unwrap();
        assert_eq!(v.tokenize("anything", false, false), vec![0]);
        assert_eq!(v.tokenize("", false, false), Vec::<utok>::new());
    }
}
