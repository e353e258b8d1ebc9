use crate::metadata::{MetaValue, Metadata};
use crate::{bpe, spm, utf8, utok};
use log::warn;
use std::collections::HashMap;
use thiserror::Error;

pub const KEY_TOKENS: &str = "tokenizer.ggml.tokens";
pub const KEY_MODEL: &str = "tokenizer.ggml.model";
pub const KEY_MERGES: &str = "tokenizer.ggml.merges";
pub const KEY_SCORES: &str = "tokenizer.ggml.scores";
pub const KEY_BOS_ID: &str = "tokenizer.ggml.bos_token_id";
pub const KEY_EOS_ID: &str = "tokenizer.ggml.eos_token_id";
pub const KEY_UNK_ID: &str = "tokenizer.ggml.unk_token_id";
pub const KEY_PADDING_ID: &str = "tokenizer.ggml.padding_token_id";
pub const KEY_PAD_ID: &str = "tokenizer.ggml.pad_token_id";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("metadata key `{}` is missing or not an array", KEY_TOKENS)]
    NoTokenList,
    #[error("token {0} is not a string")]
    TokenNotString(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VocabKind {
    Spm,
    Bpe,
}

enum Engine {
    Spm { scores: Vec<f32> },
    Bpe { ranks: HashMap<(String, String), u32> },
}

/// Immutable subword vocabulary plus the tokenizer engine it selects.
pub struct Vocab {
    tokens: Vec<String>,
    ids: HashMap<String, utok>,
    engine: Engine,
    bos: Option<utok>,
    eos: Option<utok>,
    unk: Option<utok>,
    pad: Option<utok>,
}

impl Vocab {
    /// Builds a vocabulary from container metadata.
    ///
    /// The ordered token list is required; everything else is optional and
    /// degrades with a warning when malformed. The engine is BPE when the
    /// model-type string is one of `gpt2`, `gpt-2`, `bpe`, SPM otherwise.
    pub fn load(metadata: &Metadata) -> Result<Self, LoadError> {
        let list = metadata
            .get(KEY_TOKENS)
            .and_then(MetaValue::as_array)
            .ok_or(LoadError::NoTokenList)?;

        let mut tokens = Vec::with_capacity(list.len());
        let mut ids = HashMap::with_capacity(list.len());
        for (i, entry) in list.iter().enumerate() {
            let text = entry.as_str().ok_or(LoadError::TokenNotString(i))?;
            tokens.push(text.to_string());
            ids.insert(text.to_string(), i as utok);
        }

        let model = metadata.get(KEY_MODEL).and_then(MetaValue::as_str);
        let engine = if matches!(model, Some("gpt2" | "gpt-2" | "bpe")) {
            Engine::Bpe {
                ranks: load_ranks(metadata),
            }
        } else {
            Engine::Spm {
                scores: load_scores(metadata, tokens.len()),
            }
        };

        Ok(Self {
            tokens,
            ids,
            engine,
            bos: special_id(metadata, &[KEY_BOS_ID]),
            eos: special_id(metadata, &[KEY_EOS_ID]),
            unk: special_id(metadata, &[KEY_UNK_ID]),
            pad: special_id(metadata, &[KEY_PADDING_ID, KEY_PAD_ID]),
        })
    }

    /// Tokenizes `text`, optionally wrapping the result in bos/eos markers.
    ///
    /// Markers are emitted only when configured and within the vocabulary.
    /// Never fails; unmappable input degrades per the engine's unknown rule.
    pub fn tokenize(&self, text: &str, add_bos: bool, add_eos: bool) -> Vec<utok> {
        let mut output = Vec::new();
        if add_bos {
            if let Some(bos) = self.bos.filter(|&id| (id as usize) < self.tokens.len()) {
                output.push(bos);
            }
        }
        match &self.engine {
            Engine::Spm { scores } => output.extend(spm::tokenize(self, scores, text)),
            Engine::Bpe { ranks } => output.extend(bpe::tokenize(self, ranks, text)),
        }
        if add_eos {
            if let Some(eos) = self.eos.filter(|&id| (id as usize) < self.tokens.len()) {
                output.push(eos);
            }
        }
        output
    }

    #[inline]
    pub fn token_to_id(&self, token: &str) -> Option<utok> {
        self.ids.get(token).copied()
    }

    #[inline]
    pub fn id_to_token(&self, id: utok) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.tokens.len()
    }

    pub fn kind(&self) -> VocabKind {
        match self.engine {
            Engine::Spm { .. } => VocabKind::Spm,
            Engine::Bpe { .. } => VocabKind::Bpe,
        }
    }

    #[inline]
    pub fn bos_id(&self) -> Option<utok> {
        self.bos
    }

    #[inline]
    pub fn eos_id(&self) -> Option<utok> {
        self.eos
    }

    #[inline]
    pub fn unk_id(&self) -> Option<utok> {
        self.unk
    }

    #[inline]
    pub fn pad_id(&self) -> Option<utok> {
        self.pad
    }

    /// Emits one id per codepoint of `piece`, substituting `unk` (when
    /// configured) for codepoints outside the vocabulary and for bytes that
    /// do not start a valid sequence; without `unk` they are dropped.
    pub(crate) fn push_codepoint_ids(&self, piece: &str, output: &mut Vec<utok>) {
        let bytes = piece.as_bytes();
        let mut offs = 0;
        while offs < bytes.len() {
            let len = utf8::codepoint_len(&bytes[offs..]);
            if len == 0 {
                if let Some(unk) = self.unk {
                    output.push(unk);
                }
                offs += 1;
                continue;
            }
            match piece.get(offs..offs + len).and_then(|c| self.token_to_id(c)) {
                Some(id) => output.push(id),
                None => {
                    if let Some(unk) = self.unk {
                        output.push(unk);
                    }
                }
            }
            offs += len;
        }
    }
}

fn load_ranks(metadata: &Metadata) -> HashMap<(String, String), u32> {
    let Some(merges) = metadata.get(KEY_MERGES).and_then(MetaValue::as_array) else {
        warn!("BPE model type but `{KEY_MERGES}` is missing");
        return HashMap::new();
    };
    let mut ranks = HashMap::with_capacity(merges.len());
    for (rank, entry) in merges.iter().enumerate() {
        let entry = entry.as_str().unwrap_or_default();
        // split at the first space; later spaces stay in the right piece
        match entry.find(' ') {
            Some(pos) if pos > 0 && pos < entry.len() - 1 => {
                let left = entry[..pos].to_string();
                let right = entry[pos + 1..].to_string();
                ranks.insert((left, right), rank as u32);
            }
            _ => {} // malformed entry, skipped
        }
    }
    ranks
}

fn load_scores(metadata: &Metadata, n_vocab: usize) -> Vec<f32> {
    let Some(values) = metadata.get(KEY_SCORES).and_then(MetaValue::as_array) else {
        if n_vocab > 0 {
            warn!("SPM model type but `{KEY_SCORES}` is missing");
        }
        return Vec::new();
    };
    let scores: Option<Vec<f32>> = if values.len() == n_vocab {
        values.iter().map(MetaValue::as_f32).collect()
    } else {
        None
    };
    scores.unwrap_or_else(|| {
        warn!("`{KEY_SCORES}` does not match the token list; scores ignored");
        Vec::new()
    })
}

fn special_id(metadata: &Metadata, keys: &[&str]) -> Option<utok> {
    // later keys are consulted only while earlier ones are absent entirely;
    // a present key of the wrong type means "not configured"
    let value = keys.iter().find_map(|key| metadata.get(key))?;
    match *value {
        MetaValue::U32(id) => Some(id),
        MetaValue::I32(id) if id >= 0 => Some(id as utok),
        _ => None,
    }
}
