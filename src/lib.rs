mod bpe;
mod metadata;
mod spm;
mod utf8;
mod vocab;

pub use metadata::{MetaValue, Metadata};
pub use vocab::{
    LoadError, Vocab, VocabKind, KEY_BOS_ID, KEY_EOS_ID, KEY_MERGES, KEY_MODEL, KEY_PAD_ID,
    KEY_PADDING_ID, KEY_SCORES, KEY_TOKENS, KEY_UNK_ID,
};

/// `utok` for token id.
#[allow(non_camel_case_types)]
pub type utok = u32;
