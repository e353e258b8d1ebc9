/// Byte length of the UTF-8 sequence starting at `bytes[0]`.
///
/// Returns 0 when the slice is empty, the leading byte is not a valid
/// sequence start, or the slice is too short to hold the full sequence.
/// Continuation bytes are not inspected.
#[inline]
pub(crate) fn codepoint_len(bytes: &[u8]) -> usize {
    let Some(&lead) = bytes.first() else {
        return 0;
    };
    if lead < 0x80 {
        return 1;
    }
    if bytes.len() >= 2 && lead & 0xE0 == 0xC0 {
        return 2;
    }
    if bytes.len() >= 3 && lead & 0xF0 == 0xE0 {
        return 3;
    }
    if bytes.len() >= 4 && lead & 0xF8 == 0xF0 {
        return 4;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::codepoint_len;

    #[test]
    fn ascii() {
        assert_eq!(codepoint_len(b"a"), 1);
        assert_eq!(codepoint_len(b"abc"), 1);
        assert_eq!(codepoint_len(&[0x7F]), 1);
    }

    #[test]
    fn multi_byte() {
        assert_eq!(codepoint_len("é".as_bytes()), 2);
        assert_eq!(codepoint_len("中".as_bytes()), 3);
        assert_eq!(codepoint_len("🦀".as_bytes()), 4);
        assert_eq!(codepoint_len("é!".as_bytes()), 2);
    }

    #[test]
    fn invalid_lead() {
        // continuation byte as lead
        assert_eq!(codepoint_len(&[0x80]), 0);
        assert_eq!(codepoint_len(&[0xBF, b'a']), 0);
        // 0xF8..0xFF are not valid leads
        assert_eq!(codepoint_len(&[0xF8, 0x80, 0x80, 0x80, 0x80]), 0);
        assert_eq!(codepoint_len(&[0xFF]), 0);
    }

    #[test]
    fn truncated() {
        assert_eq!(codepoint_len(&[]), 0);
        let crab = "🦀".as_bytes();
        assert_eq!(codepoint_len(&crab[..3]), 0);
        assert_eq!(codepoint_len(&"中".as_bytes()[..2]), 0);
        assert_eq!(codepoint_len(&"é".as_bytes()[..1]), 0);
    }
}
