//! Packed-integer name comparison used by the three algorithm registries.
//!
//! Section 4.5 asks for O(1) parsing of a 3-19 byte canonical name "via a
//! length-indexed switch over ... little-endian loads of the name bytes".
//! We bucket candidate names by length first (a handful of `match` arms,
//! resolved at compile time), then compare each bucket's names as a single
//! packed integer load instead of a byte-by-byte `str` comparison. Input
//! has already been through `serde_json`'s string deserializer by the time
//! it reaches here, so JSON's `+`-escaped `+` has already been
//! unescaped to a literal byte — there is no separate escape form to
//! special-case on this side of that boundary.

/// Pack up to 8 bytes of `name` into a little-endian `u64`, zero-padding
/// any remainder. Names longer than 8 bytes fall back to a direct `str`
/// comparison in the caller (still bucketed by length first).
pub const fn pack8(name: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let mut i = 0;
    while i < name.len() && i < 8 {
        buf[i] = name[i];
        i += 1;
    }
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_is_injective_for_distinct_short_names() {
        assert_ne!(pack8(b"HS256"), pack8(b"HS384"));
        assert_ne!(pack8(b"RS256"), pack8(b"ES256"));
        assert_eq!(pack8(b"dir"), pack8(b"dir"));
    }
}
