//! Base62 encoding used for text record ids.

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode `n` as exactly `width` base62 digits, keeping the low-order digits
/// when `n` does not fit.
pub fn encode_fixed(mut n: u64, width: usize) -> String {
    let mut out = vec![b'0'; width];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n % 62) as usize];
        n /= 62;
    }
    out.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_padding() {
        assert_eq!(encode_fixed(0, 3), "000");
        assert_eq!(encode_fixed(61, 2), "0z");
        assert_eq!(encode_fixed(62, 2), "10");
        assert_eq!(encode_fixed(3843, 4), "00zz");
    }

    #[test]
    fn truncates_to_low_digits() {
        // 62^2 wraps back to all zeros in two digits
        assert_eq!(encode_fixed(3844, 2), "00");
        assert_eq!(encode_fixed(3845, 2), "01");
    }
}
