use md5::{Digest as _, Md5};

pub const DIGEST_LEN: usize = 16;

/// 128-bit MD5 digest of a slot payload, as stored in front of each Steam
/// region.
pub type Digest = [u8; DIGEST_LEN];

pub fn digest(data: &[u8]) -> Digest {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&Md5::digest(data));
    out
}

pub fn to_hex(d: &Digest) -> String {
    d.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_vectors() {
        assert_eq!(to_hex(&digest(b"")), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(to_hex(&digest(b"abc")), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            to_hex(&digest(
                b"12345678901234567890123456789012345678901234567890123456789012345678901234567890"
            )),
            "57edf4a22be3c955ac49da2e2107b67a"
        );
    }

    #[test]
    fn padding_boundary_lengths_differ() {
        let a = digest(&[0u8; 55]);
        let b = digest(&[0u8; 56]);
        let c = digest(&[0u8; 64]);
        assert_ne!(a, b);
        assert_ne!(b, c);
    }
}
