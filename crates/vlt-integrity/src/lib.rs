//! vlt-integrity
//!
//! Digest computation and record checking for the persisted balance pair.
//!
//! Pure deterministic logic, no IO. The caller reads the two store slots and
//! passes them in; any absence or mismatch is a typed decision, never an
//! error. Verification must not be able to fail "loudly" — a record that
//! cannot be proven intact is simply not valid.

use sha2::{Digest, Sha256};

/// SHA-256 over the UTF-8 bytes of `blob`, lowercase hex (64 chars).
pub fn digest_hex(blob: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(blob.as_bytes());
    hex::encode(hasher.finalize())
}

/// Outcome of checking a stored (blob, digest) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordCheck {
    /// Both halves present and the digest matches the blob.
    Valid,
    /// Blob slot is absent; there is no record to trust.
    MissingBlob,
    /// Digest slot is absent; the blob cannot be proven intact.
    MissingDigest,
    /// Both halves present but the digest does not match the blob.
    ///
    /// Fields carry the recomputed and stored digests for logging.
    Mismatch { expected: String, stored: String },
}

impl RecordCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, RecordCheck::Valid)
    }
}

/// Check a stored record. Absence of either half is treated as "no valid
/// record", not as an error.
pub fn check_record(blob: Option<&str>, digest: Option<&str>) -> RecordCheck {
    let Some(blob) = blob else {
        return RecordCheck::MissingBlob;
    };
    let Some(stored) = digest else {
        return RecordCheck::MissingDigest;
    };

    let expected = digest_hex(blob);
    if expected == stored {
        RecordCheck::Valid
    } else {
        RecordCheck::Mismatch {
            expected,
            stored: stored.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_sha256_hex() {
        // Known SHA-256 vector.
        assert_eq!(
            digest_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest_hex("").len(), 64);
    }

    #[test]
    fn valid_record_checks_out() {
        let blob = "some-opaque-blob";
        let digest = digest_hex(blob);
        assert_eq!(check_record(Some(blob), Some(&digest)), RecordCheck::Valid);
        assert!(check_record(Some(blob), Some(&digest)).is_valid());
    }

    #[test]
    fn missing_halves_are_not_valid() {
        assert_eq!(check_record(None, None), RecordCheck::MissingBlob);
        assert_eq!(check_record(None, Some("beef")), RecordCheck::MissingBlob);
        assert_eq!(check_record(Some("x"), None), RecordCheck::MissingDigest);
    }

    #[test]
    fn any_blob_edit_breaks_the_match() {
        let blob = "AAAA1234BBBB";
        let digest = digest_hex(blob);
        for i in 0..blob.len() {
            let mut edited = blob.as_bytes().to_vec();
            edited[i] ^= 0x01;
            let edited = String::from_utf8(edited).unwrap();
            let check = check_record(Some(&edited), Some(&digest));
            assert!(!check.is_valid(), "edit at {i} went undetected");
        }
    }

    #[test]
    fn mismatch_carries_both_digests() {
        let check = check_record(Some("blob"), Some("not-a-digest"));
        match check {
            RecordCheck::Mismatch { expected, stored } => {
                assert_eq!(expected, digest_hex("blob"));
                assert_eq!(stored, "not-a-digest");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }
}
