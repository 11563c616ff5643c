//! Shared-key derivation for association authentication.
//!
//! During setup both endpoints exchange random key vectors and each
//! independently concatenates them into the association shared key. The
//! concatenation order is decided by comparing the vectors as big-endian
//! unsigned integers over their explicit lengths — both sides must reach
//! the same order or authentication fails forever after, so the
//! comparison is a strict total order with deterministic tiebreaks.

use std::cmp::Ordering;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use simwire_proto::sctp::AUTH_DIGEST_LEN;

type HmacSha256 = Hmac<Sha256>;

/// Compare two key vectors as big-endian unsigned integers.
///
/// Leading zero bytes are insignificant. When the numeric values are
/// equal but the raw vectors differ (zero padding), the longer vector
/// orders first, then the lexicographically larger one — any deterministic
/// rule works as long as both peers apply the same one.
#[must_use]
pub fn compare_random(own: &[u8], peer: &[u8]) -> Ordering {
    let own_sig = strip_leading_zeros(own);
    let peer_sig = strip_leading_zeros(peer);

    match own_sig.len().cmp(&peer_sig.len()) {
        Ordering::Equal => {},
        ord => return ord,
    }
    match own_sig.cmp(peer_sig) {
        Ordering::Equal => {},
        ord => return ord,
    }
    // Numerically equal: tiebreak on raw length, then raw bytes.
    match own.len().cmp(&peer.len()) {
        Ordering::Equal => own.cmp(peer),
        ord => ord,
    }
}

/// Derive the association shared key: the winning vector's bytes first,
/// the other's second.
///
/// Both endpoints run this with their arguments swapped and must produce
/// bit-identical keys; [`compare_random`]'s total order guarantees it.
#[must_use]
pub fn calculate_assoc_shared_key(own: &[u8], peer: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(own.len() + peer.len());
    match compare_random(own, peer) {
        Ordering::Less => {
            key.extend_from_slice(peer);
            key.extend_from_slice(own);
        },
        Ordering::Equal | Ordering::Greater => {
            key.extend_from_slice(own);
            key.extend_from_slice(peer);
        },
    }
    key
}

/// HMAC-SHA-256 digest over `message` under the association shared key.
///
/// Fills the placeholder left by the AUTH chunk framing.
#[must_use]
pub fn compute_auth_digest(shared_key: &[u8], message: &[u8]) -> [u8; AUTH_DIGEST_LEN] {
    // INVARIANT: HMAC accepts keys of any length (they are hashed down),
    // so construction cannot fail.
    #[allow(clippy::expect_used)]
    let mut mac =
        HmacSha256::new_from_slice(shared_key).expect("invariant: HMAC accepts any key length");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

fn strip_leading_zeros(v: &[u8]) -> &[u8] {
    let first = v.iter().position(|&b| b != 0).unwrap_or(v.len());
    &v[first..]
}
