//! Session identifier generation.
//!
//! Identifiers are built from a 63-character alphabet (upper- and lowercase
//! ASCII letters, digits, and `!`): two independent Fisher-Yates
//! permutations of the alphabet are concatenated into a 126-character
//! string. Uniqueness against the persisted document is checked after
//! generation; on an exact collision the whole identifier is regenerated.

use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::Result;
use crate::file_store::FileStore;

const ALPHABET: &[u8; 63] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!";

/// Length of a generated session identifier.
pub const ID_LEN: usize = ALPHABET.len() * 2;

/// Generate a candidate identifier: two shuffled copies of the alphabet.
pub(crate) fn generate() -> String {
    let mut rng = rand::rng();
    let mut id = String::with_capacity(ID_LEN);
    for _ in 0..2 {
        let mut half = *ALPHABET;
        half.shuffle(&mut rng);
        for byte in half {
            id.push(byte as char);
        }
    }
    id
}

/// Generate an identifier not present among the persisted sessions.
///
/// The persisted document is re-read after each candidate is produced and
/// the candidate is discarded on an exact match. This check-then-use
/// sequence is not protected by any cross-process lock: two processes
/// generating against the same file at the same time can both pass the
/// check. Within one process the store's writer lock closes that window.
pub(crate) fn generate_unique(file: &FileStore) -> Result<String> {
    loop {
        let candidate = generate();
        if !file.contains(&candidate)? {
            return Ok(candidate);
        }
        debug!("generated session id collides with a persisted record, regenerating");
    }
}
