//! Invitation code generation.

use rand::Rng;

/// Alphabet for invitation codes. Consonants only, so no code can spell
/// an offensive word.
pub const CODE_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";

/// Length of an invitation code.
pub const CODE_LEN: usize = 4;

/// Generate a random invitation code.
///
/// Uniqueness among pending invitations is the caller's responsibility;
/// regenerate on collision.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Returns `true` if `code` has the exact shape of an invitation code.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
