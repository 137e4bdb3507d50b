//! Text normalization used for win matching.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lowercase `s` and strip its diacritics.
///
/// Decomposes to NFD, drops combining marks, and recomposes to NFC so that
/// "Café" and "CAFE" normalize to the same string.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect()
}

/// Whether the normalized `guess` contains the normalized `secret`.
pub fn guess_matches(guess: &str, secret: &str) -> bool {
    let secret = normalize(secret);
    !secret.is_empty() && normalize(guess).contains(&secret)
}
