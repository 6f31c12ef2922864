use rand::RngExt;

use crate::domain::types::{OTP_CODE_LEN, SESSION_CODE_LEN};

const DIGITS: &[u8] = b"0123456789";

/// Lowercase alphanumerics. Validation folds case before lookup.
const SESSION_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

/// 6-digit numeric login code. Leading zeros are kept.
pub fn generate_otp() -> String {
    random_string(DIGITS, OTP_CODE_LEN)
}

/// 8-character lowercase alphanumeric session code.
pub fn generate_session_code() -> String {
    random_string(SESSION_CHARSET, SESSION_CODE_LEN)
}
