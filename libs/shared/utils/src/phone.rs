//! Client phone numbers are the durable key for client lookup, so every entry
//! point reduces them to digits with a country code before touching the store.

const MIN_NATIONAL_DIGITS: usize = 8;
const MAX_NATIONAL_DIGITS: usize = 11;

/// Normalizes free-form phone input (`(11) 98765-4321`, `+55 11 98765 4321`,
/// `whatsapp:+5511987654321`) into digits-only with country code.
///
/// Returns `None` when the input has too few digits to be a phone number.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    let international = trimmed.contains('+');

    let mut digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if !international && digits.starts_with("00") {
        digits.drain(..2);
        return (digits.len() > MIN_NATIONAL_DIGITS).then_some(digits);
    }

    if international {
        return (digits.len() > MIN_NATIONAL_DIGITS).then_some(digits);
    }

    // Trunk prefix used when dialing long distance inside the country.
    let national = digits.trim_start_matches('0');

    if national.len() > MAX_NATIONAL_DIGITS && national.starts_with(default_country_code) {
        return Some(national.to_string());
    }

    if (MIN_NATIONAL_DIGITS..=MAX_NATIONAL_DIGITS).contains(&national.len()) {
        return Some(format!("{}{}", default_country_code, national));
    }

    (national.len() > MAX_NATIONAL_DIGITS).then(|| national.to_string())
}
