// Kenyan mobile numbers, as accepted by M-Pesa.
use regex::Regex;
use std::sync::OnceLock;

fn local_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\+254|0)[17]\d{8}$").expect("valid phone regex"))
}

fn msisdn_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^254[17]\d{8}$").expect("valid msisdn regex"))
}

/// Accepts `07XXXXXXXX`, `01XXXXXXXX` or `+2547XXXXXXXX`.
pub fn is_valid_kenyan_phone(phone: &str) -> bool {
    local_format().is_match(phone.trim())
}

/// Normalize to the `2547XXXXXXXX` form the gateway expects.
pub fn to_msisdn(phone: &str) -> Result<String, String> {
    let mut cleaned: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect();

    if let Some(rest) = cleaned.strip_prefix('0') {
        cleaned = format!("254{}", rest);
    }
    if !cleaned.starts_with("254") {
        cleaned = format!("254{}", cleaned);
    }

    if msisdn_format().is_match(&cleaned) {
        Ok(cleaned)
    } else {
        Err(format!("Invalid Kenyan phone number: {}", phone))
    }
}
