pub const COUNTRY_CODE: &str = "61";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedPhone {
    Canonical(String),
    Unrecognized(String),
}

impl NormalizedPhone {
    pub fn as_str(&self) -> &str {
        match self {
            NormalizedPhone::Canonical(number) => number,
            NormalizedPhone::Unrecognized(raw) => raw,
        }
    }

    pub fn into_canonical(self) -> Option<String> {
        match self {
            NormalizedPhone::Canonical(number) => Some(number),
            NormalizedPhone::Unrecognized(_) => None,
        }
    }
}

/// Canonicalizes an Australian phone number into `61XXXXXXXXX` digit form.
pub fn normalize(raw: &str) -> NormalizedPhone {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let canonical = if digits.starts_with("614") {
        Some(digits)
    } else if digits.starts_with("04") && digits.len() == 10 {
        Some(format!("{}{}", COUNTRY_CODE, &digits[1..]))
    } else if digits.starts_with('4') && digits.len() == 9 {
        Some(format!("{}{}", COUNTRY_CODE, digits))
    } else if digits.starts_with('0') && digits.len() == 10 {
        Some(format!("{}{}", COUNTRY_CODE, &digits[1..]))
    } else {
        None
    };

    match canonical {
        Some(number) => NormalizedPhone::Canonical(number),
        None => NormalizedPhone::Unrecognized(raw.to_string()),
    }
}
