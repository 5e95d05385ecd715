//! Input checks shared by the registration and product handlers.

use crate::error::FieldError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TEXT_LEN: usize = 300;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_UPLOADS_PER_REQUEST: usize = 3;
pub const MAX_PRODUCT_IMAGES: usize = 10;

/// Collects field errors for a single request.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, message: impl Into<String>) {
        // First message per field wins, like the form library on the client.
        if !self.0.iter().any(|err| err.key == key) {
            self.0.push(FieldError::new(key, message));
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.iter().any(|err| err.key == key)
    }

    pub fn into_result(self) -> Result<(), crate::error::AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(crate::error::AppError::Validation(self.0))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    Empty,
    Invalid,
    TooPrecise,
    Overflow,
}

/// Parses a decimal amount such as `"249.5"` into minor units (`24950`).
///
/// At most two fractional digits are accepted; negative values and
/// exponents are rejected.
pub fn parse_amount(raw: &str) -> Result<i64, AmountError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid);
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AmountError::Invalid);
    }
    if fraction.len() > 2 {
        return Err(AmountError::TooPrecise);
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| AmountError::Invalid)? * 10,
        _ => fraction.parse().map_err(|_| AmountError::Invalid)?,
    };

    whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(cents))
        .ok_or(AmountError::Overflow)
}

/// Renders minor units back as a decimal string.
pub fn format_amount(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

pub fn price_message(err: &AmountError) -> &'static str {
    match err {
        AmountError::Empty => "Please enter price.",
        AmountError::TooPrecise => {
            "Please enter valid price. More than 2 decimal places are not allowed."
        }
        AmountError::Invalid | AmountError::Overflow => "Please enter valid price.",
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Parses a whole-number form value, tolerating a trailing `.0`.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let digits = raw.strip_suffix(".0").unwrap_or(raw);
    digits.parse::<i64>().ok()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}
