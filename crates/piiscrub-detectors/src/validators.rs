//! Per-type validators applied to regex matches
//!
//! Validators are pure functions of the matched text and the active
//! language profile. A failing validator does not discard the match; the
//! matcher keeps it as a low-confidence, invalid candidate.

use crate::language::{DateOrder, LanguageProfile};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Checksum and format rules, referenced by name from pattern definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// Luhn checksum over 13-19 digits
    Luhn,
    /// Digit count within the profile's phone length range
    PhoneDigits,
    /// Structural email address check
    Email,
    /// Calendar date, not before 1900 and not in the future
    DateOfBirth,
    /// ISO 13616 IBAN mod-97 check
    Iban,
    /// Parseable IPv4 or IPv6 address
    IpAddress,
    /// US social security number area/group/serial rules
    UsSsn,
    /// German Steuer-ID, ISO 7064 MOD 11,10
    GermanTaxId,
    /// French NIR with its 2-digit key
    FrenchNir,
    /// Spanish DNI/NIE control letter
    SpanishDni,
    /// Dutch BSN eleven test
    DutchBsn,
    /// 15-digit IMEI with Luhn check digit
    Imei,
}

impl Validator {
    /// Run the validator against matched text
    pub fn validate(&self, text: &str, profile: &LanguageProfile) -> bool {
        match self {
            Self::Luhn => {
                let digits = digits_of(text);
                (13..=19).contains(&digits.len()) && luhn(&digits)
            }
            Self::PhoneDigits => {
                let count = text.chars().filter(|c| c.is_ascii_digit()).count();
                (profile.min_phone_digits..=profile.max_phone_digits).contains(&count)
            }
            Self::Email => is_valid_email(text),
            Self::DateOfBirth => parse_date(text, profile.date_order)
                .map(|date| is_plausible_birth_date(date, Local::now().date_naive()))
                .unwrap_or(false),
            Self::Iban => is_valid_iban(text),
            Self::IpAddress => text.trim().parse::<IpAddr>().is_ok(),
            Self::UsSsn => is_valid_us_ssn(text),
            Self::GermanTaxId => is_valid_german_tax_id(text),
            Self::FrenchNir => is_valid_french_nir(text),
            Self::SpanishDni => is_valid_spanish_dni(text),
            Self::DutchBsn => is_valid_dutch_bsn(text),
            Self::Imei => {
                let digits = digits_of(text);
                digits.len() == 15 && luhn(&digits)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Luhn => "luhn",
            Self::PhoneDigits => "phone_digits",
            Self::Email => "email",
            Self::DateOfBirth => "date_of_birth",
            Self::Iban => "iban",
            Self::IpAddress => "ip_address",
            Self::UsSsn => "us_ssn",
            Self::GermanTaxId => "german_tax_id",
            Self::FrenchNir => "french_nir",
            Self::SpanishDni => "spanish_dni",
            Self::DutchBsn => "dutch_bsn",
            Self::Imei => "imei",
        }
    }
}

fn digits_of(text: &str) -> Vec<u32> {
    text.chars().filter_map(|c| c.to_digit(10)).collect()
}

/// Luhn checksum: double every second digit from the right
pub fn luhn(digits: &[u32]) -> bool {
    if digits.is_empty() {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn is_valid_email(text: &str) -> bool {
    let mut parts = text.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(l), Some(d), None) => (l, d),
        _ => return false,
    };
    if local.is_empty() || local.len() > 64 || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Month names recognised in textual dates, keyed by lowercase prefix
const MONTHS: &[(&str, u32)] = &[
    ("jan", 1),
    ("ene", 1),
    ("feb", 2),
    ("fév", 2),
    ("fev", 2),
    ("mar", 3),
    ("mär", 3),
    ("maa", 3),
    ("apr", 4),
    ("avr", 4),
    ("abr", 4),
    ("may", 5),
    ("mai", 5),
    ("mei", 5),
    ("jun", 6),
    ("jui", 6),
    ("jul", 7),
    ("aug", 8),
    ("aoû", 8),
    ("aou", 8),
    ("ago", 8),
    ("sep", 9),
    ("oct", 10),
    ("okt", 10),
    ("nov", 11),
    ("dec", 12),
    ("déc", 12),
    ("dez", 12),
    ("dic", 12),
];

fn month_from_name(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    // French "juin"/"juillet" share a prefix
    if lower.starts_with("juil") {
        return Some(7);
    }
    if lower.starts_with("juin") {
        return Some(6);
    }
    MONTHS
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|(_, m)| *m)
}

/// Parse a numeric or textual date according to the locale's preferred order.
///
/// Four-digit leading groups are always read as year-month-day.
pub fn parse_date(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() != 3 {
        return None;
    }

    let textual = tokens.iter().position(|t| t.chars().all(char::is_alphabetic));
    if let Some(month_idx) = textual {
        let month = month_from_name(tokens[month_idx])?;
        let numbers: Vec<u32> = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != month_idx)
            .map(|(_, t)| t.parse().ok())
            .collect::<Option<Vec<u32>>>()?;
        let (day, year) = if numbers[0] > 31 {
            (numbers[1], numbers[0])
        } else {
            (numbers[0], numbers[1])
        };
        return NaiveDate::from_ymd_opt(year as i32, month, day);
    }

    let nums: Vec<u32> = tokens
        .iter()
        .map(|t| t.parse().ok())
        .collect::<Option<Vec<u32>>>()?;
    if tokens[0].len() == 4 {
        return NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2]);
    }
    let year = nums[2] as i32;
    let month_first = NaiveDate::from_ymd_opt(year, nums[0], nums[1]);
    let day_first = NaiveDate::from_ymd_opt(year, nums[1], nums[0]);
    match order {
        DateOrder::MonthFirst => month_first,
        DateOrder::DayFirst => day_first,
        DateOrder::Either => day_first.or(month_first),
    }
}

/// Birth dates must lie between 1900-01-01 and `today` inclusive
pub fn is_plausible_birth_date(date: NaiveDate, today: NaiveDate) -> bool {
    NaiveDate::from_ymd_opt(1900, 1, 1).map_or(false, |min| date >= min) && date <= today
}

fn is_valid_iban(text: &str) -> bool {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if !(15..=34).contains(&compact.len()) {
        return false;
    }
    let bytes = compact.as_bytes();
    if !bytes[..2].iter().all(u8::is_ascii_alphabetic) || !bytes[2..4].iter().all(u8::is_ascii_digit) {
        return false;
    }
    let rearranged = compact[4..].chars().chain(compact[..4].chars());
    let mut remainder: u32 = 0;
    for c in rearranged {
        let value = match c.to_digit(36) {
            Some(v) => v,
            None => return false,
        };
        remainder = if value >= 10 {
            (remainder * 100 + value) % 97
        } else {
            (remainder * 10 + value) % 97
        };
    }
    remainder == 1
}

fn is_valid_us_ssn(text: &str) -> bool {
    let digits = digits_of(text);
    if digits.len() != 9 {
        return false;
    }
    let area = digits[0] * 100 + digits[1] * 10 + digits[2];
    let group = digits[3] * 10 + digits[4];
    let serial = digits[5..].iter().fold(0, |acc, d| acc * 10 + d);
    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}

fn is_valid_german_tax_id(text: &str) -> bool {
    let digits = digits_of(text);
    if digits.len() != 11 || digits[0] == 0 {
        return false;
    }
    let mut product = 10;
    for &d in &digits[..10] {
        let mut sum = (d + product) % 10;
        if sum == 0 {
            sum = 10;
        }
        product = (sum * 2) % 11;
    }
    let check = match 11 - product {
        10 => 0,
        c => c,
    };
    check == digits[10]
}

fn is_valid_french_nir(text: &str) -> bool {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if compact.len() != 15 || !compact.is_ascii() {
        return false;
    }
    if !matches!(compact.as_bytes()[0], b'1' | b'2' | b'7' | b'8') {
        return false;
    }
    // Corsican departments replace the numeric department code
    let body = match &compact[5..7] {
        "2A" => format!("{}19{}", &compact[..5], &compact[7..13]),
        "2B" => format!("{}18{}", &compact[..5], &compact[7..13]),
        _ => compact[..13].to_string(),
    };
    let number: u64 = match body.parse() {
        Ok(n) => n,
        Err(_) => return false,
    };
    let key: u64 = match compact[13..].parse() {
        Ok(k) => k,
        Err(_) => return false,
    };
    97 - (number % 97) == key
}

fn is_valid_spanish_dni(text: &str) -> bool {
    const LETTERS: &[u8] = b"TRWAGMYFPDXBNJZSQVHLCKE";
    let compact: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    if compact.len() != 9 {
        return false;
    }
    let (head, control) = compact.split_at(8);
    let numeric = match head.as_bytes()[0] {
        b'X' => format!("0{}", &head[1..]),
        b'Y' => format!("1{}", &head[1..]),
        b'Z' => format!("2{}", &head[1..]),
        _ => head.to_string(),
    };
    match numeric.parse::<usize>() {
        Ok(n) => control.as_bytes()[0] == LETTERS[n % 23],
        Err(_) => false,
    }
}

fn is_valid_dutch_bsn(text: &str) -> bool {
    let mut digits = digits_of(text);
    if digits.len() == 8 {
        digits.insert(0, 0);
    }
    if digits.len() != 9 || digits.iter().all(|&d| d == 0) {
        return false;
    }
    let weighted: i64 = digits[..8]
        .iter()
        .enumerate()
        .map(|(i, &d)| (9 - i as i64) * d as i64)
        .sum();
    (weighted - digits[8] as i64) % 11 == 0
}
