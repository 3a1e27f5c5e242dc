// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidAmount,
    NegativeAmount,
    InvalidRate,
    InvalidDate,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount => f.write_str("invalid amount"),
            Self::NegativeAmount => f.write_str("amount cannot be negative"),
            Self::InvalidRate => f.write_str("invalid interest rate"),
            Self::InvalidDate => write!(f, "invalid date, use {DATE_LAYOUT}"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Parses a money amount such as `580000`, `$1,250.50` or `2000.5`.
pub fn parse_amount(input: &str) -> ValidationResult<f64> {
    let clean = input.trim().replace(',', "");
    if clean.starts_with('-') {
        return Err(ValidationError::NegativeAmount);
    }
    let clean = clean.strip_prefix('$').unwrap_or(&clean);
    if clean.is_empty() || !clean.bytes().all(|byte| byte.is_ascii_digit() || byte == b'.') {
        return Err(ValidationError::InvalidAmount);
    }
    let value = clean
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidAmount)?;
    if !value.is_finite() {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(value)
}

/// Parses a percentage such as `5`, `3.5` or `3.5%`.
pub fn parse_rate(input: &str) -> ValidationResult<f64> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidRate)?;
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidRate);
    }
    Ok(value)
}

pub fn parse_date(input: &str) -> ValidationResult<Date> {
    Date::parse(input.trim(), &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate)
}

pub fn parse_optional_date(input: &str) -> ValidationResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

pub fn format_date(value: Option<Date>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Accepts either a bare `YYYY-MM-DD` or a timestamp that starts with one
/// (`2023-10-01T00:00:00.000Z`), which is how the document store returns
/// dates it was handed as `Date` objects.
pub fn parse_leading_date(input: &str) -> ValidationResult<Date> {
    let trimmed = input.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);
    parse_date(head)
}
