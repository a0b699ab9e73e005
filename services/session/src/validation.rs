//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate phone number
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+?[0-9]{9,15}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone) {
        return Err("Phone number must be 9 to 15 digits, optionally prefixed with +".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.len() > 64 {
        return Err("Name must be at most 64 characters long".to_string());
    }

    Ok(())
}

/// Validate referral code
pub fn validate_referral_code(code: &str) -> Result<(), String> {
    static REFERRAL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REFERRAL_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Z0-9]{4,12}$").expect("Failed to compile referral code regex")
    });

    if !regex.is_match(code) {
        return Err("Referral code must be 4 to 12 uppercase letters or digits".to_string());
    }

    Ok(())
}
