//! Shape and range checks shared across instruction categories. Every validator returns an
//! [`EncodeError`] rather than panicking — a malformed operand is a user assembly-source error,
//! not a programmer error.

use crate::error::EncodeError;

use super::constants::{ADDRESS_MAX, IMMEDIATE_MAX, IMMEDIATE_MIN};

pub fn validate_immediate16(mnemonic: &str, value: i64) -> Result<i32, EncodeError> {
    if value < IMMEDIATE_MIN || value > IMMEDIATE_MAX {
        return Err(EncodeError::ImmediateTooWide { value, width: 16 });
    }
    let _ = mnemonic;
    Ok(value as i32)
}

pub fn validate_address26(mnemonic: &str, value: i64) -> Result<u32, EncodeError> {
    if !(0..=ADDRESS_MAX).contains(&value) {
        return Err(EncodeError::ImmediateTooWide { value, width: 26 });
    }
    let _ = mnemonic;
    Ok(value as u32)
}
