//! Keypad amount editor

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Ceiling used by the Max key when none is configured
pub const DEFAULT_MAX_AMOUNT: &str = "100";

/// Why the buffer cannot be used as an amount
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountInputError {
    #[error("please enter an amount")]
    Missing,

    #[error("{0:?} is not a number")]
    Malformed(String),

    #[error("{0} must be greater than zero")]
    NotPositive(String),
}

/// Decimal string built one key at a time.
///
/// Once frozen (after a successful payment) every edit is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountEditor {
    buffer: String,
    max_amount: String,
    frozen: bool,
}

impl Default for AmountEditor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AMOUNT)
    }
}

impl AmountEditor {
    pub fn new(max_amount: impl Into<String>) -> Self {
        Self {
            buffer: String::new(),
            max_amount: max_amount.into(),
            frozen: false,
        }
    }

    /// Editor pre-filled with a value, e.g. the machine's price
    pub fn seeded(value: impl Into<String>, max_amount: impl Into<String>) -> Self {
        Self {
            buffer: value.into(),
            ..Self::new(max_amount)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn append_digit(&mut self, digit: char) {
        if self.frozen || !digit.is_ascii_digit() {
            return;
        }
        self.buffer.push(digit);
    }

    pub fn append_decimal_point(&mut self) {
        if self.frozen || self.buffer.contains('.') {
            return;
        }
        self.buffer.push('.');
    }

    pub fn backspace(&mut self) {
        if self.frozen {
            return;
        }
        self.buffer.pop();
    }

    pub fn clear(&mut self) {
        if self.frozen {
            return;
        }
        self.buffer.clear();
    }

    pub fn set_max(&mut self) {
        if self.frozen {
            return;
        }
        self.buffer = self.max_amount.clone();
    }

    /// Route one keypad key: a digit, `.`, or ignored
    pub fn press(&mut self, key: char) {
        match key {
            '.' => self.append_decimal_point(),
            d => self.append_digit(d),
        }
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Parse the buffer as a strictly positive decimal
    pub fn amount(&self) -> Result<Decimal, AmountInputError> {
        let raw = self.buffer.trim();
        if raw.is_empty() {
            return Err(AmountInputError::Missing);
        }
        let amount =
            Decimal::from_str(raw).map_err(|_| AmountInputError::Malformed(raw.to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(AmountInputError::NotPositive(raw.to_string()));
        }
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(keys: &str) -> AmountEditor {
        let mut editor = AmountEditor::default();
        keys.chars().for_each(|k| editor.press(k));
        editor
    }

    #[test]
    fn test_single_decimal_point() {
        let editor = typed("1.2.3");
        assert_eq!(editor.as_str(), "1.23");
        assert_eq!(editor.amount(), Ok(Decimal::new(123, 2)));
    }

    #[test]
    fn test_backspace_and_clear() {
        let mut editor = typed("42");
        editor.backspace();
        assert_eq!(editor.as_str(), "4");
        editor.backspace();
        editor.backspace();
        assert_eq!(editor.as_str(), "");

        let mut editor = typed("9.5");
        editor.clear();
        assert_eq!(editor.as_str(), "");
        assert_eq!(editor.amount(), Err(AmountInputError::Missing));
        assert_eq!(AmountInputError::Missing.to_string(), "please enter an amount");
    }

    #[test]
    fn test_max() {
        let mut editor = AmountEditor::new("250");
        editor.append_digit('7');
        editor.set_max();
        assert_eq!(editor.as_str(), "250");

        let mut editor = AmountEditor::default();
        editor.set_max();
        assert_eq!(editor.amount(), Ok(Decimal::new(100, 0)));
    }

    #[test]
    fn test_non_digits_ignored() {
        let editor = typed("1a-2");
        assert_eq!(editor.as_str(), "12");
    }

    #[test]
    fn test_amount_validation() {
        assert_eq!(typed("").amount(), Err(AmountInputError::Missing));
        assert_eq!(typed("0").amount(), Err(AmountInputError::NotPositive("0".into())));
        assert_eq!(typed("0.000").amount(), Err(AmountInputError::NotPositive("0.000".into())));
        assert_eq!(
            AmountEditor::seeded("abc", DEFAULT_MAX_AMOUNT).amount(),
            Err(AmountInputError::Malformed("abc".into()))
        );
        assert_eq!(typed("0.5").amount(), Ok(Decimal::new(5, 1)));

        let seeded = AmountEditor::seeded("2.5", DEFAULT_MAX_AMOUNT);
        assert_eq!(seeded.amount(), Ok(Decimal::new(25, 1)));
    }

    #[test]
    fn test_frozen_editor_ignores_edits() {
        let mut editor = typed("3");
        editor.freeze();

        editor.append_digit('4');
        editor.append_decimal_point();
        editor.backspace();
        editor.clear();
        editor.set_max();

        assert!(editor.is_frozen());
        assert_eq!(editor.as_str(), "3");
    }
}
