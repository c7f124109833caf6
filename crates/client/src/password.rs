//! Password strength meter shared by the user and password forms.

use serde::Serialize;

const SPECIAL_CHARS: &str = "!@#$%^&*";
const STRONG_MIN_LEN: usize = 8;
const GOOD_MIN_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PasswordStrength {
    VeryWeak,
    Good,
    Strong,
}

impl PasswordStrength {
    /// 1 to 3.
    pub fn level(self) -> u8 {
        match self {
            Self::VeryWeak => 1,
            Self::Good => 2,
            Self::Strong => 3,
        }
    }

    /// Fill of the strength bar.
    pub fn percentage(self) -> u8 {
        match self {
            Self::VeryWeak => 0,
            Self::Good => 75,
            Self::Strong => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryWeak => "very weak",
            Self::Good => "good",
            Self::Strong => "strong",
        }
    }
}

/// Strong: at least 8 characters with a lowercase letter, an uppercase
/// letter, a digit and one of `!@#$%^&*`.
/// Good: at least 6 characters mixing two of lowercase, uppercase, digits.
pub fn check_password_strength(password: &str) -> PasswordStrength {
    let len = password.chars().count();
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| SPECIAL_CHARS.contains(c));

    if len >= STRONG_MIN_LEN && lower && upper && digit && special {
        return PasswordStrength::Strong;
    }

    let classes = [lower, upper, digit].iter().filter(|&&b| b).count();
    if len >= GOOD_MIN_LEN && classes >= 2 {
        return PasswordStrength::Good;
    }

    PasswordStrength::VeryWeak
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_needs_every_class() {
        assert_eq!(check_password_strength("Gerbang#2024"), PasswordStrength::Strong);
        assert_eq!(check_password_strength("Gerbang2024"), PasswordStrength::Good);
        assert_eq!(check_password_strength("Gb#2x"), PasswordStrength::VeryWeak);
    }

    #[test]
    fn good_needs_two_classes_and_six_chars() {
        assert_eq!(check_password_strength("abc123"), PasswordStrength::Good);
        assert_eq!(check_password_strength("ABCdef"), PasswordStrength::Good);
        assert_eq!(check_password_strength("abcdefgh"), PasswordStrength::VeryWeak);
        assert_eq!(check_password_strength("ab12"), PasswordStrength::VeryWeak);
    }

    #[test]
    fn seven_chars_with_all_classes_is_only_good() {
        assert_eq!(check_password_strength("Ab1!xyz"), PasswordStrength::Good);
    }

    #[test]
    fn meter_values() {
        let s = PasswordStrength::Good;
        assert_eq!((s.level(), s.percentage(), s.label()), (2, 75, "good"));
        assert_eq!(PasswordStrength::VeryWeak.percentage(), 0);
        assert!(PasswordStrength::Strong > PasswordStrength::Good);
    }
}
