//! Utterance cleanup so recognizer punctuation and spacing never reach validation.

use super::country::CountryLookup;
use super::FormField;
use crate::error::CaptureError;

/// Trim, collapse inner whitespace runs, and drop a single trailing period.
///
/// Recognizers commonly end a dictated phrase with `.`; only one is removed so
/// that an intentional `..` still fails validation downstream.
#[must_use]
pub fn clean_voice_input(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    let mut last_space = false;
    for ch in raw.trim().chars() {
        if ch.is_whitespace() || ch.is_control() {
            if !last_space {
                collapsed.push(' ');
                last_space = true;
            }
        } else {
            collapsed.push(ch);
            last_space = false;
        }
    }
    let cleaned = collapsed.strip_suffix('.').unwrap_or(&collapsed);
    cleaned.trim_end().to_string()
}

/// Normalize a raw utterance for `field`.
///
/// Country names are resolved to dialing codes here; a miss is reported as
/// [`CaptureError::CountryNotRecognized`] carrying the cleaned utterance.
pub fn normalize_utterance(field: FormField, raw: &str) -> Result<String, CaptureError> {
    let cleaned = clean_voice_input(raw);
    match field {
        FormField::Name => Ok(cleaned),
        FormField::Email => Ok(cleaned.to_lowercase()),
        FormField::CountryCode => CountryLookup::code_for(&cleaned)
            .map(str::to_string)
            .ok_or(CaptureError::CountryNotRecognized { heard: cleaned }),
        FormField::Phone => Ok(cleaned.chars().filter(char::is_ascii_digit).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_voice_input_strips_one_trailing_period() {
        assert_eq!(clean_voice_input("  John Smith. "), "John Smith");
        assert_eq!(clean_voice_input("wait.."), "wait.");
        assert_eq!(clean_voice_input("j.doe@example.com"), "j.doe@example.com");
    }

    #[test]
    fn clean_voice_input_collapses_whitespace() {
        assert_eq!(clean_voice_input("John \t\n Smith"), "John Smith");
        assert!(clean_voice_input(" \n ").is_empty());
    }

    #[test]
    fn email_is_lower_cased() {
        assert_eq!(
            normalize_utterance(FormField::Email, "John@Example.COM.").as_deref(),
            Ok("john@example.com")
        );
    }

    #[test]
    fn phone_keeps_ascii_digits_only() {
        assert_eq!(
            normalize_utterance(FormField::Phone, "98765 43210.").as_deref(),
            Ok("9876543210")
        );
        assert_eq!(
            normalize_utterance(FormField::Phone, "(987) 654-3210").as_deref(),
            Ok("9876543210")
        );
    }

    #[test]
    fn country_resolves_through_lookup() {
        assert_eq!(
            normalize_utterance(FormField::CountryCode, "India.").as_deref(),
            Ok("+91")
        );
        assert_eq!(
            normalize_utterance(FormField::CountryCode, "Atlantis"),
            Err(CaptureError::CountryNotRecognized {
                heard: "Atlantis".to_string()
            })
        );
    }

    #[test]
    fn name_keeps_case() {
        assert_eq!(
            normalize_utterance(FormField::Name, "john SMITH").as_deref(),
            Ok("john SMITH")
        );
    }
}
