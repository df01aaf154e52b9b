//! Per-field validation rules applied to normalized values before commit.
//!
//! Each rule carries the text shown next to the field and the sentence spoken
//! back to the user, so the sequencer and manual edits report failures the
//! same way.

use anyhow::{Context, Result};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::country::{CountryLookup, INDIA_CODE};
use super::{FormField, FormValues};

const NAME_PATTERN: &str = r"^[A-Za-z ]+$";
const EMAIL_PATTERN: &str = r"^[a-z][a-z0-9._%+-]*@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$";
const STRICT_PHONE_PATTERN: &str = r"^[789][0-9]{9}$";
const PHONE_LENGTH_PATTERN: &str = r"^[0-9]{10}$";

/// How phone numbers are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhonePolicy {
    /// Exactly 10 digits starting with 7, 8, or 9, whatever the country.
    #[default]
    Strict,
    /// Strict for India; exactly 10 digits of any kind elsewhere.
    LengthOnlyAbroad,
}

/// Static messages attached to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRule {
    pub field: FormField,
    pub failure_text: &'static str,
    pub success_text: &'static str,
    pub spoken_failure: &'static str,
}

const RULES: [ValidationRule; 4] = [
    ValidationRule {
        field: FormField::Name,
        failure_text: "Name should contain only letters.",
        success_text: "Name entered correctly.",
        spoken_failure: "Error! Name should only contain letters. Please enter your name again.",
    },
    ValidationRule {
        field: FormField::Email,
        failure_text: "Please enter a valid email address with an @ symbol and a domain.",
        success_text: "Email entered correctly.",
        spoken_failure: "Please enter a valid email address with an at symbol and a domain like dot com.",
    },
    ValidationRule {
        field: FormField::CountryCode,
        failure_text: "Please choose a supported country.",
        success_text: "Country code selected.",
        spoken_failure: "Sorry, country not recognized. Please try again.",
    },
    ValidationRule {
        field: FormField::Phone,
        failure_text: "Please enter a phone number that starts with 7, 8, or 9 and is exactly 10 digits.",
        success_text: "Phone number entered correctly.",
        spoken_failure: "Please enter a phone number that starts with 7, 8, or 9 and is exactly 10 digits.",
    },
];

const ABROAD_PHONE_FAILURE: &str = "Please enter a phone number of exactly 10 digits.";

impl ValidationRule {
    #[must_use]
    pub fn for_field(field: FormField) -> &'static ValidationRule {
        &RULES[field.index()]
    }
}

/// A rejected value, with the messages to show and speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: FormField,
    pub message: String,
    pub spoken: String,
}

/// Compiled field predicates.
#[derive(Debug, Clone)]
pub struct FieldRules {
    name: Regex,
    email: Regex,
    strict_phone: Regex,
    phone_length: Regex,
    phone_policy: PhonePolicy,
}

impl FieldRules {
    /// Compile the rule set.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in pattern fails to compile.
    pub fn new(phone_policy: PhonePolicy) -> Result<Self> {
        Ok(Self {
            name: compile(NAME_PATTERN)?,
            email: compile(EMAIL_PATTERN)?,
            strict_phone: compile(STRICT_PHONE_PATTERN)?,
            phone_length: compile(PHONE_LENGTH_PATTERN)?,
            phone_policy,
        })
    }

    /// Check a normalized value.
    ///
    /// `values` supplies the committed country code, which the phone rule
    /// consults under [`PhonePolicy::LengthOnlyAbroad`].
    pub fn validate(
        &self,
        field: FormField,
        value: &str,
        values: &FormValues,
    ) -> Result<(), ValidationFailure> {
        let rule = ValidationRule::for_field(field);
        let ok = match field {
            FormField::Name => self.name.is_match(value),
            FormField::Email => self.email.is_match(value),
            FormField::CountryCode => CountryLookup::is_known_code(value),
            FormField::Phone => {
                if self.phone_rule_is_length_only(values) {
                    return if self.phone_length.is_match(value) {
                        Ok(())
                    } else {
                        Err(ValidationFailure {
                            field,
                            message: ABROAD_PHONE_FAILURE.to_string(),
                            spoken: ABROAD_PHONE_FAILURE.to_string(),
                        })
                    };
                }
                self.strict_phone.is_match(value)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationFailure {
                field,
                message: rule.failure_text.to_string(),
                spoken: rule.spoken_failure.to_string(),
            })
        }
    }

    /// Every field holds a value that passes its rule right now.
    #[must_use]
    pub fn all_valid(&self, values: &FormValues) -> bool {
        FormField::ALL.iter().all(|field| {
            values
                .get(*field)
                .is_some_and(|value| self.validate(*field, value, values).is_ok())
        })
    }

    fn phone_rule_is_length_only(&self, values: &FormValues) -> bool {
        match self.phone_policy {
            PhonePolicy::Strict => false,
            PhonePolicy::LengthOnlyAbroad => values
                .get(FormField::CountryCode)
                .is_some_and(|code| code.trim() != INDIA_CODE),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("invalid validation pattern: {pattern}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn strict_rules() -> FieldRules {
        FieldRules::new(PhonePolicy::Strict).expect("rules compile")
    }

    fn check(field: FormField, value: &str) -> bool {
        strict_rules()
            .validate(field, value, &FormValues::new())
            .is_ok()
    }

    #[rstest]
    #[case("John Smith", true)]
    #[case("ada", true)]
    #[case("R2D2", false)]
    #[case("O'Brien", false)]
    #[case("", false)]
    fn name_rule(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(check(FormField::Name, value), expected);
    }

    #[rstest]
    #[case("john@example.com", true)]
    #[case("j.doe+tag@mail.example.co.uk", true)]
    #[case("a1@b-c.io", true)]
    #[case("johnexample.com", false)]
    #[case("john@example", false)]
    #[case("1john@example.com", false)]
    #[case("john@.com", false)]
    #[case("john @example.com", false)]
    fn email_rule(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(check(FormField::Email, value), expected);
    }

    #[rstest]
    #[case("+91", true)]
    #[case("+44", true)]
    #[case("+999", false)]
    #[case("india", false)]
    fn country_rule(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(check(FormField::CountryCode, value), expected);
    }

    #[test]
    fn failure_carries_rule_messages() {
        let failure = strict_rules()
            .validate(FormField::Phone, "12345", &FormValues::new())
            .expect_err("short phone rejected");
        assert_eq!(failure.field, FormField::Phone);
        assert_eq!(
            failure.message,
            ValidationRule::for_field(FormField::Phone).failure_text
        );
    }

    #[test]
    fn length_only_policy_relaxes_leading_digit_outside_india() {
        let rules = FieldRules::new(PhonePolicy::LengthOnlyAbroad).expect("rules compile");
        let mut values = FormValues::new();
        values.set(FormField::CountryCode, "+1");
        assert!(rules.validate(FormField::Phone, "2125550123", &values).is_ok());
        assert!(rules.validate(FormField::Phone, "212555012", &values).is_err());

        values.set(FormField::CountryCode, "+91");
        assert!(rules.validate(FormField::Phone, "2125550123", &values).is_err());
        assert!(rules.validate(FormField::Phone, "9125550123", &values).is_ok());
    }

    #[test]
    fn all_valid_rechecks_current_values() {
        let rules = strict_rules();
        let mut values = FormValues::new();
        values.set(FormField::Name, "John Smith");
        values.set(FormField::Email, "john@example.com");
        values.set(FormField::CountryCode, "+91");
        values.set(FormField::Phone, "9876543210");
        assert!(rules.all_valid(&values));

        values.set(FormField::Email, "not an email");
        assert!(!rules.all_valid(&values));
    }

    proptest! {
        #[test]
        fn letters_and_spaces_are_valid_names(name in "[A-Za-z ]{1,40}") {
            prop_assert!(check(FormField::Name, &name));
        }

        #[test]
        fn names_with_digits_are_rejected(
            prefix in "[A-Za-z ]{0,10}",
            digit in "[0-9]",
            suffix in "[A-Za-z ]{0,10}",
        ) {
            let name = format!("{prefix}{digit}{suffix}");
            prop_assert!(!check(FormField::Name, &name));
        }

        #[test]
        fn ten_digit_phones_with_valid_lead_pass(lead in "[789]", rest in "[0-9]{9}") {
            let phone = format!("{lead}{rest}");
            prop_assert!(check(FormField::Phone, &phone));
        }

        #[test]
        fn ten_digit_phones_with_other_lead_fail(lead in "[0-6]", rest in "[0-9]{9}") {
            let phone = format!("{lead}{rest}");
            prop_assert!(!check(FormField::Phone, &phone));
        }

        #[test]
        fn phones_of_wrong_length_fail(phone in "[0-9]{0,20}") {
            prop_assume!(phone.len() != 10);
            prop_assert!(!check(FormField::Phone, &phone));
        }
    }
}
