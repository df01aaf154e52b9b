//! Form field model shared by the sequencer, the IPC adapter, and submission.

pub mod country;
pub mod normalize;
pub mod validation;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use country::CountryLookup;
pub use normalize::{clean_voice_input, normalize_utterance};
pub use validation::{FieldRules, PhonePolicy, ValidationFailure, ValidationRule};

/// One field of the capture form, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormField {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "countryCode")]
    CountryCode,
    #[serde(rename = "phone")]
    Phone,
}

impl FormField {
    /// Fields in the order they are prompted.
    pub const ALL: [FormField; 4] = [
        FormField::Name,
        FormField::Email,
        FormField::CountryCode,
        FormField::Phone,
    ];

    /// Number of fields; a cursor equal to this means the form is complete.
    pub const COUNT: usize = Self::ALL.len();

    #[must_use]
    pub fn at(index: usize) -> Option<FormField> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Name => 0,
            Self::Email => 1,
            Self::CountryCode => 2,
            Self::Phone => 3,
        }
    }

    /// Wire id used by the UI and the submission payload.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::CountryCode => "countryCode",
            Self::Phone => "phone",
        }
    }

    /// Label used in spoken prompts.
    #[must_use]
    pub fn spoken_label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email address",
            Self::CountryCode => "country",
            Self::Phone => "phone number",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Committed field values; a field is absent until its value is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormValues {
    values: BTreeMap<FormField, String>,
}

impl FormValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn remove(&mut self, field: FormField) -> Option<String> {
        self.values.remove(&field)
    }

    /// A field counts as filled when it holds non-blank text.
    #[must_use]
    pub fn is_filled(&self, field: FormField) -> bool {
        self.get(field).is_some_and(|value| !value.trim().is_empty())
    }

    /// Index of the first field without a value, or [`FormField::COUNT`] when all are filled.
    #[must_use]
    pub fn first_unfilled(&self) -> usize {
        FormField::ALL
            .iter()
            .position(|field| !self.is_filled(*field))
            .unwrap_or(FormField::COUNT)
    }

    /// Snapshot every value into the submission shape, if all four are present.
    #[must_use]
    pub fn to_record(&self) -> Option<FormRecord> {
        Some(FormRecord {
            name: self.get(FormField::Name)?.trim().to_string(),
            email: self.get(FormField::Email)?.trim().to_string(),
            country_code: self.get(FormField::CountryCode)?.trim().to_string(),
            phone: self.get(FormField::Phone)?.trim().to_string(),
        })
    }
}

/// The four committed values as sent to the submission endpoint and written on download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub name: String,
    pub email: String,
    #[serde(rename = "countryCode")]
    pub country_code: String,
    pub phone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_prompt_order() {
        for (index, field) in FormField::ALL.iter().enumerate() {
            assert_eq!(field.index(), index);
            assert_eq!(FormField::at(index), Some(*field));
        }
        assert_eq!(FormField::at(FormField::COUNT), None);
    }

    #[test]
    fn first_unfilled_skips_filled_fields_and_ignores_blank_values() {
        let mut values = FormValues::new();
        assert_eq!(values.first_unfilled(), 0);
        values.set(FormField::Name, "Ada");
        values.set(FormField::Email, "   ");
        assert_eq!(values.first_unfilled(), 1);
        values.set(FormField::Email, "ada@example.com");
        values.set(FormField::Phone, "9876543210");
        assert_eq!(values.first_unfilled(), 2);
        values.set(FormField::CountryCode, "+91");
        assert_eq!(values.first_unfilled(), FormField::COUNT);
    }

    #[test]
    fn record_requires_every_field() {
        let mut values = FormValues::new();
        values.set(FormField::Name, "Ada");
        assert!(values.to_record().is_none());
        values.set(FormField::Email, "ada@example.com");
        values.set(FormField::CountryCode, "+44");
        values.set(FormField::Phone, "7123456789");
        let record = values.to_record().expect("complete record");
        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["countryCode"], "+44");
        assert_eq!(json["name"], "Ada");
    }

    #[test]
    fn values_serialize_with_wire_ids() {
        let mut values = FormValues::new();
        values.set(FormField::CountryCode, "+1");
        let json = serde_json::to_value(&values).expect("serialize values");
        assert_eq!(json["countryCode"], "+1");
    }
}
