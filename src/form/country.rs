//! Spoken country name to dialing code lookup.

/// Lowercase country names and aliases mapped to dialing codes.
const COUNTRY_CODES: &[(&str, &str)] = &[
    ("united states", "+1"),
    ("america", "+1"),
    ("usa", "+1"),
    ("united kingdom", "+44"),
    ("uk", "+44"),
    ("britain", "+44"),
    ("england", "+44"),
    ("australia", "+61"),
    ("japan", "+81"),
    ("india", "+91"),
    ("bharat", "+91"),
];

/// Dialing code of India, the only country the strict phone rule was written for.
pub const INDIA_CODE: &str = "+91";

/// Case-insensitive exact-match lookup over the static alias table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountryLookup;

impl CountryLookup {
    /// Resolve a spoken country name or alias. No fuzzy matching.
    #[must_use]
    pub fn code_for(spoken: &str) -> Option<&'static str> {
        let key = spoken.trim().to_lowercase();
        COUNTRY_CODES
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, code)| *code)
    }

    /// Whether `code` is one of the dialing codes the table can produce.
    #[must_use]
    pub fn is_known_code(code: &str) -> bool {
        let code = code.trim();
        COUNTRY_CODES.iter().any(|(_, known)| *known == code)
    }

    /// Accept either a spoken name or an already-resolved code (typed edits send codes).
    #[must_use]
    pub fn resolve(input: &str) -> Option<&'static str> {
        Self::code_for(input).or_else(|| {
            let code = input.trim();
            COUNTRY_CODES
                .iter()
                .find(|(_, known)| *known == code)
                .map(|(_, known)| *known)
        })
    }
}
