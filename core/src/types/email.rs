use nutype::nutype;

pub const MAX_EMAIL_LENGTH: usize = 254;

/// Normalized identity: trimmed and lower-cased before validation, so two
/// spellings of the same address compare equal.
#[nutype(
    sanitize(trim, lowercase),
    validate(not_empty, len_char_max = MAX_EMAIL_LENGTH),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Into,
        Hash,
        Borrow,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct Email(String);

impl Email {
    /// Parses a comma-separated list, dropping entries that fail to normalize.
    pub fn parse_list(raw: &str) -> Vec<Email> {
        raw.split(',')
            .filter_map(|entry| Email::try_from(entry).ok())
            .collect()
    }
}
