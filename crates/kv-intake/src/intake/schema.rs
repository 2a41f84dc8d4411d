//! Fixed column layout for the application store.
//!
//! The order here is load-bearing: once a header row has been written to a
//! tabular store, reordering or removing entries would misalign every
//! previously persisted row. New columns may only be appended at the end.

/// Version persisted alongside the store so historical rows stay interpretable.
pub const SCHEMA_VERSION: u32 = 1;

/// Column receiving the generated registration identifier.
pub const REGISTRATION_FIELD: &str = "RegistrationNo";

/// Column receiving the submission timestamp.
pub const SUBMITTED_AT_FIELD: &str = "SubmittedAt";

/// Inline-encoded photo field. Consumed by the PDF renderer only, never
/// persisted to the tabular store.
pub const PHOTO_FIELD: &str = "Photo";

/// Fields a submission must carry with a non-blank value.
pub const MANDATORY_FIELDS: &[&str] = &["Name", "Mobile", "Email"];

const STANDARD_FIELDS: &[&str] = &[
    REGISTRATION_FIELD,
    SUBMITTED_AT_FIELD,
    "Name",
    "FatherName",
    "DateOfBirth",
    "Gender",
    "Mobile",
    "AltMobile",
    "Email",
    "Address",
    "City",
    "State",
    "Pincode",
    "Position",
    "Qualifications",
    "Experience",
    "References",
    "Notes",
];

/// Ordered registry of recognized column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: &'static [&'static str],
    version: u32,
}

impl FieldSchema {
    /// The deployed application schema.
    pub fn standard() -> Self {
        Self {
            fields: STANDARD_FIELDS,
            version: SCHEMA_VERSION,
        }
    }

    pub fn fields(&self) -> &[&'static str] {
        self.fields
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_schema_starts_with_designated_fields() {
        let schema = FieldSchema::standard();
        assert_eq!(schema.fields()[0], REGISTRATION_FIELD);
        assert_eq!(schema.fields()[1], SUBMITTED_AT_FIELD);
        assert_eq!(schema.version(), SCHEMA_VERSION);
    }

    #[test]
    fn mandatory_fields_are_part_of_the_schema() {
        let schema = FieldSchema::standard();
        for field in MANDATORY_FIELDS {
            assert!(
                schema.fields().contains(field),
                "mandatory field {field} missing from schema"
            );
        }
    }

    #[test]
    fn photo_is_not_a_persisted_column() {
        assert!(!FieldSchema::standard().fields().contains(&PHOTO_FIELD));
    }
}
