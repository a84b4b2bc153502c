//! Categorical encoding with the integer codes used at training time.

use crate::error::ValidationError;
use crate::types::application::{field, LoanApplication};

const EDUCATION_CODES: &[(&str, u8)] = &[("Bachelor's", 0), ("High School", 1), ("Master's", 2)];

const EMPLOYMENT_CODES: &[(&str, u8)] = &[
    ("Full-time", 0),
    ("Part-time", 1),
    ("Self-employed", 2),
    ("Unemployed", 3),
];

const MARITAL_CODES: &[(&str, u8)] = &[("Divorced", 0), ("Married", 1), ("Single", 2)];

const PURPOSE_CODES: &[(&str, u8)] = &[
    ("Auto", 0),
    ("Business", 1),
    ("Education", 2),
    ("Home", 3),
    ("Other", 4),
];

/// Categorical application attributes with a fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalField {
    Education,
    EmploymentType,
    MaritalStatus,
    LoanPurpose,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 4] = [
        CategoricalField::Education,
        CategoricalField::EmploymentType,
        CategoricalField::MaritalStatus,
        CategoricalField::LoanPurpose,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CategoricalField::Education => field::EDUCATION,
            CategoricalField::EmploymentType => field::EMPLOYMENT_TYPE,
            CategoricalField::MaritalStatus => field::MARITAL_STATUS,
            CategoricalField::LoanPurpose => field::LOAN_PURPOSE,
        }
    }

    fn codes(&self) -> &'static [(&'static str, u8)] {
        match self {
            CategoricalField::Education => EDUCATION_CODES,
            CategoricalField::EmploymentType => EMPLOYMENT_CODES,
            CategoricalField::MaritalStatus => MARITAL_CODES,
            CategoricalField::LoanPurpose => PURPOSE_CODES,
        }
    }

    /// Accepted raw values, in code order.
    pub fn vocabulary(&self) -> impl Iterator<Item = &'static str> {
        self.codes().iter().map(|(value, _)| *value)
    }
}

/// Training codes for the four categorical attributes of one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedCategories {
    pub education: u8,
    pub employment_type: u8,
    pub marital_status: u8,
    pub loan_purpose: u8,
}

/// Maps categorical strings to their training-time integer codes.
///
/// Matching is exact and case-sensitive, mirroring the lookup tables the
/// classifier was trained with.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoricalEncoder;

impl CategoricalEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Code for `raw`, or `None` when the value is outside the vocabulary.
    pub fn encode(&self, field: CategoricalField, raw: &str) -> Option<u8> {
        field
            .codes()
            .iter()
            .find(|(value, _)| *value == raw)
            .map(|(_, code)| *code)
    }

    /// Encode all categorical attributes, rejecting the first unknown value.
    pub fn encode_all(&self, app: &LoanApplication) -> Result<EncodedCategories, ValidationError> {
        Ok(EncodedCategories {
            education: self.require(CategoricalField::Education, &app.education)?,
            employment_type: self.require(CategoricalField::EmploymentType, &app.employment_type)?,
            marital_status: self.require(CategoricalField::MaritalStatus, &app.marital_status)?,
            loan_purpose: self.require(CategoricalField::LoanPurpose, &app.loan_purpose)?,
        })
    }

    fn require(&self, field: CategoricalField, raw: &str) -> Result<u8, ValidationError> {
        self.encode(field, raw)
            .ok_or_else(|| ValidationError::UnmappedCategory {
                field: field.name(),
                value: raw.to_string(),
            })
    }
}
