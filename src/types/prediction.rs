//! Prediction outcome and the record persisted for every accepted request.

use crate::error::ModelError;
use crate::types::application::LoanApplication;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier outcome, spelled the way it is reported and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefaultLabel {
    #[serde(rename = "Default")]
    Default,
    #[serde(rename = "No Default")]
    NoDefault,
}

impl DefaultLabel {
    /// Map a binary class index to its label (1 = default).
    pub fn from_class(class: i64) -> Result<Self, ModelError> {
        match class {
            1 => Ok(DefaultLabel::Default),
            0 => Ok(DefaultLabel::NoDefault),
            other => Err(ModelError::InvalidLabel(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultLabel::Default => "Default",
            DefaultLabel::NoDefault => "No Default",
        }
    }
}

impl fmt::Display for DefaultLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response returned to the caller for a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub label: DefaultLabel,
    pub loan_id: String,
}

/// Raw application plus the generated identifier and label.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub application: LoanApplication,
    pub loan_id: String,
    pub label: DefaultLabel,
}

impl PredictionRecord {
    pub fn new(application: LoanApplication, loan_id: String, label: DefaultLabel) -> Self {
        Self {
            application,
            loan_id,
            label,
        }
    }
}

/// Column layout of the prediction log.
pub const LOG_COLUMNS: [&str; 18] = [
    "Age",
    "Income",
    "LoanAmount",
    "CreditScore",
    "MonthsEmployed",
    "NumCreditLines",
    "InterestRate",
    "LoanTerm",
    "DTIRatio",
    "Education",
    "EmploymentType",
    "MaritalStatus",
    "HasMortgage",
    "HasDependents",
    "LoanPurpose",
    "HasCoSigner",
    "LoanID",
    "Default",
];

/// Flat CSV row of the prediction log. Field order must follow `LOG_COLUMNS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PredictionRow {
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Income")]
    income: f64,
    #[serde(rename = "LoanAmount")]
    loan_amount: f64,
    #[serde(rename = "CreditScore")]
    credit_score: u32,
    #[serde(rename = "MonthsEmployed")]
    months_employed: u32,
    #[serde(rename = "NumCreditLines")]
    num_credit_lines: u32,
    #[serde(rename = "InterestRate")]
    interest_rate: f64,
    #[serde(rename = "LoanTerm")]
    loan_term: u32,
    #[serde(rename = "DTIRatio")]
    dti_ratio: f64,
    #[serde(rename = "Education")]
    education: String,
    #[serde(rename = "EmploymentType")]
    employment_type: String,
    #[serde(rename = "MaritalStatus")]
    marital_status: String,
    #[serde(rename = "HasMortgage")]
    has_mortgage: u8,
    #[serde(rename = "HasDependents")]
    has_dependents: u8,
    #[serde(rename = "LoanPurpose")]
    loan_purpose: String,
    #[serde(rename = "HasCoSigner")]
    has_co_signer: u8,
    #[serde(rename = "LoanID")]
    loan_id: String,
    #[serde(rename = "Default")]
    label: DefaultLabel,
}

impl From<&PredictionRecord> for PredictionRow {
    fn from(record: &PredictionRecord) -> Self {
        let app = &record.application;
        Self {
            age: app.age,
            income: app.income,
            loan_amount: app.loan_amount,
            credit_score: app.credit_score,
            months_employed: app.months_employed,
            num_credit_lines: app.num_credit_lines,
            interest_rate: app.interest_rate,
            loan_term: app.loan_term,
            dti_ratio: app.dti_ratio,
            education: app.education.clone(),
            employment_type: app.employment_type.clone(),
            marital_status: app.marital_status.clone(),
            has_mortgage: app.has_mortgage as u8,
            has_dependents: app.has_dependents as u8,
            loan_purpose: app.loan_purpose.clone(),
            has_co_signer: app.has_co_signer as u8,
            loan_id: record.loan_id.clone(),
            label: record.label,
        }
    }
}

impl From<PredictionRow> for PredictionRecord {
    fn from(row: PredictionRow) -> Self {
        let application = LoanApplication {
            age: row.age,
            income: row.income,
            loan_amount: row.loan_amount,
            credit_score: row.credit_score,
            months_employed: row.months_employed,
            num_credit_lines: row.num_credit_lines,
            interest_rate: row.interest_rate,
            loan_term: row.loan_term,
            dti_ratio: row.dti_ratio,
            education: row.education,
            employment_type: row.employment_type,
            marital_status: row.marital_status,
            has_mortgage: row.has_mortgage != 0,
            has_dependents: row.has_dependents != 0,
            loan_purpose: row.loan_purpose,
            has_co_signer: row.has_co_signer != 0,
        };
        PredictionRecord::new(application, row.loan_id, row.label)
    }
}
