//! Form-encoded loan application, as posted by the HTML front-end.

use crate::types::application::field;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Form fields use snake_case names. Checkbox fields are only sent when
/// ticked, so their presence alone means "yes".
#[derive(Debug, Default, Deserialize)]
pub struct LoanForm {
    pub age: Option<String>,
    pub income: Option<String>,
    pub loan_amount: Option<String>,
    pub credit_score: Option<String>,
    pub months_employed: Option<String>,
    pub num_credit_lines: Option<String>,
    pub interest_rate: Option<String>,
    pub loan_term: Option<String>,
    pub dti_ratio: Option<String>,
    pub education: Option<String>,
    pub employment_type: Option<String>,
    pub marital_status: Option<String>,
    pub loan_purpose: Option<String>,
    pub has_mortgage: Option<String>,
    pub has_dependents: Option<String>,
    pub has_cosigner: Option<String>,
}

impl LoanForm {
    /// Map onto canonical request fields.
    ///
    /// Absent value fields are left out so that the application parser
    /// reports them as missing under their canonical name.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();

        let values = [
            (field::AGE, self.age),
            (field::INCOME, self.income),
            (field::LOAN_AMOUNT, self.loan_amount),
            (field::CREDIT_SCORE, self.credit_score),
            (field::MONTHS_EMPLOYED, self.months_employed),
            (field::NUM_CREDIT_LINES, self.num_credit_lines),
            (field::INTEREST_RATE, self.interest_rate),
            (field::LOAN_TERM, self.loan_term),
            (field::DTI_RATIO, self.dti_ratio),
            (field::EDUCATION, self.education),
            (field::EMPLOYMENT_TYPE, self.employment_type),
            (field::MARITAL_STATUS, self.marital_status),
            (field::LOAN_PURPOSE, self.loan_purpose),
        ];
        for (name, value) in values {
            if let Some(value) = value {
                fields.insert(name.to_string(), Value::String(value));
            }
        }

        let checkboxes = [
            (field::HAS_MORTGAGE, self.has_mortgage),
            (field::HAS_DEPENDENTS, self.has_dependents),
            (field::HAS_CO_SIGNER, self.has_cosigner),
        ];
        for (name, ticked) in checkboxes {
            fields.insert(name.to_string(), Value::Bool(ticked.is_some()));
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::application::LoanApplication;

    fn form() -> LoanForm {
        LoanForm {
            age: Some("35".into()),
            income: Some("60000".into()),
            loan_amount: Some("15000".into()),
            credit_score: Some("720".into()),
            months_employed: Some("48".into()),
            num_credit_lines: Some("3".into()),
            interest_rate: Some("8.5".into()),
            loan_term: Some("36".into()),
            dti_ratio: Some("0.3".into()),
            education: Some("Bachelor's".into()),
            employment_type: Some("Full-time".into()),
            marital_status: Some("Married".into()),
            loan_purpose: Some("Auto".into()),
            has_mortgage: Some("".into()),
            has_dependents: None,
            has_cosigner: None,
        }
    }

    #[test]
    fn test_checkbox_presence() {
        let app = LoanApplication::from_fields(&form().into_fields()).unwrap();
        // Any submitted value counts as ticked, even an empty one
        assert!(app.has_mortgage);
        assert!(!app.has_dependents);
        assert!(!app.has_co_signer);
        assert_eq!(app.interest_rate, 8.5);
    }

    #[test]
    fn test_missing_value_keeps_canonical_name() {
        let mut form = form();
        form.dti_ratio = None;

        let err = LoanApplication::from_fields(&form.into_fields()).unwrap_err();
        assert_eq!(err, crate::error::ValidationError::MissingField("DTIRatio"));
    }
}
