//! Loan application input and its conversion from raw request fields.

use crate::error::ValidationError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Canonical request field names shared by every front-end.
pub mod field {
    pub const AGE: &str = "Age";
    pub const INCOME: &str = "Income";
    pub const LOAN_AMOUNT: &str = "LoanAmount";
    pub const CREDIT_SCORE: &str = "CreditScore";
    pub const MONTHS_EMPLOYED: &str = "MonthsEmployed";
    pub const NUM_CREDIT_LINES: &str = "NumCreditLines";
    pub const INTEREST_RATE: &str = "InterestRate";
    pub const LOAN_TERM: &str = "LoanTerm";
    pub const DTI_RATIO: &str = "DTIRatio";
    pub const EDUCATION: &str = "Education";
    pub const EMPLOYMENT_TYPE: &str = "EmploymentType";
    pub const MARITAL_STATUS: &str = "MaritalStatus";
    pub const HAS_MORTGAGE: &str = "HasMortgage";
    pub const HAS_DEPENDENTS: &str = "HasDependents";
    pub const LOAN_PURPOSE: &str = "LoanPurpose";
    pub const HAS_CO_SIGNER: &str = "HasCoSigner";
}

/// Raw input fields in the order they are collected and logged.
pub const APPLICATION_FIELDS: [&str; 16] = [
    field::AGE,
    field::INCOME,
    field::LOAN_AMOUNT,
    field::CREDIT_SCORE,
    field::MONTHS_EMPLOYED,
    field::NUM_CREDIT_LINES,
    field::INTEREST_RATE,
    field::LOAN_TERM,
    field::DTI_RATIO,
    field::EDUCATION,
    field::EMPLOYMENT_TYPE,
    field::MARITAL_STATUS,
    field::HAS_MORTGAGE,
    field::HAS_DEPENDENTS,
    field::LOAN_PURPOSE,
    field::HAS_CO_SIGNER,
];

/// A loan application as submitted by the applicant.
///
/// Categorical attributes are kept as the raw strings the applicant sent;
/// they are only mapped to training codes by the categorical encoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoanApplication {
    pub age: u32,
    pub income: f64,
    pub loan_amount: f64,
    /// Usually within 300..=850
    pub credit_score: u32,
    pub months_employed: u32,
    pub num_credit_lines: u32,
    pub interest_rate: f64,
    /// Term in months
    pub loan_term: u32,
    #[serde(rename = "DTIRatio")]
    pub dti_ratio: f64,
    pub education: String,
    pub employment_type: String,
    pub marital_status: String,
    pub has_mortgage: bool,
    pub has_dependents: bool,
    pub loan_purpose: String,
    pub has_co_signer: bool,
}

impl LoanApplication {
    /// Build an application from a mapping of canonical field name to value.
    ///
    /// Numbers may be JSON numbers or numeric strings. Flags accept booleans,
    /// `0`/`1` and the usual textual spellings. A zero `Income` or
    /// `InterestRate` is accepted here; the feature engineer rejects it.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ValidationError> {
        let application = Self {
            age: count(fields, field::AGE)?,
            income: non_negative(fields, field::INCOME)?,
            loan_amount: non_negative(fields, field::LOAN_AMOUNT)?,
            credit_score: count(fields, field::CREDIT_SCORE)?,
            months_employed: count(fields, field::MONTHS_EMPLOYED)?,
            num_credit_lines: count(fields, field::NUM_CREDIT_LINES)?,
            interest_rate: non_negative(fields, field::INTEREST_RATE)?,
            loan_term: count(fields, field::LOAN_TERM)?,
            dti_ratio: non_negative(fields, field::DTI_RATIO)?,
            education: text(fields, field::EDUCATION)?,
            employment_type: text(fields, field::EMPLOYMENT_TYPE)?,
            marital_status: text(fields, field::MARITAL_STATUS)?,
            has_mortgage: flag(fields, field::HAS_MORTGAGE)?,
            has_dependents: flag(fields, field::HAS_DEPENDENTS)?,
            loan_purpose: text(fields, field::LOAN_PURPOSE)?,
            has_co_signer: flag(fields, field::HAS_CO_SIGNER)?,
        };

        if application.loan_term == 0 {
            return Err(invalid(field::LOAN_TERM, "must be at least one month"));
        }

        Ok(application)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn value<'a>(fields: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, ValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(name)),
        Some(value) => Ok(value),
    }
}

fn number(fields: &Map<String, Value>, name: &'static str) -> Result<f64, ValidationError> {
    let parsed = match value(fields, name)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(name, "number out of range"))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(name, format!("`{}` is not a number", s)))?,
        other => return Err(invalid(name, format!("expected a number, got {}", other))),
    };

    if !parsed.is_finite() {
        return Err(invalid(name, "must be a finite number"));
    }
    Ok(parsed)
}

fn non_negative(fields: &Map<String, Value>, name: &'static str) -> Result<f64, ValidationError> {
    let n = number(fields, name)?;
    if n < 0.0 {
        return Err(invalid(name, "must not be negative"));
    }
    Ok(n)
}

fn count(fields: &Map<String, Value>, name: &'static str) -> Result<u32, ValidationError> {
    let n = non_negative(fields, name)?;
    if n.fract() != 0.0 {
        return Err(invalid(name, "must be a whole number"));
    }
    if n > u32::MAX as f64 {
        return Err(invalid(name, "number out of range"));
    }
    Ok(n as u32)
}

fn text(fields: &Map<String, Value>, name: &'static str) -> Result<String, ValidationError> {
    match value(fields, name)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(invalid(name, format!("expected text, got {}", other))),
    }
}

fn flag(fields: &Map<String, Value>, name: &'static str) -> Result<bool, ValidationError> {
    match value(fields, name)? {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 0.0 => Ok(false),
            Some(v) if v == 1.0 => Ok(true),
            _ => Err(invalid(name, format!("expected 0 or 1, got {}", n))),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(invalid(name, format!("`{}` is not a yes/no value", s))),
        },
        other => Err(invalid(name, format!("expected a flag, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_fields() -> Map<String, Value> {
        json!({
            "Age": 35,
            "Income": 60000,
            "LoanAmount": 15000,
            "CreditScore": 720,
            "MonthsEmployed": 48,
            "NumCreditLines": 3,
            "InterestRate": 8.5,
            "LoanTerm": 36,
            "DTIRatio": 0.3,
            "Education": "Bachelor's",
            "EmploymentType": "Full-time",
            "MaritalStatus": "Married",
            "LoanPurpose": "Auto",
            "HasMortgage": 1,
            "HasDependents": 0,
            "HasCoSigner": 0
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_from_fields() {
        let app = LoanApplication::from_fields(&sample_fields()).unwrap();

        assert_eq!(app.age, 35);
        assert_eq!(app.income, 60000.0);
        assert_eq!(app.interest_rate, 8.5);
        assert_eq!(app.education, "Bachelor's");
        assert!(app.has_mortgage);
        assert!(!app.has_dependents);
        assert!(!app.has_co_signer);
    }

    #[test]
    fn test_numeric_strings_and_flag_spellings() {
        let mut fields = sample_fields();
        fields.insert("Age".into(), json!("41"));
        fields.insert("Income".into(), json!(" 52000.5 "));
        fields.insert("HasMortgage".into(), json!("on"));
        fields.insert("HasDependents".into(), json!(true));
        fields.insert("HasCoSigner".into(), json!("No"));

        let app = LoanApplication::from_fields(&fields).unwrap();
        assert_eq!(app.age, 41);
        assert_eq!(app.income, 52000.5);
        assert!(app.has_mortgage);
        assert!(app.has_dependents);
        assert!(!app.has_co_signer);
    }

    #[test]
    fn test_missing_field() {
        let mut fields = sample_fields();
        fields.remove("CreditScore");
        assert_eq!(
            LoanApplication::from_fields(&fields),
            Err(ValidationError::MissingField("CreditScore"))
        );

        let mut fields = sample_fields();
        fields.insert("Education".into(), Value::Null);
        assert_eq!(
            LoanApplication::from_fields(&fields),
            Err(ValidationError::MissingField("Education"))
        );
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("Age", json!(35.5)),
            ("Age", json!(-1)),
            ("LoanAmount", json!("lots")),
            ("LoanTerm", json!(0)),
            ("HasMortgage", json!(2)),
            ("Education", json!(3)),
            ("InterestRate", json!("NaN")),
        ];

        for (name, bad) in cases {
            let mut fields = sample_fields();
            fields.insert(name.to_string(), bad);
            match LoanApplication::from_fields(&fields) {
                Err(ValidationError::InvalidField { field, .. }) => assert_eq!(field, name),
                other => panic!("expected invalid {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_zero_income_is_accepted_here() {
        let mut fields = sample_fields();
        fields.insert("Income".into(), json!(0));
        assert!(LoanApplication::from_fields(&fields).is_ok());
    }

    #[test]
    fn test_serializes_with_canonical_names() {
        let app = LoanApplication::from_fields(&sample_fields()).unwrap();
        let value = serde_json::to_value(&app).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();

        for name in APPLICATION_FIELDS {
            assert!(keys.contains(&name), "missing {}", name);
        }
        assert_eq!(LoanApplication::from_fields(value.as_object().unwrap()).unwrap(), app);
    }
}
