//! Assembly of the ordered model input vector.
//!
//! The classifier and scaler were fitted on columns in this exact order.

use crate::features::encoder::EncodedCategories;
use crate::features::engineer::DerivedFeatures;
use crate::types::application::LoanApplication;

/// Total number of model input features.
pub const FEATURE_COUNT: usize = 18;

/// Number of leading features that go through the scaler.
pub const SCALED_FEATURE_COUNT: usize = 11;

/// Number of trailing features passed through unscaled.
pub const PASSTHROUGH_FEATURE_COUNT: usize = FEATURE_COUNT - SCALED_FEATURE_COUNT;

/// Feature names in model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    // Scaled numeric (11)
    "Age",
    "Income",
    "LoanAmount",
    "CreditScore",
    "MonthsEmployed",
    "NumCreditLines",
    "InterestRate",
    "LoanTerm",
    "DTIRatio",
    "RiskScore",
    "LTI",
    // Encoded categorical (4)
    "Education",
    "EmploymentType",
    "MaritalStatus",
    "LoanPurpose",
    // Binary flags (3)
    "HasMortgage",
    "HasDependents",
    "HasCoSigner",
];

/// Ordered model input before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// The leading numeric block fed to the scaler.
    pub fn numeric(&self) -> [f64; SCALED_FEATURE_COUNT] {
        let mut out = [0.0; SCALED_FEATURE_COUNT];
        out.copy_from_slice(&self.0[..SCALED_FEATURE_COUNT]);
        out
    }

    /// Encoded categories and flags, which bypass the scaler.
    pub fn passthrough(&self) -> [f64; PASSTHROUGH_FEATURE_COUNT] {
        let mut out = [0.0; PASSTHROUGH_FEATURE_COUNT];
        out.copy_from_slice(&self.0[SCALED_FEATURE_COUNT..]);
        out
    }

    /// Replace the numeric block, keeping the passthrough block in place.
    pub fn with_numeric(&self, numeric: [f64; SCALED_FEATURE_COUNT]) -> Self {
        let mut values = self.0;
        values[..SCALED_FEATURE_COUNT].copy_from_slice(&numeric);
        Self(values)
    }
}

/// Builds the model input vector from an application and its derived features.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble features in `FEATURE_NAMES` order.
    pub fn assemble(
        &self,
        app: &LoanApplication,
        categories: &EncodedCategories,
        derived: &DerivedFeatures,
    ) -> FeatureVector {
        FeatureVector([
            app.age as f64,
            app.income,
            app.loan_amount,
            app.credit_score as f64,
            app.months_employed as f64,
            app.num_credit_lines as f64,
            app.interest_rate,
            app.loan_term as f64,
            app.dti_ratio,
            derived.risk_score,
            derived.lti,
            categories.education as f64,
            categories.employment_type as f64,
            categories.marital_status as f64,
            categories.loan_purpose as f64,
            binarize(app.has_mortgage),
            binarize(app.has_dependents),
            binarize(app.has_co_signer),
        ])
    }
}

fn binarize(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> LoanApplication {
        LoanApplication {
            age: 35,
            income: 60000.0,
            loan_amount: 15000.0,
            credit_score: 720,
            months_employed: 48,
            num_credit_lines: 3,
            interest_rate: 8.5,
            loan_term: 36,
            dti_ratio: 0.3,
            education: "Bachelor's".to_string(),
            employment_type: "Full-time".to_string(),
            marital_status: "Married".to_string(),
            has_mortgage: true,
            has_dependents: false,
            loan_purpose: "Auto".to_string(),
            has_co_signer: true,
        }
    }

    fn assembled() -> FeatureVector {
        let categories = EncodedCategories {
            education: 0,
            employment_type: 0,
            marital_status: 1,
            loan_purpose: 0,
        };
        let derived = DerivedFeatures {
            risk_score: 25.41,
            lti: 0.25,
        };
        FeatureAssembler::new().assemble(&application(), &categories, &derived)
    }

    #[test]
    fn test_feature_order() {
        let features = assembled();

        assert_eq!(
            features.values(),
            &[
                35.0, 60000.0, 15000.0, 720.0, 48.0, 3.0, 8.5, 36.0, 0.3, 25.41, 0.25, 0.0, 0.0, 1.0,
                0.0, 1.0, 0.0, 1.0
            ]
        );

        let value = |name: &str| {
            FEATURE_NAMES
                .iter()
                .position(|n| *n == name)
                .map(|i| features.values()[i])
        };
        assert_eq!(value("RiskScore"), Some(25.41));
        assert_eq!(value("MaritalStatus"), Some(1.0));
        assert_eq!(value("HasCoSigner"), Some(1.0));
    }

    #[test]
    fn test_partitions() {
        let features = assembled();

        assert_eq!(features.numeric().len(), 11);
        assert_eq!(features.numeric()[10], 0.25);
        assert_eq!(features.passthrough(), [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);

        let rescaled = features.with_numeric([1.0; SCALED_FEATURE_COUNT]);
        assert_eq!(rescaled.numeric(), [1.0; SCALED_FEATURE_COUNT]);
        assert_eq!(rescaled.passthrough(), features.passthrough());
    }

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_NAMES.len(), 18);
        assert_eq!(PASSTHROUGH_FEATURE_COUNT, 7);
        assert_eq!(FEATURE_NAMES[SCALED_FEATURE_COUNT - 1], "LTI");
        assert_eq!(FEATURE_NAMES[SCALED_FEATURE_COUNT], "Education");
    }
}
