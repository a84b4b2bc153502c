//! Test Loan Application Producer
//!
//! Generates loan applications and publishes them to NATS for pipeline
//! testing. Falls back to printing samples when NATS is unreachable.
//!
//! Usage: loan_producer [nats_url] [subject] [count] [risky_rate] [delay_ms]

use loan_risk_service::features::CategoricalField;
use loan_risk_service::LoanApplication;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Application generator for testing
struct ApplicationGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ApplicationGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Applicant with steady income and a good credit history
    fn generate_healthy(&mut self) -> LoanApplication {
        let income = self.rng.gen_range(45_000.0..150_000.0_f64).round();

        LoanApplication {
            age: self.rng.gen_range(28..65),
            income,
            loan_amount: (income * self.rng.gen_range(0.05..0.4)).round(),
            credit_score: self.rng.gen_range(680..850),
            months_employed: self.rng.gen_range(36..240),
            num_credit_lines: self.rng.gen_range(1..4),
            interest_rate: round2(self.rng.gen_range(3.0..10.0)),
            loan_term: self.random_term(),
            dti_ratio: round2(self.rng.gen_range(0.1..0.4)),
            education: self.random_value(CategoricalField::Education),
            employment_type: self.random_choice(&["Full-time", "Self-employed"]).to_string(),
            marital_status: self.random_value(CategoricalField::MaritalStatus),
            has_mortgage: self.rng.gen_bool(0.5),
            has_dependents: self.rng.gen_bool(0.5),
            loan_purpose: self.random_value(CategoricalField::LoanPurpose),
            has_co_signer: self.rng.gen_bool(0.3),
        }
    }

    /// Young applicant with a thin file and an expensive loan
    fn generate_risky(&mut self) -> LoanApplication {
        let income = self.rng.gen_range(15_000.0..45_000.0_f64).round();

        LoanApplication {
            age: self.rng.gen_range(18..30),
            income,
            loan_amount: (income * self.rng.gen_range(0.8..3.0)).round(),
            credit_score: self.rng.gen_range(300..600),
            months_employed: self.rng.gen_range(0..18),
            num_credit_lines: self.rng.gen_range(3..5),
            interest_rate: round2(self.rng.gen_range(15.0..25.0)),
            loan_term: self.random_term(),
            dti_ratio: round2(self.rng.gen_range(0.5..0.9)),
            education: "High School".to_string(),
            employment_type: self.random_choice(&["Part-time", "Unemployed"]).to_string(),
            marital_status: self.random_value(CategoricalField::MaritalStatus),
            has_mortgage: false,
            has_dependents: self.rng.gen_bool(0.7),
            loan_purpose: self.random_choice(&["Business", "Other"]).to_string(),
            has_co_signer: false,
        }
    }

    fn generate(&mut self, risky_rate: f64) -> (LoanApplication, bool) {
        if self.rng.gen_bool(risky_rate) {
            (self.generate_risky(), true)
        } else {
            (self.generate_healthy(), false)
        }
    }

    fn random_term(&mut self) -> u32 {
        *[12, 24, 36, 48, 60]
            .get(self.rng.gen_range(0..5))
            .unwrap_or(&36)
    }

    fn random_value(&mut self, field: CategoricalField) -> String {
        let values: Vec<&str> = field.vocabulary().collect();
        self.random_choice(&values).to_string()
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("loan_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Loan Application Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("loans.applications");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let risky_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        risky_rate = risky_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, risky_rate, delay_ms).await;
        }
    };

    let mut generator = ApplicationGenerator::new();

    info!("Starting to publish {} applications...", count);

    let mut healthy_count = 0;
    let mut risky_count = 0;

    for i in 0..count {
        let (application, risky) = generator.generate(risky_rate);
        if risky {
            risky_count += 1;
        } else {
            healthy_count += 1;
        }

        let payload = serde_json::to_vec(&application)?;

        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} applications ({} healthy, {} risky)",
                i + 1,
                count,
                healthy_count,
                risky_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;

    info!(
        "Completed! Published {} applications ({} healthy, {} risky)",
        count, healthy_count, risky_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, risky_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = ApplicationGenerator::new();

    for i in 0..count {
        let (application, _) = generator.generate(risky_rate);

        let json = serde_json::to_string_pretty(&application)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample application {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
