// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use loandesk_app::{
    Loan, LoanApplication, LoanApplicationId, LoanId, LoanStatus, NewLoan, NewLoanApplication,
    Role, Session, UserId, WireText,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use time::{Date, Duration, Month};

const CATALOG: [(&str, &str, f64, f64); 8] = [
    ("Car Loan", "Low-interest car loan.", 5.0, 50000.0),
    ("Home Loan", "Home purchase loan.", 3.5, 500000.0),
    ("Personal Loan", "Unsecured personal loan.", 9.0, 20000.0),
    ("Education Loan", "Tuition and living costs.", 4.5, 80000.0),
    ("Business Loan", "Working capital.", 7.0, 250000.0),
    ("Mortgage Loan", "Residential mortgage.", 3.2, 750000.0),
    ("Credit Card Loan", "Balance consolidation.", 12.0, 15000.0),
    ("Emergency Loan", "Fast approval.", 10.5, 5000.0),
];

const STREET_NAMES: [&str; 8] = [
    "Main St", "Oak Ave", "Maple Dr", "Cedar Ln", "Pine Rd", "Elm St", "Lake Blvd", "Hill Ct",
];

const FIRST_NAMES: [&str; 8] = [
    "Avery", "Jordan", "Riley", "Morgan", "Casey", "Quinn", "Harper", "Rowan",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for realistic but reproducible loan applications.
#[derive(Debug, Clone)]
pub struct LoanFaker {
    rng: DeterministicRng,
}

impl LoanFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn status(&mut self) -> LoanStatus {
        LoanStatus::ALL[self.rng.int_n(LoanStatus::ALL.len())]
    }

    pub fn application(&mut self, id: u32) -> LoanApplication {
        let name = FIRST_NAMES[self.rng.int_n(FIRST_NAMES.len())];
        let (loan_type, _, _, maximum_amount) = CATALOG[self.rng.int_n(CATALOG.len())];
        let street = STREET_NAMES[self.rng.int_n(STREET_NAMES.len())];
        let submitted = reference_date() - Duration::days(self.rng.int_n(120) as i64);
        let model = reference_date() - Duration::days(365 + self.rng.int_n(3650) as i64);
        LoanApplication {
            id: LoanApplicationId::new(id.to_string()),
            user_id: UserId::new(format!("user-{}", name.to_ascii_lowercase())),
            user_name: name.to_owned(),
            loan_type: loan_type.to_owned(),
            submission_date: Some(submitted),
            income: 30000.0 + (self.rng.int_n(90) * 1000) as f64,
            purchase_price: (maximum_amount / 10.0).round() * (1 + self.rng.int_n(9)) as f64,
            model: Some(model),
            address: format!("{} {street}", 10 + self.rng.int_n(990)),
            loan_status: self.status(),
            wire_text: WireText::default(),
        }
    }
}

pub fn date(year: i32, month: Month, day: u8) -> Date {
    Date::from_calendar_date(year, month, day).expect("valid calendar date")
}

pub fn reference_date() -> Date {
    date(2024, Month::March, 1)
}

pub fn admin_session() -> Session {
    Session {
        user_id: UserId::new("1"),
        user_name: "admin".to_owned(),
        role: Role::Admin,
    }
}

pub fn user_session() -> Session {
    Session {
        user_id: UserId::new("101"),
        user_name: "User 1".to_owned(),
        role: Role::User,
    }
}

pub fn sample_new_loans() -> Vec<NewLoan> {
    CATALOG
        .iter()
        .map(|(loan_type, description, interest_rate, maximum_amount)| NewLoan {
            loan_type: (*loan_type).to_owned(),
            description: (*description).to_owned(),
            interest_rate: *interest_rate,
            maximum_amount: *maximum_amount,
        })
        .collect()
}

/// The eight-loan catalog with ids `1..=8`.
pub fn sample_loans() -> Vec<Loan> {
    sample_new_loans()
        .into_iter()
        .enumerate()
        .map(|(index, loan)| Loan {
            id: LoanId::new((index + 1).to_string()),
            loan_type: loan.loan_type,
            description: loan.description,
            interest_rate: loan.interest_rate,
            maximum_amount: loan.maximum_amount,
        })
        .collect()
}

/// `count` pending requests named `User N` for `Loan N`, submitted on
/// consecutive days starting 2023-10-01.
pub fn sample_applications(count: u32) -> Vec<LoanApplication> {
    (1..=count)
        .map(|n| {
            let offset = i64::from(n - 1);
            LoanApplication {
                id: LoanApplicationId::new(n.to_string()),
                user_id: UserId::new(format!("{}", 100 + n)),
                user_name: format!("User {n}"),
                loan_type: format!("Loan {n}"),
                submission_date: Some(date(2023, Month::October, 1) + Duration::days(offset)),
                income: 50000.0 + 1000.0 * f64::from(n),
                purchase_price: 10000.0 * f64::from(n),
                model: Some(date(2023, Month::November, 1) + Duration::days(offset)),
                address: format!("Address {n}"),
                loan_status: LoanStatus::Pending,
                wire_text: WireText::default(),
            }
        })
        .collect()
}

pub fn sample_new_application(session: &Session, loan_type: &str) -> NewLoanApplication {
    NewLoanApplication {
        user_id: session.user_id.clone(),
        user_name: session.user_name.clone(),
        loan_type: loan_type.to_owned(),
        submission_date: reference_date(),
        income: 50000.0,
        purchase_price: 60000.0,
        model: date(2023, Month::November, 15),
        address: "123 Main St".to_owned(),
        loan_status: LoanStatus::Pending,
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("loandesk.db");
    Ok((dir, db_path))
}

/// Shared, cloneable log of remote calls made by a fake runtime.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{CallLog, LoanFaker, sample_applications, sample_loans};
    use loandesk_app::format_date;

    #[test]
    fn faker_is_deterministic_per_seed() {
        let mut left = LoanFaker::new(42);
        let mut right = LoanFaker::new(42);
        assert_eq!(left.application(1), right.application(1));
    }

    #[test]
    fn faker_produces_usable_applications() {
        let mut faker = LoanFaker::new(7);
        for id in 1..=20 {
            let application = faker.application(id);
            assert!(!application.user_name.is_empty());
            assert!(application.purchase_price > 0.0);
            assert!(application.model < application.submission_date);
        }
    }

    #[test]
    fn sample_applications_follow_naming_scheme() {
        let applications = sample_applications(8);
        assert_eq!(applications.len(), 8);
        assert_eq!(applications[2].user_name, "User 3");
        assert_eq!(applications[2].loan_type, "Loan 3");
        assert_eq!(format_date(applications[0].submission_date), "2023-10-01");
        assert_eq!(format_date(applications[7].submission_date), "2023-10-08");
    }

    #[test]
    fn sample_catalog_has_eight_distinct_loans() {
        let loans = sample_loans();
        assert_eq!(loans.len(), 8);
        assert_eq!(loans[0].loan_type, "Car Loan");
        assert_eq!(loans[7].id.as_str(), "8");
    }

    #[test]
    fn call_log_is_shared_between_clones() {
        let log = CallLog::default();
        let other = log.clone();
        other.record("delete_loan 3");
        other.record("list_loans");
        assert_eq!(log.count("delete_loan"), 1);
        assert_eq!(log.calls().len(), 2);
        log.clear();
        assert!(other.calls().is_empty());
    }
}
