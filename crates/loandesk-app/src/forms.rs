// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;
use time::Date;

use crate::validation::{parse_amount, parse_date, parse_rate};
use crate::{
    FormKind, Loan, LoanId, LoanStatus, NewLoan, NewLoanApplication, NewUser, Role, Session,
};

const MIN_PASSWORD_LEN: usize = 6;

/// Every failing field of a form, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormErrors(Vec<String>);

impl FormErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, message: &str) -> bool {
        self.0.iter().any(|existing| existing == message)
    }

    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for FormErrors {}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoanFormInput {
    pub loan_type: String,
    pub description: String,
    pub interest_rate: String,
    pub maximum_amount: String,
}

impl LoanFormInput {
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            loan_type: loan.loan_type.clone(),
            description: loan.description.clone(),
            interest_rate: loan.interest_rate.to_string(),
            maximum_amount: loan.maximum_amount.to_string(),
        }
    }

    pub fn validate(&self) -> Result<NewLoan, FormErrors> {
        let mut errors = FormErrors::default();
        if self.loan_type.trim().is_empty() {
            errors.push("Loan Type is required");
        }
        if self.description.trim().is_empty() {
            errors.push("Description is required");
        }

        let mut interest_rate = 0.0;
        if self.interest_rate.trim().is_empty() {
            errors.push("Interest Rate is required");
        } else {
            match parse_rate(&self.interest_rate) {
                Ok(value) => interest_rate = value,
                Err(error) => errors.push(format!("Interest Rate: {error}")),
            }
        }

        let mut maximum_amount = 0.0;
        if self.maximum_amount.trim().is_empty() {
            errors.push("Maximum Amount is required");
        } else {
            match parse_amount(&self.maximum_amount) {
                Ok(value) => maximum_amount = value,
                Err(error) => errors.push(format!("Maximum Amount: {error}")),
            }
        }

        errors.into_result(|| NewLoan {
            loan_type: self.loan_type.trim().to_owned(),
            description: self.description.trim().to_owned(),
            interest_rate,
            maximum_amount,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoanApplicationFormInput {
    pub income: String,
    pub model: String,
    pub purchase_price: String,
    pub address: String,
}

/// The applicant-supplied half of an application; the rest comes from the
/// session and the chosen loan.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationTerms {
    pub income: f64,
    pub model: Date,
    pub purchase_price: f64,
    pub address: String,
}

impl ApplicationTerms {
    pub fn into_application(
        self,
        session: &Session,
        loan_type: &str,
        submission_date: Date,
    ) -> NewLoanApplication {
        NewLoanApplication {
            user_id: session.user_id.clone(),
            user_name: session.user_name.clone(),
            loan_type: loan_type.to_owned(),
            submission_date,
            income: self.income,
            purchase_price: self.purchase_price,
            model: self.model,
            address: self.address,
            loan_status: LoanStatus::Pending,
        }
    }
}

impl LoanApplicationFormInput {
    pub fn validate(&self) -> Result<ApplicationTerms, FormErrors> {
        let mut errors = FormErrors::default();

        let mut income = 0.0;
        if self.income.trim().is_empty() {
            errors.push("Income is required");
        } else {
            match parse_amount(&self.income) {
                Ok(value) => income = value,
                Err(error) => errors.push(format!("Income: {error}")),
            }
        }

        let mut model = None;
        if self.model.trim().is_empty() {
            errors.push("Model is required");
        } else {
            match parse_date(&self.model) {
                Ok(value) => model = Some(value),
                Err(error) => errors.push(format!("Model: {error}")),
            }
        }

        let mut purchase_price = 0.0;
        if self.purchase_price.trim().is_empty() {
            errors.push("Purchase Price is required");
        } else {
            match parse_amount(&self.purchase_price) {
                Ok(value) => purchase_price = value,
                Err(error) => errors.push(format!("Purchase Price: {error}")),
            }
        }

        if self.address.trim().is_empty() {
            errors.push("Address is required");
        }

        match (errors.0.is_empty(), model) {
            (true, Some(model)) => Ok(ApplicationTerms {
                income,
                model,
                purchase_price,
                address: self.address.trim().to_owned(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginInput {
    pub user_name: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.user_name.trim().is_empty() {
            errors.push("Username is required");
        }
        if self.password.is_empty() {
            errors.push("Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("Password must be at least 6 characters");
        }
        errors.into_result(|| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignupInput {
    pub user_name: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupInput {
    pub fn validate(&self) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::default();
        if self.user_name.trim().is_empty() {
            errors.push("Username is required");
        }
        if self.password.is_empty() {
            errors.push("Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("Password must be at least 6 characters");
        }
        if self.confirm_password.is_empty() {
            errors.push("Confirm Password is required");
        } else if self.confirm_password != self.password {
            errors.push("Passwords do not match");
        }
        errors.into_result(|| NewUser {
            user_name: self.user_name.trim().to_owned(),
            password: self.password.clone(),
            role: Role::User,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    NewLoan(LoanFormInput),
    EditLoan {
        id: LoanId,
        input: LoanFormInput,
    },
    Apply {
        loan_id: LoanId,
        loan_type: String,
        input: LoanApplicationFormInput,
    },
}

const LOAN_FIELDS: [&str; 4] = ["Loan Type", "Loan Description", "Interest Rate", "Maximum Amount"];
const APPLICATION_FIELDS: [&str; 4] = ["Income", "Model", "Purchase Price", "Address"];

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::NewLoan(_) => FormKind::NewLoan,
            Self::EditLoan { .. } => FormKind::EditLoan,
            Self::Apply { .. } => FormKind::LoanApplication,
        }
    }

    pub fn edit_loan(loan: &Loan) -> Self {
        Self::EditLoan {
            id: loan.id.clone(),
            input: LoanFormInput::from_loan(loan),
        }
    }

    pub fn apply_for(loan: &Loan) -> Self {
        Self::Apply {
            loan_id: loan.id.clone(),
            loan_type: loan.loan_type.clone(),
            input: LoanApplicationFormInput::default(),
        }
    }

    pub fn field_labels(&self) -> &'static [&'static str] {
        match self {
            Self::NewLoan(_) | Self::EditLoan { .. } => &LOAN_FIELDS,
            Self::Apply { .. } => &APPLICATION_FIELDS,
        }
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        let value = match self {
            Self::NewLoan(input) | Self::EditLoan { input, .. } => match index {
                0 => &input.loan_type,
                1 => &input.description,
                2 => &input.interest_rate,
                3 => &input.maximum_amount,
                _ => return None,
            },
            Self::Apply { input, .. } => match index {
                0 => &input.income,
                1 => &input.model,
                2 => &input.purchase_price,
                3 => &input.address,
                _ => return None,
            },
        };
        Some(value.as_str())
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match self {
            Self::NewLoan(input) | Self::EditLoan { input, .. } => match index {
                0 => Some(&mut input.loan_type),
                1 => Some(&mut input.description),
                2 => Some(&mut input.interest_rate),
                3 => Some(&mut input.maximum_amount),
                _ => None,
            },
            Self::Apply { input, .. } => match index {
                0 => Some(&mut input.income),
                1 => Some(&mut input.model),
                2 => Some(&mut input.purchase_price),
                3 => Some(&mut input.address),
                _ => None,
            },
        }
    }

    /// Placeholder hint shown for an empty field.
    pub fn field_hint(&self, index: usize) -> &'static str {
        match (self, index) {
            (Self::Apply { .. }, 1) => "YYYY-MM-DD",
            (Self::NewLoan(_) | Self::EditLoan { .. }, 2) => "percent",
            _ => "",
        }
    }
}
