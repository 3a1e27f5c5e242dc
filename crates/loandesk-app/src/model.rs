// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub const fn code(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
        }
    }

    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Approved),
            2 => Some(Self::Rejected),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Statuses reachable from `self` in one transition. There is no
    /// terminal state: approved and rejected can always flip.
    pub const fn transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Rejected],
            Self::Rejected => &[Self::Approved],
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        self.transitions().contains(&next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenKind {
    LoanCatalog,
    LoanRequests,
    AvailableLoans,
    AppliedLoans,
}

impl ScreenKind {
    pub const ADMIN: [Self; 2] = [Self::LoanCatalog, Self::LoanRequests];
    pub const USER: [Self; 2] = [Self::AvailableLoans, Self::AppliedLoans];

    pub const fn for_role(role: Role) -> &'static [Self] {
        match role {
            Role::Admin => &Self::ADMIN,
            Role::User => &Self::USER,
        }
    }

    pub const fn role(self) -> Role {
        match self {
            Self::LoanCatalog | Self::LoanRequests => Role::Admin,
            Self::AvailableLoans | Self::AppliedLoans => Role::User,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LoanCatalog => "loans",
            Self::LoanRequests => "requests",
            Self::AvailableLoans => "available",
            Self::AppliedLoans => "applied",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::LoanCatalog => "Loans",
            Self::LoanRequests => "Loan Requests for Approval",
            Self::AvailableLoans => "Available Vehicle Loans",
            Self::AppliedLoans => "Applied Loans",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormKind {
    NewLoan,
    EditLoan,
    LoanApplication,
}

impl FormKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::NewLoan => "Create New Loan",
            Self::EditLoan => "Edit Loan",
            Self::LoanApplication => "Loan Application Form",
        }
    }

    pub const fn success_message(self) -> &'static str {
        match self {
            Self::NewLoan | Self::LoanApplication => "Successfully Added!",
            Self::EditLoan => "Successfully Updated!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Filter,
    Confirm,
    Form(FormKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterKey {
    Status,
    LoanType,
    ModelDate,
    PurchasePrice,
}

impl FilterKey {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::LoanType => "loan type",
            Self::ModelDate => "model",
            Self::PurchasePrice => "purchase price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub user_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub loan_type: String,
    pub description: String,
    pub interest_rate: f64,
    pub maximum_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: LoanApplicationId,
    pub user_id: UserId,
    pub user_name: String,
    pub loan_type: String,
    pub submission_date: Option<Date>,
    pub income: f64,
    pub purchase_price: f64,
    pub model: Option<Date>,
    pub address: String,
    pub loan_status: LoanStatus,
    #[serde(default)]
    pub wire_text: WireText,
}

/// Field text exactly as the remote service sent it. Replacement writes echo
/// it back so values the client only partly understands survive untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireText {
    pub submission_date: Option<String>,
    pub model: Option<String>,
    pub numeric_user_id: bool,
}

impl LoanApplication {
    /// Full replacement body for a status change; every other field carries
    /// forward unchanged.
    pub fn with_status(&self, status: LoanStatus) -> Self {
        Self {
            loan_status: status,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub user_name: String,
    pub role: Role,
}

impl User {
    pub fn session(&self) -> Session {
        Session {
            user_id: self.id.clone(),
            user_name: self.user_name.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub loan_type: String,
    pub description: String,
    pub interest_rate: f64,
    pub maximum_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoanApplication {
    pub user_id: UserId,
    pub user_name: String,
    pub loan_type: String,
    pub submission_date: Date,
    pub income: f64,
    pub purchase_price: f64,
    pub model: Date,
    pub address: String,
    pub loan_status: LoanStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub user_name: String,
    pub password: String,
    pub role: Role,
}

pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("${value:.0}")
    } else {
        format!("${value:.2}")
    }
}

pub fn format_rate(value: f64) -> String {
    format!("{value}%")
}
