// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use loandesk_app::{
    Loan, LoanApplication, LoanApplicationId, LoanId, LoanStatus, NewLoan, NewLoanApplication,
    NewUser, Role, User, UserId, WireText, format_date, parse_date,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::Date;

pub const APP_NAME: &str = "loandesk";
pub const DB_PATH_ENV: &str = "LOANDESK_DB_PATH";

/// Demo accounts created by [`Store::seed_demo_data`].
pub const DEMO_ADMIN: (&str, &str) = ("admin", "admin123");
pub const DEMO_USER: (&str, &str) = ("user", "user123");

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "loans",
        &[
            "id",
            "loan_type",
            "description",
            "interest_rate",
            "maximum_amount",
        ],
    ),
    ("users", &["id", "user_name", "password_hash", "role"]),
    (
        "loan_applications",
        &[
            "id",
            "user_id",
            "user_name",
            "loan_type",
            "submission_date",
            "income",
            "purchase_price",
            "model",
            "address",
            "loan_status",
        ],
    ),
];

const DEMO_LOANS: [(&str, &str, f64, f64); 8] = [
    ("Car Loan", "Low-interest car loan for new and used vehicles.", 5.0, 50000.0),
    ("Home Loan", "Home purchase loan with flexible terms.", 3.5, 500000.0),
    ("Personal Loan", "Unsecured personal loan for any purpose.", 9.0, 20000.0),
    ("Education Loan", "Tuition and living costs while studying.", 4.5, 80000.0),
    ("Business Loan", "Working capital for small businesses.", 7.0, 250000.0),
    ("Mortgage Loan", "Long-term mortgage for residential property.", 3.2, 750000.0),
    ("Credit Card Loan", "Consolidate credit card balances.", 12.0, 15000.0),
    ("Emergency Loan", "Fast approval for urgent expenses.", 10.5, 5000.0),
];

const APPLICATION_COLUMNS: &str = "
    id, user_id, user_name, loan_type, submission_date,
    income, purchase_price, model, address, loan_status
";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        }
        self.conn
            .execute_batch(include_str!("sql/schema.sql"))
            .context("create schema")?;
        Ok(())
    }

    /// Fills an empty database with the demo catalog, the two demo accounts
    /// and a handful of applications. Does nothing when loans already exist.
    pub fn seed_demo_data(&self, today: Date) -> Result<()> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM loans", [], |row| row.get(0))
            .context("count loans")?;
        if existing > 0 {
            return Ok(());
        }

        let mut loans = Vec::with_capacity(DEMO_LOANS.len());
        for (loan_type, description, interest_rate, maximum_amount) in DEMO_LOANS {
            loans.push(self.create_loan(&NewLoan {
                loan_type: loan_type.to_owned(),
                description: description.to_owned(),
                interest_rate,
                maximum_amount,
            })?);
        }

        self.create_user(&NewUser {
            user_name: DEMO_ADMIN.0.to_owned(),
            password: DEMO_ADMIN.1.to_owned(),
            role: Role::Admin,
        })?;
        let applicant = self.create_user(&NewUser {
            user_name: DEMO_USER.0.to_owned(),
            password: DEMO_USER.1.to_owned(),
            role: Role::User,
        })?;

        let statuses = [LoanStatus::Pending, LoanStatus::Approved, LoanStatus::Rejected];
        for (index, loan) in loans.iter().enumerate().take(6) {
            let offset = i64::try_from(index).unwrap_or_default();
            let (user_id, user_name) = if index < 3 {
                (applicant.id.clone(), applicant.user_name.clone())
            } else {
                (
                    UserId::new(format!("guest-{index}")),
                    format!("Guest {}", index - 2),
                )
            };
            self.create_loan_application(&NewLoanApplication {
                user_id,
                user_name,
                loan_type: loan.loan_type.clone(),
                submission_date: today - time::Duration::days(offset * 3),
                income: 40000.0 + 5000.0 * index as f64,
                purchase_price: loan.maximum_amount / 2.0,
                model: today - time::Duration::days(365 * (offset + 1)),
                address: format!("{} Main St", 100 + index),
                loan_status: statuses[index % statuses.len()],
            })?;
        }
        Ok(())
    }

    pub fn list_loans(&self) -> Result<Vec<Loan>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, loan_type, description, interest_rate, maximum_amount
                FROM loans
                ORDER BY id
                ",
            )
            .context("prepare loan query")?;
        let rows = stmt
            .query_map([], loan_from_row)
            .context("query loans")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect loans")
    }

    pub fn get_loan(&self, loan_id: &LoanId) -> Result<Loan> {
        let id = parse_row_id(loan_id.as_str(), "loan")?;
        self.conn
            .query_row(
                "
                SELECT id, loan_type, description, interest_rate, maximum_amount
                FROM loans
                WHERE id = ?
                ",
                params![id],
                loan_from_row,
            )
            .optional()
            .with_context(|| format!("load loan {loan_id}"))?
            .ok_or_else(|| anyhow!("cannot find any loan with ID {loan_id}"))
    }

    pub fn create_loan(&self, loan: &NewLoan) -> Result<Loan> {
        self.conn
            .execute(
                "
                INSERT INTO loans (loan_type, description, interest_rate, maximum_amount)
                VALUES (?, ?, ?, ?)
                ",
                params![
                    loan.loan_type,
                    loan.description,
                    loan.interest_rate,
                    loan.maximum_amount
                ],
            )
            .with_context(|| format!("insert loan {:?}", loan.loan_type))?;
        self.get_loan(&LoanId::new(self.conn.last_insert_rowid().to_string()))
    }

    pub fn update_loan(&self, loan: &Loan) -> Result<Loan> {
        let id = parse_row_id(loan.id.as_str(), "loan")?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE loans
                SET loan_type = ?, description = ?, interest_rate = ?, maximum_amount = ?
                WHERE id = ?
                ",
                params![
                    loan.loan_type,
                    loan.description,
                    loan.interest_rate,
                    loan.maximum_amount,
                    id
                ],
            )
            .with_context(|| format!("update loan {}", loan.id))?;
        if rows_affected == 0 {
            bail!("cannot find any loan with ID {}", loan.id);
        }
        self.get_loan(&loan.id)
    }

    pub fn delete_loan(&self, loan_id: &LoanId) -> Result<()> {
        let id = parse_row_id(loan_id.as_str(), "loan")?;
        let rows_affected = self
            .conn
            .execute("DELETE FROM loans WHERE id = ?", params![id])
            .with_context(|| format!("delete loan {loan_id}"))?;
        if rows_affected == 0 {
            bail!("cannot find any loan with ID {loan_id}");
        }
        Ok(())
    }

    pub fn list_loan_applications(&self) -> Result<Vec<LoanApplication>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM loan_applications ORDER BY id"
            ))
            .context("prepare loan application query")?;
        let rows = stmt
            .query_map([], application_from_row)
            .context("query loan applications")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect loan applications")
    }

    pub fn list_loan_applications_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LoanApplication>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE user_id = ? ORDER BY id"
            ))
            .context("prepare loan application query")?;
        let rows = stmt
            .query_map(params![user_id.as_str()], application_from_row)
            .with_context(|| format!("query loan applications for user {user_id}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect loan applications")
    }

    pub fn get_loan_application(&self, application_id: &LoanApplicationId) -> Result<LoanApplication> {
        let id = parse_row_id(application_id.as_str(), "loan application")?;
        self.conn
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM loan_applications WHERE id = ?"),
                params![id],
                application_from_row,
            )
            .optional()
            .with_context(|| format!("load loan application {application_id}"))?
            .ok_or_else(|| anyhow!("cannot find any loan application with ID {application_id}"))
    }

    pub fn create_loan_application(
        &self,
        application: &NewLoanApplication,
    ) -> Result<LoanApplication> {
        self.conn
            .execute(
                "
                INSERT INTO loan_applications (
                  user_id, user_name, loan_type, submission_date,
                  income, purchase_price, model, address, loan_status
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    application.user_id.as_str(),
                    application.user_name,
                    application.loan_type,
                    format_date(Some(application.submission_date)),
                    application.income,
                    application.purchase_price,
                    format_date(Some(application.model)),
                    application.address,
                    application.loan_status.code()
                ],
            )
            .with_context(|| {
                format!(
                    "insert loan application for {:?}",
                    application.user_name
                )
            })?;
        self.get_loan_application(&LoanApplicationId::new(
            self.conn.last_insert_rowid().to_string(),
        ))
    }

    /// Replaces every column of the stored application.
    pub fn update_loan_application(&self, application: &LoanApplication) -> Result<LoanApplication> {
        let id = parse_row_id(application.id.as_str(), "loan application")?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE loan_applications
                SET
                  user_id = ?,
                  user_name = ?,
                  loan_type = ?,
                  submission_date = ?,
                  income = ?,
                  purchase_price = ?,
                  model = ?,
                  address = ?,
                  loan_status = ?
                WHERE id = ?
                ",
                params![
                    application.user_id.as_str(),
                    application.user_name,
                    application.loan_type,
                    optional_date_text(application.submission_date),
                    application.income,
                    application.purchase_price,
                    optional_date_text(application.model),
                    application.address,
                    application.loan_status.code(),
                    id
                ],
            )
            .with_context(|| format!("update loan application {}", application.id))?;
        if rows_affected == 0 {
            bail!(
                "cannot find any loan application with ID {}",
                application.id
            );
        }
        self.get_loan_application(&application.id)
    }

    pub fn delete_loan_application(&self, application_id: &LoanApplicationId) -> Result<()> {
        let id = parse_row_id(application_id.as_str(), "loan application")?;
        let rows_affected = self
            .conn
            .execute("DELETE FROM loan_applications WHERE id = ?", params![id])
            .with_context(|| format!("delete loan application {application_id}"))?;
        if rows_affected == 0 {
            bail!("cannot find any loan application with ID {application_id}");
        }
        Ok(())
    }

    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        let user_name = user.user_name.trim();
        if user_name.is_empty() {
            bail!("user name must not be empty");
        }
        let taken: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE user_name = ?",
                params![user_name],
                |row| row.get(0),
            )
            .optional()
            .context("check user name")?;
        if taken.is_some() {
            bail!("user name {user_name:?} is already taken -- pick another");
        }
        self.conn
            .execute(
                "INSERT INTO users (user_name, password_hash, role) VALUES (?, ?, ?)",
                params![
                    user_name,
                    password_hash(user_name, &user.password),
                    user.role.as_str()
                ],
            )
            .with_context(|| format!("insert user {user_name:?}"))?;
        Ok(User {
            id: UserId::new(self.conn.last_insert_rowid().to_string()),
            user_name: user_name.to_owned(),
            role: user.role,
        })
    }

    pub fn find_user_by_credentials(&self, user_name: &str, password: &str) -> Result<Option<User>> {
        let user_name = user_name.trim();
        let found = self
            .conn
            .query_row(
                "SELECT id, user_name, role FROM users WHERE user_name = ? AND password_hash = ?",
                params![user_name, password_hash(user_name, password)],
                |row| {
                    let id: i64 = row.get(0)?;
                    let name: String = row.get(1)?;
                    let role_raw: String = row.get(2)?;
                    Ok((id, name, role_raw))
                },
            )
            .optional()
            .with_context(|| format!("look up user {user_name:?}"))?;

        let Some((id, name, role_raw)) = found else {
            return Ok(None);
        };
        let role = Role::parse(&role_raw)
            .ok_or_else(|| anyhow!("user {name:?} has unknown role {role_raw:?}"))?;
        Ok(Some(User {
            id: UserId::new(id.to_string()),
            user_name: name,
            role,
        }))
    }

    pub fn login(&self, user_name: &str, password: &str) -> Result<User> {
        self.find_user_by_credentials(user_name, password)?
            .ok_or_else(|| anyhow!("invalid user name or password"))
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os(DB_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set {DB_PATH_ENV} to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("loandesk.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            bail!(
                "database is missing required table `{table}`; use a loandesk database or pick a new path"
            );
        }

        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; use a loandesk database or pick a new path",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?)")
        .context("prepare table info query")?;
    let rows = stmt
        .query_map(params![table], |row| row.get::<_, String>(0))
        .with_context(|| format!("read columns of {table}"))?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns of {table}"))
}

fn parse_row_id(raw: &str, entity: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| anyhow!("cannot find any {entity} with ID {raw}"))
}

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    let id: i64 = row.get(0)?;
    Ok(Loan {
        id: LoanId::new(id.to_string()),
        loan_type: row.get(1)?,
        description: row.get(2)?,
        interest_rate: row.get(3)?,
        maximum_amount: row.get(4)?,
    })
}

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<LoanApplication> {
    let id: i64 = row.get(0)?;
    let user_id: String = row.get(1)?;
    let submission_raw: Option<String> = row.get(4)?;
    let model_raw: Option<String> = row.get(7)?;
    let status_raw: i64 = row.get(9)?;
    let loan_status = LoanStatus::from_code(status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Integer,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown loan status {status_raw}"),
            )),
        )
    })?;

    Ok(LoanApplication {
        id: LoanApplicationId::new(id.to_string()),
        user_id: UserId::new(user_id),
        user_name: row.get(2)?,
        loan_type: row.get(3)?,
        submission_date: parse_stored_date(submission_raw, 4)?,
        income: row.get(5)?,
        purchase_price: row.get(6)?,
        model: parse_stored_date(model_raw, 7)?,
        address: row.get(8)?,
        loan_status,
        wire_text: WireText::default(),
    })
}

fn parse_stored_date(raw: Option<String>, column: usize) -> rusqlite::Result<Option<Date>> {
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    parse_date(&raw).map(Some).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}

fn optional_date_text(value: Option<Date>) -> Option<String> {
    value.map(|date| format_date(Some(date)))
}

fn password_hash(user_name: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{APP_NAME}:{user_name}:{password}").as_bytes());
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{parse_row_id, password_hash};

    #[test]
    fn password_hash_is_salted_by_user_name() {
        assert_eq!(password_hash("a", "secret1").len(), 64);
        assert_ne!(password_hash("a", "secret1"), password_hash("b", "secret1"));
        assert_eq!(password_hash("a", "secret1"), password_hash("a", "secret1"));
    }

    #[test]
    fn non_numeric_ids_read_as_not_found() {
        let error = parse_row_id("65a1f0", "loan").expect_err("non-numeric id");
        assert_eq!(error.to_string(), "cannot find any loan with ID 65a1f0");
        assert_eq!(parse_row_id(" 7 ", "loan").expect("numeric id"), 7);
    }
}
