// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use loandesk_app::{
    Loan, LoanApplication, LoanApplicationId, LoanId, LoanStatus, NewLoan, NewLoanApplication,
    NewUser, Role, User, UserId, WireText, format_date, parse_leading_date,
};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use time::Date;
use url::Url;

/// Blocking client for the loan REST service.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let base_url = Url::parse(trimmed)
            .with_context(|| format!("server.base_url {trimmed:?} is not a valid URL"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                base_url.scheme()
            );
        }
        if base_url.cannot_be_a_base() {
            bail!("server.base_url {trimmed:?} cannot carry request paths");
        }
        if timeout.is_zero() {
            bail!("server.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn list_loans(&self) -> Result<Vec<Loan>> {
        let wire: Vec<WireLoan> = self.fetch(&["loan", "getAllLoans"])?;
        wire.into_iter().map(WireLoan::into_loan).collect()
    }

    pub fn get_loan(&self, id: &LoanId) -> Result<Loan> {
        let wire: WireLoan = self.fetch(&["loan", "getLoanById", id.as_str()])?;
        wire.into_loan()
    }

    pub fn create_loan(&self, loan: &NewLoan) -> Result<()> {
        self.write(
            Method::POST,
            &["loan", "addLoan"],
            &LoanBody::from_new(loan),
        )
    }

    pub fn update_loan(&self, loan: &Loan) -> Result<()> {
        self.write(
            Method::PUT,
            &["loan", "updateLoan", loan.id.as_str()],
            &LoanBody::from_loan(loan),
        )
    }

    pub fn delete_loan(&self, id: &LoanId) -> Result<()> {
        self.remove(&["loan", "deleteLoan", id.as_str()])
    }

    pub fn list_applications(&self) -> Result<Vec<LoanApplication>> {
        let wire: Vec<WireApplication> =
            self.fetch(&["loanApplication", "getAllLoanApplications"])?;
        wire.into_iter().map(WireApplication::into_application).collect()
    }

    pub fn list_applications_for_user(&self, user_id: &UserId) -> Result<Vec<LoanApplication>> {
        let wire: Vec<WireApplication> = self.fetch(&[
            "loanApplication",
            "getLoanApplicationByUserId",
            user_id.as_str(),
        ])?;
        wire.into_iter().map(WireApplication::into_application).collect()
    }

    pub fn create_application(&self, application: &NewLoanApplication) -> Result<()> {
        self.write(
            Method::POST,
            &["loanApplication", "addLoanApplication"],
            &ApplicationBody::from_new(application),
        )
    }

    /// Sends the whole record as the replacement body.
    pub fn update_application(&self, application: &LoanApplication) -> Result<()> {
        self.write(
            Method::PUT,
            &[
                "loanApplication",
                "updateLoanApplication",
                application.id.as_str(),
            ],
            &ApplicationBody::from_application(application),
        )
    }

    pub fn delete_application(&self, id: &LoanApplicationId) -> Result<()> {
        self.remove(&["loanApplication", "deleteLoanApplication", id.as_str()])
    }

    pub fn login(&self, user_name: &str, password: &str) -> Result<User> {
        let wire: WireUser = self
            .send(
                Method::POST,
                &["user", "login"],
                &Credentials {
                    user_name,
                    password,
                    role: None,
                },
            )
            .with_context(|| format!("log in as {user_name:?}"))?;
        wire.into_user()
    }

    pub fn signup(&self, user: &NewUser) -> Result<User> {
        let wire: WireUser = self
            .send(
                Method::POST,
                &["user", "signup"],
                &Credentials {
                    user_name: &user.user_name,
                    password: &user.password,
                    role: Some(user.role.as_str()),
                },
            )
            .with_context(|| format!("sign up {:?}", user.user_name))?;
        wire.into_user()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("server.base_url cannot carry request paths"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn fetch<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        self.execute(self.http.get(url.clone()), &format!("GET {url}"))
    }

    fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, %method, "send");
        let label = format!("{method} {url}");
        self.execute(self.http.request(method, url).json(body), &label)
    }

    /// Mutations only look at the status; whatever body a 2xx carries is
    /// ignored and the caller re-fetches.
    fn write<B: Serialize>(&self, method: Method, segments: &[&str], body: &B) -> Result<()> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, %method, "write");
        let label = format!("{method} {url}");
        let response = self.checked(self.http.request(method, url).json(body), &label)?;
        tracing::debug!(status = response.status().as_u16(), "{label} accepted");
        Ok(())
    }

    fn remove(&self, segments: &[&str]) -> Result<()> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "DELETE");
        let label = format!("DELETE {url}");
        self.checked(self.http.delete(url), &label)?;
        Ok(())
    }

    fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, label: &str) -> Result<T> {
        self.checked(request, label)?
            .json()
            .with_context(|| format!("decode response from {label}"))
    }

    fn checked(&self, request: RequestBuilder, label: &str) -> Result<Response> {
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body)).context(label.to_owned());
        }
        Ok(response)
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check [server].base_url or run with --demo ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

fn id_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

/// Numbers arrive as JSON numbers, numeric strings, or not at all.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Option::<RawNumber>::deserialize(deserializer)? {
        Some(RawNumber::Number(value)) => value,
        Some(RawNumber::Text(text)) => text.trim().parse().unwrap_or_default(),
        None => 0.0,
    })
}

fn leading_date(raw: Option<&str>) -> Option<Date> {
    raw.and_then(|text| parse_leading_date(text).ok())
}

/// The raw text wins while it still reads as the typed value, so timestamps
/// and formats the client cannot parse go back exactly as they came.
fn echo_date(typed: Option<Date>, raw: Option<&str>) -> Option<String> {
    match raw {
        Some(raw) if leading_date(Some(raw)) == typed => Some(raw.to_owned()),
        _ => typed.map(|date| format_date(Some(date))),
    }
}

fn user_id_value(id: &str, numeric: bool) -> serde_json::Value {
    if numeric && let Ok(number) = id.parse::<serde_json::Number>() {
        return serde_json::Value::Number(number);
    }
    serde_json::Value::String(id.to_owned())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLoan {
    #[serde(rename = "_id", deserialize_with = "id_text")]
    id: String,
    #[serde(default)]
    loan_type: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "lenient_number")]
    interest_rate: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    maximum_amount: f64,
}

impl WireLoan {
    fn into_loan(self) -> Result<Loan> {
        if self.id.trim().is_empty() {
            bail!("loan record has an empty _id");
        }
        Ok(Loan {
            id: LoanId::new(self.id),
            loan_type: self.loan_type,
            description: self.description,
            interest_rate: self.interest_rate,
            maximum_amount: self.maximum_amount,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoanBody<'a> {
    loan_type: &'a str,
    description: &'a str,
    interest_rate: f64,
    maximum_amount: f64,
}

impl<'a> LoanBody<'a> {
    fn from_new(loan: &'a NewLoan) -> Self {
        Self {
            loan_type: &loan.loan_type,
            description: &loan.description,
            interest_rate: loan.interest_rate,
            maximum_amount: loan.maximum_amount,
        }
    }

    fn from_loan(loan: &'a Loan) -> Self {
        Self {
            loan_type: &loan.loan_type,
            description: &loan.description,
            interest_rate: loan.interest_rate,
            maximum_amount: loan.maximum_amount,
        }
    }
}

/// Applied-loan listings may carry only a handful of fields, so everything
/// except the id is optional on the way in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireApplication {
    #[serde(rename = "_id", deserialize_with = "id_text")]
    id: String,
    #[serde(default)]
    user_id: Option<RawId>,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    loan_type: String,
    #[serde(default)]
    submission_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    income: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    purchase_price: f64,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    address: String,
    #[serde(default, deserialize_with = "lenient_number")]
    loan_status: f64,
}

impl WireApplication {
    fn into_application(self) -> Result<LoanApplication> {
        if self.id.trim().is_empty() {
            bail!("loan application record has an empty _id");
        }
        let code = self.loan_status as i64;
        let loan_status = LoanStatus::from_code(code).unwrap_or_else(|| {
            tracing::warn!(id = %self.id, code, "unknown loan status; treating as pending");
            LoanStatus::Pending
        });
        let (user_id, numeric_user_id) = match self.user_id {
            Some(RawId::Text(text)) => (text, false),
            Some(RawId::Number(number)) => (number.to_string(), true),
            None => (String::new(), false),
        };
        Ok(LoanApplication {
            id: LoanApplicationId::new(self.id),
            user_id: UserId::new(user_id),
            user_name: self.user_name,
            loan_type: self.loan_type,
            submission_date: leading_date(self.submission_date.as_deref()),
            income: self.income,
            purchase_price: self.purchase_price,
            model: leading_date(self.model.as_deref()),
            address: self.address,
            loan_status,
            wire_text: WireText {
                submission_date: self.submission_date,
                model: self.model,
                numeric_user_id,
            },
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationBody<'a> {
    user_id: serde_json::Value,
    user_name: &'a str,
    loan_type: &'a str,
    submission_date: Option<String>,
    income: f64,
    purchase_price: f64,
    model: Option<String>,
    address: &'a str,
    loan_status: i64,
}

impl<'a> ApplicationBody<'a> {
    fn from_new(application: &'a NewLoanApplication) -> Self {
        Self {
            user_id: user_id_value(application.user_id.as_str(), false),
            user_name: &application.user_name,
            loan_type: &application.loan_type,
            submission_date: Some(format_date(Some(application.submission_date))),
            income: application.income,
            purchase_price: application.purchase_price,
            model: Some(format_date(Some(application.model))),
            address: &application.address,
            loan_status: application.loan_status.code(),
        }
    }

    fn from_application(application: &'a LoanApplication) -> Self {
        let wire = &application.wire_text;
        Self {
            user_id: user_id_value(application.user_id.as_str(), wire.numeric_user_id),
            user_name: &application.user_name,
            loan_type: &application.loan_type,
            submission_date: echo_date(
                application.submission_date,
                wire.submission_date.as_deref(),
            ),
            income: application.income,
            purchase_price: application.purchase_price,
            model: echo_date(application.model, wire.model.as_deref()),
            address: &application.address,
            loan_status: application.loan_status.code(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Credentials<'a> {
    user_name: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    #[serde(rename = "_id", deserialize_with = "id_text")]
    id: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    role: String,
}

impl WireUser {
    fn into_user(self) -> Result<User> {
        let Some(role) = Role::parse(&self.role) else {
            bail!("user {:?} has unknown role {:?}", self.user_name, self.role);
        };
        Ok(User {
            id: UserId::new(self.id),
            user_name: self.user_name,
            role,
        })
    }
}
