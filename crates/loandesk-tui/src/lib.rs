// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use loandesk_app::{
    APPLIED_LOANS, AVAILABLE_LOANS, AppCommand, AppMode, AppState, FilterKey, FilterValue,
    FormPayload, LOAN_CATALOG, LOAN_REQUESTS, ListCommand, ListEvent, ListRecord,
    ListView, Loan, LoanApplication, LoanApplicationId, LoanId, LoanStatus, NewLoan,
    NewLoanApplication, RowAction, ScreenKind, Session, SortDirection, UserId,
    application_loan_type, parse_amount, parse_optional_date,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::{Date, OffsetDateTime};

pub const NO_RECORDS: &str = "Oops! No records Found";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete?";

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const FILTER_FIELDS: [&str; 5] = [
    "Status",
    "Loan Type",
    "Model From",
    "Model To",
    "Min Purchase Price",
];

/// Which collection a screen fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchScope {
    Loans,
    Applications,
    ApplicationsFor(UserId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Loans(Vec<Loan>),
    Applications(Vec<LoanApplication>),
}

pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Fetched {
        screen: ScreenKind,
        generation: u64,
        result: Result<Fetched, String>,
    },
}

pub trait LoanRuntime {
    fn fetch(&mut self, scope: &FetchScope) -> Result<Fetched>;
    fn create_loan(&mut self, loan: &NewLoan) -> Result<()>;
    fn update_loan(&mut self, loan: &Loan) -> Result<()>;
    fn delete_loan(&mut self, id: &LoanId) -> Result<()>;
    fn create_application(&mut self, application: &NewLoanApplication) -> Result<()>;
    fn update_application(&mut self, application: &LoanApplication) -> Result<()>;
    fn delete_application(&mut self, id: &LoanApplicationId) -> Result<()>;

    /// Starts a fetch whose result arrives later as [`InternalEvent::Fetched`].
    /// Runtimes that can fetch off the UI thread override this.
    fn spawn_fetch(
        &mut self,
        screen: ScreenKind,
        generation: u64,
        scope: FetchScope,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        fetch_now(self, screen, generation, &scope, &tx)
    }

    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

pub fn fetch_now<R: LoanRuntime + ?Sized>(
    runtime: &mut R,
    screen: ScreenKind,
    generation: u64,
    scope: &FetchScope,
    tx: &Sender<InternalEvent>,
) -> Result<()> {
    let result = runtime
        .fetch(scope)
        .map_err(|error| format!("{error:#}"));
    tx.send(InternalEvent::Fetched {
        screen,
        generation,
        result,
    })
    .map_err(|_| anyhow!("fetch result channel closed"))
}

/// Glue between a record type and the runtime calls that serve it.
trait RemoteRecord: ListRecord {
    fn fetch_scope(screen: ScreenKind, session: &Session) -> FetchScope;
    fn take_fetched(fetched: Fetched) -> Option<Vec<Self>>;
    fn push_update<Rt: LoanRuntime + ?Sized>(runtime: &mut Rt, record: &Self) -> Result<()>;
    fn push_delete<Rt: LoanRuntime + ?Sized>(runtime: &mut Rt, id: &Self::Id) -> Result<()>;
    fn form_for(&self, action: RowAction) -> Option<FormPayload>;
}

impl RemoteRecord for Loan {
    fn fetch_scope(_: ScreenKind, _: &Session) -> FetchScope {
        FetchScope::Loans
    }

    fn take_fetched(fetched: Fetched) -> Option<Vec<Self>> {
        match fetched {
            Fetched::Loans(loans) => Some(loans),
            Fetched::Applications(_) => None,
        }
    }

    fn push_update<Rt: LoanRuntime + ?Sized>(runtime: &mut Rt, record: &Self) -> Result<()> {
        runtime.update_loan(record)
    }

    fn push_delete<Rt: LoanRuntime + ?Sized>(runtime: &mut Rt, id: &LoanId) -> Result<()> {
        runtime.delete_loan(id)
    }

    fn form_for(&self, action: RowAction) -> Option<FormPayload> {
        match action {
            RowAction::Edit => Some(FormPayload::edit_loan(self)),
            RowAction::Apply => Some(FormPayload::apply_for(self)),
            RowAction::Approve | RowAction::Reject | RowAction::Delete => None,
        }
    }
}

impl RemoteRecord for LoanApplication {
    fn fetch_scope(screen: ScreenKind, session: &Session) -> FetchScope {
        if screen == ScreenKind::AppliedLoans {
            FetchScope::ApplicationsFor(session.user_id.clone())
        } else {
            FetchScope::Applications
        }
    }

    fn take_fetched(fetched: Fetched) -> Option<Vec<Self>> {
        match fetched {
            Fetched::Applications(applications) => Some(applications),
            Fetched::Loans(_) => None,
        }
    }

    fn push_update<Rt: LoanRuntime + ?Sized>(runtime: &mut Rt, record: &Self) -> Result<()> {
        runtime.update_application(record)
    }

    fn push_delete<Rt: LoanRuntime + ?Sized>(
        runtime: &mut Rt,
        id: &LoanApplicationId,
    ) -> Result<()> {
        runtime.delete_application(id)
    }

    fn form_for(&self, _: RowAction) -> Option<FormPayload> {
        None
    }
}

#[derive(Debug, Clone)]
struct Lists {
    catalog: ListView<Loan>,
    requests: ListView<LoanApplication>,
    available: ListView<Loan>,
    applied: ListView<LoanApplication>,
}

impl Default for Lists {
    fn default() -> Self {
        Self {
            catalog: ListView::new(&LOAN_CATALOG),
            requests: ListView::new(&LOAN_REQUESTS),
            available: ListView::new(&AVAILABLE_LOANS),
            applied: ListView::new(&APPLIED_LOANS),
        }
    }
}

impl Lists {
    fn load_generation(&self, screen: ScreenKind) -> u64 {
        match screen {
            ScreenKind::LoanCatalog => self.catalog.load_generation(),
            ScreenKind::LoanRequests => self.requests.load_generation(),
            ScreenKind::AvailableLoans => self.available.load_generation(),
            ScreenKind::AppliedLoans => self.applied.load_generation(),
        }
    }

    fn visible_len(&self, screen: ScreenKind) -> usize {
        match screen {
            ScreenKind::LoanCatalog => self.catalog.visible_rows().len(),
            ScreenKind::LoanRequests => self.requests.visible_rows().len(),
            ScreenKind::AvailableLoans => self.available.visible_rows().len(),
            ScreenKind::AppliedLoans => self.applied.visible_rows().len(),
        }
    }

    fn search_term(&self, screen: ScreenKind) -> &str {
        match screen {
            ScreenKind::LoanCatalog => self.catalog.search_term(),
            ScreenKind::LoanRequests => self.requests.search_term(),
            ScreenKind::AvailableLoans => self.available.search_term(),
            ScreenKind::AppliedLoans => self.applied.search_term(),
        }
    }
}

/// Record-agnostic list commands; row-scoped ones act on the cursor row.
#[derive(Debug, Clone, PartialEq)]
enum ViewCommand {
    Load,
    SetSearch(String),
    SetFilter(FilterKey, FilterValue),
    ClearFilter(FilterKey),
    ClearFilters,
    ToggleSort,
    ClearSort,
    NextPage,
    PrevPage,
    ToggleExpand,
    Action(RowAction),
    CancelDelete,
    ConfirmDelete,
    MutationSucceeded,
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Status(String),
    OpenForm(FormPayload),
    ConfirmDelete,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct FilterUiState {
    field: usize,
    status: Option<LoanStatus>,
    loan_type: String,
    model_from: String,
    model_to: String,
    min_price: String,
    error: Option<String>,
}

impl FilterUiState {
    fn text_field_mut(&mut self) -> Option<&mut String> {
        match self.field {
            1 => Some(&mut self.loan_type),
            2 => Some(&mut self.model_from),
            3 => Some(&mut self.model_to),
            4 => Some(&mut self.min_price),
            _ => None,
        }
    }

    fn field_value(&self, index: usize) -> String {
        match index {
            0 => self
                .status
                .map_or_else(|| "All".to_owned(), |status| status.label().to_owned()),
            1 => self.loan_type.clone(),
            2 => self.model_from.clone(),
            3 => self.model_to.clone(),
            4 => self.min_price.clone(),
            _ => String::new(),
        }
    }

    /// Converts the inputs into engine filter commands, or the first parse error.
    fn commands(&self) -> Result<Vec<ViewCommand>, String> {
        let mut commands = Vec::with_capacity(4);
        commands.push(match self.status {
            Some(status) => ViewCommand::SetFilter(FilterKey::Status, FilterValue::Status(status)),
            None => ViewCommand::ClearFilter(FilterKey::Status),
        });

        let loan_type = self.loan_type.trim();
        commands.push(if loan_type.is_empty() {
            ViewCommand::ClearFilter(FilterKey::LoanType)
        } else {
            ViewCommand::SetFilter(FilterKey::LoanType, FilterValue::Text(loan_type.to_owned()))
        });

        let from = parse_optional_date(&self.model_from)
            .map_err(|error| format!("Model From: {error}"))?;
        let to =
            parse_optional_date(&self.model_to).map_err(|error| format!("Model To: {error}"))?;
        commands.push(if from.is_none() && to.is_none() {
            ViewCommand::ClearFilter(FilterKey::ModelDate)
        } else {
            ViewCommand::SetFilter(FilterKey::ModelDate, FilterValue::DateRange { from, to })
        });

        commands.push(if self.min_price.trim().is_empty() {
            ViewCommand::ClearFilter(FilterKey::PurchasePrice)
        } else {
            let minimum = parse_amount(&self.min_price)
                .map_err(|error| format!("Min Purchase Price: {error}"))?;
            ViewCommand::SetFilter(FilterKey::PurchasePrice, FilterValue::AtLeast(minimum))
        });
        Ok(commands)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FormUiState {
    payload: FormPayload,
    field: usize,
    errors: Vec<String>,
}

impl FormUiState {
    fn new(payload: FormPayload) -> Self {
        Self {
            payload,
            field: 0,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TableLine {
    Record {
        cells: Vec<String>,
        actions: String,
        selected: bool,
    },
    Detail(String),
    Empty,
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    lists: Lists,
    cursor: usize,
    search_input: String,
    filter: FilterUiState,
    form: Option<FormUiState>,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: LoanRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    tracing::info!(
        user = %state.session.user_name,
        role = state.session.role.as_str(),
        "session started"
    );
    ensure_loaded(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Fetched {
                screen,
                generation,
                result,
            } => {
                let outcomes = deliver_fetch(state, runtime, view_data, tx, screen, generation, result);
                apply_outcomes(state, view_data, tx, outcomes);
                clamp_cursor(state, view_data);
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn ensure_loaded<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let screen = state.active_screen;
    if view_data.lists.load_generation(screen) == 0 {
        run_command(state, runtime, view_data, tx, screen, ViewCommand::Load);
    }
}

/// Runs one command against a screen's list and applies what comes back.
fn run_command<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    screen: ScreenKind,
    command: ViewCommand,
) {
    let cursor = view_data.cursor;
    let session = &state.session;
    let lists = &mut view_data.lists;
    let outcomes = match screen {
        ScreenKind::LoanCatalog => run_on(&mut lists.catalog, runtime, session, tx, cursor, command),
        ScreenKind::LoanRequests => {
            run_on(&mut lists.requests, runtime, session, tx, cursor, command)
        }
        ScreenKind::AvailableLoans => {
            run_on(&mut lists.available, runtime, session, tx, cursor, command)
        }
        ScreenKind::AppliedLoans => run_on(&mut lists.applied, runtime, session, tx, cursor, command),
    };
    apply_outcomes(state, view_data, tx, outcomes);
    clamp_cursor(state, view_data);
}

fn run_on<R: RemoteRecord, Rt: LoanRuntime>(
    view: &mut ListView<R>,
    runtime: &mut Rt,
    session: &Session,
    tx: &Sender<InternalEvent>,
    cursor: usize,
    command: ViewCommand,
) -> Vec<Outcome> {
    match list_command(view, cursor, command) {
        Some(command) => drive(view, runtime, session, tx, command),
        None => vec![Outcome::Status("no row selected".to_owned())],
    }
}

fn list_command<R: ListRecord>(
    view: &ListView<R>,
    cursor: usize,
    command: ViewCommand,
) -> Option<ListCommand<R>> {
    let selected = || {
        view.visible_rows()
            .get(cursor)
            .map(|record| record.record_id().clone())
    };
    Some(match command {
        ViewCommand::Load => ListCommand::Load,
        ViewCommand::SetSearch(term) => ListCommand::SetSearch(term),
        ViewCommand::SetFilter(key, value) => ListCommand::SetFilter { key, value },
        ViewCommand::ClearFilter(key) => ListCommand::ClearFilter(key),
        ViewCommand::ClearFilters => ListCommand::ClearFilters,
        ViewCommand::ToggleSort => ListCommand::ToggleSort,
        ViewCommand::ClearSort => ListCommand::SetSort(None),
        ViewCommand::NextPage => ListCommand::NextPage,
        ViewCommand::PrevPage => ListCommand::PrevPage,
        ViewCommand::ToggleExpand => ListCommand::ToggleExpand(selected()?),
        ViewCommand::Action(action) => ListCommand::Action {
            id: selected()?,
            action,
        },
        ViewCommand::CancelDelete => ListCommand::CancelDelete,
        ViewCommand::ConfirmDelete => ListCommand::ConfirmDelete,
        ViewCommand::MutationSucceeded => ListCommand::MutationSucceeded,
    })
}

/// Feeds a command to the engine and services every event it emits until
/// the engine goes quiet. Mutations run synchronously; fetches go through
/// the runtime and come back as [`InternalEvent::Fetched`].
fn drive<R: RemoteRecord, Rt: LoanRuntime>(
    view: &mut ListView<R>,
    runtime: &mut Rt,
    session: &Session,
    tx: &Sender<InternalEvent>,
    command: ListCommand<R>,
) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    let mut queue = VecDeque::from([command]);
    while let Some(command) = queue.pop_front() {
        for event in view.dispatch(command) {
            match event {
                ListEvent::FetchRequested { generation } => {
                    let screen = view.screen();
                    tracing::debug!(screen = screen.label(), generation, "fetch");
                    let scope = R::fetch_scope(screen, session);
                    if let Err(error) = runtime.spawn_fetch(screen, generation, scope, tx.clone()) {
                        queue.push_back(ListCommand::LoadFailed {
                            generation,
                            message: format!("{error:#}"),
                        });
                    }
                }
                ListEvent::LoadFailed { message } => {
                    outcomes.push(Outcome::Status(format!("load failed: {message}")));
                }
                ListEvent::DeletePrompted(_) => outcomes.push(Outcome::ConfirmDelete),
                ListEvent::DeleteCancelled => {
                    outcomes.push(Outcome::Status("delete cancelled".to_owned()));
                }
                ListEvent::UpdateRequested(record) => {
                    match R::push_update(runtime, &record) {
                        Ok(()) => {
                            outcomes.push(Outcome::Status("status updated".to_owned()));
                            queue.push_back(ListCommand::MutationSucceeded);
                        }
                        Err(error) => queue.push_back(ListCommand::MutationFailed {
                            message: format!("{error:#}"),
                        }),
                    }
                }
                ListEvent::DeleteRequested(id) => match R::push_delete(runtime, &id) {
                    Ok(()) => {
                        outcomes.push(Outcome::Status(format!("deleted {id}")));
                        queue.push_back(ListCommand::MutationSucceeded);
                    }
                    Err(error) => queue.push_back(ListCommand::MutationFailed {
                        message: format!("{error:#}"),
                    }),
                },
                ListEvent::EditRequested(record) => {
                    if let Some(payload) = record.form_for(RowAction::Edit) {
                        outcomes.push(Outcome::OpenForm(payload));
                    }
                }
                ListEvent::ApplyRequested(record) => {
                    if let Some(payload) = record.form_for(RowAction::Apply) {
                        outcomes.push(Outcome::OpenForm(payload));
                    }
                }
                ListEvent::ActionUnavailable { action } => {
                    outcomes.push(Outcome::Status(format!(
                        "{} is not available for this row",
                        action.label()
                    )));
                }
                ListEvent::MutationFailed { message } => {
                    outcomes.push(Outcome::Status(format!("request failed: {message}")));
                }
                ListEvent::Refreshed { .. }
                | ListEvent::StaleLoadDiscarded { .. }
                | ListEvent::ViewChanged
                | ListEvent::PageChanged { .. }
                | ListEvent::ExpansionChanged { .. } => {}
            }
        }
    }
    outcomes
}

fn deliver_fetch<R: LoanRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    screen: ScreenKind,
    generation: u64,
    result: Result<Fetched, String>,
) -> Vec<Outcome> {
    let session = &state.session;
    let lists = &mut view_data.lists;
    match screen {
        ScreenKind::LoanCatalog => deliver(&mut lists.catalog, runtime, session, tx, generation, result),
        ScreenKind::LoanRequests => {
            deliver(&mut lists.requests, runtime, session, tx, generation, result)
        }
        ScreenKind::AvailableLoans => {
            deliver(&mut lists.available, runtime, session, tx, generation, result)
        }
        ScreenKind::AppliedLoans => deliver(&mut lists.applied, runtime, session, tx, generation, result),
    }
}

fn deliver<R: RemoteRecord, Rt: LoanRuntime>(
    view: &mut ListView<R>,
    runtime: &mut Rt,
    session: &Session,
    tx: &Sender<InternalEvent>,
    generation: u64,
    result: Result<Fetched, String>,
) -> Vec<Outcome> {
    let command = match result {
        Ok(fetched) => match R::take_fetched(fetched) {
            Some(records) => ListCommand::Loaded {
                generation,
                records,
            },
            None => ListCommand::LoadFailed {
                generation,
                message: format!("unexpected records for {}", view.screen().label()),
            },
        },
        Err(message) => ListCommand::LoadFailed {
            generation,
            message,
        },
    };
    drive(view, runtime, session, tx, command)
}

fn apply_outcomes(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    outcomes: Vec<Outcome>,
) {
    for outcome in outcomes {
        match outcome {
            Outcome::Status(message) => emit_status(state, view_data, tx, message),
            Outcome::OpenForm(payload) => {
                state.dispatch(AppCommand::OpenForm(payload.kind()));
                if state.mode == AppMode::Form(payload.kind()) {
                    view_data.form = Some(FormUiState::new(payload));
                }
            }
            Outcome::ConfirmDelete => {
                state.dispatch(AppCommand::OpenConfirm);
            }
        }
    }
}

fn clamp_cursor(state: &AppState, view_data: &mut ViewData) {
    let len = view_data.lists.visible_len(state.active_screen);
    view_data.cursor = view_data.cursor.min(len.saturating_sub(1));
}

fn handle_key_event<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    match state.mode {
        AppMode::Nav => return handle_nav_key(state, runtime, view_data, internal_tx, key),
        AppMode::Search => handle_search_key(state, runtime, view_data, internal_tx, key),
        AppMode::Filter => handle_filter_key(state, runtime, view_data, internal_tx, key),
        AppMode::Confirm => handle_confirm_key(state, runtime, view_data, internal_tx, key),
        AppMode::Form(_) => handle_form_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_nav_key<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let screen = state.active_screen;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Esc => {
            state.dispatch(AppCommand::ClearStatus);
        }
        KeyCode::Tab | KeyCode::BackTab => {
            let command = if key.code == KeyCode::Tab {
                AppCommand::NextScreen
            } else {
                AppCommand::PrevScreen
            };
            state.dispatch(command);
            view_data.cursor = 0;
            ensure_loaded(state, runtime, view_data, tx);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let len = view_data.lists.visible_len(screen);
            if view_data.cursor + 1 < len {
                view_data.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.cursor = view_data.cursor.saturating_sub(1);
        }
        KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
            run_command(state, runtime, view_data, tx, screen, ViewCommand::NextPage);
            view_data.cursor = 0;
        }
        KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
            run_command(state, runtime, view_data, tx, screen, ViewCommand::PrevPage);
            view_data.cursor = 0;
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            run_command(state, runtime, view_data, tx, screen, ViewCommand::ToggleExpand);
        }
        KeyCode::Char('/') => {
            view_data.search_input = view_data.lists.search_term(screen).to_owned();
            state.dispatch(AppCommand::EnterSearch);
        }
        KeyCode::Char('s') => {
            run_command(state, runtime, view_data, tx, screen, ViewCommand::ToggleSort);
        }
        KeyCode::Char('S') => {
            run_command(state, runtime, view_data, tx, screen, ViewCommand::ClearSort);
        }
        KeyCode::Char('f') => {
            state.dispatch(AppCommand::OpenFilters);
            view_data.filter.error = None;
        }
        KeyCode::Char('c') => {
            view_data.filter = FilterUiState::default();
            run_command(state, runtime, view_data, tx, screen, ViewCommand::ClearFilters);
        }
        KeyCode::Char('r') => {
            run_command(state, runtime, view_data, tx, screen, ViewCommand::Load);
        }
        KeyCode::Char('N') => {
            if screen == ScreenKind::LoanCatalog {
                let payload = FormPayload::NewLoan(Default::default());
                apply_outcomes(state, view_data, tx, vec![Outcome::OpenForm(payload)]);
            } else {
                emit_status(state, view_data, tx, "new loans are added from the loan catalog");
            }
        }
        KeyCode::Char(ch) => {
            if let Some(action) = action_for_key(screen, ch) {
                run_command(state, runtime, view_data, tx, screen, ViewCommand::Action(action));
            }
        }
        _ => {}
    }
    false
}

fn action_for_key(screen: ScreenKind, ch: char) -> Option<RowAction> {
    match ch {
        'a' if screen == ScreenKind::AvailableLoans => Some(RowAction::Apply),
        'a' => Some(RowAction::Approve),
        'x' => Some(RowAction::Reject),
        'e' => Some(RowAction::Edit),
        'd' => Some(RowAction::Delete),
        _ => None,
    }
}

fn handle_search_key<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let screen = state.active_screen;
    match key.code {
        KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Esc => {
            view_data.search_input.clear();
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            view_data.search_input.pop();
        }
        KeyCode::Char(ch) => view_data.search_input.push(ch),
        _ => return,
    }
    view_data.cursor = 0;
    let term = view_data.search_input.clone();
    run_command(state, runtime, view_data, tx, screen, ViewCommand::SetSearch(term));
}

fn handle_filter_key<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let screen = state.active_screen;
    if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) {
        view_data.filter = FilterUiState::default();
        state.dispatch(AppCommand::ExitToNav);
        run_command(state, runtime, view_data, tx, screen, ViewCommand::ClearFilters);
        emit_status(state, view_data, tx, "filters cleared");
        return;
    }

    let field_count = FILTER_FIELDS.len();
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Down | KeyCode::Tab => {
            view_data.filter.field = (view_data.filter.field + 1) % field_count;
        }
        KeyCode::Up | KeyCode::BackTab => {
            view_data.filter.field = (view_data.filter.field + field_count - 1) % field_count;
        }
        KeyCode::Left | KeyCode::Right => {
            let forward = key.code == KeyCode::Right;
            match view_data.filter.field {
                0 => view_data.filter.status = cycle_status(view_data.filter.status, forward),
                1 => {
                    let choices = view_data.lists.requests.distinct_values(application_loan_type);
                    view_data.filter.loan_type =
                        cycle_choice(&choices, &view_data.filter.loan_type, forward);
                }
                _ => {}
            }
        }
        KeyCode::Backspace => {
            if let Some(field) = view_data.filter.text_field_mut() {
                field.pop();
            }
        }
        KeyCode::Char(ch) => {
            if let Some(field) = view_data.filter.text_field_mut() {
                field.push(ch);
            }
        }
        KeyCode::Enter => match view_data.filter.commands() {
            Ok(commands) => {
                view_data.filter.error = None;
                state.dispatch(AppCommand::ExitToNav);
                view_data.cursor = 0;
                for command in commands {
                    run_command(state, runtime, view_data, tx, screen, command);
                }
                emit_status(state, view_data, tx, "filters applied");
            }
            Err(error) => view_data.filter.error = Some(error),
        },
        _ => {}
    }
}

fn cycle_status(current: Option<LoanStatus>, forward: bool) -> Option<LoanStatus> {
    let labels: Vec<String> = LoanStatus::ALL
        .iter()
        .map(|status| status.label().to_owned())
        .collect();
    let next = cycle_choice(&labels, current.map_or("", LoanStatus::label), forward);
    LoanStatus::ALL
        .into_iter()
        .find(|status| status.label() == next)
}

/// Steps through `choices` with an implicit empty "any" slot before the first.
fn cycle_choice(choices: &[String], current: &str, forward: bool) -> String {
    let position = choices.iter().position(|choice| choice == current);
    let len = choices.len() + 1;
    let index = position.map_or(0, |found| found + 1);
    let next = if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    };
    if next == 0 {
        String::new()
    } else {
        choices[next - 1].clone()
    }
}

fn handle_confirm_key<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let screen = state.active_screen;
    let command = match key.code {
        KeyCode::Char('y') | KeyCode::Enter => ViewCommand::ConfirmDelete,
        _ => ViewCommand::CancelDelete,
    };
    state.dispatch(AppCommand::ExitToNav);
    run_command(state, runtime, view_data, tx, screen, command);
}

fn handle_form_key<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    let field_count = form.payload.field_labels().len();
    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, tx, "form cancelled");
        }
        KeyCode::Down | KeyCode::Tab => form.field = (form.field + 1) % field_count,
        KeyCode::Up | KeyCode::BackTab => form.field = (form.field + field_count - 1) % field_count,
        KeyCode::Backspace => {
            if let Some(value) = form.payload.field_mut(form.field) {
                value.pop();
            }
        }
        KeyCode::Char(ch) => {
            if let Some(value) = form.payload.field_mut(form.field) {
                value.push(ch);
            }
        }
        KeyCode::Enter => submit_form(state, runtime, view_data, tx),
        _ => {}
    }
}

fn submit_form<R: LoanRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    let kind = form.payload.kind();
    match submit_payload(runtime, &state.session, &form.payload) {
        Ok(target) => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, tx, kind.success_message());
            run_command(state, runtime, view_data, tx, target, ViewCommand::MutationSucceeded);
        }
        Err(errors) => form.errors = errors,
    }
}

/// Validates and sends a form; returns the screen whose list changed.
fn submit_payload<R: LoanRuntime>(
    runtime: &mut R,
    session: &Session,
    payload: &FormPayload,
) -> Result<ScreenKind, Vec<String>> {
    let remote = |error: anyhow::Error| vec![format!("request failed: {error:#}")];
    match payload {
        FormPayload::NewLoan(input) => {
            let loan = input.validate().map_err(|errors| errors.messages().to_vec())?;
            runtime.create_loan(&loan).map_err(remote)?;
            Ok(ScreenKind::LoanCatalog)
        }
        FormPayload::EditLoan { id, input } => {
            let edited = input.validate().map_err(|errors| errors.messages().to_vec())?;
            let loan = Loan {
                id: id.clone(),
                loan_type: edited.loan_type,
                description: edited.description,
                interest_rate: edited.interest_rate,
                maximum_amount: edited.maximum_amount,
            };
            runtime.update_loan(&loan).map_err(remote)?;
            Ok(ScreenKind::LoanCatalog)
        }
        FormPayload::Apply {
            loan_type, input, ..
        } => {
            let terms = input.validate().map_err(|errors| errors.messages().to_vec())?;
            let application = terms.into_application(session, loan_type, runtime.today());
            runtime.create_application(&application).map_err(remote)?;
            Ok(ScreenKind::AppliedLoans)
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let screens = state.screens();
    let selected = screens
        .iter()
        .position(|screen| *screen == state.active_screen)
        .unwrap_or(0);
    let tabs = Tabs::new(
        screens
            .iter()
            .map(|screen| screen.title().to_owned())
            .collect::<Vec<String>>(),
    )
    .block(
        Block::default()
            .title(format!(
                "loandesk | {} ({})",
                state.session.user_name,
                state.session.role.as_str()
            ))
            .borders(Borders::ALL),
    )
    .style(Style::default().fg(Color::White))
    .highlight_style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .select(selected);
    frame.render_widget(tabs, layout[0]);

    let lists = &view_data.lists;
    let cursor = view_data.cursor;
    match state.active_screen {
        ScreenKind::LoanCatalog => render_list(frame, layout[1], layout[2], &lists.catalog, cursor),
        ScreenKind::LoanRequests => {
            render_list(frame, layout[1], layout[2], &lists.requests, cursor)
        }
        ScreenKind::AvailableLoans => {
            render_list(frame, layout[1], layout[2], &lists.available, cursor)
        }
        ScreenKind::AppliedLoans => render_list(frame, layout[1], layout[2], &lists.applied, cursor),
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_widget, layout[3]);

    match state.mode {
        AppMode::Confirm => {
            let area = centered_rect(44, 24, frame.area());
            frame.render_widget(Clear, area);
            let prompt = Paragraph::new(render_confirm_text()).block(
                Block::default()
                    .title("delete")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
            frame.render_widget(prompt, area);
        }
        AppMode::Form(kind) => {
            if let Some(form) = &view_data.form {
                let area = centered_rect(60, 50, frame.area());
                frame.render_widget(Clear, area);
                let body = Paragraph::new(render_form_text(form))
                    .block(Block::default().title(kind.title()).borders(Borders::ALL));
                frame.render_widget(body, area);
            }
        }
        AppMode::Filter => {
            let area = centered_rect(56, 46, frame.area());
            frame.render_widget(Clear, area);
            let body = Paragraph::new(render_filter_text(&view_data.filter))
                .block(Block::default().title("filters").borders(Borders::ALL));
            frame.render_widget(body, area);
        }
        AppMode::Nav | AppMode::Search => {}
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_list<R: ListRecord>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    pager_area: Rect,
    view: &ListView<R>,
    cursor: usize,
) {
    let spec = view.spec();
    let mut widths: Vec<Constraint> = spec
        .columns
        .iter()
        .map(|column| Constraint::Min(column.width))
        .collect();
    widths.push(Constraint::Min(16));

    let header_style = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let mut header_cells: Vec<Cell> = spec
        .columns
        .iter()
        .map(|column| Cell::from(column.header).style(header_style))
        .collect();
    header_cells.push(Cell::from("Action").style(header_style));

    let rows = table_lines(view, cursor).into_iter().map(|line| match line {
        TableLine::Record {
            cells,
            actions,
            selected,
        } => {
            let style = if selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let mut row_cells: Vec<Cell> = cells.into_iter().map(Cell::from).collect();
            row_cells.push(Cell::from(actions).style(Style::default().fg(Color::Cyan)));
            Row::new(row_cells).style(style)
        }
        TableLine::Detail(text) => Row::new(vec![Cell::from(format!("  {text}"))]).style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ),
        TableLine::Empty => Row::new(vec![Cell::from(NO_RECORDS)])
            .style(Style::default().fg(Color::DarkGray)),
    });

    let table = Table::new(rows, widths)
        .header(Row::new(header_cells))
        .column_spacing(1)
        .block(
            Block::default()
                .title(list_title(view))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);

    frame.render_widget(
        Paragraph::new(pager_text(view)).style(Style::default().fg(Color::White)),
        pager_area,
    );
}

fn table_lines<R: ListRecord>(view: &ListView<R>, cursor: usize) -> Vec<TableLine> {
    let rows = view.visible_rows();
    if rows.is_empty() {
        return vec![TableLine::Empty];
    }

    let spec = view.spec();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (index, record) in rows.into_iter().enumerate() {
        let actions = view
            .row_actions(record)
            .iter()
            .map(|action| action.label())
            .collect::<Vec<_>>()
            .join(" / ");
        lines.push(TableLine::Record {
            cells: spec
                .columns
                .iter()
                .map(|column| (column.cell)(record))
                .collect(),
            actions,
            selected: index == cursor,
        });
        if view.expanded() == Some(record.record_id()) {
            lines.push(TableLine::Detail(view.detail(record)));
        }
    }
    lines
}

fn list_title<R: ListRecord>(view: &ListView<R>) -> String {
    let spec = view.spec();
    let mut title = spec.screen.title().to_owned();
    if let Some(direction) = view.sort() {
        let arrow = match direction {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        };
        title.push_str(&format!(" | {} {arrow}", spec.sort_field.label));
    }
    if !view.search_term().is_empty() {
        title.push_str(&format!(" | search: {}", view.search_term()));
    }
    let filters = view.active_filters().count();
    if filters > 0 {
        title.push_str(&format!(" | filters: {filters}"));
    }
    if view.is_loading() {
        title.push_str(" | loading");
    }
    title
}

fn pager_text<R: ListRecord>(view: &ListView<R>) -> String {
    let prev = if view.has_prev() { "< Prev" } else { "" };
    let next = if view.has_next() { "Next >" } else { "" };
    format!("{prev} | {} | {next}", view.page_label())
}

fn render_confirm_text() -> String {
    format!("{DELETE_PROMPT}\n\n[y] Yes, Delete    [n] Cancel")
}

fn render_form_text(form: &FormUiState) -> String {
    let mut lines = Vec::new();
    if let FormPayload::Apply { loan_type, .. } = &form.payload {
        lines.push(format!("Applying for: {loan_type}"));
        lines.push(String::new());
    }
    for (index, label) in form.payload.field_labels().iter().enumerate() {
        let marker = if index == form.field { ">" } else { " " };
        let value = form.payload.field(index).unwrap_or_default();
        let shown = if value.is_empty() {
            let hint = form.payload.field_hint(index);
            if hint.is_empty() {
                String::new()
            } else {
                format!("({hint})")
            }
        } else {
            value.to_owned()
        };
        lines.push(format!("{marker} {label}: {shown}"));
    }
    if !form.errors.is_empty() {
        lines.push(String::new());
        lines.extend(form.errors.iter().map(|error| format!("! {error}")));
    }
    lines.push(String::new());
    lines.push("enter save | tab/↑↓ field | esc cancel".to_owned());
    lines.join("\n")
}

fn render_filter_text(filter: &FilterUiState) -> String {
    let mut lines = Vec::new();
    for (index, label) in FILTER_FIELDS.iter().enumerate() {
        let marker = if index == filter.field { ">" } else { " " };
        lines.push(format!("{marker} {label}: {}", filter.field_value(index)));
    }
    if let Some(error) = &filter.error {
        lines.push(String::new());
        lines.push(format!("! {error}"));
    }
    lines.push(String::new());
    lines.push("←/→ choose | enter apply | ctrl+l clear | esc close".to_owned());
    lines.join("\n")
}

fn help_overlay_text() -> &'static str {
    "tab/shift+tab  switch screen
j/k            move row
n/p            next / previous page
enter          show details
/              search
s / S          toggle sort / clear sort
f / c          filters / clear filters
r              reload
a / x          approve (apply) / reject
e / d          edit / delete
N              new loan
ctrl+q         quit"
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let mode = mode_label(state.mode);
    let hints = match state.mode {
        AppMode::Nav => "j/k n/p enter / s f r a x e d | ? help | ctrl+q",
        AppMode::Search => "enter keep | esc clear",
        AppMode::Filter => "enter apply | esc close",
        AppMode::Confirm => "y delete | n cancel",
        AppMode::Form(_) => "enter save | esc cancel",
    };
    let mut parts = vec![mode.to_owned()];
    if state.mode == AppMode::Search {
        parts.push(format!("search: {}_", view_data.search_input));
    }
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    parts.push(hints.to_owned());
    parts.join(" | ")
}

fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Nav => "NAV",
        AppMode::Search => "SEARCH",
        AppMode::Filter => "FILTER",
        AppMode::Confirm => "CONFIRM",
        AppMode::Form(_) => "FORM",
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
