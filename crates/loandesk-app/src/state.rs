// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, FormKind, Role, ScreenKind, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub session: Session,
    pub mode: AppMode,
    pub active_screen: ScreenKind,
    pub status_line: Option<String>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        let active_screen = ScreenKind::for_role(session.role)[0];
        Self {
            session,
            mode: AppMode::Nav,
            active_screen,
            status_line: None,
        }
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    pub fn screens(&self) -> &'static [ScreenKind] {
        ScreenKind::for_role(self.session.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextScreen,
    PrevScreen,
    ShowScreen(ScreenKind),
    EnterSearch,
    OpenFilters,
    OpenConfirm,
    OpenForm(FormKind),
    ExitToNav,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ScreenChanged(ScreenKind),
    StatusUpdated(String),
    StatusCleared,
    Denied(String),
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::ShowScreen(screen) => {
                if screen.role() != self.session.role {
                    let message = format!(
                        "{} is not available to {}",
                        screen.title(),
                        self.session.role.as_str()
                    );
                    return vec![AppEvent::Denied(message.clone()), self.set_status(&message)];
                }
                self.active_screen = screen;
                self.mode = AppMode::Nav;
                vec![AppEvent::ScreenChanged(screen)]
            }
            AppCommand::EnterSearch => self.change_mode(AppMode::Search),
            AppCommand::OpenFilters => {
                if self.active_screen != ScreenKind::LoanRequests {
                    return vec![self.set_status("no filters on this screen")];
                }
                self.change_mode(AppMode::Filter)
            }
            AppCommand::OpenConfirm => self.change_mode(AppMode::Confirm),
            AppCommand::OpenForm(kind) => {
                let allowed = match kind {
                    FormKind::NewLoan | FormKind::EditLoan => Role::Admin,
                    FormKind::LoanApplication => Role::User,
                };
                if allowed != self.session.role {
                    let message = format!("{} is not available", kind.title());
                    return vec![AppEvent::Denied(message.clone()), self.set_status(&message)];
                }
                self.change_mode(AppMode::Form(kind))
            }
            AppCommand::ExitToNav => self.change_mode(AppMode::Nav),
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn change_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        if self.mode == mode {
            return Vec::new();
        }
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        let screens = self.screens();
        let current = screens
            .iter()
            .position(|screen| *screen == self.active_screen)
            .unwrap_or(0) as isize;
        let len = screens.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_screen = screens[next];
        vec![AppEvent::ScreenChanged(self.active_screen)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::{AppMode, FormKind, Role, ScreenKind, Session, UserId};

    fn session(role: Role) -> Session {
        Session {
            user_id: UserId::new("1"),
            user_name: "tester".to_owned(),
            role,
        }
    }

    #[test]
    fn admin_starts_on_catalog_and_user_on_available_loans() {
        assert_eq!(
            AppState::new(session(Role::Admin)).active_screen,
            ScreenKind::LoanCatalog
        );
        assert_eq!(
            AppState::new(session(Role::User)).active_screen,
            ScreenKind::AvailableLoans
        );
    }

    #[test]
    fn screen_rotation_wraps_within_role() {
        let mut state = AppState::new(session(Role::User));

        let events = state.dispatch(AppCommand::NextScreen);
        assert_eq!(events, vec![AppEvent::ScreenChanged(ScreenKind::AppliedLoans)]);

        state.dispatch(AppCommand::NextScreen);
        assert_eq!(state.active_screen, ScreenKind::AvailableLoans);

        state.dispatch(AppCommand::PrevScreen);
        assert_eq!(state.active_screen, ScreenKind::AppliedLoans);
    }

    #[test]
    fn user_cannot_open_admin_screen() {
        let mut state = AppState::new(session(Role::User));

        let events = state.dispatch(AppCommand::ShowScreen(ScreenKind::LoanRequests));
        assert!(matches!(events.first(), Some(AppEvent::Denied(_))));
        assert_eq!(state.active_screen, ScreenKind::AvailableLoans);
    }

    #[test]
    fn forms_are_gated_by_role() {
        let mut admin = AppState::new(session(Role::Admin));
        admin.dispatch(AppCommand::OpenForm(FormKind::NewLoan));
        assert_eq!(admin.mode, AppMode::Form(FormKind::NewLoan));

        let events = admin.dispatch(AppCommand::OpenForm(FormKind::LoanApplication));
        assert!(matches!(events.first(), Some(AppEvent::Denied(_))));
        assert_eq!(admin.mode, AppMode::Form(FormKind::NewLoan));
    }

    #[test]
    fn filters_only_open_on_request_screen() {
        let mut state = AppState::new(session(Role::Admin));

        state.dispatch(AppCommand::OpenFilters);
        assert_eq!(state.mode, AppMode::Nav);

        state.dispatch(AppCommand::ShowScreen(ScreenKind::LoanRequests));
        let events = state.dispatch(AppCommand::OpenFilters);
        assert_eq!(events, vec![AppEvent::ModeChanged(AppMode::Filter)]);

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn status_line_set_and_cleared() {
        let mut state = AppState::new(session(Role::Admin));

        state.dispatch(AppCommand::SetStatus("Successfully Added!".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("Successfully Added!"));

        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
        assert_eq!(state.status_line, None);
    }
}
