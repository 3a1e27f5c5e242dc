// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::list::{
    FilterField, FilterValue, ListColumn, ListRecord, ListSpec, RowAction, SortField, SortValue,
};
use crate::validation::format_date;
use crate::{
    FilterKey, Loan, LoanApplication, LoanApplicationId, LoanId, LoanStatus, ScreenKind,
    format_amount, format_rate,
};

pub const PAGE_SIZE: usize = 5;

impl ListRecord for Loan {
    type Id = LoanId;

    fn record_id(&self) -> &LoanId {
        &self.id
    }
}

impl ListRecord for LoanApplication {
    type Id = LoanApplicationId;

    fn record_id(&self) -> &LoanApplicationId {
        &self.id
    }

    fn with_status(&self, status: LoanStatus) -> Option<Self> {
        Some(LoanApplication::with_status(self, status))
    }
}

pub fn loan_type(loan: &Loan) -> &str {
    &loan.loan_type
}

fn loan_description(loan: &Loan) -> &str {
    &loan.description
}

fn loan_rate(loan: &Loan) -> SortValue {
    SortValue::Number(loan.interest_rate)
}

fn loan_type_cell(loan: &Loan) -> String {
    loan.loan_type.clone()
}

fn loan_description_cell(loan: &Loan) -> String {
    loan.description.clone()
}

fn loan_rate_cell(loan: &Loan) -> String {
    format_rate(loan.interest_rate)
}

fn loan_amount_cell(loan: &Loan) -> String {
    format_amount(loan.maximum_amount)
}

fn loan_detail(loan: &Loan) -> String {
    format!("Description: {}", loan.description)
}

fn catalog_actions(_: &Loan) -> &'static [RowAction] {
    &[RowAction::Edit, RowAction::Delete]
}

fn available_actions(_: &Loan) -> &'static [RowAction] {
    &[RowAction::Apply]
}

pub fn application_loan_type(application: &LoanApplication) -> &str {
    &application.loan_type
}

fn application_user_name(application: &LoanApplication) -> &str {
    &application.user_name
}

fn application_submitted(application: &LoanApplication) -> SortValue {
    SortValue::Date(application.submission_date)
}

fn application_user_cell(application: &LoanApplication) -> String {
    application.user_name.clone()
}

fn application_type_cell(application: &LoanApplication) -> String {
    application.loan_type.clone()
}

fn application_submitted_cell(application: &LoanApplication) -> String {
    format_date(application.submission_date)
}

fn application_income_cell(application: &LoanApplication) -> String {
    format_amount(application.income)
}

fn application_price_cell(application: &LoanApplication) -> String {
    format_amount(application.purchase_price)
}

fn application_model_cell(application: &LoanApplication) -> String {
    format_date(application.model)
}

fn application_status_cell(application: &LoanApplication) -> String {
    application.loan_status.label().to_owned()
}

fn application_detail(application: &LoanApplication) -> String {
    format!("Address: {}", application.address)
}

fn request_actions(application: &LoanApplication) -> &'static [RowAction] {
    match application.loan_status {
        LoanStatus::Pending => &[RowAction::Approve, RowAction::Reject],
        LoanStatus::Approved => &[RowAction::Reject],
        LoanStatus::Rejected => &[RowAction::Approve],
    }
}

fn applied_actions(_: &LoanApplication) -> &'static [RowAction] {
    &[RowAction::Delete]
}

fn status_matches(application: &LoanApplication, value: &FilterValue) -> bool {
    match value {
        FilterValue::Status(status) => application.loan_status == *status,
        _ => true,
    }
}

fn loan_type_matches(application: &LoanApplication, value: &FilterValue) -> bool {
    match value {
        FilterValue::Text(text) => application
            .loan_type
            .to_lowercase()
            .contains(&text.trim().to_lowercase()),
        _ => true,
    }
}

fn model_matches(application: &LoanApplication, value: &FilterValue) -> bool {
    match value {
        FilterValue::DateRange { from, to } => {
            let Some(model) = application.model else {
                return from.is_none() && to.is_none();
            };
            from.is_none_or(|from| model >= from) && to.is_none_or(|to| model <= to)
        }
        _ => true,
    }
}

fn purchase_price_matches(application: &LoanApplication, value: &FilterValue) -> bool {
    match value {
        FilterValue::AtLeast(minimum) => application.purchase_price >= *minimum,
        _ => true,
    }
}

pub static LOAN_CATALOG: ListSpec<Loan> = ListSpec {
    screen: ScreenKind::LoanCatalog,
    page_size: PAGE_SIZE,
    search_fields: &[loan_type, loan_description],
    sort_field: SortField {
        label: "Interest Rate",
        key: loan_rate,
    },
    filters: &[],
    columns: &[
        ListColumn {
            header: "Loan Type",
            width: 24,
            cell: loan_type_cell,
        },
        ListColumn {
            header: "Interest Rate",
            width: 14,
            cell: loan_rate_cell,
        },
        ListColumn {
            header: "Maximum Amount",
            width: 16,
            cell: loan_amount_cell,
        },
    ],
    detail: loan_detail,
    row_actions: catalog_actions,
};

pub static LOAN_REQUESTS: ListSpec<LoanApplication> = ListSpec {
    screen: ScreenKind::LoanRequests,
    page_size: PAGE_SIZE,
    search_fields: &[application_user_name, application_loan_type],
    sort_field: SortField {
        label: "Submission Date",
        key: application_submitted,
    },
    filters: &[
        FilterField {
            key: FilterKey::Status,
            matches: status_matches,
        },
        FilterField {
            key: FilterKey::LoanType,
            matches: loan_type_matches,
        },
        FilterField {
            key: FilterKey::ModelDate,
            matches: model_matches,
        },
        FilterField {
            key: FilterKey::PurchasePrice,
            matches: purchase_price_matches,
        },
    ],
    columns: &[
        ListColumn {
            header: "Username",
            width: 14,
            cell: application_user_cell,
        },
        ListColumn {
            header: "Loan Type",
            width: 18,
            cell: application_type_cell,
        },
        ListColumn {
            header: "Submission Date",
            width: 15,
            cell: application_submitted_cell,
        },
        ListColumn {
            header: "Income",
            width: 12,
            cell: application_income_cell,
        },
        ListColumn {
            header: "Purchase Price",
            width: 14,
            cell: application_price_cell,
        },
        ListColumn {
            header: "Model",
            width: 11,
            cell: application_model_cell,
        },
        ListColumn {
            header: "Status",
            width: 9,
            cell: application_status_cell,
        },
    ],
    detail: application_detail,
    row_actions: request_actions,
};

pub static AVAILABLE_LOANS: ListSpec<Loan> = ListSpec {
    screen: ScreenKind::AvailableLoans,
    page_size: PAGE_SIZE,
    search_fields: &[loan_type, loan_description],
    sort_field: SortField {
        label: "Interest Rate",
        key: loan_rate,
    },
    filters: &[],
    columns: &[
        ListColumn {
            header: "Loan Type",
            width: 20,
            cell: loan_type_cell,
        },
        ListColumn {
            header: "Description",
            width: 36,
            cell: loan_description_cell,
        },
        ListColumn {
            header: "Interest Rate",
            width: 14,
            cell: loan_rate_cell,
        },
        ListColumn {
            header: "Maximum Amount",
            width: 16,
            cell: loan_amount_cell,
        },
    ],
    detail: loan_detail,
    row_actions: available_actions,
};

pub static APPLIED_LOANS: ListSpec<LoanApplication> = ListSpec {
    screen: ScreenKind::AppliedLoans,
    page_size: PAGE_SIZE,
    search_fields: &[application_loan_type],
    sort_field: SortField {
        label: "Submission Date",
        key: application_submitted,
    },
    filters: &[],
    columns: &[
        ListColumn {
            header: "Loan Type",
            width: 20,
            cell: application_type_cell,
        },
        ListColumn {
            header: "Submission Date",
            width: 15,
            cell: application_submitted_cell,
        },
        ListColumn {
            header: "Status",
            width: 10,
            cell: application_status_cell,
        },
    ],
    detail: application_detail,
    row_actions: applied_actions,
};

#[cfg(test)]
mod tests {
    use super::{APPLIED_LOANS, AVAILABLE_LOANS, LOAN_CATALOG, LOAN_REQUESTS};
    use crate::list::{FilterValue, ListCommand, ListEvent, ListView, RowAction};
    use crate::validation::parse_date;
    use crate::{
        FilterKey, Loan, LoanApplication, LoanApplicationId, LoanId, LoanStatus, SortDirection,
        UserId, WireText,
    };

    fn application(n: u32, status: LoanStatus) -> LoanApplication {
        LoanApplication {
            id: LoanApplicationId::new(n.to_string()),
            user_id: UserId::new(format!("u{n}")),
            user_name: format!("User {n}"),
            loan_type: format!("Loan {n}"),
            submission_date: parse_date(&format!("2023-10-0{n}")).ok(),
            income: 50000.0,
            purchase_price: f64::from(n) * 10000.0,
            model: parse_date(&format!("2023-11-0{n}")).ok(),
            address: format!("Address {n}"),
            loan_status: status,
            wire_text: WireText::default(),
        }
    }

    fn load<R: crate::list::ListRecord>(view: &mut ListView<R>, records: Vec<R>) {
        let generation = view.load_generation() + 1;
        view.dispatch(ListCommand::Load);
        view.dispatch(ListCommand::Loaded {
            generation,
            records,
        });
    }

    #[test]
    fn request_actions_follow_status_matrix() {
        let view = ListView::new(&LOAN_REQUESTS);
        assert_eq!(
            view.row_actions(&application(1, LoanStatus::Pending)),
            &[RowAction::Approve, RowAction::Reject]
        );
        assert_eq!(
            view.row_actions(&application(1, LoanStatus::Approved)),
            &[RowAction::Reject]
        );
        assert_eq!(
            view.row_actions(&application(1, LoanStatus::Rejected)),
            &[RowAction::Approve]
        );
    }

    #[test]
    fn reject_carries_every_field_forward() {
        let mut view = ListView::new(&LOAN_REQUESTS);
        let original = application(2, LoanStatus::Approved);
        load(&mut view, vec![original.clone()]);
        let events = view.dispatch(ListCommand::Action {
            id: original.id.clone(),
            action: RowAction::Reject,
        });
        assert_eq!(
            events,
            vec![ListEvent::UpdateRequested(LoanApplication {
                loan_status: LoanStatus::Rejected,
                ..original
            })]
        );
    }

    #[test]
    fn requests_search_user_name_and_sort_by_submission() {
        let mut view = ListView::new(&LOAN_REQUESTS);
        load(
            &mut view,
            (1..=8).map(|n| application(n, LoanStatus::Pending)).collect(),
        );
        view.dispatch(ListCommand::SetSearch("User 3".to_owned()));
        let names: Vec<&str> = view
            .visible_rows()
            .iter()
            .map(|row| row.user_name.as_str())
            .collect();
        assert_eq!(names, vec!["User 3"]);

        view.dispatch(ListCommand::SetSearch(String::new()));
        view.dispatch(ListCommand::SetSort(Some(SortDirection::Desc)));
        assert_eq!(
            view.visible_rows()[0].id,
            LoanApplicationId::new("8")
        );
        assert_eq!(view.detail(view.visible_rows()[0]), "Address: Address 8");
    }

    #[test]
    fn request_filters_narrow_the_list() {
        let mut view = ListView::new(&LOAN_REQUESTS);
        load(
            &mut view,
            vec![
                application(1, LoanStatus::Pending),
                application(2, LoanStatus::Approved),
                application(3, LoanStatus::Rejected),
                application(4, LoanStatus::Approved),
            ],
        );

        view.dispatch(ListCommand::SetFilter {
            key: FilterKey::Status,
            value: FilterValue::Status(LoanStatus::Approved),
        });
        assert_eq!(view.derived_len(), 2);

        view.dispatch(ListCommand::SetFilter {
            key: FilterKey::PurchasePrice,
            value: FilterValue::AtLeast(35000.0),
        });
        assert_eq!(view.derived_len(), 1);

        view.dispatch(ListCommand::ClearFilter(FilterKey::Status));
        view.dispatch(ListCommand::ClearFilter(FilterKey::PurchasePrice));
        view.dispatch(ListCommand::SetFilter {
            key: FilterKey::LoanType,
            value: FilterValue::Text("LOAN 3".to_owned()),
        });
        assert_eq!(view.derived_len(), 1);

        view.dispatch(ListCommand::ClearFilter(FilterKey::LoanType));
        view.dispatch(ListCommand::SetFilter {
            key: FilterKey::ModelDate,
            value: FilterValue::DateRange {
                from: parse_date("2023-11-02").ok(),
                to: parse_date("2023-11-03").ok(),
            },
        });
        assert_eq!(view.derived_len(), 2);
    }

    #[test]
    fn catalog_offers_edit_and_delete_while_browser_offers_apply() {
        let loan = Loan {
            id: LoanId::new("1"),
            loan_type: "Car Loan".to_owned(),
            description: "Low-interest car loan.".to_owned(),
            interest_rate: 5.0,
            maximum_amount: 10000.0,
        };
        let catalog = ListView::new(&LOAN_CATALOG);
        assert_eq!(
            catalog.row_actions(&loan),
            &[RowAction::Edit, RowAction::Delete]
        );
        let available = ListView::new(&AVAILABLE_LOANS);
        assert_eq!(available.row_actions(&loan), &[RowAction::Apply]);
        assert_eq!(available.detail(&loan), "Description: Low-interest car loan.");
    }

    #[test]
    fn applied_loans_only_allow_delete_and_ignore_status_actions() {
        let mut view = ListView::new(&APPLIED_LOANS);
        let record = application(1, LoanStatus::Pending);
        load(&mut view, vec![record.clone()]);
        let events = view.dispatch(ListCommand::Action {
            id: record.id.clone(),
            action: RowAction::Approve,
        });
        assert_eq!(
            events,
            vec![ListEvent::ActionUnavailable {
                action: RowAction::Approve
            }]
        );
        assert!(!view.spec().supports_filter(FilterKey::Status));
    }
}
