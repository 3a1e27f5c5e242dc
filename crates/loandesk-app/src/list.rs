// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Client-side list engine shared by every screen.
//!
//! A [`ListView`] owns the last fetched collection plus the search, filter,
//! sort, page, expansion and pending-delete state layered over it. All
//! changes go through [`ListView::dispatch`], which returns the events the
//! caller must act on (fetches, mutations, redraws). The engine itself
//! performs no I/O.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use time::Date;

use crate::{FilterKey, LoanStatus, ScreenKind, SortDirection};

pub trait ListRecord: Clone + fmt::Debug + PartialEq + 'static {
    type Id: Clone + Eq + fmt::Debug + fmt::Display;

    fn record_id(&self) -> &Self::Id;

    /// Full replacement record carrying a new status, for records that have one.
    fn with_status(&self, _status: LoanStatus) -> Option<Self> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortValue {
    Number(f64),
    Date(Option<Date>),
}

impl SortValue {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left.total_cmp(right),
            (Self::Date(left), Self::Date(right)) => left.cmp(right),
            (Self::Number(_), Self::Date(_)) => Ordering::Less,
            (Self::Date(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

#[derive(Debug)]
pub struct SortField<R> {
    pub label: &'static str,
    pub key: fn(&R) -> SortValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Status(LoanStatus),
    Text(String),
    AtLeast(f64),
    DateRange {
        from: Option<Date>,
        to: Option<Date>,
    },
}

impl FilterValue {
    /// True when the value constrains nothing and should be dropped.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Status(_) | Self::AtLeast(_) => false,
            Self::Text(text) => text.trim().is_empty(),
            Self::DateRange { from, to } => from.is_none() && to.is_none(),
        }
    }
}

#[derive(Debug)]
pub struct FilterField<R> {
    pub key: FilterKey,
    pub matches: fn(&R, &FilterValue) -> bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Approve,
    Reject,
    Edit,
    Delete,
    Apply,
}

impl RowAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::Reject => "Reject",
            Self::Edit => "Edit",
            Self::Delete => "Delete",
            Self::Apply => "Apply",
        }
    }

    pub const fn target_status(self) -> Option<LoanStatus> {
        match self {
            Self::Approve => Some(LoanStatus::Approved),
            Self::Reject => Some(LoanStatus::Rejected),
            Self::Edit | Self::Delete | Self::Apply => None,
        }
    }
}

#[derive(Debug)]
pub struct ListColumn<R> {
    pub header: &'static str,
    pub width: u16,
    pub cell: fn(&R) -> String,
}

/// Per-screen configuration. Instances live in statics, one per screen.
#[derive(Debug)]
pub struct ListSpec<R: 'static> {
    pub screen: ScreenKind,
    pub page_size: usize,
    pub search_fields: &'static [fn(&R) -> &str],
    pub sort_field: SortField<R>,
    pub filters: &'static [FilterField<R>],
    pub columns: &'static [ListColumn<R>],
    pub detail: fn(&R) -> String,
    pub row_actions: fn(&R) -> &'static [RowAction],
}

impl<R: 'static> ListSpec<R> {
    pub fn supports_filter(&self, key: FilterKey) -> bool {
        self.filters.iter().any(|filter| filter.key == key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListCommand<R: ListRecord> {
    Load,
    Loaded { generation: u64, records: Vec<R> },
    LoadFailed { generation: u64, message: String },
    SetSearch(String),
    SetFilter { key: FilterKey, value: FilterValue },
    ClearFilter(FilterKey),
    /// Drops every field filter and re-fetches; the search term stays.
    ClearFilters,
    SetSort(Option<SortDirection>),
    ToggleSort,
    NextPage,
    PrevPage,
    ToggleExpand(R::Id),
    Action { id: R::Id, action: RowAction },
    CancelDelete,
    ConfirmDelete,
    MutationSucceeded,
    MutationFailed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent<R: ListRecord> {
    FetchRequested { generation: u64 },
    Refreshed { count: usize },
    StaleLoadDiscarded { generation: u64 },
    LoadFailed { message: String },
    ViewChanged,
    PageChanged { page: usize },
    ExpansionChanged { expanded: Option<R::Id> },
    DeletePrompted(R::Id),
    DeleteCancelled,
    UpdateRequested(R),
    DeleteRequested(R::Id),
    EditRequested(R),
    ApplyRequested(R),
    ActionUnavailable { action: RowAction },
    MutationFailed { message: String },
}

#[derive(Debug, Clone)]
pub struct ListView<R: ListRecord> {
    spec: &'static ListSpec<R>,
    source: Vec<R>,
    derived: Vec<usize>,
    search_term: String,
    sort: Option<SortDirection>,
    filters: BTreeMap<FilterKey, FilterValue>,
    page: usize,
    expanded: Option<R::Id>,
    pending_delete: Option<R::Id>,
    load_generation: u64,
    loading: bool,
}

impl<R: ListRecord> ListView<R> {
    pub fn new(spec: &'static ListSpec<R>) -> Self {
        Self {
            spec,
            source: Vec::new(),
            derived: Vec::new(),
            search_term: String::new(),
            sort: None,
            filters: BTreeMap::new(),
            page: 1,
            expanded: None,
            pending_delete: None,
            load_generation: 0,
            loading: false,
        }
    }

    pub fn spec(&self) -> &'static ListSpec<R> {
        self.spec
    }

    pub fn screen(&self) -> ScreenKind {
        self.spec.screen
    }

    pub fn source(&self) -> &[R] {
        &self.source
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort(&self) -> Option<SortDirection> {
        self.sort
    }

    pub fn filter(&self, key: FilterKey) -> Option<&FilterValue> {
        self.filters.get(&key)
    }

    pub fn active_filters(&self) -> impl Iterator<Item = (FilterKey, &FilterValue)> {
        self.filters.iter().map(|(key, value)| (*key, value))
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn expanded(&self) -> Option<&R::Id> {
        self.expanded.as_ref()
    }

    pub fn pending_delete(&self) -> Option<&R::Id> {
        self.pending_delete.as_ref()
    }

    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn derived_len(&self) -> usize {
        self.derived.len()
    }

    /// Records that survive search and filters, in sort order.
    pub fn derived(&self) -> impl Iterator<Item = &R> {
        self.derived.iter().map(|&index| &self.source[index])
    }

    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
    }

    pub fn total_pages(&self) -> usize {
        self.derived.len().div_ceil(self.spec.page_size.max(1)).max(1)
    }

    pub fn visible_rows(&self) -> Vec<&R> {
        let size = self.spec.page_size.max(1);
        let start = (self.page - 1) * size;
        let end = (start + size).min(self.derived.len());
        self.derived
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|&index| &self.source[index])
            .collect()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages())
    }

    pub fn find(&self, id: &R::Id) -> Option<&R> {
        self.source.iter().find(|record| record.record_id() == id)
    }

    pub fn row_actions(&self, record: &R) -> &'static [RowAction] {
        (self.spec.row_actions)(record)
    }

    pub fn detail(&self, record: &R) -> String {
        (self.spec.detail)(record)
    }

    /// Sorted, de-duplicated values of one text field across the whole source.
    pub fn distinct_values(&self, field: fn(&R) -> &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .source
            .iter()
            .map(|record| field(record).trim())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn dispatch(&mut self, command: ListCommand<R>) -> Vec<ListEvent<R>> {
        match command {
            ListCommand::Load => vec![self.request_fetch()],
            ListCommand::Loaded {
                generation,
                records,
            } => self.apply_loaded(generation, records),
            ListCommand::LoadFailed {
                generation,
                message,
            } => self.apply_load_failed(generation, message),
            ListCommand::SetSearch(term) => {
                if term == self.search_term {
                    return Vec::new();
                }
                self.search_term = term;
                self.page = 1;
                self.recompute();
                vec![ListEvent::ViewChanged]
            }
            ListCommand::SetFilter { key, value } => {
                if !self.spec.supports_filter(key) {
                    return Vec::new();
                }
                if value.is_noop() {
                    self.filters.remove(&key);
                } else {
                    self.filters.insert(key, value);
                }
                self.page = 1;
                self.recompute();
                vec![ListEvent::ViewChanged]
            }
            ListCommand::ClearFilter(key) => {
                if self.filters.remove(&key).is_none() {
                    return Vec::new();
                }
                self.page = 1;
                self.recompute();
                vec![ListEvent::ViewChanged]
            }
            ListCommand::ClearFilters => {
                self.filters.clear();
                self.page = 1;
                self.recompute();
                vec![ListEvent::ViewChanged, self.request_fetch()]
            }
            ListCommand::SetSort(direction) => {
                self.sort = direction;
                self.recompute();
                vec![ListEvent::ViewChanged]
            }
            ListCommand::ToggleSort => {
                self.sort = Some(match self.sort {
                    Some(SortDirection::Asc) => SortDirection::Desc,
                    Some(SortDirection::Desc) | None => SortDirection::Asc,
                });
                self.recompute();
                vec![ListEvent::ViewChanged]
            }
            ListCommand::NextPage => self.move_page(self.page + 1),
            ListCommand::PrevPage => self.move_page(self.page.saturating_sub(1)),
            ListCommand::ToggleExpand(id) => {
                if self.find(&id).is_none() {
                    return Vec::new();
                }
                self.expanded = if self.expanded.as_ref() == Some(&id) {
                    None
                } else {
                    Some(id)
                };
                vec![ListEvent::ExpansionChanged {
                    expanded: self.expanded.clone(),
                }]
            }
            ListCommand::Action { id, action } => self.apply_action(id, action),
            ListCommand::CancelDelete => match self.pending_delete.take() {
                Some(_) => vec![ListEvent::DeleteCancelled],
                None => Vec::new(),
            },
            ListCommand::ConfirmDelete => match self.pending_delete.take() {
                Some(id) => vec![ListEvent::DeleteRequested(id)],
                None => Vec::new(),
            },
            ListCommand::MutationSucceeded => vec![self.request_fetch()],
            ListCommand::MutationFailed { message } => {
                tracing::warn!(
                    screen = self.spec.screen.label(),
                    error = %message,
                    "mutation failed; keeping current list"
                );
                vec![ListEvent::MutationFailed { message }]
            }
        }
    }

    fn request_fetch(&mut self) -> ListEvent<R> {
        self.load_generation += 1;
        self.loading = true;
        ListEvent::FetchRequested {
            generation: self.load_generation,
        }
    }

    fn apply_loaded(&mut self, generation: u64, records: Vec<R>) -> Vec<ListEvent<R>> {
        if generation != self.load_generation {
            tracing::debug!(
                screen = self.spec.screen.label(),
                generation,
                current = self.load_generation,
                "discarding stale load"
            );
            return vec![ListEvent::StaleLoadDiscarded { generation }];
        }
        self.loading = false;
        self.source = records;
        if let Some(id) = &self.expanded
            && self.find(id).is_none()
        {
            self.expanded = None;
        }
        if let Some(id) = &self.pending_delete
            && self.find(id).is_none()
        {
            self.pending_delete = None;
        }
        self.recompute();
        vec![ListEvent::Refreshed {
            count: self.source.len(),
        }]
    }

    fn apply_load_failed(&mut self, generation: u64, message: String) -> Vec<ListEvent<R>> {
        if generation != self.load_generation {
            tracing::debug!(
                screen = self.spec.screen.label(),
                generation,
                "discarding stale load failure"
            );
            return vec![ListEvent::StaleLoadDiscarded { generation }];
        }
        self.loading = false;
        tracing::warn!(
            screen = self.spec.screen.label(),
            error = %message,
            "fetch failed; keeping previous list"
        );
        vec![ListEvent::LoadFailed { message }]
    }

    fn apply_action(&mut self, id: R::Id, action: RowAction) -> Vec<ListEvent<R>> {
        let Some(record) = self.find(&id) else {
            return vec![ListEvent::ActionUnavailable { action }];
        };
        if !self.row_actions(record).contains(&action) {
            return vec![ListEvent::ActionUnavailable { action }];
        }
        match action {
            RowAction::Approve | RowAction::Reject => {
                let updated = action
                    .target_status()
                    .and_then(|status| record.with_status(status));
                match updated {
                    Some(updated) => vec![ListEvent::UpdateRequested(updated)],
                    None => vec![ListEvent::ActionUnavailable { action }],
                }
            }
            RowAction::Edit => vec![ListEvent::EditRequested(record.clone())],
            RowAction::Apply => vec![ListEvent::ApplyRequested(record.clone())],
            RowAction::Delete => {
                self.pending_delete = Some(id.clone());
                vec![ListEvent::DeletePrompted(id)]
            }
        }
    }

    fn move_page(&mut self, target: usize) -> Vec<ListEvent<R>> {
        if target < 1 || target > self.total_pages() || target == self.page {
            return Vec::new();
        }
        self.page = target;
        vec![ListEvent::PageChanged { page: target }]
    }

    fn matches(&self, record: &R, needle: &str) -> bool {
        let searched = needle.is_empty()
            || self
                .spec
                .search_fields
                .iter()
                .any(|field| field(record).to_lowercase().contains(needle));
        searched
            && self.filters.iter().all(|(key, value)| {
                self.spec
                    .filters
                    .iter()
                    .find(|filter| filter.key == *key)
                    .is_none_or(|filter| (filter.matches)(record, value))
            })
    }

    fn recompute(&mut self) {
        let needle = self.search_term.to_lowercase();
        let mut derived: Vec<usize> = (0..self.source.len())
            .filter(|&index| self.matches(&self.source[index], &needle))
            .collect();

        if let Some(direction) = self.sort {
            let key = self.spec.sort_field.key;
            let source = &self.source;
            derived.sort_by(|&left, &right| {
                let ordering = key(&source[left]).compare(&key(&source[right]));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        self.derived = derived;
        self.page = self.page.clamp(1, self.total_pages());
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FilterField, FilterValue, ListColumn, ListCommand, ListEvent, ListRecord, ListSpec,
        ListView, RowAction, SortField, SortValue,
    };
    use crate::{FilterKey, LoanStatus, ScreenKind, SortDirection};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        name: String,
        kind: String,
        amount: f64,
        status: LoanStatus,
    }

    impl ListRecord for Row {
        type Id = u32;

        fn record_id(&self) -> &u32 {
            &self.id
        }

        fn with_status(&self, status: LoanStatus) -> Option<Self> {
            Some(Self {
                status,
                ..self.clone()
            })
        }
    }

    fn row_name(row: &Row) -> &str {
        &row.name
    }

    fn row_kind(row: &Row) -> &str {
        &row.kind
    }

    fn row_amount(row: &Row) -> SortValue {
        SortValue::Number(row.amount)
    }

    fn row_status_matches(row: &Row, value: &FilterValue) -> bool {
        match value {
            FilterValue::Status(status) => row.status == *status,
            _ => true,
        }
    }

    fn row_amount_matches(row: &Row, value: &FilterValue) -> bool {
        match value {
            FilterValue::AtLeast(minimum) => row.amount >= *minimum,
            _ => true,
        }
    }

    fn row_cell(row: &Row) -> String {
        row.name.clone()
    }

    fn row_detail(row: &Row) -> String {
        format!("Kind: {}", row.kind)
    }

    fn row_actions(row: &Row) -> &'static [RowAction] {
        match row.status {
            LoanStatus::Pending => &[RowAction::Approve, RowAction::Reject, RowAction::Delete],
            LoanStatus::Approved => &[RowAction::Reject, RowAction::Delete],
            LoanStatus::Rejected => &[RowAction::Approve, RowAction::Delete],
        }
    }

    static ROWS: ListSpec<Row> = ListSpec {
        screen: ScreenKind::LoanRequests,
        page_size: 5,
        search_fields: &[row_name, row_kind],
        sort_field: SortField {
            label: "Amount",
            key: row_amount,
        },
        filters: &[
            FilterField {
                key: FilterKey::Status,
                matches: row_status_matches,
            },
            FilterField {
                key: FilterKey::PurchasePrice,
                matches: row_amount_matches,
            },
        ],
        columns: &[ListColumn {
            header: "Name",
            width: 20,
            cell: row_cell,
        }],
        detail: row_detail,
        row_actions,
    };

    fn rows(count: u32) -> Vec<Row> {
        (1..=count)
            .map(|n| Row {
                id: n,
                name: format!("User {n}"),
                kind: format!("Loan {n}"),
                amount: f64::from(n * 1000),
                status: LoanStatus::Pending,
            })
            .collect()
    }

    fn row_submitted(row: &Row) -> SortValue {
        SortValue::Date(crate::parse_date(&row.kind).ok())
    }

    static DATED: ListSpec<Row> = ListSpec {
        screen: ScreenKind::LoanRequests,
        page_size: 5,
        search_fields: &[row_name],
        sort_field: SortField {
            label: "Submitted",
            key: row_submitted,
        },
        filters: &[],
        columns: &[ListColumn {
            header: "Name",
            width: 20,
            cell: row_cell,
        }],
        detail: row_detail,
        row_actions,
    };

    fn loaded(count: u32) -> ListView<Row> {
        let mut view = ListView::new(&ROWS);
        let generation = match view.dispatch(ListCommand::Load).as_slice() {
            [ListEvent::FetchRequested { generation }] => *generation,
            other => panic!("unexpected events: {other:?}"),
        };
        view.dispatch(ListCommand::Loaded {
            generation,
            records: rows(count),
        });
        view
    }

    fn visible_ids(view: &ListView<Row>) -> Vec<u32> {
        view.visible_rows().iter().map(|row| row.id).collect()
    }

    fn fetch_generation(events: &[ListEvent<Row>]) -> Option<u64> {
        events.iter().find_map(|event| match event {
            ListEvent::FetchRequested { generation } => Some(*generation),
            _ => None,
        })
    }

    #[test]
    fn eight_records_paginate_five_then_three() {
        let mut view = loaded(8);
        assert_eq!(visible_ids(&view), vec![1, 2, 3, 4, 5]);
        assert_eq!(view.page_label(), "Page 1 of 2");
        assert!(!view.has_prev());
        assert!(view.has_next());

        let events = view.dispatch(ListCommand::NextPage);
        assert_eq!(events, vec![ListEvent::PageChanged { page: 2 }]);
        assert_eq!(visible_ids(&view), vec![6, 7, 8]);
        assert!(view.has_prev());
        assert!(!view.has_next());

        assert!(view.dispatch(ListCommand::NextPage).is_empty());
        assert_eq!(view.page(), 2);

        view.dispatch(ListCommand::PrevPage);
        assert_eq!(visible_ids(&view), vec![1, 2, 3, 4, 5]);
        assert!(view.dispatch(ListCommand::PrevPage).is_empty());
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::SetSearch("User 3".to_owned()));
        assert_eq!(visible_ids(&view), vec![3]);

        view.dispatch(ListCommand::SetSearch("loan 7".to_owned()));
        assert_eq!(visible_ids(&view), vec![7]);

        view.dispatch(ListCommand::SetSearch(String::new()));
        assert_eq!(view.derived_len(), 8);
    }

    #[test]
    fn search_is_idempotent() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::SetSearch("USER 1".to_owned()));
        let once: Vec<Row> = view.derived().cloned().collect();
        assert_eq!(once.iter().map(|row| row.id).collect::<Vec<_>>(), vec![1]);

        let twice: Vec<u32> = once
            .iter()
            .filter(|row| view.matches(row, "user 1"))
            .map(|row| row.id)
            .collect();
        assert_eq!(twice, vec![1]);

        let mut fresh = loaded(8);
        fresh.dispatch(ListCommand::SetSearch("USER 1".to_owned()));
        assert_eq!(visible_ids(&fresh), visible_ids(&view));
    }

    #[test]
    fn search_resets_page_but_reload_does_not() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::NextPage);
        assert_eq!(view.page(), 2);

        let generation = fetch_generation(&view.dispatch(ListCommand::Load))
            .expect("load requests a fetch");
        view.dispatch(ListCommand::Loaded {
            generation,
            records: rows(8),
        });
        assert_eq!(view.page(), 2);

        view.dispatch(ListCommand::SetSearch("User".to_owned()));
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn reload_with_fewer_records_clamps_page() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::NextPage);
        let generation = fetch_generation(&view.dispatch(ListCommand::Load))
            .expect("load requests a fetch");
        view.dispatch(ListCommand::Loaded {
            generation,
            records: rows(3),
        });
        assert_eq!(view.page(), 1);
        assert_eq!(view.total_pages(), 1);
    }

    #[test]
    fn empty_source_is_one_empty_page() {
        let view = loaded(0);
        assert!(view.is_empty());
        assert_eq!(view.total_pages(), 1);
        assert_eq!(view.page_label(), "Page 1 of 1");
        assert!(view.visible_rows().is_empty());
        assert!(!view.has_next());
    }

    #[test]
    fn sort_applies_after_filter_and_keeps_length() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::SetSort(Some(SortDirection::Desc)));
        assert_eq!(view.derived_len(), 8);
        assert_eq!(visible_ids(&view), vec![8, 7, 6, 5, 4]);

        view.dispatch(ListCommand::SetFilter {
            key: FilterKey::PurchasePrice,
            value: FilterValue::AtLeast(6000.0),
        });
        assert_eq!(visible_ids(&view), vec![8, 7, 6]);

        view.dispatch(ListCommand::ToggleSort);
        assert_eq!(view.sort(), Some(SortDirection::Asc));
        assert_eq!(visible_ids(&view), vec![6, 7, 8]);

        view.dispatch(ListCommand::SetSort(None));
        assert_eq!(visible_ids(&view), vec![6, 7, 8]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut view = ListView::new(&ROWS);
        let generation = fetch_generation(&view.dispatch(ListCommand::Load))
            .expect("load requests a fetch");
        let mut records = rows(4);
        for record in &mut records {
            record.amount = 10.0;
        }
        view.dispatch(ListCommand::Loaded {
            generation,
            records,
        });
        view.dispatch(ListCommand::SetSort(Some(SortDirection::Asc)));
        assert_eq!(visible_ids(&view), vec![1, 2, 3, 4]);
        view.dispatch(ListCommand::SetSort(Some(SortDirection::Desc)));
        assert_eq!(visible_ids(&view), vec![1, 2, 3, 4]);
    }

    #[test]
    fn search_and_filters_combine_with_and() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::SetFilter {
            key: FilterKey::PurchasePrice,
            value: FilterValue::AtLeast(3000.0),
        });
        view.dispatch(ListCommand::SetSearch("user 2".to_owned()));
        assert!(view.is_empty());

        view.dispatch(ListCommand::ClearFilter(FilterKey::PurchasePrice));
        assert_eq!(visible_ids(&view), vec![2]);
    }

    #[test]
    fn unsupported_filter_is_ignored() {
        let mut view = loaded(8);
        let events = view.dispatch(ListCommand::SetFilter {
            key: FilterKey::ModelDate,
            value: FilterValue::DateRange {
                from: None,
                to: None,
            },
        });
        assert!(events.is_empty());
        assert_eq!(view.derived_len(), 8);
    }

    #[test]
    fn clearing_filters_refetches() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::SetFilter {
            key: FilterKey::Status,
            value: FilterValue::Status(LoanStatus::Approved),
        });
        assert!(view.is_empty());

        let events = view.dispatch(ListCommand::ClearFilters);
        assert!(events.contains(&ListEvent::ViewChanged));
        assert_eq!(fetch_generation(&events), Some(2));
        assert_eq!(view.derived_len(), 8);
        assert!(view.is_loading());
    }

    #[test]
    fn expanding_second_row_collapses_first() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::ToggleExpand(1));
        assert_eq!(view.expanded(), Some(&1));

        let events = view.dispatch(ListCommand::ToggleExpand(2));
        assert_eq!(events, vec![ListEvent::ExpansionChanged { expanded: Some(2) }]);
        assert_eq!(view.expanded(), Some(&2));

        view.dispatch(ListCommand::ToggleExpand(2));
        assert_eq!(view.expanded(), None);
    }

    #[test]
    fn expanding_unknown_row_does_nothing() {
        let mut view = loaded(3);
        assert!(view.dispatch(ListCommand::ToggleExpand(42)).is_empty());
        assert_eq!(view.expanded(), None);
    }

    #[test]
    fn approve_requests_full_record_update_then_refetches() {
        let mut view = loaded(3);
        let pending = view.find(&1).cloned().expect("row 1 exists");
        assert_eq!(
            view.row_actions(&pending),
            &[RowAction::Approve, RowAction::Reject, RowAction::Delete]
        );

        let events = view.dispatch(ListCommand::Action {
            id: 1,
            action: RowAction::Approve,
        });
        let expected = Row {
            status: LoanStatus::Approved,
            ..pending
        };
        assert_eq!(events, vec![ListEvent::UpdateRequested(expected.clone())]);
        assert_eq!(view.find(&1).map(|row| row.status), Some(LoanStatus::Pending));

        let generation = fetch_generation(&view.dispatch(ListCommand::MutationSucceeded))
            .expect("mutation success refetches");
        let mut refreshed = rows(3);
        refreshed[0] = expected;
        view.dispatch(ListCommand::Loaded {
            generation,
            records: refreshed,
        });
        let approved = view.find(&1).cloned().expect("row 1 exists");
        assert_eq!(
            view.row_actions(&approved),
            &[RowAction::Reject, RowAction::Delete]
        );
    }

    #[test]
    fn action_outside_status_matrix_is_unavailable() {
        let mut view = loaded(3);
        let events = view.dispatch(ListCommand::Action {
            id: 1,
            action: RowAction::Edit,
        });
        assert_eq!(
            events,
            vec![ListEvent::ActionUnavailable {
                action: RowAction::Edit
            }]
        );
    }

    #[test]
    fn mutation_failure_skips_refetch() {
        let mut view = loaded(3);
        let generation = view.load_generation();
        let events = view.dispatch(ListCommand::MutationFailed {
            message: "HTTP 500".to_owned(),
        });
        assert_eq!(
            events,
            vec![ListEvent::MutationFailed {
                message: "HTTP 500".to_owned()
            }]
        );
        assert_eq!(view.load_generation(), generation);
    }

    #[test]
    fn delete_needs_explicit_confirmation() {
        let mut view = loaded(3);
        let events = view.dispatch(ListCommand::Action {
            id: 2,
            action: RowAction::Delete,
        });
        assert_eq!(events, vec![ListEvent::DeletePrompted(2)]);
        assert_eq!(view.pending_delete(), Some(&2));

        assert_eq!(
            view.dispatch(ListCommand::CancelDelete),
            vec![ListEvent::DeleteCancelled]
        );
        assert_eq!(view.pending_delete(), None);
        assert!(view.dispatch(ListCommand::ConfirmDelete).is_empty());

        view.dispatch(ListCommand::Action {
            id: 2,
            action: RowAction::Delete,
        });
        assert_eq!(
            view.dispatch(ListCommand::ConfirmDelete),
            vec![ListEvent::DeleteRequested(2)]
        );
        assert_eq!(view.pending_delete(), None);
        assert!(view.dispatch(ListCommand::ConfirmDelete).is_empty());
    }

    #[test]
    fn stale_load_cannot_overwrite_newer_one() {
        let mut view = ListView::new(&ROWS);
        let first = fetch_generation(&view.dispatch(ListCommand::Load)).expect("first fetch");
        let second = fetch_generation(&view.dispatch(ListCommand::Load)).expect("second fetch");
        assert!(second > first);

        view.dispatch(ListCommand::Loaded {
            generation: second,
            records: rows(2),
        });
        let events = view.dispatch(ListCommand::Loaded {
            generation: first,
            records: rows(8),
        });
        assert_eq!(
            events,
            vec![ListEvent::StaleLoadDiscarded { generation: first }]
        );
        assert_eq!(view.source().len(), 2);
        assert!(!view.is_loading());
    }

    #[test]
    fn failed_load_keeps_previous_source() {
        let mut view = loaded(4);
        let generation = fetch_generation(&view.dispatch(ListCommand::Load)).expect("fetch");
        let events = view.dispatch(ListCommand::LoadFailed {
            generation,
            message: "connection refused".to_owned(),
        });
        assert_eq!(
            events,
            vec![ListEvent::LoadFailed {
                message: "connection refused".to_owned()
            }]
        );
        assert_eq!(view.source().len(), 4);
        assert!(!view.is_loading());
    }

    #[test]
    fn reload_drops_expansion_of_vanished_record() {
        let mut view = loaded(8);
        view.dispatch(ListCommand::ToggleExpand(7));
        view.dispatch(ListCommand::Action {
            id: 8,
            action: RowAction::Delete,
        });
        let generation = fetch_generation(&view.dispatch(ListCommand::Load)).expect("fetch");
        view.dispatch(ListCommand::Loaded {
            generation,
            records: rows(5),
        });
        assert_eq!(view.expanded(), None);
        assert_eq!(view.pending_delete(), None);
    }

    #[test]
    fn distinct_values_are_sorted_and_unique() {
        let mut view = ListView::new(&ROWS);
        let generation = fetch_generation(&view.dispatch(ListCommand::Load)).expect("fetch");
        let mut records = rows(3);
        records[2].kind = "Loan 1".to_owned();
        view.dispatch(ListCommand::Loaded {
            generation,
            records,
        });
        assert_eq!(
            view.distinct_values(row_kind),
            vec!["Loan 1".to_owned(), "Loan 2".to_owned()]
        );
    }

    #[test]
    fn stale_load_failure_is_discarded() {
        let mut view = loaded(3);
        let first = fetch_generation(&view.dispatch(ListCommand::Load)).expect("first fetch");
        let second = fetch_generation(&view.dispatch(ListCommand::Load)).expect("second fetch");

        let events = view.dispatch(ListCommand::LoadFailed {
            generation: first,
            message: "timed out".to_owned(),
        });
        assert_eq!(
            events,
            vec![ListEvent::StaleLoadDiscarded { generation: first }]
        );
        assert!(view.is_loading());
        assert_eq!(visible_ids(&view), vec![1, 2, 3]);

        let events = view.dispatch(ListCommand::LoadFailed {
            generation: second,
            message: "timed out".to_owned(),
        });
        assert_eq!(
            events,
            vec![ListEvent::LoadFailed {
                message: "timed out".to_owned()
            }]
        );
        assert!(!view.is_loading());
        assert_eq!(visible_ids(&view), vec![1, 2, 3]);
    }

    #[test]
    fn missing_dates_sort_first_ascending_and_last_descending() {
        let mut view = ListView::new(&DATED);
        let generation = fetch_generation(&view.dispatch(ListCommand::Load)).expect("fetch");
        let records = [(1, "2023-10-03"), (2, ""), (3, "2023-10-01")]
            .into_iter()
            .map(|(id, submitted)| Row {
                id,
                name: format!("User {id}"),
                kind: submitted.to_owned(),
                amount: 0.0,
                status: LoanStatus::Pending,
            })
            .collect();
        view.dispatch(ListCommand::Loaded {
            generation,
            records,
        });

        view.dispatch(ListCommand::SetSort(Some(SortDirection::Asc)));
        assert_eq!(visible_ids(&view), vec![2, 3, 1]);
        view.dispatch(ListCommand::SetSort(Some(SortDirection::Desc)));
        assert_eq!(visible_ids(&view), vec![1, 3, 2]);
    }
}
