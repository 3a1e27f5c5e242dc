// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use loandesk_api::Client;
use loandesk_app::{
    Loan, LoanApplication, LoanApplicationId, LoanId, NewLoan, NewLoanApplication, ScreenKind,
};
use loandesk_db::Store;
use loandesk_tui::{FetchScope, Fetched, InternalEvent, LoanRuntime};
use std::sync::mpsc::Sender;
use std::thread;

/// Talks to the REST service; list fetches run on a worker thread.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn fetch_remote(client: &Client, scope: &FetchScope) -> Result<Fetched> {
    tracing::debug!(?scope, base = client.base_url(), "fetch");
    Ok(match scope {
        FetchScope::Loans => Fetched::Loans(client.list_loans()?),
        FetchScope::Applications => Fetched::Applications(client.list_applications()?),
        FetchScope::ApplicationsFor(user_id) => {
            Fetched::Applications(client.list_applications_for_user(user_id)?)
        }
    })
}

impl LoanRuntime for ApiRuntime {
    fn fetch(&mut self, scope: &FetchScope) -> Result<Fetched> {
        fetch_remote(&self.client, scope)
    }

    fn spawn_fetch(
        &mut self,
        screen: ScreenKind,
        generation: u64,
        scope: FetchScope,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("fetch-{}", screen.label()))
            .spawn(move || {
                let result = fetch_remote(&client, &scope).map_err(|error| format!("{error:#}"));
                let _ = tx.send(InternalEvent::Fetched {
                    screen,
                    generation,
                    result,
                });
            })
            .context("spawn fetch thread")?;
        Ok(())
    }

    fn create_loan(&mut self, loan: &NewLoan) -> Result<()> {
        self.client.create_loan(loan)
    }

    fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        self.client.update_loan(loan)
    }

    fn delete_loan(&mut self, id: &LoanId) -> Result<()> {
        self.client.delete_loan(id)
    }

    fn create_application(&mut self, application: &NewLoanApplication) -> Result<()> {
        self.client.create_application(application)
    }

    fn update_application(&mut self, application: &LoanApplication) -> Result<()> {
        self.client.update_application(application)
    }

    fn delete_application(&mut self, id: &LoanApplicationId) -> Result<()> {
        self.client.delete_application(id)
    }
}

/// Serves the same operations from a local SQLite store.
pub struct StoreRuntime<'a> {
    store: &'a Store,
}

impl<'a> StoreRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl LoanRuntime for StoreRuntime<'_> {
    fn fetch(&mut self, scope: &FetchScope) -> Result<Fetched> {
        tracing::debug!(?scope, "fetch from store");
        Ok(match scope {
            FetchScope::Loans => Fetched::Loans(self.store.list_loans()?),
            FetchScope::Applications => {
                Fetched::Applications(self.store.list_loan_applications()?)
            }
            FetchScope::ApplicationsFor(user_id) => {
                Fetched::Applications(self.store.list_loan_applications_for_user(user_id)?)
            }
        })
    }

    fn create_loan(&mut self, loan: &NewLoan) -> Result<()> {
        let created = self.store.create_loan(loan)?;
        tracing::debug!(id = %created.id, "loan created");
        Ok(())
    }

    fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        self.store.update_loan(loan).map(|_| ())
    }

    fn delete_loan(&mut self, id: &LoanId) -> Result<()> {
        self.store.delete_loan(id)
    }

    fn create_application(&mut self, application: &NewLoanApplication) -> Result<()> {
        let created = self.store.create_loan_application(application)?;
        tracing::debug!(id = %created.id, "loan application created");
        Ok(())
    }

    fn update_application(&mut self, application: &LoanApplication) -> Result<()> {
        self.store.update_loan_application(application).map(|_| ())
    }

    fn delete_application(&mut self, id: &LoanApplicationId) -> Result<()> {
        self.store.delete_loan_application(id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, StoreRuntime};
    use anyhow::Result;
    use loandesk_api::Client;
    use loandesk_app::{LoanStatus, ScreenKind};
    use loandesk_db::{DEMO_USER, Store};
    use loandesk_testkit::{reference_date, sample_new_application, sample_new_loans};
    use loandesk_tui::{FetchScope, Fetched, InternalEvent, LoanRuntime};
    use std::sync::mpsc;
    use std::time::Duration;

    fn seeded_store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.seed_demo_data(reference_date())?;
        Ok(store)
    }

    #[test]
    fn store_runtime_serves_each_scope() -> Result<()> {
        let store = seeded_store()?;
        let user = store.login(DEMO_USER.0, DEMO_USER.1)?;
        let mut runtime = StoreRuntime::new(&store);

        let Fetched::Loans(loans) = runtime.fetch(&FetchScope::Loans)? else {
            panic!("loans scope should return loans");
        };
        assert_eq!(loans.len(), 8);

        let Fetched::Applications(all) = runtime.fetch(&FetchScope::Applications)? else {
            panic!("applications scope should return applications");
        };
        let Fetched::Applications(mine) =
            runtime.fetch(&FetchScope::ApplicationsFor(user.id.clone()))?
        else {
            panic!("user scope should return applications");
        };
        assert_eq!(all.len(), 6);
        assert_eq!(mine.len(), 3);
        Ok(())
    }

    #[test]
    fn store_runtime_mutations_show_up_on_next_fetch() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let mut runtime = StoreRuntime::new(&store);

        runtime.create_loan(&sample_new_loans()[0])?;
        let session = loandesk_testkit::user_session();
        runtime.create_application(&sample_new_application(&session, "Car Loan"))?;

        let applications = store.list_loan_applications()?;
        runtime.update_application(&applications[0].with_status(LoanStatus::Rejected))?;
        assert_eq!(
            store.list_loan_applications()?[0].loan_status,
            LoanStatus::Rejected
        );

        let loan = store.list_loans()?.remove(0);
        runtime.delete_loan(&loan.id)?;
        assert!(store.list_loans()?.is_empty());
        assert!(runtime.delete_loan(&loan.id).is_err());
        Ok(())
    }

    #[test]
    fn default_spawn_fetch_delivers_through_channel() -> Result<()> {
        let store = seeded_store()?;
        let mut runtime = StoreRuntime::new(&store);
        let (tx, rx) = mpsc::channel();

        runtime.spawn_fetch(ScreenKind::LoanCatalog, 4, FetchScope::Loans, tx)?;
        match rx.try_recv()? {
            InternalEvent::Fetched {
                screen,
                generation,
                result,
            } => {
                assert_eq!(screen, ScreenKind::LoanCatalog);
                assert_eq!(generation, 4);
                assert!(matches!(result, Ok(Fetched::Loans(loans)) if loans.len() == 8));
            }
            InternalEvent::ClearStatus { .. } => panic!("expected fetch result"),
        }
        Ok(())
    }

    #[test]
    fn api_runtime_reports_unreachable_server_on_worker() -> Result<()> {
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
        let mut runtime = ApiRuntime::new(client);
        let (tx, rx) = mpsc::channel();

        runtime.spawn_fetch(ScreenKind::LoanRequests, 1, FetchScope::Applications, tx)?;
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::Fetched { result, .. } => {
                let message = result.expect_err("unreachable server should fail");
                assert!(message.contains("cannot reach"));
            }
            InternalEvent::ClearStatus { .. } => panic!("expected fetch result"),
        }
        Ok(())
    }
}
