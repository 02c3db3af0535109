use std::io::{self, Write};

use anyhow::{Context, Result};
use cemes_core::api::{ListFilter, Resource, ResourceService};
use cemes_core::auth::SessionManager;
use cemes_core::models::{Admin, Customer, Loan, Payment};
use cemes_core::navigation::{GuardDecision, LoginFlow, PendingDestination};
use cemes_core::{Config, Location, Route, RouteGuard};
use serde_json::Value;
use tracing::warn;

use crate::cli::{ListArgs, ResourceAction};

/// Env var read before prompting for a password
const PASSWORD_ENV: &str = "CEMES_PASSWORD";

pub async fn login(
    manager: &SessionManager,
    config: &mut Config,
    email: Option<String>,
    next: Option<String>,
) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt_email()?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    let pending = next.map(|next| PendingDestination::new(Location::new(next)));
    eprintln!("Authenticating...");

    let target = match LoginFlow::new(pending).submit(manager, &email, &password).await {
        Ok(target) => target,
        Err((e, _)) => anyhow::bail!(e.user_message()),
    };

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    let name = manager
        .user()
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| "admin".to_string());
    println!("Logged in as {}", name);

    if let Some(route) = target.route() {
        render(manager, route).await?;
    }
    Ok(())
}

pub fn status(manager: &SessionManager) {
    let session = manager.session();
    if !session.is_authenticated() {
        println!("Not logged in");
        return;
    }
    match session.user {
        Some(user) => {
            println!("Logged in as {}", user.display_name());
            if let Some(email) = user.email {
                println!("  email: {}", email);
            }
            if let Some(role) = user.role {
                println!("  role:  {}", role);
            }
        }
        None => println!("Logged in"),
    }
}

pub async fn visit(manager: &SessionManager, path: &str) -> Result<()> {
    let guard = RouteGuard::new();
    let navigator = manager.api().navigator().clone();
    let (route, pending) = guard.resolve(&Location::new(path), manager, navigator.as_ref());

    if route == Route::Login {
        let next = PendingDestination::resume_target(pending.as_ref());
        println!("Log in to continue: cemes login --next '{}'", next);
        return Ok(());
    }
    render(manager, route).await
}

/// Fail with a login hint unless the guard lets the session reach `route`
pub fn require_access(manager: &SessionManager, route: Route) -> Result<()> {
    if let GuardDecision::Redirect { pending, .. } =
        RouteGuard::new().check(&route.location(), manager.is_authenticated())
    {
        let next = PendingDestination::resume_target(pending.as_ref());
        anyhow::bail!("Not logged in. Run: cemes login --next '{}'", next);
    }
    Ok(())
}

/// Run a resource command if the guard lets the session reach `route`
pub async fn resource_command<R>(
    manager: &SessionManager,
    route: Route,
    action: ResourceAction,
) -> Result<()>
where
    R: Resource,
{
    require_access(manager, route)?;

    let service: ResourceService<'_, R> = manager.api().resource();
    match action {
        ResourceAction::List(args) => {
            let filter = ListFilter::from(args);
            print_json(&service.list_filtered(&filter).await?)?
        }
        ResourceAction::Get { id } => print_json(&service.get(id).await?)?,
        ResourceAction::Create { json } => {
            let item: R = parse_item(&json)?;
            match service.create(&item).await? {
                Some(created) => {
                    eprintln!("Created {} {}", R::NAME, describe_id(created.id()));
                    print_json(&created)?;
                }
                None => eprintln!("Created {}", R::NAME),
            }
        }
        ResourceAction::Update { id, json } => {
            let item: R = parse_item(&json)?;
            match service.update(id, &item).await? {
                Some(updated) => print_json(&updated)?,
                None => eprintln!("Updated {} {}", R::NAME, id),
            }
        }
        ResourceAction::Delete { id } => {
            service.delete(id).await?;
            eprintln!("Deleted {} {}", R::NAME, id);
        }
    }
    Ok(())
}

pub async fn summary(manager: &SessionManager) -> Result<()> {
    let api = manager.api();
    let (loans_svc, customers_svc, payments_svc) = (api.loans(), api.customers(), api.payments());
    let (loans, customers, payments) = futures::try_join!(
        loans_svc.list(),
        customers_svc.list(),
        payments_svc.list(),
    )?;

    let summary = Summary::from_records(&loans, customers.len(), &payments);
    println!(
        "Loans:      {} ({:.2} disbursed, {} active)",
        summary.loans, summary.loan_total, summary.active_loans
    );
    println!("Customers:  {}", summary.customers);
    println!("Payments:   {} ({:.2} collected)", summary.payments, summary.payment_total);
    println!("Outstanding: {:.2}", summary.outstanding());
    println!("Collection: {:.1}%", summary.collection_rate());
    println!("Risk:       {:.1}%", summary.risk_rate());
    Ok(())
}

fn list_all() -> ResourceAction {
    ResourceAction::List(ListArgs::default())
}

async fn render(manager: &SessionManager, route: Route) -> Result<()> {
    match route {
        Route::Dashboard => summary(manager).await,
        Route::Loans => resource_command::<Loan>(manager, route, list_all()).await,
        Route::Customers => resource_command::<Customer>(manager, route, list_all()).await,
        Route::Payments => resource_command::<Payment>(manager, route, list_all()).await,
        Route::Admin => resource_command::<Admin>(manager, route, list_all()).await,
        Route::Login => {
            println!("Run `cemes login` to sign in");
            Ok(())
        }
    }
}

#[derive(Debug, PartialEq)]
struct Summary {
    loans: usize,
    active_loans: usize,
    loan_total: f64,
    customers: usize,
    payments: usize,
    payment_total: f64,
}

impl Summary {
    fn from_records(loans: &[Loan], customers: usize, payments: &[Payment]) -> Self {
        Self {
            loans: loans.len(),
            active_loans: loans.iter().filter(|l| l.has_status("active")).count(),
            loan_total: loans.iter().map(|l| l.amount).sum(),
            customers,
            payments: payments.len(),
            payment_total: payments.iter().map(|p| p.amount).sum(),
        }
    }

    /// Disbursed but not yet collected
    fn outstanding(&self) -> f64 {
        self.loan_total - self.payment_total
    }

    /// Percentage of the disbursed total collected; 0 with nothing disbursed
    fn collection_rate(&self) -> f64 {
        if self.loan_total == 0.0 {
            return 0.0;
        }
        self.payment_total / self.loan_total * 100.0
    }

    /// Percentage of the disbursed total still outstanding
    fn risk_rate(&self) -> f64 {
        if self.loan_total == 0.0 {
            return 0.0;
        }
        self.outstanding() / self.loan_total * 100.0
    }
}

fn describe_id(id: Option<i64>) -> String {
    id.map(|id| format!("#{}", id))
        .unwrap_or_else(|| "(no id returned)".to_string())
}

/// Parse a record from inline JSON or `@path`
fn parse_item<R: Resource>(input: &str) -> Result<R> {
    let raw = match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?,
        None => input.to_string(),
    };
    let value: Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;
    serde_json::from_value(value).with_context(|| format!("Input is not a valid {}", R::NAME))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn prompt_email() -> Result<String> {
    print!("Email: ");
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    Ok(email.trim().to_string())
}
