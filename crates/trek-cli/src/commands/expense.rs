use trek_core::alerts::Action;
use trek_core::currency::format_amount;
use trek_core::models::ExpensePatch;
use trek_core::{Entity, EntityKind, Expense};

use crate::cli::ExpenseCommands;
use crate::commands::common::{
    format_relative_time, join_words, last_touched, parse_id, print_records, sync_marker, Session,
};
use crate::error::CliError;

pub async fn run_expense(session: &Session, command: ExpenseCommands) -> Result<(), CliError> {
    let alert = |action: Action| {
        move |error: trek_core::Error| session.alert(action, EntityKind::Expense, &error)
    };

    match command {
        ExpenseCommands::Add {
            category,
            trip,
            amount,
            description,
            currency,
        } => {
            let currency = match currency {
                Some(code) => code,
                None => session.base_currency().await?,
            };
            let mut expense = Expense::new(
                parse_id(&category)?,
                join_words(&description)?,
                amount,
                currency,
            );
            if let Some(trip) = trip {
                expense = expense.with_travel_id(parse_id(&trip)?);
            }

            let expense = session
                .expense_manager()
                .await?
                .handle_add(expense)
                .await
                .map_err(alert(Action::Save))?;
            println!("{}", expense.id());
            if let Some(reason) = &expense.conversion_error {
                eprintln!(
                    "Saved as {} without conversion: {reason}",
                    format_amount(expense.amount, &expense.currency)
                );
            }
        }
        ExpenseCommands::List { category } => {
            let mut manager = session.expense_manager().await?;
            if let Some(category) = category {
                manager = manager.with_parent(parse_id(&category)?);
            }
            let expenses = manager.load_data().await.map_err(alert(Action::Load))?;
            print_records(&expenses, session.json, format_expense_line)?;
        }
        ExpenseCommands::Update {
            id,
            description,
            amount,
            currency,
        } => {
            let patch = ExpensePatch {
                description,
                amount,
                currency,
            };
            if patch == ExpensePatch::default() {
                return Err(CliError::EmptyUpdate);
            }
            let id = parse_id(&id)?;
            let manager = session.expense_manager().await?;
            manager.load_data().await.map_err(alert(Action::Load))?;
            let expense = manager
                .handle_update(&id, &patch)
                .await
                .map_err(alert(Action::Update))?;
            println!("{}", expense.id());
        }
        ExpenseCommands::Delete { id } => {
            let id = parse_id(&id)?;
            session
                .expense_manager()
                .await?
                .handle_delete(&id)
                .await
                .map_err(alert(Action::Delete))?;
            println!("{id}");
        }
    }

    Ok(())
}

pub fn format_expense_line(expense: &Expense, now_ms: i64) -> String {
    let amount = format_amount(expense.amount, &expense.currency);
    let original = match (expense.original_amount, expense.original_currency.as_deref()) {
        (Some(original), Some(code)) => format!("  (from {})", format_amount(original, code)),
        _ => String::new(),
    };
    format!(
        "{:<28}  {:<30}  {:>14}  {:<6}  {}{original}",
        expense.id(),
        expense.description,
        amount,
        sync_marker(expense.sync_state()),
        format_relative_time(last_touched(expense), now_ms)
    )
}
