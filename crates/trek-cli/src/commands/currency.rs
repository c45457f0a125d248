use serde::Serialize;
use trek_core::alerts::Locale;
use trek_core::currency::{catalog, Currency};

use crate::cli::CurrencyCommands;
use crate::commands::common::{print_json, Session};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct CurrencyItem {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub base: bool,
}

pub async fn run_currency(session: &Session, command: CurrencyCommands) -> Result<(), CliError> {
    match command {
        CurrencyCommands::Show => println!("{}", session.base_currency().await?),
        CurrencyCommands::Set { code } => {
            let code = session
                .preferences()
                .set_base_currency(&session.user, &code)
                .await?;
            println!("{code}");
        }
        CurrencyCommands::List => {
            let base = session.base_currency().await?;
            let items = catalog::ordered_for_picker()
                .map(|currency| currency_item(currency, &base, session.locale))
                .collect::<Vec<_>>();
            if session.json {
                print_json(&items)?;
            } else {
                for item in &items {
                    println!("{}", format_currency_line(item));
                }
            }
        }
    }
    Ok(())
}

pub fn currency_item(currency: &Currency, base: &str, locale: Locale) -> CurrencyItem {
    CurrencyItem {
        code: currency.code,
        name: currency.display_name(locale),
        symbol: currency.symbol,
        base: currency.code == base,
    }
}

pub fn format_currency_line(item: &CurrencyItem) -> String {
    let marker = if item.base { "*" } else { " " };
    format!("{marker} {}  {:<4}  {}", item.code, item.symbol, item.name)
}
