use serde::Serialize;
use trek_core::currency::{format_amount, normalize_code};

use crate::commands::common::{print_json, Session};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ConversionOutput {
    from: String,
    to: String,
    amount: f64,
    converted: f64,
    source: String,
}

pub async fn run_convert(
    session: &Session,
    from: &str,
    to: &str,
    amount: f64,
) -> Result<(), CliError> {
    let converter = session.converter()?;
    let conversion = converter
        .try_convert(from, to, amount, session.is_online())
        .await?;

    if session.json {
        return print_json(&ConversionOutput {
            from: normalize_code(from),
            to: normalize_code(to),
            amount,
            converted: conversion.amount,
            source: conversion.source.to_string(),
        });
    }

    println!(
        "{} = {}  ({})",
        format_amount(amount, from),
        format_amount(conversion.amount, to),
        conversion.source
    );
    Ok(())
}
