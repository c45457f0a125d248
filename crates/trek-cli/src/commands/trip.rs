use trek_core::alerts::Action;
use trek_core::models::TripPatch;
use trek_core::{Entity, EntityKind, Trip};

use crate::cli::TripCommands;
use crate::commands::common::{
    format_relative_time, join_words, last_touched, normalize_text, parse_id, print_records,
    sync_marker, Session,
};
use crate::error::CliError;

pub async fn run_trip(session: &Session, command: TripCommands) -> Result<(), CliError> {
    let manager = session.manager::<Trip>();
    let alert = |action: Action| {
        move |error: trek_core::Error| session.alert(action, EntityKind::Trip, &error)
    };

    match command {
        TripCommands::Add { name, color } => {
            let mut trip = Trip::new(join_words(&name)?);
            if let Some(color) = color.as_deref().and_then(normalize_text) {
                trip = trip.with_color(color);
            }
            let trip = manager.handle_add(trip).await.map_err(alert(Action::Save))?;
            println!("{}", trip.id());
        }
        TripCommands::List => {
            let trips = manager.load_data().await.map_err(alert(Action::Load))?;
            print_records(&trips, session.json, format_trip_line)?;
        }
        TripCommands::Update { id, name, color } => {
            let patch = TripPatch { name, color };
            if patch == TripPatch::default() {
                return Err(CliError::EmptyUpdate);
            }
            let id = parse_id(&id)?;
            manager.load_data().await.map_err(alert(Action::Load))?;
            let trip = manager
                .handle_update(&id, &patch)
                .await
                .map_err(alert(Action::Update))?;
            println!("{}", trip.id());
        }
        TripCommands::Delete { id } => {
            let id = parse_id(&id)?;
            manager
                .handle_delete(&id)
                .await
                .map_err(alert(Action::Delete))?;
            println!("{id}");
        }
    }

    Ok(())
}

pub fn format_trip_line(trip: &Trip, now_ms: i64) -> String {
    format!(
        "{:<28}  {:<30}  {:<6}  {}",
        trip.id(),
        trip.name,
        sync_marker(trip.sync_state()),
        format_relative_time(last_touched(trip), now_ms)
    )
}
