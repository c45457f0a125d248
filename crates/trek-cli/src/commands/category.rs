use trek_core::alerts::Action;
use trek_core::models::CategoryPatch;
use trek_core::{Category, Entity, EntityKind};

use crate::cli::CategoryCommands;
use crate::commands::common::{
    join_words, normalize_text, parse_id, print_records, sync_marker, Session,
};
use crate::error::CliError;

pub async fn run_category(session: &Session, command: CategoryCommands) -> Result<(), CliError> {
    let alert = |action: Action| {
        move |error: trek_core::Error| session.alert(action, EntityKind::Category, &error)
    };

    match command {
        CategoryCommands::Add { trip, name, color } => {
            let trip_id = parse_id(&trip)?;
            let mut category = Category::new(trip_id.clone(), join_words(&name)?);
            if let Some(color) = color.as_deref().and_then(normalize_text) {
                category = category.with_color(color);
            }
            let category = session
                .manager::<Category>()
                .with_parent(trip_id)
                .handle_add(category)
                .await
                .map_err(alert(Action::Save))?;
            println!("{}", category.id());
        }
        CategoryCommands::List { trip } => {
            let categories = session
                .manager::<Category>()
                .with_parent(parse_id(&trip)?)
                .load_data()
                .await
                .map_err(alert(Action::Load))?;
            print_records(&categories, session.json, |category, _| {
                format_category_line(category)
            })?;
        }
        CategoryCommands::Update { id, name, color } => {
            let patch = CategoryPatch { name, color };
            if patch == CategoryPatch::default() {
                return Err(CliError::EmptyUpdate);
            }
            let id = parse_id(&id)?;
            let manager = session.manager::<Category>();
            manager.load_data().await.map_err(alert(Action::Load))?;
            let category = manager
                .handle_update(&id, &patch)
                .await
                .map_err(alert(Action::Update))?;
            println!("{}", category.id());
        }
        CategoryCommands::Delete { id } => {
            let id = parse_id(&id)?;
            session
                .manager::<Category>()
                .handle_delete(&id)
                .await
                .map_err(alert(Action::Delete))?;
            println!("{id}");
        }
    }

    Ok(())
}

pub fn format_category_line(category: &Category) -> String {
    let color = category.color.as_deref().unwrap_or("-");
    format!(
        "{:<28}  {:<24}  {:<9}  {}",
        category.id(),
        category.name,
        color,
        sync_marker(category.sync_state())
    )
}
