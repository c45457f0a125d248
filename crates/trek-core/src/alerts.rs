//! User-facing alert texts in English and Spanish.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::models::EntityKind;
use crate::services::SyncReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            other => Err(Error::Validation(format!("unsupported locale '{other}'"))),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::En => "en",
            Self::Es => "es",
        })
    }
}

/// What the user was trying to do when something failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    Save,
    Update,
    Delete,
    Sync,
}

/// Title and message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAlert {
    pub title: String,
    pub message: String,
}

/// Spanish renderings of the validation messages raised by the models.
const VALIDATION_ES: &[(&str, &str)] = &[
    ("Trip name is required", "El nombre del viaje es requerido"),
    (
        "Category name is required",
        "El nombre de la categoría es requerido",
    ),
    ("Expense description is required", "La descripción es requerida"),
    ("Invalid expense amount", "Monto inválido"),
    ("Expense amount must be a number", "Monto inválido"),
    ("Expense currency is required", "La moneda es requerida"),
];

const fn noun_es(kind: EntityKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        EntityKind::Trip => ("el", "viaje", "viajes"),
        EntityKind::Category => ("la", "categoría", "categorías"),
        EntityKind::Expense => ("el", "gasto", "gastos"),
    }
}

const fn plural_en(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Trip => "trips",
        EntityKind::Category => "categories",
        EntityKind::Expense => "expenses",
    }
}

impl UserAlert {
    fn error(message: String) -> Self {
        Self {
            title: "Error".to_string(),
            message,
        }
    }

    /// Alert for a failed operation on one entity kind.
    #[must_use]
    pub fn from_error(action: Action, kind: EntityKind, error: &Error, locale: Locale) -> Self {
        let message = match (error, locale) {
            (Error::Validation(message), Locale::En) => message.clone(),
            (Error::Validation(message), Locale::Es) => VALIDATION_ES
                .iter()
                .find(|(en, _)| en == message)
                .map_or_else(
                    || format!("Datos inválidos: {message}"),
                    |(_, es)| (*es).to_string(),
                ),
            (Error::Busy, Locale::En) => "Another operation is still in progress".to_string(),
            (Error::Busy, Locale::Es) => "Hay otra operación en curso".to_string(),
            (Error::SyncInProgress(_), Locale::En) => "A sync is already running".to_string(),
            (Error::SyncInProgress(_), Locale::Es) => {
                "Ya hay una sincronización en curso".to_string()
            }
            (Error::NotFound(_), Locale::En) => format!("The {kind} no longer exists"),
            (Error::NotFound(_), Locale::Es) => {
                let (article, noun, _) = noun_es(kind);
                format!("No se encontró {article} {noun}")
            }
            (_, Locale::En) => failure_en(action, kind),
            (_, Locale::Es) => failure_es(action, kind),
        };
        Self::error(message)
    }

    /// Single alert summarizing a sync run.
    #[must_use]
    pub fn sync_summary(report: &SyncReport, locale: Locale) -> Self {
        let failed = report.failures().count();
        match (failed, locale) {
            (0, Locale::En) => Self {
                title: "Success".to_string(),
                message: format!("Everything is synced ({} changes pushed)", report.pushed()),
            },
            (0, Locale::Es) => Self {
                title: "Éxito".to_string(),
                message: format!(
                    "Sincronizado correctamente ({} cambios enviados)",
                    report.pushed()
                ),
            },
            (_, Locale::En) => Self::error(format!(
                "{failed} sync steps failed; pending changes will be retried"
            )),
            (_, Locale::Es) => Self::error(format!(
                "Fallaron {failed} pasos de la sincronización; \
                 los cambios pendientes se reintentarán"
            )),
        }
    }
}

fn failure_en(action: Action, kind: EntityKind) -> String {
    match action {
        Action::Load => format!("Could not load the {}", plural_en(kind)),
        Action::Save => format!("Could not save the {kind}"),
        Action::Update => format!("Could not update the {kind}"),
        Action::Delete => format!("Could not delete the {kind}"),
        Action::Sync => format!("Could not sync the {}", plural_en(kind)),
    }
}

fn failure_es(action: Action, kind: EntityKind) -> String {
    let (article, noun, plural) = noun_es(kind);
    let plural_article = if article == "la" { "las" } else { "los" };
    match action {
        Action::Load => format!("No se pudieron cargar {plural_article} {plural}"),
        Action::Save => format!("No se pudo guardar {article} {noun}"),
        Action::Update => format!("No se pudo actualizar {article} {noun}"),
        Action::Delete => format!("No se pudo eliminar {article} {noun}"),
        Action::Sync => format!("No se pudieron sincronizar {plural_article} {plural}"),
    }
}
