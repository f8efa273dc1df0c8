//! Variable resolution
//!
//! Turns field definitions plus the caller's raw input map into the
//! final values the compositor and renderer draw. Pure transformation:
//! no I/O, no clock access (the generation timestamp comes in through
//! [`GenerationContext`]).

use crate::config::RenderConfig;
use crate::schema::{AutoKind, FieldDef, FieldKind, ResolvedField};
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Caller-supplied identity of one generation request
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Pre-allocated certificate identifier (the core never mints one)
    pub certificate_id: String,
    /// Generation timestamp
    pub generated_at: NaiveDateTime,
}

/// Input date formats accepted for reformatting, tried in order
const INPUT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

/// Resolve every field to its final value
///
/// Fields resolve in definition order. After all fields are resolved,
/// every `required` non-image field left empty is reported in a single
/// [`Error::MissingRequiredFields`] so the caller sees the complete
/// list, not just the first offender.
pub fn resolve(
    fields: &[FieldDef],
    inputs: &HashMap<String, String>,
    ctx: &GenerationContext,
    config: &RenderConfig,
) -> Result<Vec<ResolvedField>> {
    let resolved: Vec<ResolvedField> = fields
        .iter()
        .map(|def| ResolvedField {
            def: def.clone(),
            value: resolve_value(def, inputs, ctx, config),
        })
        .collect();

    let missing: Vec<String> = resolved
        .iter()
        .filter(|f| {
            f.def.required && f.def.kind != FieldKind::Image && f.value.is_empty()
        })
        .map(|f| f.def.key.clone())
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingRequiredFields(missing));
    }

    Ok(resolved)
}

fn resolve_value(
    def: &FieldDef,
    inputs: &HashMap<String, String>,
    ctx: &GenerationContext,
    config: &RenderConfig,
) -> String {
    let raw = || inputs.get(&def.key).cloned().unwrap_or_default();

    match def.kind {
        FieldKind::Auto => match def.auto_kind {
            Some(AutoKind::CertificateId) => ctx.certificate_id.clone(),
            // Generation date is the default for auto fields without an
            // explicit auto_type
            Some(AutoKind::GenerationDate) | None => ctx
                .generated_at
                .format(date_format(def, config))
                .to_string(),
        },
        FieldKind::Date => reformat_date(&raw(), date_format(def, config)),
        FieldKind::Text | FieldKind::Select | FieldKind::Image => raw(),
    }
}

fn date_format<'a>(def: &'a FieldDef, config: &'a RenderConfig) -> &'a str {
    def.date_format
        .as_deref()
        .filter(|f| !f.is_empty())
        .unwrap_or(&config.default_date_format)
}

/// Reformat a raw date string, passing it through verbatim when it
/// matches none of the accepted input formats
fn reformat_date(raw: &str, format: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    for input_format in INPUT_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, input_format) {
            return date.format(format).to_string();
        }
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return datetime.format(format).to_string();
    }

    raw.to_string()
}
