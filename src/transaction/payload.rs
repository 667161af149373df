//! Parsing and validating transaction request bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};

use crate::{Error, FieldError, TransactionType};

use super::core::{Transaction, TransactionBuilder, TransactionChanges};

const DESCRIPTION_REQUIRED: &str = "Description is required";
const AMOUNT_INVALID: &str = "Amount must be a positive number";
const TYPE_INVALID: &str = "Type must be one of: INCOME, EXPENSE";
const DATE_INVALID: &str = "Date must be a valid ISO 8601 date (YYYY-MM-DD)";

/// The JSON body for creating or updating a transaction.
///
/// Every field is optional here so that all problems with a request can be
/// reported at once. `amount` accepts a number or a numeric string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub description: Option<String>,
    pub amount: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub date: Option<String>,
}

impl TransactionPayload {
    /// Validate the payload for creating a transaction.
    ///
    /// `description`, `amount` and `type` are required, `date` is optional.
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every invalid or missing field.
    pub fn into_builder(self) -> Result<TransactionBuilder, Error> {
        let mut errors = Vec::new();

        let description = match self.description {
            Some(description) => parse_description(&description, &mut errors),
            None => {
                errors.push(FieldError::new("description", DESCRIPTION_REQUIRED));
                None
            }
        };
        let amount = match &self.amount {
            Some(amount) => parse_amount(amount, &mut errors),
            None => {
                errors.push(FieldError::new("amount", AMOUNT_INVALID));
                None
            }
        };
        let kind = match self.kind {
            Some(kind) => parse_kind(&kind, &mut errors),
            None => {
                errors.push(FieldError::new("type", TYPE_INVALID));
                None
            }
        };
        let date = self
            .date
            .and_then(|date| parse_date_field(&date, &mut errors));

        match (description, amount, kind) {
            (Some(description), Some(amount), Some(kind)) if errors.is_empty() => {
                let builder = Transaction::build(&description, amount, kind);

                Ok(match date {
                    Some(date) => builder.date(date),
                    None => builder,
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }

    /// Validate the payload for updating a transaction.
    ///
    /// Absent fields are left out of the changes, supplied fields follow the same rules as
    /// [TransactionPayload::into_builder].
    ///
    /// # Errors
    /// Returns an [Error::Validation] listing every invalid field.
    pub fn into_changes(self) -> Result<TransactionChanges, Error> {
        let mut errors = Vec::new();

        let changes = TransactionChanges {
            description: self
                .description
                .and_then(|description| parse_description(&description, &mut errors)),
            amount: self
                .amount
                .and_then(|amount| parse_amount(&amount, &mut errors)),
            kind: self.kind.and_then(|kind| parse_kind(&kind, &mut errors)),
            date: self
                .date
                .and_then(|date| parse_date_field(&date, &mut errors)),
        };

        if errors.is_empty() {
            Ok(changes)
        } else {
            Err(Error::Validation(errors))
        }
    }
}

fn parse_description(description: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let description = description.trim();

    if description.is_empty() {
        errors.push(FieldError::new("description", DESCRIPTION_REQUIRED));
        None
    } else {
        Some(description.to_owned())
    }
}

fn parse_amount(amount: &Value, errors: &mut Vec<FieldError>) -> Option<f64> {
    let amount = match amount {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match amount {
        Some(amount) if amount.is_finite() && amount > 0.0 => Some(amount),
        _ => {
            errors.push(FieldError::new("amount", AMOUNT_INVALID));
            None
        }
    }
}

fn parse_kind(kind: &str, errors: &mut Vec<FieldError>) -> Option<TransactionType> {
    match kind.parse() {
        Ok(kind) => Some(kind),
        Err(_) => {
            errors.push(FieldError::new("type", TYPE_INVALID));
            None
        }
    }
}

fn parse_date_field(date: &str, errors: &mut Vec<FieldError>) -> Option<OffsetDateTime> {
    let parsed = parse_date(date);

    if parsed.is_none() {
        errors.push(FieldError::new("date", DATE_INVALID));
    }

    parsed
}

/// Parse an ISO 8601 date or date time.
///
/// Accepts RFC 3339 date times, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and
/// `YYYY-MM-DD` (taken as midnight UTC). The result is always in UTC.
pub fn parse_date(date: &str) -> Option<OffsetDateTime> {
    let date = date.trim();

    if let Ok(date_time) = OffsetDateTime::parse(date, &Rfc3339) {
        return Some(date_time.to_offset(time::UtcOffset::UTC));
    }

    if let Ok(date_time) = PrimitiveDateTime::parse(
        date,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(date_time.assume_utc());
    }

    Date::parse(date, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
