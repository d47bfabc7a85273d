//! Date/time builtins: ISO-8601 in and out, component extraction, and
//! arithmetic in named units. All values travel as strings; instants are
//! normalized to UTC.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc,
};
use jam_core::diag::MessageCode;
use jam_core::error::RuntimeError;
use jam_core::signature::{FunctionSignature, ParameterType as P};
use jam_core::value::Value;

use crate::executor::Invocation;
use crate::registry::FunctionRegistry;

use super::register;

pub(crate) fn install(registry: &mut FunctionRegistry) {
    register(
        registry,
        FunctionSignature::new("Now").returns(P::String),
        |_| Ok(Value::String(format_instant(Utc::now()))),
    );
    register(
        registry,
        FunctionSignature::new("Today").returns(P::String),
        |_| Ok(Value::String(Utc::now().format("%Y-%m-%d").to_string())),
    );
    register(
        registry,
        FunctionSignature::new("ParseDate")
            .required("text", P::String)
            .returns(P::String),
        |inv| Ok(Value::String(format_instant(parse_instant(inv.string(0)?)?))),
    );
    register(
        registry,
        FunctionSignature::new("FormatDate")
            .required("date", P::String)
            .required("format", P::String)
            .returns(P::String),
        format_date,
    );
    register(
        registry,
        FunctionSignature::new("DatePart")
            .required("date", P::String)
            .required("part", P::String)
            .returns(P::Number),
        date_part,
    );
    register(
        registry,
        FunctionSignature::new("DateAdd")
            .required("date", P::String)
            .required("amount", P::Number)
            .required("unit", P::String)
            .returns(P::String),
        date_add,
    );
    register(
        registry,
        FunctionSignature::new("DateDiff")
            .required("first", P::String)
            .required("second", P::String)
            .required("unit", P::String)
            .returns(P::Number),
        date_diff,
    );
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (with or without the
/// `T`), or a bare `YYYY-MM-DD`.
pub(crate) fn parse_instant(text: &str) -> Result<DateTime<Utc>, RuntimeError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(RuntimeError::new(
        MessageCode::InvalidDateTime,
        vec![text.to_string()],
    ))
}

fn format_date(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let instant = parse_instant(inv.string(0)?)?;
    let format = inv.string(1)?;
    let mut out = String::new();
    // A malformed format item surfaces as a fmt error, not a panic.
    use std::fmt::Write;
    write!(out, "{}", instant.format(format))
        .map_err(|_| inv.failure(format!("invalid date format string '{format}'")))?;
    Ok(Value::String(out))
}

fn date_part(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let instant = parse_instant(inv.string(0)?)?;
    let part = inv.string(1)?;
    let value = match part {
        "year" => instant.year() as f64,
        "month" => instant.month() as f64,
        "day" => instant.day() as f64,
        "hour" => instant.hour() as f64,
        "minute" => instant.minute() as f64,
        "second" => instant.second() as f64,
        "weekday" => instant.weekday().number_from_monday() as f64,
        "dayofyear" => instant.ordinal() as f64,
        other => {
            return Err(RuntimeError::new(
                MessageCode::InvalidDateUnit,
                vec![other.to_string()],
            ))
        }
    };
    Ok(Value::Number(value))
}

fn shift_months(instant: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    if months >= 0 {
        instant.checked_add_months(Months::new(months as u32))
    } else {
        instant.checked_sub_months(Months::new((-months) as u32))
    }
}

fn date_add(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let instant = parse_instant(inv.string(0)?)?;
    let amount = inv.integer(1)?;
    let unit = inv.string(2)?;
    let shifted = match unit {
        "year" | "years" => shift_months(instant, amount.saturating_mul(12)),
        "month" | "months" => shift_months(instant, amount),
        "day" | "days" => instant.checked_add_signed(Duration::days(amount)),
        "hour" | "hours" => instant.checked_add_signed(Duration::hours(amount)),
        "minute" | "minutes" => instant.checked_add_signed(Duration::minutes(amount)),
        "second" | "seconds" => instant.checked_add_signed(Duration::seconds(amount)),
        other => {
            return Err(RuntimeError::new(
                MessageCode::InvalidDateUnit,
                vec![other.to_string()],
            ))
        }
    };
    shifted
        .map(|dt| Value::String(format_instant(dt)))
        .ok_or_else(|| inv.failure("date arithmetic out of range"))
}

fn date_diff(inv: &mut Invocation<'_, '_, '_>) -> Result<Value, RuntimeError> {
    let first = parse_instant(inv.string(0)?)?;
    let second = parse_instant(inv.string(1)?)?;
    let unit = inv.string(2)?;
    let delta = second - first;
    let month_delta = (second.year() as i64 * 12 + second.month() as i64 - 1)
        - (first.year() as i64 * 12 + first.month() as i64 - 1);
    let value = match unit {
        "year" | "years" => (month_delta / 12) as f64,
        "month" | "months" => month_delta as f64,
        "day" | "days" => delta.num_days() as f64,
        "hour" | "hours" => delta.num_hours() as f64,
        "minute" | "minutes" => delta.num_minutes() as f64,
        "second" | "seconds" => delta.num_seconds() as f64,
        other => {
            return Err(RuntimeError::new(
                MessageCode::InvalidDateUnit,
                vec![other.to_string()],
            ))
        }
    };
    Ok(Value::Number(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant_accepts_common_shapes() {
        for text in [
            "2026-08-02T10:30:00Z",
            "2026-08-02T10:30:00+02:00",
            "2026-08-02T10:30:00",
            "2026-08-02 10:30:00",
            "2026-08-02",
        ] {
            parse_instant(text).unwrap_or_else(|e| panic!("{text}: {e}"));
        }
    }

    #[test]
    fn test_parse_instant_rejects_garbage() {
        let err = parse_instant("yesterday").unwrap_err();
        assert_eq!(err.code, MessageCode::InvalidDateTime);
        assert_eq!(err.args, vec!["yesterday"]);
    }

    #[test]
    fn test_format_instant_is_rfc3339_utc() {
        let instant = parse_instant("2026-08-02T10:30:00+02:00").unwrap();
        assert_eq!(format_instant(instant), "2026-08-02T08:30:00Z");
    }
}
