use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::PipelineError;

/// Timezone the exchange export writes its wall-clock timestamps in.
pub const DEFAULT_SOURCE_ZONE: Tz = chrono_tz::Asia::Kolkata;

/// Wall-clock layout of the `Timestamp IST` column, e.g. `02-12-2024 22:50`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

pub fn parse_zone(name: &str) -> Result<Tz, PipelineError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| PipelineError::Configuration(format!("unknown timezone {name:?}: {e}")))
}

/// Interpret `raw` as wall-clock time in `zone` and return the same instant in UTC.
///
/// The conversion happens on the full instant; callers truncate to a date
/// only after this, so a late-evening IST trade lands on the right UTC day.
pub fn source_to_utc(raw: &str, format: &str, zone: Tz) -> Result<DateTime<Utc>, String> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), format)
        .map_err(|e| format!("{raw:?} does not match {format:?}: {e}"))?;

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) => Err(format!("{raw:?} is ambiguous in {zone}")),
        LocalResult::None => Err(format!("{raw:?} does not exist in {zone}")),
    }
}

/// Inverse of [`source_to_utc`]: the same instant viewed in the source zone.
pub fn to_source_zone(ts: DateTime<Utc>, zone: Tz) -> DateTime<Tz> {
    ts.with_timezone(&zone)
}
