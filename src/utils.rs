use chrono::{NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::{Json, Value};
use serde::Serializer;

pub fn try_respond(req: &Request, json: Value, status: Status) -> response::Result<'static> {
    Response::build_from(Json(json).respond_to(req)?)
        .status(status)
        .ok()
}

/// Timestamps are stored as naive UTC and rendered as `2024-01-01T10:00:00.000Z`.
pub fn format_date(date: &NaiveDateTime) -> String {
    Utc.from_utc_datetime(date)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn serialize_date<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_date(date))
}

/// Current time truncated to the precision the API renders.
pub fn now() -> NaiveDateTime {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
        .naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn dates_render_as_utc_millis() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_milli_opt(8, 5, 1, 42))
            .unwrap();
        assert_eq!(format_date(&date), "2024-03-09T08:05:01.042Z");
    }

    #[test]
    fn now_has_millisecond_precision() {
        let now = now();
        assert_eq!(now.nanosecond() % 1_000_000, 0);
    }
}
