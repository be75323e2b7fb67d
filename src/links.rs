//! Outbound deep links (WhatsApp chats, Google Calendar events).
//!
//! Only URLs are built here; opening them is the caller's business.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use url::Url;

use crate::errors::ServiceError;
use crate::validation::digits_only;

const WHATSAPP_BASE: &str = "https://wa.me/";
const CALENDAR_TEMPLATE: &str = "https://calendar.google.com/calendar/render";
const CALENDAR_EVENT: &str = "https://calendar.google.com/calendar/event";
const BRAZIL_COUNTRY_CODE: &str = "55";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("phone number has no usable digits")]
    InvalidPhone,

    #[error("event id is empty")]
    MissingEventId,

    #[error("could not build link: {0}")]
    Url(#[from] url::ParseError),
}

impl From<LinkError> for ServiceError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Url(e) => ServiceError::InternalError(e.to_string()),
            other => ServiceError::ValidationError(other.to_string()),
        }
    }
}

/// `https://wa.me/<digits>?text=<message>`. Local numbers get the `55` prefix.
pub fn whatsapp_link(phone: &str, message: Option<&str>) -> Result<Url, LinkError> {
    let mut digits = digits_only(phone);
    if digits.len() < 10 {
        return Err(LinkError::InvalidPhone);
    }
    if matches!(digits.len(), 10 | 11) {
        digits.insert_str(0, BRAZIL_COUNTRY_CODE);
    }

    let mut url = Url::parse(WHATSAPP_BASE)?.join(&digits)?;
    if let Some(text) = message.filter(|m| !m.trim().is_empty()) {
        url.query_pairs_mut().append_pair("text", text);
    }
    Ok(url)
}

fn calendar_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Google Calendar "add event" form prefilled with the appointment.
pub fn calendar_template_link(
    title: &str,
    starts_at: DateTime<Utc>,
    duration_minutes: i64,
    details: Option<&str>,
) -> Result<Url, LinkError> {
    let ends_at = starts_at + Duration::minutes(duration_minutes.max(1));
    let dates = format!("{}/{}", calendar_stamp(starts_at), calendar_stamp(ends_at));

    let mut params = vec![("action", "TEMPLATE"), ("text", title), ("dates", dates.as_str())];
    if let Some(details) = details {
        params.push(("details", details));
    }
    Ok(Url::parse_with_params(CALENDAR_TEMPLATE, &params)?)
}

/// Link to an event already synced to Google Calendar.
pub fn calendar_event_link(event_id: &str) -> Result<Url, LinkError> {
    let event_id = event_id.trim();
    if event_id.is_empty() {
        return Err(LinkError::MissingEventId);
    }
    Ok(Url::parse_with_params(CALENDAR_EVENT, &[("eid", event_id)])?)
}
