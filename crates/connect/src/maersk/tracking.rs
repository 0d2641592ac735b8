//! Tracking and booking shapes, live and mock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use unibridge_core::shipments::ShipmentStatus;
use uuid::Uuid;

use super::status::map_status;
use crate::adapter::{Booking, BookingRequest, Port, TrackingEvent, TrackingSnapshot};

pub const CARRIER_NAME: &str = "Maersk";
pub const DEFAULT_CONTAINER_TYPE: &str = "40HC";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaerskEvent {
    #[serde(alias = "status")]
    pub event_type: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(alias = "timestamp")]
    pub event_date_time: DateTime<Utc>,
}

/// `GET /track/{tracking_number}` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaerskTrackingResponse {
    pub vessel_name: Option<String>,
    pub voyage_number: Option<String>,
    pub origin: Option<Port>,
    pub destination: Option<Port>,
    pub current_location: Option<String>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub container_type: Option<String>,
    pub events: Vec<MaerskEvent>,
}

/// `POST /bookings` response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaerskBookingResponse {
    #[serde(alias = "carrierBookingReference")]
    pub booking_number: String,
    #[serde(default)]
    pub status: Option<String>,
    pub estimated_departure: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
}

fn map_event(event: MaerskEvent) -> TrackingEvent {
    TrackingEvent {
        timestamp: event.event_date_time,
        status: map_status(&event.event_type),
        native_status: event.event_type,
        location: event.location,
    }
}

/// Builds the canonical snapshot; the latest event decides the status.
pub fn to_snapshot(tracking_number: &str, response: MaerskTrackingResponse) -> TrackingSnapshot {
    let mut events: Vec<TrackingEvent> = response.events.into_iter().map(map_event).collect();
    events.sort_by_key(|event| event.timestamp);
    let status = events
        .last()
        .map(|event| event.status)
        .unwrap_or(ShipmentStatus::Pending);

    TrackingSnapshot {
        tracking_number: tracking_number.to_string(),
        carrier: CARRIER_NAME.to_string(),
        status,
        vessel: response.vessel_name,
        voyage_number: response.voyage_number,
        origin: response.origin,
        destination: response.destination,
        current_location: response
            .current_location
            .or_else(|| events.last().and_then(|event| event.location.clone())),
        estimated_arrival: response.estimated_arrival,
        container_type: response.container_type,
        events,
    }
}

pub fn to_booking(
    request: &BookingRequest,
    response: MaerskBookingResponse,
    now: DateTime<Utc>,
) -> Booking {
    Booking {
        booking_number: response.booking_number,
        status: response.status.unwrap_or_else(|| "confirmed".to_string()),
        origin: request.origin.clone(),
        destination: request.destination.clone(),
        container_type: container_type(request),
        estimated_departure: response.estimated_departure,
        estimated_arrival: response.estimated_arrival,
        created_at: now,
    }
}

fn container_type(request: &BookingRequest) -> String {
    request
        .container_type
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONTAINER_TYPE.to_string())
}

fn port(code: &str, name: &str, country: &str) -> Port {
    Port {
        code: code.to_string(),
        name: name.to_string(),
        country: country.to_string(),
    }
}

/// A container sailing Valencia to Shanghai, currently in the Suez Canal.
pub fn mock_tracking(tracking_number: &str, now: DateTime<Utc>) -> TrackingSnapshot {
    let event = |event_type: &str, location: &str, days_ago: i64| MaerskEvent {
        event_type: event_type.to_string(),
        location: Some(location.to_string()),
        event_date_time: now - Duration::days(days_ago),
    };
    let response = MaerskTrackingResponse {
        vessel_name: Some("Maersk Madrid".to_string()),
        voyage_number: Some("MV2601".to_string()),
        origin: Some(port("ESVLC", "Valencia", "Spain")),
        destination: Some(port("CNSHA", "Shanghai", "China")),
        current_location: Some("Suez Canal".to_string()),
        estimated_arrival: Some(now + Duration::days(12)),
        container_type: Some(DEFAULT_CONTAINER_TYPE.to_string()),
        events: vec![
            event("Gate in (Out)", "Valencia", 10),
            event("Loaded", "Valencia", 9),
            event("Departed", "Valencia", 8),
        ],
    };
    to_snapshot(tracking_number, response)
}

/// Mock bookings depart in a week and arrive three weeks later.
pub fn mock_booking(request: &BookingRequest, now: DateTime<Utc>) -> Booking {
    let reference = Uuid::new_v4().simple().to_string();
    let response = MaerskBookingResponse {
        booking_number: format!("MAEU{}", reference[..9].to_ascii_uppercase()),
        status: Some("confirmed".to_string()),
        estimated_departure: now + Duration::days(7),
        estimated_arrival: now + Duration::days(28),
    };
    to_booking(request, response, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_status_follows_latest_event() {
        let response: MaerskTrackingResponse = serde_json::from_value(json!({
            "events": [
                {"eventType": "Arrived", "location": "Shanghai", "eventDateTime": "2026-03-02T10:00:00Z"},
                {"eventType": "Departed", "location": "Valencia", "eventDateTime": "2026-02-01T10:00:00Z"}
            ]
        }))
        .unwrap();
        let snapshot = to_snapshot("MSKU1234567", response);
        assert_eq!(snapshot.status, ShipmentStatus::ArrivedAtPort);
        assert_eq!(snapshot.current_location.as_deref(), Some("Shanghai"));
        assert_eq!(snapshot.events[0].native_status, "Departed");
    }

    #[test]
    fn test_empty_history_is_pending() {
        let snapshot = to_snapshot("MSKU1", MaerskTrackingResponse::default());
        assert_eq!(snapshot.status, ShipmentStatus::Pending);
    }

    #[test]
    fn test_mock_tracking() {
        let snapshot = mock_tracking("MSKU7654321", Utc::now());
        assert_eq!(snapshot.status, ShipmentStatus::InTransit);
        assert_eq!(snapshot.vessel.as_deref(), Some("Maersk Madrid"));
        assert_eq!(snapshot.current_location.as_deref(), Some("Suez Canal"));
        assert_eq!(snapshot.events.len(), 3);
    }

    #[test]
    fn test_mock_booking_dates() {
        let now = Utc::now();
        let request = BookingRequest {
            origin: "ESVLC".to_string(),
            destination: "CNSHA".to_string(),
            ..Default::default()
        };
        let booking = mock_booking(&request, now);
        assert!(booking.booking_number.starts_with("MAEU"));
        assert_eq!(booking.container_type, DEFAULT_CONTAINER_TYPE);
        assert_eq!(booking.estimated_departure, now + Duration::days(7));
        assert_eq!(booking.estimated_arrival, now + Duration::days(28));
    }
}
