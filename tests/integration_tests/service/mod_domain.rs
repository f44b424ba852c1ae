use crate::integration_tests::_support::{API_ROOT, harness};
use chrono::{NaiveDate, TimeZone, Utc};
use racedata::config::TableNames;
use racedata::domain::{MeetingService, RaceService, WeatherService};
use racedata::domain::dates::{day_bounds, range_filter};
use serde_json::json;

#[tokio::test]
async fn meetings_on_a_date_filter_by_local_day() {
    let h = harness("domain-meetings");
    let tables = TableNames::default();
    let meetings = MeetingService::new(&h.env, &tables, &h.session).unwrap();
    h.transport.route_json(
        "cr616_meetings",
        json!({"value": [{
            "cr616_meetingid": "m-1",
            "cr616_trackname": "Wentworth Park",
            "cr616_meetingdate": "2026-10-19T08:00:00Z"
        }]}),
    );

    let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let found = meetings.on_date(date).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].track_name, "Wentworth Park");

    let url = h.transport.last().unwrap().url;
    assert!(url.starts_with(&format!("{API_ROOT}/cr616_meetings?$filter=cr616_meetingdate ge ")), "{url}");
    let (from, to) = day_bounds(date);
    assert!(url.contains(&range_filter("cr616_meetingdate", from, to)));
    assert!(url.ends_with("&$orderby=cr616_meetingdate asc"));
}

#[tokio::test]
async fn races_for_a_meeting_use_the_lookup_column() {
    let h = harness("domain-races");
    let races = RaceService::new(&h.env, &TableNames::default(), &h.session).unwrap();
    h.transport.route_json(
        "cr616_races",
        json!({"value": [
            {"cr616_raceid": "r-1", "_cr616_meeting_value": "m-1", "cr616_racenumber": 1},
            {"cr616_raceid": "r-2", "_cr616_meeting_value": "m-1", "cr616_racenumber": 2}
        ]}),
    );
    let found = races.for_meeting("m-1").await.unwrap();
    assert_eq!(found.iter().map(|r| r.race_number).collect::<Vec<_>>(), vec![Some(1), Some(2)]);
    assert_eq!(
        h.transport.last().unwrap().url,
        format!("{API_ROOT}/cr616_races?$filter=_cr616_meeting_value eq m-1&$orderby=cr616_racenumber asc")
    );

    races.for_meeting("m-1").await.unwrap();
    assert_eq!(h.transport.count(), 1);
}

#[tokio::test]
async fn latest_weather_is_optional() {
    let h = harness("domain-weather");
    let weather = WeatherService::new(&h.env, &TableNames::default(), &h.session).unwrap();
    h.transport.push_json(200, json!({"value": []}));
    assert_eq!(weather.latest_for_track("Sandown Park").await.unwrap(), None);
    assert!(h.transport.last().unwrap().url.contains("$top=1"));

    h.transport.push_json(
        200,
        json!({"value": [{
            "cr616_weatherobservationid": "w-1",
            "cr616_trackname": "The Meadows",
            "cr616_observedat": "2026-10-19T06:30:00Z",
            "cr616_trackcondition": "Good"
        }]}),
    );
    let latest = weather.latest_for_track("The Meadows").await.unwrap().unwrap();
    assert_eq!(latest.observed_at, Utc.with_ymd_and_hms(2026, 10, 19, 6, 30, 0).unwrap());
    assert_eq!(latest.track_condition.as_deref(), Some("Good"));
}

#[tokio::test]
async fn services_in_one_environment_share_a_token() {
    let h = harness("domain-shared");
    let tables = TableNames::default();
    let meetings = MeetingService::new(&h.env, &tables, &h.session).unwrap();
    let races = RaceService::new(&h.env, &tables, &h.session).unwrap();
    h.transport.route_json("cr616_", json!({"value": []}));

    meetings.for_track("Angle Park").await.unwrap();
    races.by_status("Scheduled").await.unwrap();
    assert_eq!(h.provider.calls(), 1);
    assert!(std::sync::Arc::ptr_eq(meetings.entity().auth(), races.entity().auth()));
    assert_eq!(races.entity().table(), "cr616_races");
}
