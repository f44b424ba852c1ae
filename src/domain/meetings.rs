use super::dates::{day_bounds, days_bounds_in, range_filter, today_local};
use crate::auth::HostSession;
use crate::config::{Environment, TableNames};
use crate::errors::Result;
use crate::odata::{ODataQuery, quote};
use crate::service::EntityService;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const FIELD_DATE: &str = "cr616_meetingdate";
pub const FIELD_TRACK: &str = "cr616_trackname";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(rename = "cr616_meetingid")]
    pub id: String,
    #[serde(rename = "cr616_trackname", default)]
    pub track_name: String,
    #[serde(rename = "cr616_meetingdate")]
    pub meeting_date: DateTime<Utc>,
    #[serde(rename = "cr616_authority", default)]
    pub authority: Option<String>,
    #[serde(rename = "cr616_timeslot", default)]
    pub timeslot: Option<String>,
    #[serde(rename = "cr616_status", default)]
    pub status: Option<String>,
}

pub struct MeetingService {
    entity: EntityService<Meeting>,
}

impl MeetingService {
    pub fn new(environment: &Environment, tables: &TableNames, session: &HostSession) -> Result<Self> {
        Ok(Self { entity: EntityService::new(tables.meetings.as_str(), environment, session)? })
    }

    pub fn from_entity(entity: EntityService<Meeting>) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &EntityService<Meeting> {
        &self.entity
    }

    /// Meetings on `date`, bounded by local midnights.
    pub fn on_date_query(date: NaiveDate) -> ODataQuery {
        let (from, to) = day_bounds(date);
        ODataQuery::new().filter(range_filter(FIELD_DATE, from, to)).order_by(format!("{FIELD_DATE} asc"))
    }

    pub fn for_track_query(track: &str) -> ODataQuery {
        ODataQuery::new()
            .filter(format!("{FIELD_TRACK} eq {}", quote(track)))
            .order_by(format!("{FIELD_DATE} desc"))
    }

    /// Today plus the following `days - 1` local days.
    pub fn upcoming_query(days: u32) -> ODataQuery {
        let (from, to) = days_bounds_in(today_local(), days.max(1), &Local);
        ODataQuery::new().filter(range_filter(FIELD_DATE, from, to)).order_by(format!("{FIELD_DATE} asc"))
    }

    pub async fn today(&self) -> Result<Vec<Meeting>> {
        self.on_date(today_local()).await
    }

    pub async fn on_date(&self, date: NaiveDate) -> Result<Vec<Meeting>> {
        self.entity.get_all(Some(&Self::on_date_query(date))).await
    }

    pub async fn for_track(&self, track: &str) -> Result<Vec<Meeting>> {
        self.entity.get_all(Some(&Self::for_track_query(track))).await
    }

    pub async fn upcoming(&self, days: u32) -> Result<Vec<Meeting>> {
        self.entity.get_all(Some(&Self::upcoming_query(days))).await
    }
}
