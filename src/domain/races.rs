use super::dates::{day_bounds, range_filter, today_local};
use crate::auth::HostSession;
use crate::config::{Environment, TableNames};
use crate::errors::Result;
use crate::odata::{ODataQuery, quote};
use crate::service::EntityService;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const FIELD_MEETING: &str = "_cr616_meeting_value";
pub const FIELD_NUMBER: &str = "cr616_racenumber";
pub const FIELD_STATUS: &str = "cr616_status";
pub const FIELD_TIME: &str = "cr616_racetime";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Race {
    #[serde(rename = "cr616_raceid")]
    pub id: String,
    #[serde(rename = "_cr616_meeting_value", default)]
    pub meeting_id: Option<String>,
    #[serde(rename = "cr616_racenumber", default)]
    pub race_number: Option<u32>,
    #[serde(rename = "cr616_racename", default)]
    pub name: Option<String>,
    #[serde(rename = "cr616_distance", default)]
    pub distance_m: Option<u32>,
    #[serde(rename = "cr616_grade", default)]
    pub grade: Option<String>,
    #[serde(rename = "cr616_racetime", default)]
    pub race_time: Option<DateTime<Utc>>,
    #[serde(rename = "cr616_status", default)]
    pub status: Option<String>,
}

pub struct RaceService {
    entity: EntityService<Race>,
}

impl RaceService {
    pub fn new(environment: &Environment, tables: &TableNames, session: &HostSession) -> Result<Self> {
        Ok(Self { entity: EntityService::new(tables.races.as_str(), environment, session)? })
    }

    pub fn from_entity(entity: EntityService<Race>) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &EntityService<Race> {
        &self.entity
    }

    pub fn for_meeting_query(meeting_id: &str) -> ODataQuery {
        ODataQuery::new()
            .filter(format!("{FIELD_MEETING} eq {meeting_id}"))
            .order_by(format!("{FIELD_NUMBER} asc"))
    }

    pub fn by_status_query(status: &str) -> ODataQuery {
        ODataQuery::new()
            .filter(format!("{FIELD_STATUS} eq {}", quote(status)))
            .order_by(format!("{FIELD_TIME} asc"))
    }

    pub fn on_date_query(date: NaiveDate) -> ODataQuery {
        let (from, to) = day_bounds(date);
        ODataQuery::new().filter(range_filter(FIELD_TIME, from, to)).order_by(format!("{FIELD_TIME} asc"))
    }

    pub async fn for_meeting(&self, meeting_id: &str) -> Result<Vec<Race>> {
        self.entity.get_all(Some(&Self::for_meeting_query(meeting_id))).await
    }

    pub async fn by_status(&self, status: &str) -> Result<Vec<Race>> {
        self.entity.get_all(Some(&Self::by_status_query(status))).await
    }

    pub async fn today(&self) -> Result<Vec<Race>> {
        self.entity.get_all(Some(&Self::on_date_query(today_local()))).await
    }
}
