use super::dates::range_filter;
use crate::auth::HostSession;
use crate::config::{Environment, TableNames};
use crate::errors::Result;
use crate::odata::{ODataQuery, quote};
use crate::service::EntityService;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FIELD_TRACK: &str = "cr616_trackname";
pub const FIELD_OBSERVED: &str = "cr616_observedat";

/// Weather and track-condition reading at a venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    #[serde(rename = "cr616_weatherobservationid")]
    pub id: String,
    #[serde(rename = "cr616_trackname", default)]
    pub track_name: String,
    #[serde(rename = "cr616_observedat")]
    pub observed_at: DateTime<Utc>,
    #[serde(rename = "cr616_temperature", default)]
    pub temperature_c: Option<f64>,
    #[serde(rename = "cr616_humidity", default)]
    pub humidity_pct: Option<f64>,
    #[serde(rename = "cr616_windspeed", default)]
    pub wind_speed_kmh: Option<f64>,
    #[serde(rename = "cr616_rainfall", default)]
    pub rainfall_mm: Option<f64>,
    #[serde(rename = "cr616_trackcondition", default)]
    pub track_condition: Option<String>,
}

pub struct WeatherService {
    entity: EntityService<WeatherObservation>,
}

impl WeatherService {
    pub fn new(environment: &Environment, tables: &TableNames, session: &HostSession) -> Result<Self> {
        Ok(Self { entity: EntityService::new(tables.weather.as_str(), environment, session)? })
    }

    pub fn from_entity(entity: EntityService<WeatherObservation>) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &EntityService<WeatherObservation> {
        &self.entity
    }

    fn track_filter(track: &str) -> String {
        format!("{FIELD_TRACK} eq {}", quote(track))
    }

    pub fn latest_query(track: &str) -> ODataQuery {
        ODataQuery::new()
            .filter(Self::track_filter(track))
            .order_by(format!("{FIELD_OBSERVED} desc"))
            .top(1)
    }

    pub fn range_query(track: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> ODataQuery {
        ODataQuery::new()
            .filter(format!("{} and {}", Self::track_filter(track), range_filter(FIELD_OBSERVED, from, to)))
            .order_by(format!("{FIELD_OBSERVED} asc"))
    }

    pub async fn latest_for_track(&self, track: &str) -> Result<Option<WeatherObservation>> {
        let page = self.entity.get_list(Some(&Self::latest_query(track))).await?;
        Ok(page.value.into_iter().next())
    }

    pub async fn range(&self, track: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<WeatherObservation>> {
        self.entity.get_all(Some(&Self::range_query(track, from, to))).await
    }
}
