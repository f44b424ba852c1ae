use super::dates::{local_midnight, today_local};
use crate::auth::HostSession;
use crate::config::{Environment, TableNames};
use crate::errors::Result;
use crate::odata::{ODataQuery, datetime_literal, quote};
use crate::service::EntityService;
use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const FIELD_GREYHOUND: &str = "cr616_greyhoundname";
pub const FIELD_DATE: &str = "cr616_injurydate";
pub const FIELD_SEVERITY: &str = "cr616_severity";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Injury {
    #[serde(rename = "cr616_injuryid")]
    pub id: String,
    #[serde(rename = "cr616_greyhoundname", default)]
    pub greyhound_name: String,
    #[serde(rename = "cr616_injurydate")]
    pub injury_date: DateTime<Utc>,
    #[serde(rename = "cr616_severity", default)]
    pub severity: Option<String>,
    #[serde(rename = "cr616_bodypart", default)]
    pub body_part: Option<String>,
    #[serde(rename = "cr616_standdowndays", default)]
    pub stand_down_days: Option<u32>,
    #[serde(rename = "_cr616_race_value", default)]
    pub race_id: Option<String>,
}

pub struct InjuryService {
    entity: EntityService<Injury>,
}

impl InjuryService {
    pub fn new(environment: &Environment, tables: &TableNames, session: &HostSession) -> Result<Self> {
        Ok(Self { entity: EntityService::new(tables.injuries.as_str(), environment, session)? })
    }

    pub fn from_entity(entity: EntityService<Injury>) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &EntityService<Injury> {
        &self.entity
    }

    pub fn for_greyhound_query(name: &str) -> ODataQuery {
        ODataQuery::new()
            .filter(format!("{FIELD_GREYHOUND} eq {}", quote(name)))
            .order_by(format!("{FIELD_DATE} desc"))
    }

    /// Injuries since local midnight `days` days before `today`.
    pub fn recent_query(today: NaiveDate, days: u32) -> ODataQuery {
        let since_day = today.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN);
        let since = local_midnight(since_day, &Local);
        ODataQuery::new()
            .filter(format!("{FIELD_DATE} ge {}", datetime_literal(since)))
            .order_by(format!("{FIELD_DATE} desc"))
    }

    pub fn by_severity_query(severity: &str) -> ODataQuery {
        ODataQuery::new()
            .filter(format!("{FIELD_SEVERITY} eq {}", quote(severity)))
            .order_by(format!("{FIELD_DATE} desc"))
    }

    pub async fn for_greyhound(&self, name: &str) -> Result<Vec<Injury>> {
        self.entity.get_all(Some(&Self::for_greyhound_query(name))).await
    }

    pub async fn recent(&self, days: u32) -> Result<Vec<Injury>> {
        self.entity.get_all(Some(&Self::recent_query(today_local(), days))).await
    }

    pub async fn by_severity(&self, severity: &str) -> Result<Vec<Injury>> {
        self.entity.get_all(Some(&Self::by_severity_query(severity))).await
    }
}
