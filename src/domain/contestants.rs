use crate::auth::HostSession;
use crate::config::{Environment, TableNames};
use crate::errors::Result;
use crate::odata::{ODataQuery, quote};
use crate::service::EntityService;
use serde::{Deserialize, Serialize};

pub const FIELD_RACE: &str = "_cr616_race_value";
pub const FIELD_GREYHOUND: &str = "cr616_greyhoundname";
pub const FIELD_BOX: &str = "cr616_boxnumber";
pub const FIELD_SCRATCHED: &str = "cr616_scratched";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contestant {
    #[serde(rename = "cr616_contestantid")]
    pub id: String,
    #[serde(rename = "_cr616_race_value", default)]
    pub race_id: Option<String>,
    #[serde(rename = "cr616_greyhoundname", default)]
    pub greyhound_name: String,
    #[serde(rename = "cr616_boxnumber", default)]
    pub box_number: Option<u32>,
    #[serde(rename = "cr616_trainername", default)]
    pub trainer_name: Option<String>,
    #[serde(rename = "cr616_placement", default)]
    pub placement: Option<u32>,
    #[serde(rename = "cr616_margin", default)]
    pub margin: Option<f64>,
    #[serde(rename = "cr616_scratched", default)]
    pub scratched: bool,
}

pub struct ContestantService {
    entity: EntityService<Contestant>,
}

impl ContestantService {
    pub fn new(environment: &Environment, tables: &TableNames, session: &HostSession) -> Result<Self> {
        Ok(Self { entity: EntityService::new(tables.contestants.as_str(), environment, session)? })
    }

    pub fn from_entity(entity: EntityService<Contestant>) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &EntityService<Contestant> {
        &self.entity
    }

    pub fn for_race_query(race_id: &str) -> ODataQuery {
        ODataQuery::new().filter(format!("{FIELD_RACE} eq {race_id}")).order_by(format!("{FIELD_BOX} asc"))
    }

    pub fn for_greyhound_query(name: &str) -> ODataQuery {
        ODataQuery::new()
            .filter(format!("{FIELD_GREYHOUND} eq {}", quote(name)))
            .order_by("createdon desc")
    }

    /// Scratchings, across all races or within one.
    pub fn scratched_query(race_id: Option<&str>) -> ODataQuery {
        let filter = match race_id {
            Some(id) => format!("{FIELD_SCRATCHED} eq true and {FIELD_RACE} eq {id}"),
            None => format!("{FIELD_SCRATCHED} eq true"),
        };
        ODataQuery::new().filter(filter)
    }

    pub async fn for_race(&self, race_id: &str) -> Result<Vec<Contestant>> {
        self.entity.get_all(Some(&Self::for_race_query(race_id))).await
    }

    pub async fn for_greyhound(&self, name: &str) -> Result<Vec<Contestant>> {
        self.entity.get_all(Some(&Self::for_greyhound_query(name))).await
    }

    pub async fn scratched(&self, race_id: Option<&str>) -> Result<Vec<Contestant>> {
        self.entity.get_all(Some(&Self::scratched_query(race_id))).await
    }
}
