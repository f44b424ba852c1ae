//! Table-specific services for the racing portal. Each one only names its table and builds
//! queries; caching, throttling and auth come from [`crate::service::EntityService`].

pub mod contestants;
pub mod dates;
pub mod injuries;
pub mod meetings;
pub mod races;
pub mod weather;

pub use contestants::{Contestant, ContestantService};
pub use injuries::{Injury, InjuryService};
pub use meetings::{Meeting, MeetingService};
pub use races::{Race, RaceService};
pub use weather::{WeatherObservation, WeatherService};
