//! Controllers behind the incident list and detail views.

pub mod detail;
pub mod list;

pub use detail::{Draft, IncidentDetailController, IncidentId};
pub use list::{CreateForm, IncidentListController, IncidentPage};
