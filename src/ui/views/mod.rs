mod documents;
mod incident_detail;
mod incident_list;
mod status;

pub use documents::DocumentsView;
pub use incident_detail::IncidentDetailView;
pub use incident_list::IncidentListView;
pub use status::StatusView;
