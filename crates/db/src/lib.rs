pub mod connection;
pub mod fixtures;
pub mod lifecycle;
pub mod migrations;
pub mod reporting;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::SeedDataset;
pub use lifecycle::{LifecycleEngine, RequestBundle, RequestScope};
pub use reporting::ReportingRepository;
