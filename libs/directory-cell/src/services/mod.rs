pub mod catalog;
pub mod employee;
pub mod patient;
pub mod room;

pub use catalog::ServiceCatalog;
pub use employee::EmployeeDirectory;
pub use patient::PatientDirectory;
pub use room::RoomDirectory;
