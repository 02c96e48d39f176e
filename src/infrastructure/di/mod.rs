//! Dependency injection: wiring of services and their I/O boundaries

mod service_container;

pub use service_container::ServiceContainer;
