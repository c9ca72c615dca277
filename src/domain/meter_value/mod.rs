pub mod model;
pub mod repository;

pub use model::{Measurand, MeterValue};
pub use repository::MeterValueRepository;
