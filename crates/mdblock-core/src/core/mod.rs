pub mod params;
pub mod protocol;
pub mod schema;
