#![doc = include_str!("../README.md")]

pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod parse;
pub mod spatial;

pub use engine::Engine;
pub use error::{GeocoderError, Result};
pub use index::{IndexData, SourceContent};
pub use model::{
    AdminCode, AdminCodeInfo, AdminCodeRecord, AlternateName, CityRecord, Point, ResultRecord,
    SideTables,
};
