pub mod client;
pub mod error;
pub mod fetcher;
pub mod fixture;
pub mod mapper;
pub mod models;
pub mod params;
#[cfg(feature = "aws")]
pub mod sdk;

pub use crate::client::AwsService;
pub use crate::fetcher::{enumerators, GlacierEnumerator, GlueEnumerator, KinesisEnumerator};
pub use crate::fixture::FixtureService;
pub use crate::params::{default_overrides, FamilySelection};
