//! Client for the Play Developer Reporting API.
//!
//! Used after the console harvest to attach the store's own user-weighted
//! rates to each Android app. Everything here is optional: a missing service
//! account disables the client, a failing metric set just leaves its values out.

mod client;
mod error;
mod metrics;
mod token;

pub use client::{PlayVitalsClient, VitalsSource, DEFAULT_BASE_URL};
pub use error::{Error, Result};
pub use metrics::{MetricDef, MetricSet, METRICS};
pub use token::{GcloudTokenProvider, StaticTokenProvider, TokenProvider};
