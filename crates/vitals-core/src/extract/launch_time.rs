use super::{ExtractError, ExtractResult, float, timestamp_date};
use crate::aggregate::round2;
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

/// Quantile buckets are 5% apart starting at p5, so p90 sits at index 18
const P90_INDEX: usize = 18;
const MICROS_PER_SECOND: f64 = 1_000_000.0;

#[derive(Debug, Deserialize)]
struct RawTimelines {
    #[serde(default)]
    timelines: Vec<RawTimeline>,
}

#[derive(Debug, Deserialize)]
struct RawTimeline {
    #[serde(default)]
    projections: Vec<RawProjection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProjection {
    start_time: Option<String>,
    #[serde(default)]
    projection: RawQuantiles,
}

#[derive(Debug, Default, Deserialize)]
struct RawQuantiles {
    #[serde(default)]
    quantiles: Vec<Value>,
}

/// P90 app start latency in seconds from a trace timeline payload.
///
/// Uses the projection dated `today`, or `yesterday` when today's has not been
/// published yet. No usable projection yields `Ok(None)`.
pub fn parse(body: &[u8], today: NaiveDate) -> ExtractResult<Option<f64>> {
    let raw: RawTimelines = serde_json::from_slice(body)?;

    let Some(timeline) = raw.timelines.first() else {
        return Ok(None);
    };

    let dated: Vec<(NaiveDate, &RawProjection)> = timeline
        .projections
        .iter()
        .filter_map(|p| {
            let date = p.start_time.as_deref().and_then(timestamp_date)?;
            Some((date, p))
        })
        .collect();

    let yesterday = today.checked_sub_days(Days::new(1));
    let pick = |want: Option<NaiveDate>| {
        dated
            .iter()
            .find(|(date, _)| Some(*date) == want)
            .map(|(_, p)| *p)
    };

    let Some(projection) = pick(Some(today)).or_else(|| pick(yesterday)) else {
        return Ok(None);
    };

    let quantiles = &projection.projection.quantiles;
    if quantiles.len() <= P90_INDEX {
        return Ok(None);
    }

    let micros = float(quantiles.get(P90_INDEX), "quantiles[18]")?;
    if micros < 0.0 {
        return Err(ExtractError::InvalidValue {
            field: "quantiles[18]",
            value: micros.to_string(),
        });
    }

    Ok(Some(round2(micros / MICROS_PER_SECOND)))
}
