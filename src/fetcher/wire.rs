use std::collections::BTreeSet;

use super::FetchError;
use crate::domain::{ObservationRow, Period, TrendTable};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub(crate) const TIMESERIES_WIDGET: &str = "TIMESERIES";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExplorePayload<'a> {
    pub(crate) comparison_item: Vec<ComparisonItem<'a>>,
    pub(crate) category: u32,
    pub(crate) property: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ComparisonItem<'a> {
    pub(crate) keyword: &'a str,
    pub(crate) time: &'a str,
    pub(crate) geo: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExploreResponse {
    #[serde(default)]
    pub(crate) widgets: Vec<ExploreWidget>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExploreWidget {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) token: Option<String>,
    /// Echoed back verbatim as the `req` parameter of the data call.
    #[serde(default)]
    pub(crate) request: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MultilineResponse {
    pub(crate) default: MultilineBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MultilineBody {
    #[serde(rename = "timelineData", default)]
    pub(crate) timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimelinePoint {
    pub(crate) time: String,
    #[serde(default)]
    pub(crate) value: Vec<f64>,
    #[serde(rename = "isPartial", default)]
    pub(crate) is_partial: bool,
}

/// Trends responses open with an anti-XSSI guard such as `)]}'`; JSON starts
/// at the first brace.
pub(crate) fn decode_guarded<T: DeserializeOwned>(
    stage: &'static str,
    body: &str,
) -> Result<T, FetchError> {
    let json = body.find('{').map_or(body, |start| &body[start..]);
    serde_json::from_str(json).map_err(|source| FetchError::Decode { stage, source })
}

pub(crate) fn timeseries_widget(response: ExploreResponse) -> Option<ExploreWidget> {
    response
        .widgets
        .into_iter()
        .find(|widget| widget.id == TIMESERIES_WIDGET)
}

pub(crate) fn into_table(
    terms: &[String],
    points: Vec<TimelinePoint>,
) -> Result<TrendTable, FetchError> {
    let mut seen = BTreeSet::new();
    let rows = points
        .into_iter()
        .map(|point| {
            let seconds: i64 = point.time.parse().map_err(|_| {
                FetchError::MalformedPayload(format!("non-numeric time '{}'", point.time))
            })?;
            let period = Period::from_unix_seconds(seconds).ok_or_else(|| {
                FetchError::MalformedPayload(format!("time out of range: {seconds}"))
            })?;
            // Sub-monthly points would collapse onto one month.
            if !seen.insert(period) {
                return Err(FetchError::MalformedPayload(format!(
                    "more than one point for {period}; the time window is not monthly"
                )));
            }
            if point.value.len() != terms.len() {
                return Err(FetchError::MalformedPayload(format!(
                    "{} values for {} terms at {period}",
                    point.value.len(),
                    terms.len()
                )));
            }
            Ok(ObservationRow {
                period,
                values: point.value,
                partial: point.is_partial,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TrendTable {
        terms: terms.to_vec(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_guarded_strips_xssi_prefix() {
        let body = ")]}'\n{\"widgets\":[{\"id\":\"TIMESERIES\",\"token\":\"t\",\"request\":{}}]}";
        let response: ExploreResponse = decode_guarded("explore", body).unwrap();
        assert_eq!(response.widgets.len(), 1);
        assert_eq!(response.widgets[0].token.as_deref(), Some("t"));
    }

    #[test]
    fn decode_guarded_reports_stage_on_bad_json() {
        let err = decode_guarded::<ExploreResponse>("explore", ")]}'\nnot json").unwrap_err();
        assert!(matches!(err, FetchError::Decode { stage: "explore", .. }));
    }

    #[test]
    fn timeseries_widget_ignores_other_widgets() {
        let response = ExploreResponse {
            widgets: vec![
                ExploreWidget {
                    id: "GEO_MAP".into(),
                    token: Some("geo".into()),
                    request: serde_json::Value::Null,
                },
                ExploreWidget {
                    id: "TIMESERIES".into(),
                    token: Some("ts".into()),
                    request: serde_json::Value::Null,
                },
            ],
        };
        let widget = timeseries_widget(response).unwrap();
        assert_eq!(widget.token.as_deref(), Some("ts"));
    }

    #[test]
    fn into_table_rejects_value_count_mismatch() {
        let terms = vec!["a".to_string(), "b".to_string()];
        let points = vec![TimelinePoint {
            time: "1072915200".into(),
            value: vec![1.0],
            is_partial: false,
        }];
        assert!(matches!(
            into_table(&terms, points),
            Err(FetchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn into_table_rejects_weekly_points() {
        let terms = vec!["a".to_string()];
        let points = ["1704585600", "1705190400", "1705795200", "1706400000"]
            .into_iter()
            .zip([10.0, 20.0, 30.0, 40.0])
            .map(|(time, value)| TimelinePoint {
                time: time.into(),
                value: vec![value],
                is_partial: false,
            })
            .collect();

        match into_table(&terms, points) {
            Err(FetchError::MalformedPayload(reason)) => assert!(reason.contains("2024-01-01")),
            other => panic!("expected malformed payload, got {other:?}"),
        }
    }

    #[test]
    fn into_table_keeps_partial_flag() {
        let terms = vec!["a".to_string()];
        let points = vec![TimelinePoint {
            time: "1704067200".into(),
            value: vec![42.0],
            is_partial: true,
        }];
        let table = into_table(&terms, points).unwrap();
        assert_eq!(table.rows[0].period.to_string(), "2024-01-01");
        assert!(table.rows[0].partial);
    }
}
