use crate::rest::error::ApiError;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use survey_core::SurveyError;
use survey_data::{
    Aggregation, CategoryShare, DatasetCache, FieldValue, MetricRequest, compute, distribution,
};

#[derive(Clone)]
pub struct DatasetController {
    cache: Arc<DatasetCache>,
    expose_error_details: bool,
}

impl DatasetController {
    pub fn new(cache: Arc<DatasetCache>, expose_error_details: bool) -> Self {
        Self { cache, expose_error_details }
    }

    fn fail(&self, err: SurveyError) -> ApiError {
        ApiError::from_error(err, self.expose_error_details)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricResponse {
    pub field: String,
    pub mode: Aggregation,
    pub value: f64,
    pub total: usize,
}

/// Build a metric request from `field`, repeatable `value` and optional `mode`
/// query parameters. Values are typed the same way as CSV cells.
fn metric_request(params: Vec<(String, String)>) -> Result<MetricRequest, SurveyError> {
    let mut field = None;
    let mut values = Vec::new();
    let mut mode = Aggregation::default();

    for (key, value) in params {
        match key.as_str() {
            "field" => field = Some(value),
            "value" => values.push(FieldValue::infer(&value)),
            "mode" => mode = value.parse()?,
            other => {
                return Err(SurveyError::InvalidArgument(format!("unknown parameter '{other}'")));
            }
        }
    }

    let field = field
        .filter(|f| !f.is_empty())
        .ok_or_else(|| SurveyError::InvalidArgument("missing 'field' parameter".to_string()))?;

    let request = MetricRequest::new(field);
    let request = match values.len() {
        0 => request,
        1 => request.equals(values.remove(0)),
        _ => request.one_of(values),
    };
    Ok(request.with_aggregation(mode))
}

/// GET /api/metrics?field=..&value=..&mode=count|percentage
pub async fn metrics(
    State(controller): State<DatasetController>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<MetricResponse>, ApiError> {
    let request = metric_request(params).map_err(|e| controller.fail(e))?;
    let dataset = controller.cache.get_or_load().await.map_err(|e| controller.fail(e))?;

    Ok(Json(MetricResponse {
        value: compute(dataset.records(), &request),
        field: request.field,
        mode: request.aggregation,
        total: dataset.len(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DistributionQuery {
    pub field: String,
}

/// GET /api/distribution?field=..
pub async fn distribution_of(
    State(controller): State<DatasetController>,
    Query(query): Query<DistributionQuery>,
) -> Result<Json<Vec<CategoryShare>>, ApiError> {
    let dataset = controller.cache.get_or_load().await.map_err(|e| controller.fail(e))?;
    Ok(Json(distribution(dataset.records(), &query.field)))
}
