use utoipa::OpenApi;

use super::api::error::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(super::api::passes::list_passes),
    components(
        schemas(
            ErrorResponse,
            crate::predictor::Prediction,
            crate::predict::Pass,
            crate::elements::Freshness,
        )
    ),
    info(
        title = "Overhead Pass Prediction API",
        description = "Predict when a satellite is visible from a ground observer",
        version = "0.1.0"
    ),
    tags(
        (name = "passes", description = "Pass prediction")
    )
)]
pub struct ApiDoc;
