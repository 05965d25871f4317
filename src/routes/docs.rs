use axum::{
    http::header::CONTENT_TYPE,
    response::{Html, IntoResponse},
};

use crate::{
    error::ApiError,
    routing::{Ctx, HandlerFuture},
};

const OPENAPI: &str = include_str!("../../openapi.yaml");

const SWAGGER_UI: &str = r##"<!DOCTYPE html>
<html>
<head>
    <title>Shop API Documentation</title>
    <link rel="stylesheet" type="text/css"
          href="https://unpkg.com/swagger-ui-dist@3/swagger-ui.css">
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@3/swagger-ui-bundle.js"></script>
    <script>
        SwaggerUIBundle({
            url: "/openapi.yaml",
            dom_id: "#swagger-ui",
            presets: [
                SwaggerUIBundle.presets.apis,
                SwaggerUIBundle.presets.standalone
            ]
        });
    </script>
</body>
</html>
"##;

pub fn openapi(_ctx: Ctx) -> HandlerFuture {
    Box::pin(async {
        Ok::<_, ApiError>(([(CONTENT_TYPE, "application/yaml")], OPENAPI).into_response())
    })
}

pub fn swagger_ui(_ctx: Ctx) -> HandlerFuture {
    Box::pin(async { Ok::<_, ApiError>(Html(SWAGGER_UI).into_response()) })
}
