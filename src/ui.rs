use crate::config::OpenApiVersion;
use crate::models::RootDocument;

/// Everything a UI provider gets to see when the documentation endpoint is
/// mounted.
pub struct UiContext<'a> {
    /// Path the generated document is served at.
    pub docs_json_path: &'a str,
    pub open_api_version: OpenApiVersion,
    pub specs: &'a RootDocument,
}

/// Hook for exposing an interactive documentation UI. Invoked once at
/// initialization; entirely external to the correctness of the generated
/// document.
pub trait UiProvider {
    /// Called once when the documentation endpoint is mounted.
    fn init(&self, _ctx: &UiContext<'_>) {}

    /// HTML page to serve at the docs path, if the provider exposes one.
    fn index_html(&self, _ctx: &UiContext<'_>) -> Option<String> {
        None
    }
}

/// No interactive UI; only the JSON document is exposed.
pub struct NoUi;

impl UiProvider for NoUi {}

/// Serves a swagger-ui-dist page wired to the document endpoint.
pub struct SwaggerUiPage;

impl UiProvider for SwaggerUiPage {
    fn index_html(&self, ctx: &UiContext<'_>) -> Option<String> {
        let title = if ctx.specs.info.title.is_empty() {
            "API Documentation"
        } else {
            ctx.specs.info.title.as_str()
        };
        Some(
            SWAGGER_UI_TEMPLATE
                .replace("{{title}}", title)
                .replace("{{docsJsonPath}}", ctx.docs_json_path),
        )
    }
}

const SWAGGER_UI_TEMPLATE: &str = r###"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{title}}</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.21.0/swagger-ui.css">
    <style>
        body {
            margin: 0;
            padding: 0;
        }
        #swagger-ui {
            max-width: 1200px;
            margin: 0 auto;
        }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.21.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            const ui = SwaggerUIBundle({
                url: "{{docsJsonPath}}",
                dom_id: "#swagger-ui",
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIBundle.SwaggerUIStandalonePreset
                ],
            });
        };
    </script>
</body>
</html>"###;
