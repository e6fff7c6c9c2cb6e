//! Operator status routes: `GET /health` (JSON) and `GET /` (HTML).
//!
//! Both render a fresh `HealthResult` plus configuration presence flags.

use axum::Json;
use axum::extract::State;
use axum::response::Html;
use chrono::Utc;
use serde::Serialize;

use super::AppState;
use crate::diagnostics::HealthResult;

/// JSON body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub message: String,
    pub timestamp: String,
    pub api_endpoint: Option<String>,
    pub token_configured: bool,
}

pub async fn health_json(State(state): State<AppState>) -> Json<StatusReport> {
    let result = state.diagnostics.check(&state.config).await;
    Json(StatusReport {
        status: if result.success { "healthy" } else { "unhealthy" },
        message: result.message,
        timestamp: Utc::now().to_rfc3339(),
        api_endpoint: state.config.endpoint().map(str::to_string),
        token_configured: state.config.token_configured(),
    })
}

pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    let result = state.diagnostics.check(&state.config).await;
    Html(render_page(&result))
}

pub fn render_page(result: &HealthResult) -> String {
    let (class, icon, label) = if result.success {
        ("success", "&#x2705;", "OK")
    } else {
        ("error", "&#x274C;", "FAILED")
    };

    let mut details = String::new();
    if !result.success
        && let Some(info) = &result.debug_info
    {
        details.push_str("<div class=\"info\"><h3>Error details</h3>");
        if let Some(error) = info.error() {
            details.push_str(&format!(
                "<p><strong>Error:</strong> <code>{}</code></p>",
                escape_html(error)
            ));
        }
        if let Some(solution) = info.solution() {
            details.push_str(&format!(
                "<p class=\"solution\"><strong>Suggested fix:</strong> {}</p>",
                escape_html(solution)
            ));
        }
        details.push_str("</div>");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Mail relay status</title>
<style>
body {{ font-family: sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }}
.status {{ padding: 15px; border-radius: 6px; }}
.status.success {{ background: #d4edda; color: #155724; }}
.status.error {{ background: #f8d7da; color: #721c24; }}
.info {{ background: #f8f9fa; padding: 15px; margin: 20px 0; }}
.solution {{ background: #fff3cd; padding: 10px; }}
</style>
</head>
<body>
<h1>Mail relay status</h1>
<div class="status {class}">{icon} <strong>API connection: {label}</strong><br><small>{message}</small></div>
{details}
<div class="info"><p>API_ENDPOINT must use a domain name; IP addresses are not supported.</p></div>
</body>
</html>"#,
        message = escape_html(&result.message),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
