//! Embedded example pages

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Pages served at `/{name}`.
pub const PAGES: &[(&str, &str)] = &[
    ("example.html", include_str!("../pages/example.html")),
    ("frame_a.html", include_str!("../pages/frame_a.html")),
    ("frame_b.html", include_str!("../pages/frame_b.html")),
    ("frame_c.html", include_str!("../pages/frame_c.html")),
    ("frame_d.html", include_str!("../pages/frame_d.html")),
];

pub fn page(name: &str) -> Option<&'static str> {
    PAGES
        .iter()
        .find(|(page, _)| *page == name)
        .map(|(_, content)| *content)
}

/// Serve an embedded page, or 404
pub fn serve_page(name: &str) -> Response {
    match page(name) {
        Some(content) => serve_embedded(content, guess_content_type(name)),
        None => (StatusCode::NOT_FOUND, "Page not found").into_response(),
    }
}

fn guess_content_type(path: &str) -> &'static str {
    if path.ends_with(".html") {
        "text/html; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn serve_embedded(content: &'static str, content_type: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response()
}
