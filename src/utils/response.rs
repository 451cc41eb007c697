use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::utils::query::{ListPage, Pagination};

/// `{success, count?, pagination?, data}` wrapper returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub data: T,
}

#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Self {
        Self::with_status(StatusCode::CREATED, data)
    }

    fn with_status(status: StatusCode, data: T) -> Self {
        Self {
            status,
            body: Envelope {
                success: true,
                count: None,
                pagination: None,
                data,
            },
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// Unpaginated collection; `count` is the number of items returned.
    pub fn collection(items: Vec<T>) -> Self {
        let mut response = Self::ok(items);
        response.body.count = Some(response.body.data.len() as u64);
        response
    }
}

impl ApiResponse<Vec<serde_json::Value>> {
    pub fn page(page: ListPage) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                count: Some(page.items.len() as u64),
                pagination: Some(page.pagination),
                data: page.items,
            },
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// `{success: true, data: {}}`, the reply to a delete.
    pub fn empty() -> Self {
        Self::ok(json!({}))
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
