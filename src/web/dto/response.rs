//! Response DTOs for Web API.

use serde::Serialize;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Plain confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response to a successful subscription.
#[derive(Debug, Serialize)]
pub struct CreatedFeedResponse {
    pub feed_id: i64,
    pub title: String,
    /// Articles stored by the initial fetch.
    pub inserted: usize,
}

/// Response to a single-feed refresh.
#[derive(Debug, Serialize)]
pub struct RefreshFeedResponse {
    pub message: String,
    pub inserted: usize,
}

/// Response to a group creation.
#[derive(Debug, Serialize)]
pub struct CreatedGroupResponse {
    pub group_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_wraps_data() {
        let value = serde_json::to_value(ApiResponse::new(MessageResponse::new("ok"))).unwrap();
        assert_eq!(value["data"]["message"], "ok");
    }
}
