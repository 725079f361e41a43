//! Reqwest-backed image host adapter.
//!
//! Uploads avatar bytes to the imgur API as a multipart form and returns the
//! hosted link. The adapter never stores the image; the team record keeps
//! only the URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, multipart};
use serde::Deserialize;

use crate::domain::ports::{ImageHost, ImageHostError};

const DEFAULT_UPLOAD_URL: &str = "https://api.imgur.com/3/image";
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct UploadResponseDto {
    data: UploadDataDto,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct UploadDataDto {
    link: Option<String>,
}

/// Image host adapter performing anonymous client-id uploads.
pub struct ImgurImageHost {
    client: Client,
    upload_url: Url,
    client_id: String,
}

impl ImgurImageHost {
    /// Build an adapter against the public imgur API.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(client_id: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(DEFAULT_UPLOAD_TIMEOUT).build()?;
        Ok(Self {
            client,
            upload_url: Url::parse(DEFAULT_UPLOAD_URL)
                .unwrap_or_else(|_| panic!("upload endpoint constant must be a valid URL")),
            client_id: client_id.into(),
        })
    }

    /// Point the adapter at an alternative endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, upload_url: Url) -> Self {
        self.upload_url = upload_url;
        self
    }
}

fn map_transport_error(error: reqwest::Error) -> ImageHostError {
    ImageHostError::unavailable(error.to_string())
}

fn map_status_error(status: StatusCode) -> ImageHostError {
    if status.is_client_error() {
        ImageHostError::rejected(format!("host answered status {}", status.as_u16()))
    } else {
        ImageHostError::unavailable(format!("host answered status {}", status.as_u16()))
    }
}

fn extract_link(body: &[u8]) -> Result<String, ImageHostError> {
    let decoded: UploadResponseDto = serde_json::from_slice(body)
        .map_err(|error| ImageHostError::unavailable(format!("invalid host JSON: {error}")))?;
    if !decoded.success {
        return Err(ImageHostError::rejected("host reported a failed upload"));
    }
    decoded
        .data
        .link
        .ok_or_else(|| ImageHostError::unavailable("host response carried no link"))
}

#[async_trait]
impl ImageHost for ImgurImageHost {
    async fn upload(&self, image: Vec<u8>) -> Result<String, ImageHostError> {
        let form = multipart::Form::new().part("image", multipart::Part::bytes(image));
        let response = self
            .client
            .post(self.upload_url.clone())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Client-ID {}", self.client_id),
            )
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        extract_link(body.as_ref())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the non-network mapping helpers.
    use super::*;
    use rstest::rstest;

    #[test]
    fn successful_responses_yield_the_hosted_link() {
        let body = r#"{"data":{"link":"https://i.imgur.com/abc.png","id":"abc"},"success":true,"status":200}"#;
        let link = extract_link(body.as_bytes()).expect("valid payload");
        assert_eq!(link, "https://i.imgur.com/abc.png");
    }

    #[test]
    fn failed_uploads_map_to_rejected() {
        let body = r#"{"data":{},"success":false,"status":400}"#;
        let error = extract_link(body.as_bytes()).expect_err("failed upload");
        assert!(matches!(error, ImageHostError::Rejected { .. }));
    }

    #[test]
    fn malformed_responses_map_to_unavailable() {
        let error = extract_link(b"not json").expect_err("decode must fail");
        assert!(matches!(error, ImageHostError::Unavailable { .. }));
    }

    #[rstest]
    #[case(StatusCode::BAD_REQUEST, true)]
    #[case(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, false)]
    fn statuses_split_between_rejected_and_unavailable(
        #[case] status: StatusCode,
        #[case] rejected: bool,
    ) {
        let error = map_status_error(status);
        assert_eq!(matches!(error, ImageHostError::Rejected { .. }), rejected);
    }
}
