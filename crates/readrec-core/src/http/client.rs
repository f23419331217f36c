//! reqwest-backed client with a fixed User-Agent and per-request timeout

use std::time::Duration;

use reqwest::Client;

use super::{HttpError, HttpResponse};

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::RequestFailed {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }

    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError> {
        let mut request = self.client.get(url).header("User-Agent", &self.user_agent);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();

        if status == 429 {
            return Err(HttpError::RateLimited);
        }

        let body = response.text().await.map_err(|e| HttpError::ParseError {
            message: e.to_string(),
        })?;

        tracing::debug!("GET {} -> {}", url, status);
        Ok(HttpResponse { status, body })
    }

    pub async fn get_with_params(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let url =
            reqwest::Url::parse_with_params(url, params).map_err(|_| HttpError::InvalidUrl {
                url: url.to_string(),
            })?;

        self.get(url.as_str(), headers).await
    }

    /// POST a JSON body. 429 is reported as [`HttpError::RateLimited`] like GET.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut request = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();

        if status == 429 {
            return Err(HttpError::RateLimited);
        }

        let body = response.text().await.map_err(|e| HttpError::ParseError {
            message: e.to_string(),
        })?;

        tracing::debug!("POST {} -> {}", url, status);
        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout
    } else {
        HttpError::RequestFailed {
            message: e.to_string(),
        }
    }
}
