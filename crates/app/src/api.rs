use std::time::Duration;

use api_types::{
    ErrorResponse,
    discovery::{DiscoveryRequest, DiscoveryResponse, ProfileRecord},
    swipe::{SwipeKind, SwipeRequest, SwipeResponse},
    wallet::WalletBalance,
};
use engine::{Backend, BackendError, Candidate, DiscoveryQuery, SwipeAction, SwipeVerdict};
use reqwest::{Client, RequestBuilder, StatusCode};
use uuid::Uuid;

/// HTTP client for the matching backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
}

impl From<ApiError> for BackendError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(err) if err.is_decode() => Self::Decode(err.to_string()),
            ApiError::Network(err) => Self::Network(err.to_string()),
            ApiError::Server { status, message } => Self::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl ApiClient {
    pub fn new(
        base_url: String,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn post_json<TReq, TResp>(&self, path: &str, body: &TReq) -> Result<TResp, ApiError>
    where
        TReq: serde::Serialize + Sync + ?Sized,
        TResp: for<'de> serde::Deserialize<'de>,
    {
        let req = self.authorize(self.client.post(self.url(path)).json(body));
        read_json(req.send().await?).await
    }

    async fn get_json<TResp>(&self, path: &str) -> Result<TResp, ApiError>
    where
        TResp: for<'de> serde::Deserialize<'de>,
    {
        let req = self.authorize(self.client.get(self.url(path)));
        read_json(req.send().await?).await
    }

    /// Server-side currency balance, used to refresh the cached ledger value.
    pub async fn wallet(&self) -> Result<WalletBalance, ApiError> {
        self.get_json("/wallet").await
    }
}

async fn read_json<TResp>(resp: reqwest::Response) -> Result<TResp, ApiError>
where
    TResp: for<'de> serde::Deserialize<'de>,
{
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<TResp>().await?);
    }

    let message = match resp.json::<ErrorResponse>().await {
        Ok(err) => err.error,
        Err(_) => "server error".to_string(),
    };
    Err(ApiError::Server { status, message })
}

impl Backend for ApiClient {
    async fn discover(&self, query: &DiscoveryQuery) -> Result<Vec<Candidate>, BackendError> {
        let res: DiscoveryResponse = self
            .post_json("/discovery", &discovery_request(query))
            .await?;
        Ok(res.profiles.into_iter().map(candidate_from_record).collect())
    }

    async fn submit_swipe(
        &self,
        candidate_id: &str,
        action: SwipeAction,
    ) -> Result<SwipeVerdict, BackendError> {
        let req = SwipeRequest {
            candidate_id: candidate_id.to_string(),
            action: swipe_kind(action),
            idempotency_key: Uuid::new_v4(),
        };
        let res: SwipeResponse = self.post_json("/swipes", &req).await?;
        Ok(SwipeVerdict {
            accepted: res.accepted,
            is_match: res.is_match,
            match_id: res.match_id,
        })
    }
}

fn discovery_request(query: &DiscoveryQuery) -> DiscoveryRequest {
    DiscoveryRequest {
        min_age: query.min_age,
        max_age: query.max_age,
        max_distance_km: query.max_distance_km,
        tags: query.tags.clone(),
        limit: query.limit,
    }
}

fn swipe_kind(action: SwipeAction) -> SwipeKind {
    match action {
        SwipeAction::Like => SwipeKind::Like,
        SwipeAction::Pass => SwipeKind::Pass,
    }
}

fn candidate_from_record(record: ProfileRecord) -> Candidate {
    let mut candidate = Candidate::remote(record.id, record.name)
        .with_media(record.photos)
        .with_tags(record.tags);
    if let Some(age) = record.age {
        candidate = candidate.with_age(age);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let client = ApiClient::new(
            "http://localhost:3000/".to_string(),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.url("/swipes"), "http://localhost:3000/swipes");
        assert_eq!(client.url("wallet"), "http://localhost:3000/wallet");
    }

    #[test]
    fn server_errors_keep_status_and_message() {
        let err: BackendError = ApiError::Server {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "slow down".to_string(),
        }
        .into();
        assert_eq!(
            err,
            BackendError::Server {
                status: 429,
                message: "slow down".to_string(),
            }
        );
    }

    #[test]
    fn profile_records_become_remote_candidates() {
        let candidate = candidate_from_record(ProfileRecord {
            id: "p-9".to_string(),
            name: "Noor".to_string(),
            age: Some(31),
            photos: vec!["https://cdn.example.test/p-9.jpg".to_string()],
            tags: vec!["climbing".to_string()],
        });
        assert_eq!(candidate.id, "p-9");
        assert!(!candidate.is_fallback);
        assert_eq!(candidate.age, Some(31));
        assert_eq!(candidate.media.len(), 1);
    }
}
