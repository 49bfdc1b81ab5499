//! JSON HTTP client for a networked backend.
//!
//! Requests are single attempts with no client-side timeout or retry; a
//! failure is reported once and the caller decides whether to fall back.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use urlencoding::encode;

use super::{RemoteResult, RemoteStore};
use crate::error::RemoteError;
use crate::model::{Category, NewCategory, StockCard, StockCardDraft};

#[derive(Debug, Serialize, Deserialize)]
pub struct UsageResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub materialized: u64,
}

#[derive(Debug, Serialize)]
pub struct StockCardCreate<'a> {
    pub id: &'a str,
    #[serde(flatten)]
    pub draft: &'a StockCardDraft,
}

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> RemoteResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|err| RemoteError::Unavailable(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn check(response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound(text),
            StatusCode::CONFLICT => RemoteError::Conflict(text),
            other => RemoteError::Rejected {
                status: other.as_u16(),
                message: text,
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> RemoteResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn sync_implicit_categories(&self) -> RemoteResult<u64> {
        let response: SyncResponse = self.post_json("api/categories/sync", &()).await?;
        Ok(response.materialized)
    }

    async fn list_categories(&self) -> RemoteResult<Vec<Category>> {
        self.get_json("api/categories").await
    }

    async fn create_category(&self, category: &NewCategory) -> RemoteResult<()> {
        let response = self
            .client
            .post(self.url("api/categories"))
            .json(category)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_category(&self, id: &str) -> RemoteResult<()> {
        let path = format!("api/categories/{}", encode(id));
        let response = self.client.delete(self.url(&path)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn count_category_usage(&self, category_id: &str) -> RemoteResult<u64> {
        let path = format!("api/categories/{}/usage", encode(category_id));
        let response: UsageResponse = self.get_json(&path).await?;
        Ok(response.count)
    }

    async fn list_stock_cards(&self) -> RemoteResult<Vec<StockCard>> {
        self.get_json("api/stock-cards").await
    }

    async fn find_stock_card_by_barcode(&self, barcode: &str) -> RemoteResult<Option<StockCard>> {
        let path = format!("api/stock-cards/by-barcode/{}", encode(barcode));
        match self.get_json(&path).await {
            Ok(card) => Ok(Some(card)),
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    async fn create_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard> {
        self.post_json("api/stock-cards", &StockCardCreate { id, draft })
            .await
    }

    async fn update_stock_card(&self, id: &str, draft: &StockCardDraft) -> RemoteResult<StockCard> {
        let path = format!("api/stock-cards/{}", encode(id));
        let response = self.client.put(self.url(&path)).json(draft).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
