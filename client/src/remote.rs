//! The remote city collection the Record Store synchronizes against.

use async_trait::async_trait;
use domain::{City, NewCity, RecordId};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::trace;
use url::Url;

use crate::error::RemoteError;

/// Port for the remote `cities` collection. Any REST JSON-array CRUD service
/// can stand behind it.
#[async_trait]
pub trait CityCollection: Send + Sync {
    async fn list(&self) -> Result<Vec<City>, RemoteError>;
    async fn get(&self, id: &RecordId) -> Result<City, RemoteError>;
    async fn create(&self, city: &NewCity) -> Result<City, RemoteError>;
    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError>;
}

/// `CityCollection` over HTTP using reqwest.
#[derive(Clone, Debug)]
pub struct HttpCollection {
    client: Client,
    base: Url,
}

impl HttpCollection {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url).map_err(|e| RemoteError::InvalidBaseUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self { client, base })
    }

    /// `{base}/cities` or `{base}/cities/{id}`, with the id percent-encoded.
    fn endpoint(&self, id: Option<&RecordId>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("cities");
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }
        url
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
    let resp = ensure_success(resp)?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn ensure_success(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(RemoteError::Status(status));
    }
    Ok(resp)
}

#[async_trait]
impl CityCollection for HttpCollection {
    async fn list(&self) -> Result<Vec<City>, RemoteError> {
        let url = self.endpoint(None);
        trace!(%url, "GET cities");
        read_json(self.client.get(url).send().await?).await
    }

    async fn get(&self, id: &RecordId) -> Result<City, RemoteError> {
        let url = self.endpoint(Some(id));
        trace!(%url, "GET city");
        read_json(self.client.get(url).send().await?).await
    }

    async fn create(&self, city: &NewCity) -> Result<City, RemoteError> {
        let url = self.endpoint(None);
        trace!(%url, "POST city");
        read_json(self.client.post(url).json(city).send().await?).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
        let url = self.endpoint(Some(id));
        trace!(%url, "DELETE city");
        ensure_success(self.client.delete(url).send().await?)?;
        Ok(())
    }
}
