use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::ErrorBody,
    protocol::{
        BeneficiaryPage, BeneficiaryQuery, CreatedTransfer, DraftSeed, GenerateXmlRequest,
        GeneratedXml, TemplateLoadRequest, TransferCreatePayload,
    },
};
use tracing::{debug, info};
use url::Url;

use crate::{config::Settings, error::ApiFailure};

/// Backend calls the transfer editor depends on.
#[async_trait]
pub trait TransferApi: Send + Sync {
    async fn search_beneficiaries(
        &self,
        query: &BeneficiaryQuery,
    ) -> Result<BeneficiaryPage, ApiFailure>;

    async fn load_template(
        &self,
        request: &TemplateLoadRequest,
    ) -> Result<Vec<DraftSeed>, ApiFailure>;

    /// Creates all transfers in one request. The response lists the created
    /// records in request order.
    async fn create_transfers(
        &self,
        transfers: &[TransferCreatePayload],
    ) -> Result<Vec<CreatedTransfer>, ApiFailure>;

    async fn generate_xml(&self, request: &GenerateXmlRequest) -> Result<GeneratedXml, ApiFailure>;
}

pub struct HttpTransferApi {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTransferApi {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url: with_trailing_slash(base_url),
            token: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.base_url()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: with_trailing_slash(base_url),
            token: settings.api_token.clone(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiFailure> {
        self.base_url
            .join(path)
            .map_err(|err| ApiFailure::Message(format!("invalid endpoint '{path}': {err}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.bytes().await?;
    debug!(%status, "backend rejected request");
    match serde_json::from_slice::<ErrorBody>(&body) {
        Ok(ErrorBody::Rows(rows)) => Err(ApiFailure::FieldErrors(rows)),
        Ok(other) => Err(ApiFailure::Message(other.messages().join("; "))),
        Err(_) => Err(ApiFailure::Message(format!(
            "request failed with status {status}"
        ))),
    }
}

#[async_trait]
impl TransferApi for HttpTransferApi {
    async fn search_beneficiaries(
        &self,
        query: &BeneficiaryQuery,
    ) -> Result<BeneficiaryPage, ApiFailure> {
        let mut url = self.endpoint("beneficiaries/")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                pairs.append_pair("search", search.trim());
            }
            if query.is_active {
                pairs.append_pair("is_active", "true");
            }
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
        }
        let response = self.authorize(self.http.get(url)).send().await?;
        decode(response).await
    }

    async fn load_template(
        &self,
        request: &TemplateLoadRequest,
    ) -> Result<Vec<DraftSeed>, ApiFailure> {
        let url = self.endpoint(&format!("templates/{}/load_transfers/", request.template_id))?;
        let response = self
            .authorize(self.http.post(url))
            .json(request)
            .send()
            .await?;
        let seeds: Vec<DraftSeed> = decode(response).await?;
        info!(
            template_id = %request.template_id,
            transfers = seeds.len(),
            "loaded transfer template"
        );
        Ok(seeds)
    }

    async fn create_transfers(
        &self,
        transfers: &[TransferCreatePayload],
    ) -> Result<Vec<CreatedTransfer>, ApiFailure> {
        let url = self.endpoint("transfers/bulk_create/")?;
        let response = self
            .authorize(self.http.post(url))
            .json(transfers)
            .send()
            .await?;
        decode(response).await
    }

    async fn generate_xml(&self, request: &GenerateXmlRequest) -> Result<GeneratedXml, ApiFailure> {
        let url = self.endpoint("batches/generate_xml/")?;
        let response = self
            .authorize(self.http.post(url))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
