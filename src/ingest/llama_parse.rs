//! LlamaParse (LlamaCloud) document parsing client.
//!
//! A parse is an asynchronous job: upload the file, poll the job until it
//! settles, then download the per-page JSON result.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::time::Instant;

use crate::core::config::{ParserConfig, ResultType};
use crate::core::errors::ApiError;
use super::parser::{DocumentParser, ParsedPage};

const SERVICE: &str = "llamaparse";

#[derive(Deserialize)]
struct JobResponse {
    id: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct JsonResult {
    #[serde(default)]
    pages: Vec<JsonPage>,
}

#[derive(Deserialize)]
struct JsonPage {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    md: Option<String>,
}

#[derive(Debug, PartialEq)]
enum JobStatus {
    Succeeded,
    Failed(String),
}

#[derive(Clone)]
pub struct LlamaParseClient {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
    result_type: ResultType,
    poll_interval: Duration,
    max_wait: Duration,
}

impl LlamaParseClient {
    pub fn new(config: &ParserConfig) -> Result<Self, ApiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::Config("LLAMA_CLOUD_API_KEY is not set".to_string()))?;

        Ok(Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            language: config.language.clone(),
            result_type: config.result_type,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.api_key)
    }

    async fn submit(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        target_pages: Option<&str>,
    ) -> Result<String, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(ApiError::internal)?;
        let mut form = Form::new()
            .part("file", part)
            .text("language", self.language.clone());
        if let Some(range) = target_pages {
            form = form.text("target_pages", range.to_string());
        }

        let url = format!("{}/api/v1/parsing/upload", self.base_url);
        let res = self
            .authorized(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::upstream(
                SERVICE,
                format!("upload failed ({}): {}", status, text),
            ));
        }

        let job: JobResponse = res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))?;
        tracing::info!(job_id = %job.id, target_pages = ?target_pages, "Submitted parse job");
        Ok(job.id)
    }

    async fn wait_for(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let url = format!("{}/api/v1/parsing/job/{}", self.base_url, job_id);
        let deadline = Instant::now() + self.max_wait;

        loop {
            let res = self
                .authorized(self.client.get(&url))
                .send()
                .await
                .map_err(|e| ApiError::upstream(SERVICE, e))?;
            if !res.status().is_success() {
                let status = res.status();
                let text = res.text().await.unwrap_or_default();
                return Err(ApiError::upstream(
                    SERVICE,
                    format!("job status failed ({}): {}", status, text),
                ));
            }

            let job: JobResponse = res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))?;
            match job.status.to_ascii_uppercase().as_str() {
                "SUCCESS" | "PARTIAL_SUCCESS" => return Ok(JobStatus::Succeeded),
                "ERROR" | "CANCELED" | "CANCELLED" => return Ok(JobStatus::Failed(job.status)),
                other => tracing::debug!(job_id, status = other, "Parse job still running"),
            }

            if Instant::now() >= deadline {
                return Err(ApiError::upstream(
                    SERVICE,
                    format!("job {} did not finish within {:?}", job_id, self.max_wait),
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_pages(&self, job_id: &str) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/api/v1/parsing/job/{}/result/json", self.base_url, job_id);
        let res = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, e))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::upstream(
                SERVICE,
                format!("result download failed ({}): {}", status, text),
            ));
        }

        let result: JsonResult = res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))?;
        let result_type = self.result_type;
        Ok(result
            .pages
            .into_iter()
            .map(|page| match result_type {
                ResultType::Markdown => page.md.or(page.text),
                ResultType::Text => page.text.or(page.md),
            })
            .map(Option::unwrap_or_default)
            .collect())
    }

    /// Runs one job to completion. `Ok(None)` means the service rejected it.
    async fn run_job(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        target_pages: Option<&str>,
    ) -> Result<Option<Vec<String>>, ApiError> {
        let job_id = self.submit(file_name, bytes, target_pages).await?;
        match self.wait_for(&job_id).await? {
            JobStatus::Succeeded => Ok(Some(self.fetch_pages(&job_id).await?)),
            JobStatus::Failed(status) => {
                tracing::warn!(job_id = %job_id, status = %status, "Parse job did not succeed");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    async fn parse(
        &self,
        path: &Path,
        partition_pages: Option<u32>,
    ) -> Result<Vec<ParsedPage>, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::BadRequest(format!("cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        let texts = match partition_pages.filter(|size| *size > 0) {
            None => self
                .run_job(&file_name, bytes, None)
                .await?
                .ok_or_else(|| ApiError::upstream(SERVICE, format!("parsing {} failed", file_name)))?,
            Some(size) => {
                let mut texts = Vec::new();
                let mut partition: u32 = 0;
                loop {
                    let Some(first) = partition.checked_mul(size) else {
                        tracing::warn!(
                            file = %file_name,
                            pages = texts.len(),
                            "Page window start exceeds u32; stopping"
                        );
                        break;
                    };
                    let range = format!("{}-{}", first, first.saturating_add(size - 1));
                    match self.run_job(&file_name, bytes.clone(), Some(&range)).await? {
                        Some(batch) => {
                            let received = batch.len();
                            texts.extend(batch);
                            if received < size as usize {
                                break;
                            }
                        }
                        // A window past the last page is rejected by the service.
                        // A transient failure looks the same, so say where output stops.
                        None if partition > 0 => {
                            tracing::warn!(
                                file = %file_name,
                                range = %range,
                                pages = texts.len(),
                                "Window rejected; assuming it is past the last page. \
                                 Output ends here and may be truncated"
                            );
                            break;
                        }
                        None => {
                            return Err(ApiError::upstream(
                                SERVICE,
                                format!("parsing {} (pages {}) failed", file_name, range),
                            ))
                        }
                    }
                    let Some(next) = partition.checked_add(1) else { break };
                    partition = next;
                }
                texts
            }
        };

        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| ParsedPage {
                page: index as u32 + 1,
                text,
            })
            .collect())
    }
}
