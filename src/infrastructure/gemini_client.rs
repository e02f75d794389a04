//! Generative Language REST 客户端 - 基础设施层
//!
//! 用 `reqwest` 实现 `RemoteService`：文件上传（resumable 协议）、
//! 文件状态查询、上下文缓存、内容生成。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RemoteError;
use crate::infrastructure::remote::{
    CacheRequest, GenerateRequest, GenerateResponse, GenerationContext, RemoteService,
};
use crate::models::{ArtifactState, CacheHandle, TokenUsage, UploadedArtifact};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Generative Language API 客户端
///
/// 职责：
/// - 只负责 HTTP 调用和报文转换
/// - 不认识工作项 / 游标
/// - 不做重试（重试由流程层决定）
pub struct GeminiClient {
    http: Client,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

impl GeminiClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    fn model_path(&self) -> String {
        if self.model_name.starts_with("models/") {
            self.model_name.clone()
        } else {
            format!("models/{}", self.model_name)
        }
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| RemoteError::request_failed(endpoint, e))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!("远程服务返回错误 ({}): status={}", endpoint, status);
        Err(RemoteError::BadStatus {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = self.send(endpoint, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::request_failed(endpoint, e))?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RemoteService for GeminiClient {
    async fn upload(
        &self,
        display_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedArtifact, RemoteError> {
        let endpoint = "upload/v1beta/files";
        debug!("开始上传 {} ({} 字节)", display_name, bytes.len());

        // 第一步：申请上传地址
        let start = self
            .http
            .post(self.url(endpoint))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }));
        let response = self.send(endpoint, start).await?;

        let upload_url = response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| RemoteError::MissingField {
                endpoint: endpoint.to_string(),
                field: UPLOAD_URL_HEADER.to_string(),
            })?;

        // 第二步：一次性上传并结束
        let finish = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes);
        let uploaded: FileEnvelope = self.send_json(endpoint, finish).await?;

        debug!("上传完成: {}", uploaded.file.name);
        Ok(uploaded.file.into_artifact(display_name))
    }

    async fn artifact_state(&self, artifact_id: &str) -> Result<ArtifactState, RemoteError> {
        let endpoint = format!("v1beta/{}", artifact_id);
        let file: RemoteFile = self
            .send_json(&endpoint, self.http.get(self.url(&endpoint)))
            .await?;
        Ok(ArtifactState::from_remote(file.state.as_deref().unwrap_or("")))
    }

    async fn create_cache(&self, request: CacheRequest<'_>) -> Result<CacheHandle, RemoteError> {
        let endpoint = "v1beta/cachedContents";
        let body = json!({
            "model": self.model_path(),
            "displayName": request.display_name,
            "systemInstruction": text_content(request.system_instruction),
            "contents": [file_content(request.artifacts)],
            "ttl": format!("{}s", request.ttl.as_secs()),
        });

        let cached: RemoteCache = self
            .send_json(endpoint, self.http.post(self.url(endpoint)).json(&body))
            .await?;
        Ok(cached.into_handle())
    }

    async fn get_cache(&self, name: &str) -> Result<Option<CacheHandle>, RemoteError> {
        let endpoint = format!("v1beta/{}", name);
        match self
            .send_json::<RemoteCache>(&endpoint, self.http.get(self.url(&endpoint)))
            .await
        {
            Ok(cached) => Ok(Some(cached.into_handle())),
            Err(RemoteError::BadStatus { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn generate(
        &self,
        request: GenerateRequest<'_>,
    ) -> Result<GenerateResponse, RemoteError> {
        let endpoint = format!("v1beta/{}:generateContent", self.model_path());
        let body = build_generate_body(request);
        debug!("调用生成接口，模型: {}", self.model_name);

        let response: GenerateContentResponse = self
            .send_json(&endpoint, self.http.post(self.url(&endpoint)).json(&body))
            .await?;
        Ok(response.into_generate_response())
    }
}

// ========== 请求报文 ==========

fn text_content(text: &str) -> JsonValue {
    json!({ "parts": [{ "text": text }] })
}

fn file_content(artifacts: &[UploadedArtifact]) -> JsonValue {
    let parts: Vec<JsonValue> = artifacts
        .iter()
        .map(|a| json!({ "fileData": { "mimeType": a.mime_type, "fileUri": a.uri } }))
        .collect();
    json!({ "role": "user", "parts": parts })
}

fn build_generate_body(request: GenerateRequest<'_>) -> JsonValue {
    let prompt = json!({ "role": "user", "parts": [{ "text": request.prompt }] });
    match request.context {
        GenerationContext::Cached(cache) => json!({
            "cachedContent": cache.name,
            "contents": [prompt],
        }),
        GenerationContext::Inline {
            artifacts,
            system_instruction,
        } => json!({
            "systemInstruction": text_content(system_instruction),
            "contents": [file_content(artifacts), prompt],
        }),
    }
}

// ========== 响应报文 ==========

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    name: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl RemoteFile {
    fn into_artifact(self, fallback_name: &str) -> UploadedArtifact {
        UploadedArtifact {
            uri: self.uri.unwrap_or_default(),
            mime_type: self
                .mime_type
                .unwrap_or_else(|| "application/pdf".to_string()),
            display_name: self
                .display_name
                .unwrap_or_else(|| fallback_name.to_string()),
            state: ArtifactState::from_remote(self.state.as_deref().unwrap_or("")),
            id: self.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteCache {
    name: String,
    #[serde(default)]
    expire_time: Option<DateTime<Utc>>,
}

impl RemoteCache {
    fn into_handle(self) -> CacheHandle {
        CacheHandle {
            name: self.name,
            expire_time: self.expire_time,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

impl GenerateContentResponse {
    fn into_generate_response(self) -> GenerateResponse {
        let usage = self
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                candidate_tokens: u.candidates_token_count,
                cached_tokens: u.cached_content_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let first = self.candidates.into_iter().next();
        let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());

        let text = first
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty());

        GenerateResponse {
            text,
            block_reason,
            finish_reason,
            usage,
        }
    }
}
