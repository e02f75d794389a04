//! 远程服务接口 - 基础设施层
//!
//! 外部生成式 AI 服务只通过 `RemoteService` 暴露四种能力：
//! 上传文件、查询文件状态、上下文缓存、生成内容。

use async_trait::async_trait;
use std::time::Duration;

use crate::error::RemoteError;
use crate::models::{ArtifactState, CacheHandle, TokenUsage, UploadedArtifact};

/// 生成请求绑定的上下文
#[derive(Debug, Clone)]
pub enum GenerationContext {
    /// 绑定服务端缓存（缓存内已包含文件和系统指令）
    Cached(CacheHandle),
    /// 每次请求都直接引用文件
    Inline {
        artifacts: Vec<UploadedArtifact>,
        system_instruction: String,
    },
}

/// 创建上下文缓存的请求
#[derive(Debug, Clone)]
pub struct CacheRequest<'a> {
    pub display_name: &'a str,
    pub system_instruction: &'a str,
    pub artifacts: &'a [UploadedArtifact],
    pub ttl: Duration,
}

/// 单次生成请求
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub context: &'a GenerationContext,
}

/// 生成结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// 所有文本片段拼接后的内容；没有任何片段时为 None
    pub text: Option<String>,
    /// 请求被整体拦截时的原因
    pub block_reason: Option<String>,
    /// 候选结果的结束原因，例如 "STOP" / "SAFETY" / "RECITATION"
    pub finish_reason: Option<String>,
    pub usage: TokenUsage,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish_reason: Some("STOP".to_string()),
            ..Default::default()
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            block_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// 外部服务能力
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// 上传一个文件，返回远程句柄
    async fn upload(
        &self,
        display_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedArtifact, RemoteError>;

    /// 查询远程文件当前状态
    async fn artifact_state(&self, artifact_id: &str) -> Result<ArtifactState, RemoteError>;

    /// 创建上下文缓存
    async fn create_cache(&self, request: CacheRequest<'_>) -> Result<CacheHandle, RemoteError>;

    /// 获取已有缓存，不存在时返回 None
    async fn get_cache(&self, name: &str) -> Result<Option<CacheHandle>, RemoteError>;

    /// 生成内容
    async fn generate(&self, request: GenerateRequest<'_>)
        -> Result<GenerateResponse, RemoteError>;
}
