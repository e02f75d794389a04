//! 准备阶段 - 编排层
//!
//! ## 职责
//!
//! 在批处理开始前把所有文件送到远程服务并得到可用的生成上下文：
//!
//! 1. **读取并切分**：试卷和每本教材，超过页数上限的切段
//! 2. **逐段上传**：任意一段失败即中止
//! 3. **等待就绪**：轮询直到全部就绪，失败或超时即中止
//! 4. **构建上下文**：创建上下文缓存，或直接引用文件
//!
//! 这里出现的所有错误都是致命错误。

use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError};
use crate::infrastructure::{GenerationContext, RemoteService};
use crate::models::{RunState, UploadedArtifact};
use crate::services::prompts::SYSTEM_INSTRUCTION;
use crate::services::{ContextCacheService, PdfChunker, ReadinessPoller};

/// 准备阶段
pub struct SessionSetup {
    chunker: PdfChunker,
    poller: ReadinessPoller,
    cache_service: ContextCacheService,
    exam_pdf: String,
    textbook_pdfs: Vec<String>,
}

impl SessionSetup {
    pub fn new(config: &Config) -> Self {
        Self {
            chunker: PdfChunker::new(config.max_chunk_pages),
            poller: ReadinessPoller::new(config.poll_interval(), config.readiness_timeout()),
            cache_service: ContextCacheService::new(config.use_context_cache, config.cache_ttl()),
            exam_pdf: config.exam_pdf.clone(),
            textbook_pdfs: config.textbook_pdfs.clone(),
        }
    }

    /// 全新准备：上传全部文件、等待就绪、构建上下文
    ///
    /// 上传结果和缓存句柄写入 `state`
    pub async fn prepare_fresh(
        &self,
        remote: &dyn RemoteService,
        state: &mut RunState,
    ) -> AppResult<GenerationContext> {
        state.artifacts.clear();
        state.cache = None;

        info!("📂 正在上传文件...");
        let mut artifacts = self.upload_all(remote).await?;
        self.poller.wait_until_ready(remote, &mut artifacts).await?;
        state.artifacts = artifacts;

        let context = self
            .cache_service
            .build_context(remote, &state.artifacts, SYSTEM_INSTRUCTION)
            .await?;
        if let GenerationContext::Cached(handle) = &context {
            state.cache = Some(handle.clone());
        }
        Ok(context)
    }

    /// 续跑准备：尽量复用上次的缓存或文件，不可用时退回全新准备
    pub async fn prepare_resume(
        &self,
        remote: &dyn RemoteService,
        state: &mut RunState,
    ) -> AppResult<GenerationContext> {
        if let Some(handle) = state.cache.clone() {
            if let Some(current) = self.cache_service.reuse(remote, &handle).await {
                state.cache = Some(current.clone());
                return Ok(GenerationContext::Cached(current));
            }
        } else if !self.cache_service.enabled() && !state.artifacts.is_empty() {
            let mut artifacts = state.artifacts.clone();
            match self.poller.wait_until_ready(remote, &mut artifacts).await {
                Ok(()) => {
                    info!("♻️ 复用已上传的 {} 个文件", artifacts.len());
                    state.artifacts = artifacts.clone();
                    return Ok(GenerationContext::Inline {
                        artifacts,
                        system_instruction: SYSTEM_INSTRUCTION.to_string(),
                    });
                }
                Err(e) => warn!("⚠️ 上次上传的文件不可用，重新上传: {}", e),
            }
        }

        self.prepare_fresh(remote, state).await
    }

    /// 读取、切分并上传试卷和所有教材，顺序为试卷在前
    async fn upload_all(&self, remote: &dyn RemoteService) -> AppResult<Vec<UploadedArtifact>> {
        let mut artifacts = Vec::new();

        for path in std::iter::once(&self.exam_pdf).chain(self.textbook_pdfs.iter()) {
            let (name, bytes) = read_document(path).await?;
            let uploaded = self.chunker.upload_document(remote, &name, bytes).await?;
            info!("✓ {} 上传完成（{} 个分片）", name, uploaded.len());
            artifacts.extend(uploaded);
        }

        Ok(artifacts)
    }
}

async fn read_document(path: &str) -> AppResult<(String, Vec<u8>)> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        return Err(FileError::NotFound {
            path: path.to_string(),
        }
        .into());
    }

    let bytes = tokio::fs::read(file_path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))?;
    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());

    Ok((name, bytes))
}
