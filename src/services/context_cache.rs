//! 上下文缓存服务 - 业务能力层
//!
//! 把全部文件和固定系统指令预加载到服务端缓存，后续每个工作项只发送短请求。

use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AppResult, SetupError};
use crate::infrastructure::{CacheRequest, GenerationContext, RemoteService};
use crate::models::{CacheHandle, UploadedArtifact};

const CACHE_DISPLAY_NAME: &str = "exam_analogue_context";

/// 上下文缓存服务
pub struct ContextCacheService {
    enabled: bool,
    ttl: Duration,
}

impl ContextCacheService {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self { enabled, ttl }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// 为已就绪的文件构建生成上下文
    ///
    /// 启用缓存时创建新缓存；否则每次请求直接引用文件
    pub async fn build_context(
        &self,
        remote: &dyn RemoteService,
        artifacts: &[UploadedArtifact],
        system_instruction: &str,
    ) -> AppResult<GenerationContext> {
        if !self.enabled {
            return Ok(GenerationContext::Inline {
                artifacts: artifacts.to_vec(),
                system_instruction: system_instruction.to_string(),
            });
        }

        info!("💾 正在创建上下文缓存（TTL {} 分钟）...", self.ttl.as_secs() / 60);
        let handle = remote
            .create_cache(CacheRequest {
                display_name: CACHE_DISPLAY_NAME,
                system_instruction,
                artifacts,
                ttl: self.ttl,
            })
            .await
            .map_err(|source| SetupError::CacheFailed { source })?;

        info!("✅ 缓存创建完成 (ID: {})", handle.name);
        Ok(GenerationContext::Cached(handle))
    }

    /// 尝试复用之前的缓存
    ///
    /// 缓存已过期、已被删除或查询失败时返回 None，由调用方重新准备
    pub async fn reuse(
        &self,
        remote: &dyn RemoteService,
        handle: &CacheHandle,
    ) -> Option<CacheHandle> {
        if !self.enabled {
            return None;
        }
        if handle.is_expired(Utc::now()) {
            info!("缓存 {} 已过期，需要重新创建", handle.name);
            return None;
        }

        match remote.get_cache(&handle.name).await {
            Ok(Some(current)) if !current.is_expired(Utc::now()) => {
                info!("♻️ 复用已有缓存: {}", current.name);
                Some(current)
            }
            Ok(_) => {
                info!("缓存 {} 已不存在，需要重新创建", handle.name);
                None
            }
            Err(e) => {
                warn!("⚠️ 查询缓存 {} 失败，将重新创建: {}", handle.name, e);
                None
            }
        }
    }
}
