use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 远程文件的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactState {
    /// 仍在处理中
    Pending,
    /// 可以使用
    Ready,
    /// 处理失败（终态）
    Failed,
}

impl ArtifactState {
    /// 从远程服务返回的状态字符串转换
    ///
    /// 未知状态一律视为仍在处理中
    pub fn from_remote(state: &str) -> Self {
        match state.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => ArtifactState::Ready,
            "FAILED" => ArtifactState::Failed,
            _ => ArtifactState::Pending,
        }
    }
}

/// 上传后的远程文件句柄
///
/// 文件本身归远程服务所有，这里只保存引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedArtifact {
    /// 远程资源名，例如 "files/abc123"
    pub id: String,
    /// 在生成请求中引用该文件的 URI
    pub uri: String,
    pub mime_type: String,
    pub display_name: String,
    pub state: ArtifactState,
}

/// 上下文缓存句柄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHandle {
    /// 远程资源名，例如 "cachedContents/xyz"
    pub name: String,
    /// 过期时间，服务未返回时为 None
    pub expire_time: Option<DateTime<Utc>>,
}

impl CacheHandle {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time.map(|t| t <= now).unwrap_or(false)
    }
}
