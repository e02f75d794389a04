//! 运行状态
//!
//! 游标、结果日志、缓存句柄等会话级状态全部放在 `RunState` 中，
//! 由批处理驱动器显式持有，并在每个工作项完成后写回磁盘。

use crate::error::StateError;
use crate::models::artifact::{CacheHandle, UploadedArtifact};
use crate::models::work_item::WorkItem;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 批处理状态机的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

/// 累计的 token 用量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub candidate_tokens: u64,
    pub cached_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.candidate_tokens += other.candidate_tokens;
        self.cached_tokens += other.cached_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// 一次运行的完整状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    pub phase: RunPhase,
    /// 下一个待处理工作项的下标
    pub cursor: usize,
    /// 成功产出的文本，按处理顺序追加
    pub results: Vec<String>,
    /// 本次运行使用的工作列表
    pub work_list: Vec<WorkItem>,
    /// 已上传的远程文件
    #[serde(default)]
    pub artifacts: Vec<UploadedArtifact>,
    /// 上下文缓存
    #[serde(default)]
    pub cache: Option<CacheHandle>,
    #[serde(default)]
    pub usage: TokenUsage,
    /// 重试耗尽的工作项 id
    #[serde(default)]
    pub failed_items: Vec<String>,
    /// 中止原因
    #[serde(default)]
    pub abort_reason: Option<String>,
}

impl RunState {
    /// 全新开始：游标归零、清空结果日志
    pub fn start(&mut self, work_list: Vec<WorkItem>) {
        self.phase = RunPhase::Running;
        self.cursor = 0;
        self.results.clear();
        self.failed_items.clear();
        self.usage = TokenUsage::default();
        self.abort_reason = None;
        self.work_list = work_list;
    }

    /// 从当前游标继续，游标和结果日志保持不变
    pub fn resume(&mut self) -> Result<(), StateError> {
        if self.cursor > self.work_list.len() {
            return Err(StateError::CursorOutOfRange {
                cursor: self.cursor,
                len: self.work_list.len(),
            });
        }
        self.phase = RunPhase::Running;
        self.abort_reason = None;
        Ok(())
    }

    /// 当前待处理的工作项
    pub fn current_item(&self) -> Option<&WorkItem> {
        self.work_list.get(self.cursor)
    }

    /// 游标前进一格，不会超过工作列表长度
    pub fn advance(&mut self) {
        if self.cursor < self.work_list.len() {
            self.cursor += 1;
        }
    }

    pub fn append_result(&mut self, text: String) {
        self.results.push(text);
    }

    pub fn mark_failed(&mut self, item_id: &str) {
        self.failed_items.push(item_id.to_string());
    }

    pub fn remaining(&self) -> usize {
        self.work_list.len().saturating_sub(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.work_list.len()
    }

    pub fn complete(&mut self) {
        self.phase = RunPhase::Completed;
    }

    pub fn abort(&mut self, reason: impl Into<String>) {
        self.phase = RunPhase::Aborted;
        self.abort_reason = Some(reason.into());
    }

    /// 是否存在可以继续的进度
    pub fn can_resume(&self) -> bool {
        !self.work_list.is_empty() && self.cursor > 0 && !self.is_exhausted()
    }

    /// 从文件加载，文件不存在时返回 None
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, StateError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let state: RunState =
            serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Some(state))
    }

    /// 写入文件（先写临时文件再改名）
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| StateError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .and_then(|_| std::fs::rename(&tmp_path, path))
            .map_err(|source| StateError::Io {
                path: path.display().to_string(),
                source,
            })
    }
}
