//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::WorkItem;

/// 警告写入服务
///
/// 职责：
/// - 把重试耗尽的工作项追加写入警告文件
/// - 只处理单个工作项
/// - 不关心流程顺序
pub struct WarnWriter {
    warn_file_path: String,
}

impl WarnWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.warn_file_path
    }

    /// 写入警告信息
    ///
    /// # 参数
    /// - `item`: 工作项
    /// - `reason`: 失败原因
    pub async fn write(&self, item: &WorkItem, reason: &str) -> AppResult<()> {
        debug!("写入警告: 题目 {} | 原因: {}", item.id, reason);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .map_err(|e| AppError::file_write_failed(&self.warn_file_path, e))?;

        let warn_msg = format!(
            "{} | 题目 {} | {} | 原因: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            item.id,
            item.label,
            reason.replace('\n', " ")
        );

        file.write_all(warn_msg.as_bytes())
            .map_err(|e| AppError::file_write_failed(&self.warn_file_path, e))?;

        Ok(())
    }
}
