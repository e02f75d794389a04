use crate::error::{AppError, AppResult, FileError};
use crate::models::work_item::WorkItem;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 工作列表 TOML 文件结构
///
/// ```toml
/// [[items]]
/// id = "1"
/// label = "exam multiple-choice question 1"
/// ```
#[derive(Debug, Deserialize)]
struct WorkListFile {
    #[serde(default)]
    items: Vec<WorkItemEntry>,
}

#[derive(Debug, Deserialize)]
struct WorkItemEntry {
    id: String,
    /// 省略时使用 id
    label: Option<String>,
}

/// 从 TOML 文件加载工作列表
pub async fn load_work_list(toml_file_path: &Path) -> AppResult<Vec<WorkItem>> {
    let path_str = toml_file_path.display().to_string();

    if !toml_file_path.exists() {
        return Err(FileError::NotFound { path: path_str }.into());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    parse_work_list(&content).map_err(|source| {
        FileError::TomlParseFailed {
            path: path_str.clone(),
            source,
        }
        .into()
    })
}

/// 解析工作列表 TOML 文本，空 id 的条目会被丢弃
pub fn parse_work_list(content: &str) -> Result<Vec<WorkItem>, toml::de::Error> {
    let file: WorkListFile = toml::from_str(content)?;

    let items = file
        .items
        .into_iter()
        .filter(|entry| !entry.id.trim().is_empty())
        .map(|entry| {
            let id = entry.id.trim().to_string();
            let label = entry
                .label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| id.clone());
            WorkItem::new(id, label)
        })
        .collect::<Vec<_>>();

    tracing::info!("成功加载 {} 个工作项", items.len());
    Ok(items)
}
