//! 工作列表构建 - 业务能力层
//!
//! 来源优先级：TOML 文件 > 模型推导 > 默认列表

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{GenerateRequest, GenerationContext, RemoteService};
use crate::models::{default_work_list, load_work_list, WorkItem};
use crate::services::prompts::WORK_LIST_PROMPT;

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*\|?\s*(?:[-*•]\s*|\d+[.)]\s+)?`?([^|`]+?)`?\s*\|\s*(.+?)\s*$")
            .expect("work list line pattern is valid")
    })
}

/// 解析模型返回的 `ID | 描述` 行，也接受 `| ID | 描述 |` 表格行
///
/// 表头、分隔行和重复 id 会被丢弃
pub fn parse_derived_list(text: &str) -> Vec<WorkItem> {
    let mut items: Vec<WorkItem> = Vec::new();

    for line in text.lines() {
        let Some(caps) = line_pattern().captures(line) else {
            continue;
        };
        let id = caps[1].trim().trim_matches('*').trim();
        let label = caps[2].trim().trim_end_matches('|').trim();

        if id.is_empty() || id.chars().all(|c| matches!(c, '-' | ':' | ' ')) {
            continue;
        }
        if id.eq_ignore_ascii_case("id") || id.eq_ignore_ascii_case("question") {
            continue;
        }
        if items.iter().any(|i| i.id == id) {
            continue;
        }
        items.push(WorkItem::new(id, label));
    }

    items
}

/// 构建工作列表
///
/// 列表文件读取失败属于配置问题，直接返回错误；
/// 模型推导失败只告警并回退到默认列表
pub async fn build_work_list(
    config: &Config,
    remote: &dyn RemoteService,
    context: &GenerationContext,
) -> AppResult<Vec<WorkItem>> {
    if let Some(path) = &config.work_list_file {
        info!("📋 从文件加载工作列表: {}", path);
        return load_work_list(Path::new(path)).await;
    }

    if config.derive_work_list {
        info!("📋 正在让模型推导题号列表...");
        match remote
            .generate(GenerateRequest {
                prompt: WORK_LIST_PROMPT,
                context,
            })
            .await
        {
            Ok(response) => {
                let items = response
                    .text
                    .as_deref()
                    .map(parse_derived_list)
                    .unwrap_or_default();
                if !items.is_empty() {
                    info!("✓ 模型推导出 {} 道题目", items.len());
                    return Ok(items);
                }
                warn!("⚠️ 模型没有返回可用的题号列表，使用默认列表");
            }
            Err(e) => warn!("⚠️ 推导题号列表失败，使用默认列表: {}", e),
        }
    }

    Ok(default_work_list())
}
