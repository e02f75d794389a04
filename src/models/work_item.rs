use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 选择题数量
pub const MULTIPLE_CHOICE_COUNT: usize = 25;
/// 简答题数量
pub const SHORT_ANSWER_COUNT: usize = 6;

/// 单个工作项：一道需要分析的试题
///
/// 工作列表构建完成后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// 题号，例如 "12" 或 "short-answer 3"
    pub id: String,
    /// 给人看的描述，会拼进请求里
    pub label: String,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.id, self.label)
    }
}

/// 默认工作列表：25 道选择题 + 6 道简答题
pub fn default_work_list() -> Vec<WorkItem> {
    let multiple_choice = (1..=MULTIPLE_CHOICE_COUNT)
        .map(|i| WorkItem::new(i.to_string(), format!("exam multiple-choice question {}", i)));
    let short_answer = (1..=SHORT_ANSWER_COUNT).map(|i| {
        WorkItem::new(
            format!("short-answer {}", i),
            format!("exam short-answer (free response) question {}", i),
        )
    });
    multiple_choice.chain(short_answer).collect()
}
