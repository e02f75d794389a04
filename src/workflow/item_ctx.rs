//! 工作项处理上下文
//!
//! 封装"我正在处理工作列表的第几项"这一信息

use std::fmt::Display;

use crate::models::WorkItem;

/// 工作项处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 在工作列表中的下标（从 0 开始）
    pub index: usize,
    /// 工作列表总长度
    pub total: usize,
    pub item: WorkItem,
}

impl ItemCtx {
    pub fn new(index: usize, total: usize, item: WorkItem) -> Self {
        Self { index, total, item }
    }

    /// 从 1 开始的序号，仅用于日志
    pub fn position(&self) -> usize {
        self.index + 1
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[题目 {} ({}/{})]",
            self.item.id,
            self.position(),
            self.total
        )
    }
}
