//! 响应分类
//!
//! 把一次生成结果归为：正文 / 哨兵跳过 / 被拦截 / 空响应。
//! 策略集中在 `classify_response` 一个纯函数里。

use crate::infrastructure::GenerateResponse;
use crate::services::prompts::SKIP_SENTINEL;

/// 视为内容拦截的结束原因
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// 响应分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseClass {
    /// 有实质内容
    Content(String),
    /// 模型明确表示没有对应内容
    Skip,
    /// 被安全策略拦截
    Blocked(String),
    /// 没有任何可用文本
    Empty,
}

/// 分类一次生成结果
///
/// 只有当整段文本去掉空白、强调符号、引号和结尾标点后恰好等于哨兵词时才算跳过；
/// 哨兵词夹在正文里的响应按正文处理
pub fn classify_response(response: &GenerateResponse) -> ResponseClass {
    if let Some(reason) = &response.block_reason {
        return ResponseClass::Blocked(reason.clone());
    }

    let text = response.text.as_deref().map(str::trim).unwrap_or("");

    if text.is_empty() {
        return match response.finish_reason.as_deref() {
            Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason) => {
                ResponseClass::Blocked(reason.to_string())
            }
            _ => ResponseClass::Empty,
        };
    }

    if is_skip_sentinel(text) {
        return ResponseClass::Skip;
    }

    ResponseClass::Content(text.to_string())
}

/// 文本是否只包含哨兵词
pub fn is_skip_sentinel(text: &str) -> bool {
    let stripped = text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '*' | '_' | '`' | '"' | '\'' | '.' | '!' | '。')
    });
    stripped.eq_ignore_ascii_case(SKIP_SENTINEL)
}
