//! 请求文本
//!
//! 所有发给模型的固定文本都集中在这里。

use crate::models::WorkItem;

/// "没有找到对应内容"的哨兵词
pub const SKIP_SENTINEL: &str = "SKIP";

/// 缓存 / 每次请求附带的系统指令
pub const SYSTEM_INSTRUCTION: &str = "You are an analyst comparing exam questions against reference textbooks.\n\
Rules:\n\
1. Write every absolute value as `\\lvert x \\rvert` so that table cells never contain a bare `|`.\n\
2. Always look for the closest analogous problem in the attached textbooks.\n\
3. Only when the requested exam question does not exist, answer with the single word SKIP.";

/// 软化后缀，按尝试次数依次追加
const SOFTENERS: &[&str] = &[
    "(Copyright note: do not quote problem text verbatim; summarise it down to its key figures.)",
    "(Length note: keep every cell very short and concise.)",
];

/// 构建单个工作项的基础请求
pub fn analysis_prompt(item: &WorkItem) -> String {
    format!(
        r#"Analyse **{label}**.

Answer with exactly one markdown table row set in this layout:

| Question | Exam summary | Textbook analogue | Variation analysis |
| :--- | :--- | :--- | :--- |
| {id} | **[Source]**<br>(LaTeX)<br><br>**[Summary]** | **[Source]**<br>p.xx<br>(LaTeX)<br><br>**[Summary]** | **▶ Variation points**<br>• details |
"#,
        label = item.label,
        id = item.id
    )
}

/// 工作项的请求变体列表
///
/// 第 k 次尝试使用第 min(k, len-1) 个变体：原始请求、加版权软化、加长度软化
pub fn request_variants(item: &WorkItem) -> Vec<String> {
    let base = analysis_prompt(item);
    std::iter::once(base.clone())
        .chain(SOFTENERS.iter().map(|s| format!("{}\n{}", base, s)))
        .collect()
}

/// 让模型列出试卷题号的请求
pub const WORK_LIST_PROMPT: &str = "List every question in the attached exam paper, in order.\n\
Output one line per question in the form `ID | description`, where ID is the question \
number as printed (for example `12` or `short-answer 3`).\n\
Output nothing else.";
