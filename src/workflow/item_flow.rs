//! 工作项处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! 流程顺序：
//! 1. 构建请求变体列表
//! 2. 依次尝试，最多 `max_attempts` 次，每次之间固定等待
//! 3. 分类响应：正文 → 成功；哨兵 → 跳过；拦截 / 空 / 调用失败 → 换下一个变体重试
//! 4. 重试耗尽 → 失败（非致命）

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::infrastructure::{GenerateRequest, GenerationContext, RemoteService};
use crate::models::TokenUsage;
use crate::services::prompts::request_variants;
use crate::utils::logging::truncate_text;
use crate::workflow::classify::{classify_response, ResponseClass};
use crate::workflow::item_ctx::ItemCtx;

/// 工作项处理结果
#[derive(Debug)]
pub enum ProcessResult {
    /// 得到正文
    Success { text: String, usage: TokenUsage },
    /// 模型明确表示没有对应内容
    Skipped,
    /// 重试耗尽，携带最后一次的错误
    Failed { attempts: usize, error: RemoteError },
}

/// 工作项处理流程
///
/// - 只处理单个工作项
/// - 不持有运行状态，不推进游标
/// - 不决定失败后的去向（由驱动器决定）
pub struct ItemFlow {
    max_attempts: usize,
    retry_delay: Duration,
    verbose_logging: bool,
}

impl ItemFlow {
    pub fn new(max_attempts: usize, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            verbose_logging: false,
        }
    }

    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    pub async fn run(
        &self,
        remote: &dyn RemoteService,
        context: &GenerationContext,
        ctx: &ItemCtx,
    ) -> ProcessResult {
        let variants = request_variants(&ctx.item);
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            let prompt = variants[attempt.min(variants.len() - 1)].as_str();
            if attempt > 0 {
                info!(
                    "{} 🔁 第 {}/{} 次尝试（请求变体 {}）",
                    ctx,
                    attempt + 1,
                    self.max_attempts,
                    attempt.min(variants.len() - 1)
                );
            }

            match remote.generate(GenerateRequest { prompt, context }).await {
                Ok(response) => {
                    let usage = response.usage;
                    match classify_response(&response) {
                        ResponseClass::Content(text) => {
                            self.log_success(ctx, &text, &usage);
                            return ProcessResult::Success { text, usage };
                        }
                        ResponseClass::Skip => {
                            info!("{} ⏭️ 教材中没有对应题目，跳过", ctx);
                            return ProcessResult::Skipped;
                        }
                        ResponseClass::Blocked(reason) => {
                            warn!("{} ⚠️ 内容被拦截: {}", ctx, reason);
                            last_error = Some(RemoteError::Blocked { reason });
                        }
                        ResponseClass::Empty => {
                            warn!("{} ⚠️ 返回内容为空", ctx);
                            last_error = Some(RemoteError::EmptyContent {
                                item: ctx.item.id.clone(),
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!("{} ⚠️ 调用失败: {}", ctx, e);
                    last_error = Some(e);
                }
            }

            if attempt + 1 < self.max_attempts && !self.retry_delay.is_zero() {
                sleep(self.retry_delay).await;
            }
        }

        ProcessResult::Failed {
            attempts: self.max_attempts,
            error: last_error.unwrap_or(RemoteError::EmptyContent {
                item: ctx.item.id.clone(),
            }),
        }
    }

    fn log_success(&self, ctx: &ItemCtx, text: &str, usage: &TokenUsage) {
        info!(
            "{} ✓ 分析完成 (tokens: 输入 {}, 输出 {}, 缓存 {})",
            ctx, usage.prompt_tokens, usage.candidate_tokens, usage.cached_tokens
        );
        if self.verbose_logging {
            info!("{} {}", ctx, truncate_text(text, 200));
        } else {
            debug!("{} {}", ctx, truncate_text(text, 80));
        }
    }
}
