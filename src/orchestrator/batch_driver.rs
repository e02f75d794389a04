//! 批处理驱动器 - 编排层
//!
//! ## 状态机
//!
//! ```text
//! Idle ──start/resume──▶ Running ──列表处理完──▶ Completed
//!                           │
//!                           └──致命错误──▶ Aborted
//! ```
//!
//! ## 核心规则
//!
//! 1. **严格串行**：一次只处理一个工作项
//! 2. **永不卡住**：成功、跳过、失败都推进游标
//! 3. **单项失败非致命**：只写警告，继续下一项
//! 4. **显式持久化**：每个工作项完成后写回状态文件

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, StateError};
use crate::infrastructure::{GenerationContext, RemoteService};
use crate::models::{RunPhase, RunState};
use crate::orchestrator::session_setup::SessionSetup;
use crate::services::{build_work_list, WarnWriter};
use crate::workflow::{ItemCtx, ItemFlow, ProcessResult};

/// 运行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 游标归零、清空结果日志、重新上传
    Start,
    /// 从当前游标继续
    Resume,
}

/// 一次驱动的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub phase: RunPhase,
    pub cursor: usize,
    pub total: usize,
    /// 本次追加到结果日志的数量
    pub appended: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 批处理驱动器
pub struct BatchDriver {
    flow: ItemFlow,
    warn_writer: Option<WarnWriter>,
    state_file: Option<PathBuf>,
}

impl BatchDriver {
    pub fn new(flow: ItemFlow) -> Self {
        Self {
            flow,
            warn_writer: None,
            state_file: None,
        }
    }

    /// 按配置创建：带警告文件和状态文件
    pub fn from_config(config: &Config) -> Self {
        let flow = ItemFlow::new(config.max_attempts, config.retry_delay())
            .with_verbose_logging(config.verbose_logging);
        Self::new(flow)
            .with_warn_writer(WarnWriter::with_path(&config.warn_file))
            .with_state_file(&config.state_file)
    }

    pub fn with_warn_writer(mut self, warn_writer: WarnWriter) -> Self {
        self.warn_writer = Some(warn_writer);
        self
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// 从当前游标处理到列表末尾
    pub async fn run(
        &self,
        remote: &dyn RemoteService,
        context: &GenerationContext,
        state: &mut RunState,
    ) -> AppResult<RunSummary> {
        self.run_items(remote, context, state, None).await
    }

    /// 从当前游标开始最多处理 `limit` 个工作项
    ///
    /// 未处理到末尾时阶段保持 Running，之后可以续跑
    pub async fn run_items(
        &self,
        remote: &dyn RemoteService,
        context: &GenerationContext,
        state: &mut RunState,
        limit: Option<usize>,
    ) -> AppResult<RunSummary> {
        if state.phase != RunPhase::Running {
            return Err(StateError::NotRunning {
                phase: format!("{:?}", state.phase),
            }
            .into());
        }

        let total = state.work_list.len();
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };
        let mut processed = 0usize;

        info!(
            "📦 开始处理工作列表：第 {}/{} 项起，剩余 {} 项",
            (state.cursor + 1).min(total),
            total,
            state.remaining()
        );

        while let Some(item) = state.current_item().cloned() {
            if limit.is_some_and(|l| processed >= l) {
                break;
            }

            let ctx = ItemCtx::new(state.cursor, total, item);
            info!("{} 🔄 分析中...", ctx);

            match self.flow.run(remote, context, &ctx).await {
                ProcessResult::Success { text, usage } => {
                    state.append_result(text);
                    state.usage.add(&usage);
                    summary.appended += 1;
                }
                ProcessResult::Skipped => {
                    summary.skipped += 1;
                }
                ProcessResult::Failed { attempts, error } => {
                    let reason = format!("已尝试 {} 次: {}", attempts, error);
                    warn!("{} ❌ 重试耗尽，跳过该题: {}", ctx, reason);
                    state.mark_failed(&ctx.item.id);
                    summary.failed += 1;
                    self.write_warn(&ctx, &reason).await;
                }
            }

            state.advance();
            processed += 1;
            self.persist(state)?;
        }

        if state.is_exhausted() {
            state.complete();
            self.persist(state)?;
            info!("✅ 工作列表处理完成");
        } else {
            info!(
                "⏸️ 已暂停在第 {}/{} 项，可续跑",
                state.cursor + 1,
                total
            );
        }

        summary.phase = state.phase;
        summary.cursor = state.cursor;
        Ok(summary)
    }

    /// 写回状态文件（未配置时什么也不做）
    pub fn persist(&self, state: &RunState) -> AppResult<()> {
        if let Some(path) = &self.state_file {
            state.save(path)?;
        }
        Ok(())
    }

    async fn write_warn(&self, ctx: &ItemCtx, reason: &str) {
        if let Some(writer) = &self.warn_writer {
            if let Err(e) = writer.write(&ctx.item, reason).await {
                warn!("{} 写入 {} 失败: {}", ctx, writer.path(), e);
            }
        }
    }
}

/// 执行一次完整运行：状态迁移 → 准备 → 工作列表 → 批处理
///
/// 准备阶段出错时状态迁移到 Aborted 并返回错误，不会处理任何工作项；
/// 批处理中的致命错误（例如状态文件写入失败）同样迁移到 Aborted
pub async fn execute_run(
    config: &Config,
    remote: &dyn RemoteService,
    state: &mut RunState,
    mode: RunMode,
) -> AppResult<RunSummary> {
    let driver = BatchDriver::from_config(config);
    let setup = SessionSetup::new(config);

    match mode {
        RunMode::Start => state.start(Vec::new()),
        RunMode::Resume => state.resume()?,
    }
    driver.persist(state)?;

    let prepared = match mode {
        RunMode::Start => setup.prepare_fresh(remote, state).await,
        RunMode::Resume => setup.prepare_resume(remote, state).await,
    };
    let context = match prepared {
        Ok(context) => context,
        Err(e) => return Err(abort(&driver, state, e)),
    };

    if state.work_list.is_empty() {
        match build_work_list(config, remote, &context).await {
            Ok(list) => state.work_list = list,
            Err(e) => return Err(abort(&driver, state, e)),
        }
    }
    driver.persist(state)?;

    driver.run(remote, &context, state).await.map_err(|e| {
        if e.is_fatal() {
            abort(&driver, state, e)
        } else {
            e
        }
    })
}

fn abort(driver: &BatchDriver, state: &mut RunState, err: AppError) -> AppError {
    error!("❌ 运行中止: {}", err);
    state.abort(err.to_string());
    if let Err(persist_err) = driver.persist(state) {
        warn!("保存运行状态失败: {}", persist_err);
    }
    err
}
