//! # Exam Analogue
//!
//! 把试卷 PDF 和参考教材 PDF 交给远程大模型，逐题找出教材中的对应题目，
//! 输出带公式的对照表 HTML。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 远程服务的唯一入口，只暴露能力
//! - `RemoteService` - 上传 / 查询状态 / 上下文缓存 / 生成
//! - `GeminiClient` - 基于 reqwest 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `PdfChunker` - 切分并上传
//! - `ReadinessPoller` - 等待远程文件就绪
//! - `ContextCacheService` - 上下文缓存
//! - `html_renderer` - 结果渲染
//! - `WarnWriter` - 写 warn.txt
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整处理流程
//! - `ItemCtx` - 上下文封装（下标 + 工作项）
//! - `ItemFlow` - 请求变体 → 重试 → 分类
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session_setup` - 准备阶段，错误即中止
//! - `orchestrator/batch_driver` - 状态机与游标，单项失败不中止
//! - `orchestrator/app` - 应用入口
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{GeminiClient, GenerationContext, RemoteService};
pub use models::{RunPhase, RunState, WorkItem};
pub use orchestrator::{execute_run, App, BatchDriver, RunMode, RunSummary};
pub use workflow::{ItemCtx, ItemFlow, ProcessResult};
