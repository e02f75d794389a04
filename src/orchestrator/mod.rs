//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责运行生命周期和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 校验配置、初始化日志文件
//! - 加载或新建运行状态，决定全新开始还是续跑
//! - 输出 HTML 结果和最终统计
//!
//! ### `session_setup` - 准备阶段
//! - 切分、上传、等待就绪、构建上下文缓存
//! - 这里的错误全部是致命错误
//!
//! ### `batch_driver` - 批处理驱动器
//! - 状态机 Idle → Running → Completed / Aborted
//! - 串行遍历工作列表，推进游标，持久化状态
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! batch_driver ──▶ session_setup
//!     ↓
//! workflow::ItemFlow (处理单个工作项)
//!     ↓
//! services (能力层：chunk / poll / cache / render / warn)
//!     ↓
//! infrastructure (基础设施：RemoteService)
//! ```

pub mod app;
pub mod batch_driver;
pub mod session_setup;

// 重新导出主要类型
pub use app::App;
pub use batch_driver::{execute_run, BatchDriver, RunMode, RunSummary};
pub use session_setup::SessionSetup;
