//! 应用入口 - 编排层
//!
//! 管理一次运行的生命周期：初始化、加载 / 新建运行状态、执行、输出结果、统计。

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::GeminiClient;
use crate::models::RunState;
use crate::orchestrator::batch_driver::{execute_run, RunMode, RunSummary};
use crate::services::render_html;
use crate::utils::logging::{append_log_line, init_log_file, log_startup};

/// 应用主结构
pub struct App {
    config: Config,
    client: GeminiClient,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        if !config.resume {
            init_log_file(&config.output_log_file)?;
        }
        log_startup(&config.model_name, config.resume);

        let client = GeminiClient::new(&config);
        Ok(Self { config, client })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let (mut state, mode) = self.load_state()?;

        let outcome = execute_run(&self.config, &self.client, &mut state, mode).await;

        // 中途失败也输出已有结果
        self.write_output(&state).await?;

        match outcome {
            Ok(summary) => {
                self.print_final_stats(&summary, &state);
                Ok(())
            }
            Err(e) => {
                error!("❌ 运行中止: {}", e);
                self.log_to_file(&format!("运行中止: {}", e));
                Err(e.into())
            }
        }
    }

    /// 续跑时加载状态文件，没有可续跑的进度则全新开始
    fn load_state(&self) -> Result<(RunState, RunMode)> {
        if !self.config.resume {
            return Ok((RunState::default(), RunMode::Start));
        }

        let loaded = RunState::load(&self.config.state_file)
            .with_context(|| format!("无法加载运行状态: {}", self.config.state_file))?;

        match loaded {
            Some(state) if state.can_resume() => {
                let next = state
                    .current_item()
                    .map(|i| i.id.clone())
                    .unwrap_or_default();
                info!("⏯️ 从第 {} 题继续（已有 {} 条结果）", next, state.results.len());
                Ok((state, RunMode::Resume))
            }
            Some(_) => {
                warn!("⚠️ 状态文件中没有可续跑的进度，全新开始");
                Ok((RunState::default(), RunMode::Start))
            }
            None => {
                warn!("⚠️ 没有找到状态文件 {}，全新开始", self.config.state_file);
                Ok((RunState::default(), RunMode::Start))
            }
        }
    }

    /// 结果日志非空时写出 HTML
    async fn write_output(&self, state: &RunState) -> Result<()> {
        if state.results.is_empty() {
            warn!("⚠️ 没有任何分析结果，不生成输出文件");
            return Ok(());
        }

        let html = render_html(&state.results);
        tokio::fs::write(&self.config.output_html, html)
            .await
            .with_context(|| format!("无法写入结果文件: {}", self.config.output_html))?;
        info!("📥 结果已保存至: {}", self.config.output_html);
        Ok(())
    }

    fn print_final_stats(&self, summary: &RunSummary, state: &RunState) {
        info!("\n{}", "=".repeat(60));
        info!("📊 处理完成统计");
        info!(
            "完成时间: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        info!("{}", "=".repeat(60));
        info!("📍 进度: {}/{} ({:?})", summary.cursor, summary.total, summary.phase);
        info!("✅ 本次成功: {}", summary.appended);
        info!("⏭️ 本次跳过: {}", summary.skipped);
        info!("❌ 本次失败: {}", summary.failed);
        info!("📄 结果总数: {}", state.results.len());
        info!(
            "🔢 Token 累计: 输入 {}, 输出 {}, 缓存 {}, 总计 {}",
            state.usage.prompt_tokens,
            state.usage.candidate_tokens,
            state.usage.cached_tokens,
            state.usage.total_tokens
        );
        if !state.failed_items.is_empty() {
            warn!(
                "⚠️ 失败题目: {}（详见 {}）",
                state.failed_items.join(", "),
                self.config.warn_file
            );
        }
        info!("{}", "=".repeat(60));
        info!("\n日志已保存至: {}", self.config.output_log_file);

        self.log_to_file(&format!(
            "进度 {}/{}, 成功 {}, 跳过 {}, 失败 {}",
            summary.cursor, summary.total, summary.appended, summary.skipped, summary.failed
        ));
    }

    fn log_to_file(&self, line: &str) {
        if let Err(e) = append_log_line(&self.config.output_log_file, line) {
            warn!("写入日志文件 {} 失败: {}", self.config.output_log_file, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_log(path: &str) -> App {
        let config = Config {
            output_log_file: path.to_string(),
            ..Config::default()
        };
        let client = GeminiClient::new(&config);
        App { config, client }
    }

    #[test]
    fn test_log_to_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let app = app_with_log(&path.to_string_lossy());

        app.log_to_file("进度 1/2");
        app.log_to_file("进度 2/2");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("进度 2/2"));
    }

    #[test]
    fn test_log_to_file_unwritable_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("output.txt");
        let app = app_with_log(&path.to_string_lossy());

        app.log_to_file("运行中止");
        assert!(!path.exists());
    }
}
