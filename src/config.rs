use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 远程服务配置 ---
    pub api_key: String,
    pub api_base_url: String,
    pub model_name: String,
    // --- 输入文件 ---
    /// 试卷 PDF 路径
    pub exam_pdf: String,
    /// 参考教材 PDF 路径（可多个）
    pub textbook_pdfs: Vec<String>,
    /// 工作列表 TOML 文件（可选）
    pub work_list_file: Option<String>,
    /// 是否让模型从试卷中推导题号列表
    pub derive_work_list: bool,
    // --- 上传与轮询 ---
    /// 单个分片的最大页数
    pub max_chunk_pages: u32,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 等待就绪的最长时间（秒）
    pub readiness_timeout_secs: u64,
    // --- 重试 ---
    /// 每个工作项的最大尝试次数
    pub max_attempts: usize,
    /// 两次尝试之间的等待（毫秒）
    pub retry_delay_ms: u64,
    // --- 上下文缓存 ---
    pub use_context_cache: bool,
    pub cache_ttl_minutes: u64,
    // --- 输出 ---
    /// 运行状态文件（用于断点续跑）
    pub state_file: String,
    /// 最终 HTML 输出路径
    pub output_html: String,
    /// 失败题目记录文件
    pub warn_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 是否从上次的游标继续
    pub resume: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            model_name: "gemini-2.5-pro".to_string(),
            exam_pdf: String::new(),
            textbook_pdfs: Vec::new(),
            work_list_file: None,
            derive_work_list: false,
            max_chunk_pages: 50,
            poll_interval_ms: 2000,
            readiness_timeout_secs: 600,
            max_attempts: 3,
            retry_delay_ms: 1000,
            use_context_cache: true,
            cache_ttl_minutes: 60,
            state_file: "run_state.json".to_string(),
            output_html: "analysis_result.html".to_string(),
            warn_file: "warn.txt".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
            resume: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_key: env_or("GEMINI_API_KEY", default.api_key),
            api_base_url: env_or("GEMINI_API_BASE_URL", default.api_base_url),
            model_name: env_or("GEMINI_MODEL_NAME", default.model_name),
            exam_pdf: env_or("EXAM_PDF", default.exam_pdf),
            textbook_pdfs: std::env::var("TEXTBOOK_PDFS")
                .map(|v| split_paths(&v))
                .unwrap_or(default.textbook_pdfs),
            work_list_file: std::env::var("WORK_LIST_FILE").ok().filter(|v| !v.is_empty()),
            derive_work_list: env_parse("DERIVE_WORK_LIST", default.derive_work_list),
            max_chunk_pages: env_parse("MAX_CHUNK_PAGES", default.max_chunk_pages),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", default.poll_interval_ms),
            readiness_timeout_secs: env_parse("READINESS_TIMEOUT_SECS", default.readiness_timeout_secs),
            max_attempts: env_parse("MAX_ATTEMPTS", default.max_attempts),
            retry_delay_ms: env_parse("RETRY_DELAY_MS", default.retry_delay_ms),
            use_context_cache: env_parse("USE_CONTEXT_CACHE", default.use_context_cache),
            cache_ttl_minutes: env_parse("CACHE_TTL_MINUTES", default.cache_ttl_minutes),
            state_file: env_or("STATE_FILE", default.state_file),
            output_html: env_or("OUTPUT_HTML", default.output_html),
            warn_file: env_or("WARN_FILE", default.warn_file),
            output_log_file: env_or("OUTPUT_LOG_FILE", default.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
            resume: env_parse("RESUME", default.resume),
        }
    }

    /// 校验配置是否可以开始运行
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "GEMINI_API_KEY".to_string(),
            });
        }
        if self.exam_pdf.trim().is_empty() {
            return Err(ConfigError::Missing {
                var_name: "EXAM_PDF".to_string(),
            });
        }
        if self.max_chunk_pages == 0 {
            return Err(invalid("MAX_CHUNK_PAGES", "必须大于 0"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("MAX_ATTEMPTS", "必须大于 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("POLL_INTERVAL_MS", "必须大于 0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }
}

fn env_or(var_name: &str, default: String) -> String {
    std::env::var(var_name).unwrap_or(default)
}

fn env_parse<T: FromStr>(var_name: &str, default: T) -> T {
    std::env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_paths(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(var_name: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var_name: var_name.to_string(),
        reason: reason.to_string(),
    }
}
