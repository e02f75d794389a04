use thiserror::Error;

/// 应用程序错误类型
///
/// 除 `Remote` 以外的错误都属于致命错误：出现即中止整个运行。
/// `Remote` 只在单个工作项的重试循环里出现，由批处理驱动器就地消化。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// PDF 解析 / 切分错误
    #[error("PDF错误: {0}")]
    Pdf(#[from] PdfError),
    /// 远程服务调用错误
    #[error("远程服务错误: {0}")]
    Remote(#[from] RemoteError),
    /// 准备阶段（上传、轮询、缓存）错误
    #[error("准备阶段错误: {0}")]
    Setup(#[from] SetupError),
    /// 运行状态持久化错误
    #[error("运行状态错误: {0}")]
    State(#[from] StateError),
}

impl AppError {
    /// 是否为致命错误（需要中止整个运行）
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::Remote(_))
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填项缺失
    #[error("缺少必填配置 {var_name}")]
    Missing { var_name: String },
    /// 取值非法
    #[error("配置 {var_name} 取值非法: {reason}")]
    Invalid { var_name: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// PDF 错误
#[derive(Debug, Error)]
pub enum PdfError {
    /// PDF 没有页面
    #[error("PDF没有任何页面: {name}")]
    NoPages { name: String },
    /// 切分后重新序列化失败
    #[error("保存PDF分片失败 ({name} 第 {start}-{end} 页): {source}")]
    SaveFailed {
        name: String,
        start: u32,
        end: u32,
        #[source]
        source: std::io::Error,
    },
}

/// 远程服务调用错误
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务返回非成功状态码
    #[error("服务返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 内容被安全策略拦截
    #[error("内容被拦截: {reason}")]
    Blocked { reason: String },
    /// 返回内容为空
    #[error("返回内容为空 (题目 {item})")]
    EmptyContent { item: String },
    /// 响应缺少预期字段
    #[error("响应缺少字段 {field} ({endpoint})")]
    MissingField { endpoint: String, field: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {0}")]
    JsonParseFailed(#[from] serde_json::Error),
}

/// 准备阶段错误，全部为致命错误
#[derive(Debug, Error)]
pub enum SetupError {
    /// 上传失败
    #[error("上传 {name} 失败: {source}")]
    UploadFailed {
        name: String,
        #[source]
        source: RemoteError,
    },
    /// 远程文件进入失败状态
    #[error("远程文件处理失败: {artifact_id}")]
    ArtifactFailed { artifact_id: String },
    /// 等待远程文件就绪超时
    #[error("等待远程文件就绪超时 ({waited_secs} 秒): {artifact_id}")]
    ReadinessTimeout {
        artifact_id: String,
        waited_secs: u64,
    },
    /// 查询远程文件状态失败
    #[error("查询远程文件状态失败 ({artifact_id}): {source}")]
    PollFailed {
        artifact_id: String,
        #[source]
        source: RemoteError,
    },
    /// 创建上下文缓存失败
    #[error("创建上下文缓存失败: {source}")]
    CacheFailed {
        #[source]
        source: RemoteError,
    },
}

/// 运行状态持久化错误
#[derive(Debug, Error)]
pub enum StateError {
    /// 读写状态文件失败
    #[error("状态文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 状态文件内容损坏
    #[error("状态文件内容无法解析 ({path}): {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 游标超出工作列表
    #[error("游标 {cursor} 超出工作列表长度 {len}")]
    CursorOutOfRange { cursor: usize, len: usize },
    /// 状态机不在运行阶段
    #[error("当前阶段 {phase} 不能处理工作项")]
    NotRunning { phase: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

impl RemoteError {
    /// 创建请求失败错误
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        RemoteError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
