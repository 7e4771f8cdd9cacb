//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Image Probe 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ImageProbeError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 图片探测相关错误
    #[error("图片探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// 清单审计相关错误
    #[error("清单错误: {0}")]
    Manifest(#[from] ManifestError),

    /// HTTP客户端错误
    #[error("HTTP客户端错误: {0}")]
    Http(#[from] reqwest::Error),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 存在不可用的图片
    #[error("{unavailable}/{total} 张图片不可用")]
    Unavailable { unavailable: usize, total: usize },
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 图片探测错误类型
///
/// 只有两类：加载失败与超时。两者都在探测层内部处理，
/// 以 `false` 或 `Err` 的形式交给调用方，不会 panic。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// 资源加载失败（网络错误、非2xx状态、CORS拒绝、无法解码等）
    #[error("图片加载失败 (failed to load): {url}: {reason}")]
    LoadFailed { url: String, reason: String },

    /// 在超时时间内未完成加载
    #[error("图片加载超时 (timeout): {url} 超过 {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
}

impl ProbeError {
    /// 创建加载失败错误
    pub fn load_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        ProbeError::LoadFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// 诊断日志中使用的简短原因标签
    pub fn reason_tag(&self) -> &'static str {
        match self {
            ProbeError::LoadFailed { .. } => "failed to load",
            ProbeError::Timeout { .. } => "timeout",
        }
    }

    /// 是否为超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Timeout { .. })
    }

    /// 出错的URL
    pub fn url(&self) -> &str {
        match self {
            ProbeError::LoadFailed { url, .. } | ProbeError::Timeout { url, .. } => url,
        }
    }
}

/// 图片清单错误类型
#[derive(Error, Debug)]
pub enum ManifestError {
    /// 读取清单失败
    #[error("读取清单失败: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 清单不是合法JSON
    #[error("清单解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 清单中缺少指定的集合字段
    #[error("清单中不存在数组字段: {collection}")]
    MissingCollection { collection: String },

    /// 写回清单失败
    #[error("写回清单失败: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ImageProbeError>;
