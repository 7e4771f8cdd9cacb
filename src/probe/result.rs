//! 图片探测结果数据结构
//!
//! 定义探测结果类型和结局枚举

use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// 探测结局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// 尚未结算
    #[default]
    Pending,
    /// 加载成功
    Loaded,
    /// 加载失败
    Failed,
    /// 超时
    TimedOut,
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Pending => write!(f, "等待中"),
            ProbeOutcome::Loaded => write!(f, "可用"),
            ProbeOutcome::Failed => write!(f, "加载失败"),
            ProbeOutcome::TimedOut => write!(f, "超时"),
        }
    }
}

impl ProbeOutcome {
    /// 图片是否可用
    pub fn is_available(&self) -> bool {
        matches!(self, ProbeOutcome::Loaded)
    }
}

impl From<&ProbeError> for ProbeOutcome {
    fn from(error: &ProbeError) -> Self {
        match error {
            ProbeError::LoadFailed { .. } => ProbeOutcome::Failed,
            ProbeError::Timeout { .. } => ProbeOutcome::TimedOut,
        }
    }
}

/// 成功加载的图片元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// 图片格式（png、jpeg等）
    pub format: String,
    /// 宽度（像素）
    pub width: u32,
    /// 高度（像素）
    pub height: u32,
    /// 字节数
    pub byte_size: u64,
}

/// 图片探测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// 探测ID
    pub id: Uuid,
    /// 图片名称（来自配置或清单）
    pub name: Option<String>,
    /// 目标URL
    pub url: String,
    /// 探测时间戳
    pub timestamp: DateTime<Utc>,
    /// 结局
    pub outcome: ProbeOutcome,
    /// 耗时
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// HTTP状态码（本地文件为空）
    pub status_code: Option<u16>,
    /// Content-Type 响应头
    pub content_type: Option<String>,
    /// 图片元数据
    pub image: Option<ImageMetadata>,
    /// 错误信息
    pub error_message: Option<String>,
}

impl ProbeReport {
    /// 创建新的待结算结果
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            url: url.into(),
            timestamp: Utc::now(),
            outcome: ProbeOutcome::Pending,
            elapsed: Duration::from_millis(0),
            status_code: None,
            content_type: None,
            image: None,
            error_message: None,
        }
    }

    /// 设置名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设置耗时
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// 以成功结算
    pub fn loaded(mut self, image: ImageMetadata) -> Self {
        self.outcome = ProbeOutcome::Loaded;
        self.image = Some(image);
        self.error_message = None;
        self
    }

    /// 以失败或超时结算
    pub fn failed(mut self, error: &ProbeError) -> Self {
        self.outcome = ProbeOutcome::from(error);
        self.error_message = Some(error.to_string());
        self
    }

    /// 耗时（毫秒）
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// 图片是否可用
    pub fn is_available(&self) -> bool {
        self.outcome.is_available()
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Duration序列化模块
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
