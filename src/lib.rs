//! Image Probe - 图片可用性检测工具
//!
//! 这是一个用Rust编写的图片可用性检测工具，支持：
//! - 带超时的图片预加载（awaitable 与回调两种形式）
//! - 匿名跨域请求与 CORS 响应头校验
//! - 本地文件与 file:// 探测
//! - JSON 图片清单审计与占位图替换
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod probe;

// 重新导出主要类型
pub use config::{Config, ImageConfig, ProbeConfig};
pub use error::{ImageProbeError, ProbeError};
pub use probe::{HttpImageProber, ImageChecker, ProbeOutcome, ProbeReport, ProbeTarget};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
