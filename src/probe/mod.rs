//! 图片探测模块
//!
//! 提供图片可用性检测、预加载和批量探测功能

pub mod checker;
pub mod result;

// 重新导出主要类型
pub use checker::{HttpImageProber, ImageChecker, ProbeTarget};
pub use result::{ImageMetadata, ProbeOutcome, ProbeReport};
