//! 图片清单审计模块
//!
//! 读取站点的JSON数据文件，逐条探测其中引用的图片，
//! 可选地把不可用的图片替换为占位图并写回文件。

use crate::config::DEFAULT_TIMEOUT_MS;
use crate::error::ManifestError;
use crate::probe::{ImageChecker, ProbeReport, ProbeTarget};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// 审计选项
#[derive(Debug, Clone, PartialEq)]
pub struct AuditOptions {
    /// 记录所在的数组字段
    pub collection: String,
    /// 记录中的图片字段
    pub field: String,
    /// 相对路径的基准（URL或目录），默认从清单所在目录向上查找站点根目录
    pub base: Option<String>,
    /// 每张图片的超时时间
    pub timeout: Duration,
    /// 不可用图片的替换占位图
    pub fallback: Option<String>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            collection: "doctors".to_string(),
            field: "image".to_string(),
            base: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            fallback: None,
        }
    }
}

/// 单条记录的审计结果
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// 记录在数组中的下标
    pub index: usize,
    /// 记录的 `name` 字段
    pub name: Option<String>,
    /// 清单中的原始图片值
    pub image: Option<String>,
    /// 探测结果，缺少图片字段时为空
    pub report: Option<ProbeReport>,
    /// 是否已替换为占位图
    pub replaced: bool,
}

/// 审计汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub available: usize,
    pub unavailable: usize,
    pub skipped: usize,
    pub replaced: usize,
    pub entries: Vec<AuditEntry>,
}

impl AuditSummary {
    /// 是否全部可用（跳过的记录不计）
    pub fn all_available(&self) -> bool {
        self.unavailable == 0
    }
}

/// 清单审计器
#[derive(Debug, Clone)]
pub struct ManifestAudit {
    path: PathBuf,
    document: Value,
    options: AuditOptions,
}

impl ManifestAudit {
    /// 从文件加载清单
    pub async fn load(
        path: impl AsRef<Path>,
        options: AuditOptions,
    ) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ManifestError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
        let document: Value = serde_json::from_str(&content)?;
        Ok(Self::from_value(path, document, options))
    }

    /// 从已解析的JSON构建
    pub fn from_value(path: impl Into<PathBuf>, document: Value, options: AuditOptions) -> Self {
        Self {
            path: path.into(),
            document,
            options,
        }
    }

    /// 当前（可能已被替换过的）清单内容
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// 相对路径使用的基准
    ///
    /// 未指定时从清单所在目录向上查找，取第一个包含相对图片路径首段
    /// （例如 `Images`）的目录；都找不到时退回清单所在目录。
    fn base(&self, records: &[Value]) -> String {
        if let Some(base) = &self.options.base {
            return base.clone();
        }

        let manifest_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let roots: Vec<&str> = records
            .iter()
            .filter_map(|record| record.get(&self.options.field).and_then(Value::as_str))
            .filter_map(relative_root)
            .collect();

        manifest_dir
            .ancestors()
            .map(|dir| if dir.as_os_str().is_empty() { Path::new(".") } else { dir })
            .find(|dir| roots.iter().any(|root| dir.join(root).exists()))
            .unwrap_or(manifest_dir.as_path())
            .display()
            .to_string()
    }

    fn records(&self) -> Result<&Vec<Value>, ManifestError> {
        self.document
            .get(&self.options.collection)
            .and_then(Value::as_array)
            .ok_or_else(|| ManifestError::MissingCollection {
                collection: self.options.collection.clone(),
            })
    }

    /// 执行审计
    ///
    /// 每条记录独立探测；设置了占位图时，不可用记录的图片字段会在内存中被替换，
    /// 调用 [`ManifestAudit::save`] 才会写回文件。
    pub async fn run<C>(&mut self, checker: &C) -> Result<AuditSummary, ManifestError>
    where
        C: ImageChecker + ?Sized,
    {
        let records = self.records()?;
        let base = self.base(records);
        let mut entries = Vec::new();
        let mut targets = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let name = record
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string);
            let image = record
                .get(&self.options.field)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string);

            if let Some(image) = &image {
                let mut target =
                    ProbeTarget::new(resolve_image_location(&base, image), self.options.timeout);
                if let Some(name) = &name {
                    target = target.with_name(name.clone());
                }
                targets.push((index, target));
            }

            entries.push(AuditEntry {
                index,
                name,
                image,
                report: None,
                replaced: false,
            });
        }

        let batch: Vec<ProbeTarget> = targets.iter().map(|(_, t)| t.clone()).collect();
        let reports = checker.check_batch(&batch).await;

        for ((index, _), report) in targets.into_iter().zip(reports) {
            entries[index].report = Some(report);
        }

        let mut summary = AuditSummary {
            total: entries.len(),
            ..Default::default()
        };

        for entry in &mut entries {
            match &entry.report {
                None => summary.skipped += 1,
                Some(report) if report.is_available() => summary.available += 1,
                Some(report) => {
                    summary.unavailable += 1;
                    warn!(
                        "记录 #{} ({}) 的图片不可用: {}",
                        entry.index,
                        entry.name.as_deref().unwrap_or("-"),
                        report.url
                    );
                    if let Some(fallback) = &self.options.fallback {
                        if let Some(record) = self
                            .document
                            .get_mut(&self.options.collection)
                            .and_then(Value::as_array_mut)
                            .and_then(|records| records.get_mut(entry.index))
                            .and_then(Value::as_object_mut)
                        {
                            record.insert(
                                self.options.field.clone(),
                                Value::String(fallback.clone()),
                            );
                            entry.replaced = true;
                            summary.replaced += 1;
                        }
                    }
                }
            }
        }

        summary.entries = entries;

        info!(
            "清单审计完成: 共 {} 条，可用 {}，不可用 {}，跳过 {}",
            summary.total, summary.available, summary.unavailable, summary.skipped
        );

        Ok(summary)
    }

    /// 以4空格缩进写回清单，保留非ASCII字符
    pub async fn save(&self) -> Result<(), ManifestError> {
        let content = to_pretty_json(&self.document)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| ManifestError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
        info!("已更新清单文件: {}", self.path.display());
        Ok(())
    }
}

/// 审计清单文件，`write` 为真且发生替换时写回
pub async fn audit_manifest<C>(
    checker: &C,
    path: impl AsRef<Path>,
    options: AuditOptions,
    write: bool,
) -> Result<AuditSummary, ManifestError>
where
    C: ImageChecker + ?Sized,
{
    let mut audit = ManifestAudit::load(path, options).await?;
    let summary = audit.run(checker).await?;
    if write && summary.replaced > 0 {
        audit.save().await?;
    }
    Ok(summary)
}

/// 把清单中的图片值解析为可探测的位置
///
/// 绝对URL原样返回；基准为URL时按URL规则拼接（`/` 开头的值相对站点根目录），
/// 基准为目录时绝对路径原样返回，相对路径拼接到目录上。
pub fn resolve_image_location(base: &str, image: &str) -> String {
    if image.contains("://") {
        return image.to_string();
    }

    if base.starts_with("http://") || base.starts_with("https://") {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        if let Ok(joined) = Url::parse(&base).and_then(|url| url.join(image)) {
            return joined.to_string();
        }
    }

    if Path::new(image).is_absolute() {
        return image.to_string();
    }

    PathBuf::from(base).join(image).display().to_string()
}

/// 相对本地路径的首段目录，绝对路径和URL返回 `None`
fn relative_root(image: &str) -> Option<&str> {
    if image.contains("://") || image.starts_with('/') || Path::new(image).is_absolute() {
        return None;
    }
    match Path::new(image).components().next() {
        Some(Component::Normal(root)) => root.to_str(),
        _ => None,
    }
}

fn to_pretty_json(value: &Value) -> Result<Vec<u8>, ManifestError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}
