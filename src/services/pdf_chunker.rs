//! PDF 切分服务 - 业务能力层
//!
//! 把超过页数上限的 PDF 切成连续的页段，每段单独上传。

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::error::{AppResult, PdfError, SetupError};
use crate::infrastructure::RemoteService;
use crate::models::UploadedArtifact;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// 页段，页码从 1 开始，两端都包含
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn contains(&self, page: u32) -> bool {
        page >= self.start && page <= self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// 把 `page_count` 页划分为最多 `max_pages` 页一段的连续页段
///
/// 共 ⌈page_count / max_pages⌉ 段；`max_pages` 为 0 时返回空列表
pub fn page_ranges(page_count: u32, max_pages: u32) -> Vec<PageRange> {
    if max_pages == 0 {
        return Vec::new();
    }
    (0..page_count.div_ceil(max_pages))
        .map(|i| {
            let start = i * max_pages + 1;
            PageRange {
                start,
                end: (start + max_pages - 1).min(page_count),
            }
        })
        .collect()
}

/// 切分后的一个分片
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub display_name: String,
    /// None 表示原文件未切分
    pub range: Option<PageRange>,
    pub bytes: Vec<u8>,
}

/// PDF 切分服务
pub struct PdfChunker {
    max_pages: u32,
}

impl PdfChunker {
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages }
    }

    /// 切分文档
    ///
    /// 页数不超过上限时原样返回一个分片；无法解析页数时同样整体返回
    pub fn split(&self, name: &str, bytes: Vec<u8>) -> AppResult<Vec<DocumentChunk>> {
        let doc = match Document::load_mem(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("⚠️ 无法解析 {} 的页数，整体上传: {}", name, e);
                return Ok(vec![whole(name, bytes)]);
            }
        };

        let pages = doc.get_pages();
        let page_count = pages.len() as u32;
        if page_count == 0 {
            return Err(PdfError::NoPages {
                name: name.to_string(),
            }
            .into());
        }

        let ranges = page_ranges(page_count, self.max_pages);
        if ranges.len() <= 1 {
            debug!("{} 共 {} 页，无需切分", name, page_count);
            return Ok(vec![whole(name, bytes)]);
        }

        info!(
            "✂️ {} 共 {} 页，切分为 {} 段（每段最多 {} 页）",
            name,
            page_count,
            ranges.len(),
            self.max_pages
        );

        ranges
            .into_iter()
            .map(|range| {
                let mut part = doc.clone();
                let removed: Vec<u32> = pages
                    .keys()
                    .copied()
                    .filter(|page| !range.contains(*page))
                    .collect();
                part.delete_pages(&removed);
                part.prune_objects();
                part.renumber_objects();

                let mut out = Vec::new();
                part.save_to(&mut out).map_err(|source| PdfError::SaveFailed {
                    name: name.to_string(),
                    start: range.start,
                    end: range.end,
                    source,
                })?;

                Ok(DocumentChunk {
                    display_name: format!("{} (p{}-{})", name, range.start, range.end),
                    range: Some(range),
                    bytes: out,
                })
            })
            .collect()
    }

    /// 切分并逐段上传
    ///
    /// 任意一段上传失败即整体失败，不保留部分结果
    pub async fn upload_document(
        &self,
        remote: &dyn RemoteService,
        name: &str,
        bytes: Vec<u8>,
    ) -> AppResult<Vec<UploadedArtifact>> {
        let chunks = self.split(name, bytes)?;
        let mut artifacts = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            info!("📤 正在上传 {}", chunk.display_name);
            let artifact = remote
                .upload(&chunk.display_name, PDF_MIME_TYPE, chunk.bytes)
                .await
                .map_err(|source| SetupError::UploadFailed {
                    name: chunk.display_name.clone(),
                    source,
                })?;
            artifacts.push(artifact);
        }

        Ok(artifacts)
    }
}

fn whole(name: &str, bytes: Vec<u8>) -> DocumentChunk {
    DocumentChunk {
        display_name: name.to_string(),
        range: None,
        bytes,
    }
}
