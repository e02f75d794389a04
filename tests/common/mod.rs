//! 集成测试公共工具：脚本化的远程服务和测试文件

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use exam_analogue::error::RemoteError;
use exam_analogue::infrastructure::{CacheRequest, GenerateRequest, GenerateResponse};
use exam_analogue::models::{ArtifactState, CacheHandle, TokenUsage, UploadedArtifact};
use exam_analogue::{Config, RemoteService};

/// 工作列表推导请求的脚本键
pub const WORK_LIST_KEY: &str = "<work-list>";

/// 一次生成调用的脚本化回复
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Skip,
    Blocked(String),
    Empty,
    Error,
}

/// 按脚本回复的远程服务
///
/// - 文件状态按 `poll_script` 依次返回，用完后一直返回 `final_state`
/// - 生成请求按工作项 label 查找回复队列，队列为空时返回 `text_for(label)`
/// - 上传、状态查询、创建缓存可以单独设置为失败
pub struct FakeRemote {
    poll_script: Mutex<VecDeque<ArtifactState>>,
    fail_upload_at: Option<usize>,
    fail_poll: bool,
    fail_cache: bool,
    final_state: ArtifactState,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    cache_alive: AtomicBool,
    pub uploads: Mutex<Vec<String>>,
    pub upload_attempts: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    pub polls: AtomicUsize,
    pub caches_created: AtomicUsize,
    pub cache_lookups: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            poll_script: Mutex::new(VecDeque::new()),
            fail_upload_at: None,
            fail_poll: false,
            fail_cache: false,
            final_state: ArtifactState::Ready,
            replies: Mutex::new(HashMap::new()),
            cache_alive: AtomicBool::new(true),
            uploads: Mutex::new(Vec::new()),
            upload_attempts: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            caches_created: AtomicUsize::new(0),
            cache_lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_final_state(mut self, state: ArtifactState) -> Self {
        self.final_state = state;
        self
    }

    pub fn with_poll_script(self, states: Vec<ArtifactState>) -> Self {
        self.poll_script.lock().unwrap().extend(states);
        self
    }

    /// 第 `n` 次上传（从 1 开始）返回错误
    pub fn with_upload_failure(mut self, n: usize) -> Self {
        self.fail_upload_at = Some(n);
        self
    }

    pub fn with_poll_failure(mut self) -> Self {
        self.fail_poll = true;
        self
    }

    pub fn with_cache_failure(mut self) -> Self {
        self.fail_cache = true;
        self
    }

    pub fn with_cache_alive(self, alive: bool) -> Self {
        self.cache_alive.store(alive, Ordering::SeqCst);
        self
    }

    /// 为某个 label 追加一条回复
    pub fn reply(self, label: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(label.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn upload_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn generate_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// 发给某个 label 的全部请求
    pub fn prompts_for(&self, label: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| prompt_label(p).as_deref() == Some(label))
            .cloned()
            .collect()
    }

    fn next_reply(&self, key: &str) -> Option<Reply> {
        self.replies
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(|queue| queue.pop_front())
    }
}

/// 未设置脚本时的默认正文
pub fn text_for(label: &str) -> String {
    format!("| {} | exam | textbook | variation |", label)
}

fn prompt_label(prompt: &str) -> Option<String> {
    prompt
        .strip_prefix("Analyse **")
        .and_then(|rest| rest.split_once("**"))
        .map(|(label, _)| label.to_string())
}

fn unavailable(endpoint: &str) -> RemoteError {
    RemoteError::BadStatus {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "unavailable".to_string(),
    }
}

fn live_cache(name: &str) -> CacheHandle {
    CacheHandle {
        name: name.to_string(),
        expire_time: Some(Utc::now() + ChronoDuration::hours(1)),
    }
}

#[async_trait]
impl RemoteService for FakeRemote {
    async fn upload(
        &self,
        display_name: &str,
        mime_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<UploadedArtifact, RemoteError> {
        let attempt = self.upload_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_upload_at == Some(attempt) {
            return Err(unavailable("upload/v1beta/files"));
        }

        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(display_name.to_string());
        let id = format!("files/{}", uploads.len());
        Ok(UploadedArtifact {
            uri: format!("https://example.invalid/{}", id),
            id,
            mime_type: mime_type.to_string(),
            display_name: display_name.to_string(),
            state: ArtifactState::Pending,
        })
    }

    async fn artifact_state(&self, _artifact_id: &str) -> Result<ArtifactState, RemoteError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail_poll {
            return Err(unavailable("v1beta/files"));
        }
        Ok(self
            .poll_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.final_state))
    }

    async fn create_cache(&self, _request: CacheRequest<'_>) -> Result<CacheHandle, RemoteError> {
        if self.fail_cache {
            return Err(unavailable("v1beta/cachedContents"));
        }
        let n = self.caches_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(live_cache(&format!("cachedContents/{}", n)))
    }

    async fn get_cache(&self, name: &str) -> Result<Option<CacheHandle>, RemoteError> {
        self.cache_lookups.fetch_add(1, Ordering::SeqCst);
        if self.cache_alive.load(Ordering::SeqCst) {
            Ok(Some(live_cache(name)))
        } else {
            Ok(None)
        }
    }

    async fn generate(
        &self,
        request: GenerateRequest<'_>,
    ) -> Result<GenerateResponse, RemoteError> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());

        let label = prompt_label(request.prompt);
        let key = label.clone().unwrap_or_else(|| WORK_LIST_KEY.to_string());
        let reply = self.next_reply(&key).unwrap_or_else(|| match &label {
            Some(label) => Reply::Text(text_for(label)),
            None => Reply::Text("1 | q1\n2 | q2".to_string()),
        });

        let usage = TokenUsage {
            prompt_tokens: 10,
            candidate_tokens: 5,
            cached_tokens: 0,
            total_tokens: 15,
        };
        match reply {
            Reply::Text(text) => Ok(GenerateResponse {
                usage,
                ..GenerateResponse::text(text)
            }),
            Reply::Skip => Ok(GenerateResponse::text("SKIP")),
            Reply::Blocked(reason) => Ok(GenerateResponse::blocked(reason)),
            Reply::Empty => Ok(GenerateResponse::default()),
            Reply::Error => Err(unavailable("generateContent")),
        }
    }
}

/// 生成一个有 `page_count` 个空白页的 PDF
pub fn blank_pdf(page_count: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..page_count)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// 在 `dir` 下准备试卷、一本教材和工作列表，返回无等待的测试配置
///
/// `work_list` 为空时不写列表文件
pub fn test_config(
    dir: &Path,
    exam_pages: u32,
    textbook_pages: u32,
    work_list: &[&str],
) -> Config {
    let exam = dir.join("exam.pdf");
    let book = dir.join("book.pdf");
    std::fs::write(&exam, blank_pdf(exam_pages)).unwrap();
    std::fs::write(&book, blank_pdf(textbook_pages)).unwrap();

    let work_list_file = if work_list.is_empty() {
        None
    } else {
        let path = dir.join("work_list.toml");
        let body: String = work_list
            .iter()
            .map(|id| format!("[[items]]\nid = \"{}\"\n\n", id))
            .collect();
        std::fs::write(&path, body).unwrap();
        Some(path.display().to_string())
    };

    Config {
        api_key: "test-key".to_string(),
        exam_pdf: exam.display().to_string(),
        textbook_pdfs: vec![book.display().to_string()],
        work_list_file,
        max_chunk_pages: 50,
        poll_interval_ms: 0,
        readiness_timeout_secs: 5,
        max_attempts: 3,
        retry_delay_ms: 0,
        state_file: dir.join("run_state.json").display().to_string(),
        output_html: dir.join("result.html").display().to_string(),
        warn_file: dir.join("warn.txt").display().to_string(),
        output_log_file: dir.join("output.txt").display().to_string(),
        ..Config::default()
    }
}
