pub mod context_cache;
pub mod html_renderer;
pub mod pdf_chunker;
pub mod prompts;
pub mod readiness_poller;
pub mod warn_writer;
pub mod work_list;

pub use context_cache::ContextCacheService;
pub use html_renderer::render_html;
pub use pdf_chunker::{page_ranges, PageRange, PdfChunker};
pub use readiness_poller::ReadinessPoller;
pub use warn_writer::WarnWriter;
pub use work_list::build_work_list;
