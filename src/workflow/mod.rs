pub mod classify;
pub mod item_ctx;
pub mod item_flow;

pub use classify::{classify_response, ResponseClass};
pub use item_ctx::ItemCtx;
pub use item_flow::{ItemFlow, ProcessResult};
