pub mod gemini_client;
pub mod remote;

pub use gemini_client::GeminiClient;
pub use remote::{
    CacheRequest, GenerateRequest, GenerateResponse, GenerationContext, RemoteService,
};
