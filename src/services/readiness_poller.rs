//! 远程文件就绪轮询 - 业务能力层
//!
//! 逐个查询上传后的文件，直到全部离开"处理中"状态。

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::error::{AppResult, SetupError};
use crate::infrastructure::RemoteService;
use crate::models::{ArtifactState, UploadedArtifact};

/// 就绪轮询器
///
/// 职责：
/// - 固定间隔轮询文件状态
/// - 任一文件失败立即返回致命错误
/// - 超过截止时间返回致命错误
pub struct ReadinessPoller {
    interval: Duration,
    timeout: Duration,
}

impl ReadinessPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// 等待所有文件就绪，就绪状态会写回 `artifacts`
    pub async fn wait_until_ready(
        &self,
        remote: &dyn RemoteService,
        artifacts: &mut [UploadedArtifact],
    ) -> AppResult<()> {
        let deadline = Instant::now() + self.timeout;
        info!("⏳ 等待 {} 个远程文件处理完成...", artifacts.len());

        for artifact in artifacts.iter_mut() {
            loop {
                if artifact.state != ArtifactState::Ready {
                    artifact.state = remote
                        .artifact_state(&artifact.id)
                        .await
                        .map_err(|source| SetupError::PollFailed {
                            artifact_id: artifact.id.clone(),
                            source,
                        })?;
                }

                match artifact.state {
                    ArtifactState::Ready => {
                        debug!("✓ {} 已就绪", artifact.display_name);
                        break;
                    }
                    ArtifactState::Failed => {
                        error!("❌ 远程文件处理失败: {}", artifact.display_name);
                        return Err(SetupError::ArtifactFailed {
                            artifact_id: artifact.id.clone(),
                        }
                        .into());
                    }
                    ArtifactState::Pending => {
                        if Instant::now() >= deadline {
                            return Err(SetupError::ReadinessTimeout {
                                artifact_id: artifact.id.clone(),
                                waited_secs: self.timeout.as_secs(),
                            }
                            .into());
                        }
                        sleep(self.interval).await;
                    }
                }
            }
        }

        info!("✓ 所有远程文件已就绪");
        Ok(())
    }
}
