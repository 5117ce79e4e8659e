//! 关闭信号
//!
//! 信号到达后取消 CancellationToken；监听信号本身失败时只记录错误，
//! 服务继续运行，直到 token 被其他地方取消。

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// 等待 Ctrl+C 后取消 `cancel`
pub async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    shutdown_on(tokio::signal::ctrl_c(), cancel).await
}

pub async fn shutdown_on<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C, shutting down");
            cancel.cancel();
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C, running until cancelled");
            cancel.cancelled().await;
        }
    }
}
