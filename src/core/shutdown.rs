//! 优雅关闭：等待 Ctrl+C 或 SIGTERM，供 axum::serve 的 with_graceful_shutdown 使用
//!
//! 已接受的请求会处理完毕；已派发的后台任务随运行时退出而结束。

/// 关闭原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM（容器平台停止实例）
    Signal,
}

/// 等待第一个关闭信号并返回原因
pub async fn wait_for_signal() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => ShutdownReason::UserInitiated,
        _ = terminate => ShutdownReason::Signal,
    }
}

/// 关闭信号 future（丢弃原因，只记录日志）
pub async fn shutdown_signal() {
    let reason = wait_for_signal().await;
    tracing::info!(?reason, "Shutdown signal received, draining in-flight requests...");
}
