use std::sync::Arc;

use bgremove_service::startup::run_startup_checks;
use bgremove_service::{AppConfig, AppState, ShutdownManager, build_app};

#[tokio::main]
async fn main() {
    // 先加载配置，日志过滤指令依赖配置；加载失败时用默认指令初始化日志再退出
    let loaded = AppConfig::load();
    let default_filter = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| AppConfig::default().logging.level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = match loaded {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("Config init failed: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("配置加载完成: {:?}", AppConfig::get_config_path());

    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let remover = match run_startup_checks(&config).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Startup checks failed: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_app(AppState::new(config.clone(), remover));

    let addr = config.server_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/", addr);
    tracing::info!("Remove BG: http://{}/remove-bg", addr);

    let shutdown_timeout = config.shutdown.timeout_duration();
    let signal_manager = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = signal_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    // 收到退出信号后，最多等待 timeout 让在途请求完成
    let mut server = tokio::spawn(async move { graceful.await });
    let finished = tokio::select! {
        res = &mut server => res,
        reason = shutdown_manager.wait_for_shutdown() => {
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(res) => res,
                Err(_) => {
                    tracing::warn!(
                        "优雅退出超时（{}秒，原因: {:?}），强制退出",
                        config.shutdown.timeout_secs,
                        reason
                    );
                    server.abort();
                    return;
                }
            }
        }
    };

    match finished {
        Ok(Ok(())) => tracing::info!("服务器已优雅关闭"),
        Ok(Err(e)) => {
            tracing::error!("服务器运行错误: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("服务器任务异常: {}", e);
            std::process::exit(1);
        }
    }
}
