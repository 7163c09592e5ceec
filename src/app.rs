use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dispatch_config::AppConfig;
use dispatch_dispatcher::{
    DispatchProcessor, DispatchService, LoggingEventSink, ProcessorConfig,
};
use dispatch_domain::SeedTruck;
use metrics::gauge;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 主应用程序
pub struct Application {
    config: AppConfig,
    service: DispatchService,
    processor: Arc<DispatchProcessor>,
}

impl Application {
    /// 根据配置创建调度服务并登记初始车队
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!(
            "初始化调度服务 (容差: {}, 历史上限: {})",
            config.dispatcher.underfill_tolerance, config.dispatcher.history_limit
        );

        let service = DispatchService::from_config(&config.dispatcher);

        if config.fleet.seed_default_truck {
            service.initialize_fleet().await;
        }

        let seeds: Vec<SeedTruck> = config
            .fleet
            .trucks
            .iter()
            .map(|truck| SeedTruck {
                capacity: truck.capacity,
                reliability: truck.reliability,
            })
            .collect();
        service
            .seed_fleet(&seeds)
            .await
            .context("登记配置中的车辆失败")?;
        info!("车队初始化完成，共 {} 辆车", service.fleet().await.len());

        let processor = Arc::new(service.processor(
            ProcessorConfig::from(&config.dispatcher),
            Arc::new(LoggingEventSink::new()),
        ));

        Ok(Self {
            config,
            service,
            processor,
        })
    }

    pub fn service(&self) -> &DispatchService {
        &self.service
    }

    pub fn processor(&self) -> &Arc<DispatchProcessor> {
        &self.processor
    }

    /// 运行处理器与状态报告任务，直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let processor_handle = if self.config.dispatcher.enabled {
            Some(Arc::clone(&self.processor).spawn(shutdown_rx.resubscribe()))
        } else {
            warn!("调度处理器已在配置中禁用，请求只会排队不会被处理");
            None
        };

        let reporter_handle = self.spawn_status_reporter(shutdown_rx.resubscribe());

        let _ = shutdown_rx.recv().await;
        info!("应用收到关闭信号");

        if let Some(handle) = processor_handle {
            handle.await.context("调度处理器任务异常退出")?;
        }
        reporter_handle.await.context("状态报告任务异常退出")?;

        let stats = self.processor.stats();
        info!(
            "调度服务已停止 (已处理: {}, 完成: {}, 重新入队: {}, 失败: {}, 错误: {})",
            stats.processed, stats.completed, stats.requeued, stats.failed, stats.errors
        );
        Ok(())
    }

    fn spawn_status_reporter(&self, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let service = self.service.clone();
        let processor = Arc::clone(&self.processor);
        let interval =
            Duration::from_secs(self.config.observability.status_report_interval_seconds);

        tokio::spawn(async move {
            run_status_reporter(service, processor, interval, shutdown_rx).await;
        })
    }
}

/// 定期输出队列与车队状态
async fn run_status_reporter(
    service: DispatchService,
    processor: Arc<DispatchProcessor>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // 第一次 tick 立即返回
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = service.summary().await;
                let stats = processor.stats();
                gauge!("dispatch_fleet_utilization").set(summary.utilization);
                gauge!("dispatch_fleet_trucks").set(summary.truck_count as f64);
                info!(
                    "调度状态: 等待中 {}, 车辆 {} (忙碌 {}), 利用率 {:.1}%, 已完成 {}",
                    summary.pending_count,
                    summary.truck_count,
                    summary.busy_trucks,
                    summary.utilization * 100.0,
                    stats.completed
                );
            }
            _ = shutdown_rx.recv() => {
                info!("状态报告任务收到关闭信号");
                break;
            }
        }
    }
}
