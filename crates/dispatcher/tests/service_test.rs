#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dispatch_config::DispatcherConfig;
    use dispatch_dispatcher::{DispatchService, ProcessOutcome, ProcessorConfig};
    use dispatch_domain::{DispatchError, DispatchStatus, SeedTruck, SubmitDispatch, TruckStatus};
    use dispatch_testing_utils::{RecordingEventSink, TestEnv};
    use uuid::Uuid;

    fn submit(expected_bottles: i32, fullness_percentage: f64) -> SubmitDispatch {
        SubmitDispatch {
            recycler_id: Uuid::new_v4(),
            expected_bottles,
            fullness_percentage,
        }
    }

    #[tokio::test]
    async fn test_initialize_fleet_adds_default_truck_only() {
        let service = DispatchService::new();
        service.submit(submit(10, 20.0)).await.unwrap();

        let truck = service.initialize_fleet().await;

        assert_eq!(truck.capacity, 50);
        assert_eq!(truck.status, TruckStatus::Idle);
        assert_eq!(truck.reliability, 0.95);
        assert_eq!(truck.current_load, 0);
        assert_eq!(service.fleet().await, vec![truck]);
        assert_eq!(service.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let service = DispatchService::new();
        service.initialize_fleet().await;
        let completed = service.submit(submit(10, 50.0)).await.unwrap();
        let processor = service.processor(
            TestEnv::fast_processor_config(),
            Arc::new(RecordingEventSink::new()),
        );
        assert!(matches!(
            processor.process_next().await.unwrap(),
            ProcessOutcome::Completed { .. }
        ));
        service.submit(submit(10, 60.0)).await.unwrap();

        service.reset().await;

        assert!(service.pending().await.is_empty());
        assert!(service.fleet().await.is_empty());
        assert!(service.history().is_empty().await);
        assert!(service.find_request(completed.id).await.is_none());
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_request() {
        let service = DispatchService::new();
        service.initialize_fleet().await;
        let request = service.submit(submit(30, 70.0)).await.unwrap();
        let sink = RecordingEventSink::new();
        let config = ProcessorConfig {
            in_progress_delay: Duration::from_millis(200),
            ..TestEnv::fast_processor_config()
        };
        let processor = Arc::new(service.processor(config, Arc::new(sink.clone())));

        let worker = {
            let processor = Arc::clone(&processor);
            tokio::spawn(async move { processor.process_next().await })
        };

        let in_progress = TestEnv::wait_for(
            || {
                let service = service.clone();
                async move {
                    service
                        .find_request(request.id)
                        .await
                        .is_some_and(|r| r.status == DispatchStatus::InProgress)
                }
            },
            Duration::from_secs(2),
        )
        .await;
        assert!(in_progress);

        service.reset().await;
        let fresh = service.initialize_fleet().await;

        assert_eq!(
            worker.await.unwrap().unwrap(),
            ProcessOutcome::Discarded {
                request_id: request.id
            }
        );
        assert!(service.find_request(request.id).await.is_none());
        assert!(service.history().is_empty().await);
        assert!(service.pending().await.is_empty());
        assert_eq!(service.fleet().await, vec![fresh]);
        assert_eq!(sink.completed_count(), 0);
        assert_eq!(processor.stats().discarded, 1);
    }

    #[tokio::test]
    async fn test_reset_during_backoff_leaves_no_trace() {
        let service = DispatchService::new();
        let request = service.submit(submit(90, 100.0)).await.unwrap();
        let processor = service.processor(
            TestEnv::fast_processor_config(),
            Arc::new(RecordingEventSink::new()),
        );
        assert!(matches!(
            processor.process_next().await.unwrap(),
            ProcessOutcome::Requeued { attempts: 1, .. }
        ));

        service.reset().await;

        assert_eq!(processor.process_next().await.unwrap(), ProcessOutcome::Idle);
        assert!(service.find_request(request.id).await.is_none());
        assert!(service.history().is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_bumps_epoch() {
        let service = DispatchService::new();
        let before = service.epoch().current().await;

        service.reset().await;
        service.reset().await;

        assert_eq!(service.epoch().current().await, before + 2);
    }

    #[tokio::test]
    async fn test_submit_builds_pending_request() {
        let service = DispatchService::new();
        let recycler_id = Uuid::new_v4();

        let request = service
            .submit(SubmitDispatch {
                recycler_id,
                expected_bottles: 25,
                fullness_percentage: 45.0,
            })
            .await
            .unwrap();

        assert_eq!(request.recycler_id, recycler_id);
        assert_eq!(request.status, DispatchStatus::Pending);
        assert!((request.priority - 4.5).abs() < 1e-9);
        assert_eq!(service.find_request(request.id).await, Some(request));
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_input() {
        let service = DispatchService::new();

        for invalid in [
            submit(-1, 50.0),
            submit(10, -0.5),
            submit(10, 100.5),
            submit(10, f64::NAN),
        ] {
            let err = service.submit(invalid).await.unwrap_err();
            assert!(matches!(err, DispatchError::Validation(_)));
        }
        assert!(service.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_find_request_by_str() {
        let service = DispatchService::new();
        let request = service.submit(submit(10, 50.0)).await.unwrap();

        let found = service
            .find_request_by_str(&request.id.to_string())
            .await
            .unwrap();
        assert_eq!(found.id, request.id);

        assert!(service.find_request_by_str("not-a-uuid").await.is_none());
        assert!(service.find_request_by_str("").await.is_none());
        assert!(service
            .find_request_by_str(&Uuid::new_v4().to_string())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_seed_truck_validation() {
        let service = DispatchService::new();

        let truck = service
            .seed_truck(SeedTruck {
                capacity: 120,
                reliability: 0.8,
            })
            .await
            .unwrap();
        assert_eq!(truck.capacity, 120);
        assert_eq!(truck.status, TruckStatus::Idle);

        for invalid in [
            SeedTruck {
                capacity: 0,
                reliability: 0.8,
            },
            SeedTruck {
                capacity: 10,
                reliability: 0.0,
            },
            SeedTruck {
                capacity: 10,
                reliability: 1.5,
            },
        ] {
            let err = service.seed_truck(invalid).await.unwrap_err();
            assert!(matches!(err, DispatchError::Validation(_)));
        }
        assert_eq!(service.fleet().await.len(), 1);
    }

    #[tokio::test]
    async fn test_seed_fleet_rejects_batch_with_invalid_entry() {
        let service = DispatchService::new();
        let seeds = vec![
            SeedTruck::default(),
            SeedTruck {
                capacity: -5,
                reliability: 0.9,
            },
        ];

        assert!(service.seed_fleet(&seeds).await.is_err());
        assert!(service.fleet().await.is_empty());

        let trucks = service.seed_fleet(&seeds[..1]).await.unwrap();
        assert_eq!(trucks.len(), 1);
        assert_eq!(service.fleet().await.len(), 1);
    }

    #[tokio::test]
    async fn test_summary_utilization() {
        let service = DispatchService::new();
        let empty = service.summary().await;
        assert_eq!(empty.truck_count, 0);
        assert_eq!(empty.utilization, 0.0);

        let first = service.initialize_fleet().await;
        service.initialize_fleet().await;
        service.submit(submit(10, 50.0)).await.unwrap();
        service
            .set_truck_status(first.id, TruckStatus::Unavailable)
            .await
            .unwrap();

        let summary = service.summary().await;
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.truck_count, 2);
        assert_eq!(summary.busy_trucks, 1);
        assert_eq!(summary.idle_trucks(), 1);
        assert_eq!(summary.utilization, 0.5);
        assert_eq!(service.available_trucks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_set_truck_status_unknown_truck() {
        let service = DispatchService::new();
        let id = Uuid::new_v4();

        let err = service
            .set_truck_status(id, TruckStatus::Unavailable)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TruckNotFound { id: missing } if missing == id));
    }

    #[tokio::test]
    async fn test_from_config_applies_tolerance() {
        let config = DispatcherConfig {
            underfill_tolerance: 0.0,
            ..DispatcherConfig::default()
        };
        let service = DispatchService::from_config(&config);
        service
            .seed_truck(SeedTruck {
                capacity: 39,
                reliability: 0.9,
            })
            .await
            .unwrap();
        service.submit(submit(40, 80.0)).await.unwrap();
        let processor = service.processor(
            TestEnv::fast_processor_config(),
            Arc::new(RecordingEventSink::new()),
        );

        assert!(matches!(
            processor.process_next().await.unwrap(),
            ProcessOutcome::Requeued { attempts: 1, .. }
        ));

        // 默认容差下 39 可以承载 40
        let lenient = DispatchService::new();
        lenient
            .seed_truck(SeedTruck {
                capacity: 39,
                reliability: 0.9,
            })
            .await
            .unwrap();
        lenient.submit(submit(40, 80.0)).await.unwrap();
        let processor = lenient.processor(
            TestEnv::fast_processor_config(),
            Arc::new(RecordingEventSink::new()),
        );
        assert!(matches!(
            processor.process_next().await.unwrap(),
            ProcessOutcome::Completed { .. }
        ));
    }
}
