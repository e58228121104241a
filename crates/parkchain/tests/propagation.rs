//! Integration tests for need-to-go propagation and notification delivery.

mod common;

use async_trait::async_trait;
use common::{CollectingGateway, FixedStore, directory, relation, service, service_with};
use parkchain::domain::{CarId, MessageKind, Notification, Situation, UserId};
use parkchain::error::Error;
use parkchain::notify::{DispatchMode, Dispatcher, GatewayError, NotificationGateway};
use parkchain::service::BlockingService;
use parkchain::storage::in_memory::new_in_memory_store;
use std::sync::Arc;
use std::time::Duration;

const CHAIN_CARS: &[(u64, &[u64])] = &[(1, &[10]), (2, &[20]), (3, &[30]), (4, &[40])];

async fn chain(service: &BlockingService, pairs: &[(u64, u64)]) {
    for (blocking, blocked) in pairs {
        service
            .create_relation(CarId(*blocking), CarId(*blocked), Situation::Blocking)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_chain_reaches_every_upstream_owner_in_order() {
    let (service, gateway) = service(CHAIN_CARS);
    chain(&service, &[(1, 2), (2, 3), (3, 4)]).await;
    gateway.take();

    let plan = service.send_need_to_go(CarId(4)).await.unwrap();

    assert_eq!(plan.origin, CarId(4));
    assert_eq!(plan.blockers, vec![CarId(3), CarId(2), CarId(1)]);
    assert_eq!(
        gateway.sent(),
        vec![
            Notification::new(UserId(30), MessageKind::NeedToGo, CarId(3), CarId(4)),
            Notification::new(UserId(20), MessageKind::NeedToGo, CarId(2), CarId(4)),
            Notification::new(UserId(10), MessageKind::NeedToGo, CarId(1), CarId(4)),
        ]
    );
}

#[tokio::test]
async fn test_middle_of_chain_only_walks_upstream() {
    let (service, gateway) = service(CHAIN_CARS);
    chain(&service, &[(1, 2), (2, 3), (3, 4)]).await;
    gateway.take();

    let plan = service.send_need_to_go(CarId(2)).await.unwrap();

    assert_eq!(plan.blockers, vec![CarId(1)]);
    assert_eq!(plan.recipients(), vec![UserId(10)]);
}

#[tokio::test]
async fn test_duplicated_edge_notifies_once() {
    // The second 1 -> 2 row is what a corrupted store could hand back
    let store = Arc::new(FixedStore::new(vec![
        relation(1, 1, 2),
        relation(2, 2, 3),
        relation(3, 3, 4),
        relation(4, 1, 2),
    ]));
    let (service, gateway) = service_with(store, CHAIN_CARS);

    let plan = service.send_need_to_go(CarId(4)).await.unwrap();

    assert_eq!(plan.recipients(), vec![UserId(30), UserId(20), UserId(10)]);
    assert_eq!(gateway.sent().len(), 3);
    assert!(plan.truncated_cycles.is_empty());
}

#[tokio::test]
async fn test_diamond_reaches_shared_blocker_once() {
    // 1 blocks both 2 and 3, which both block 4
    let (service, gateway) = service(CHAIN_CARS);
    chain(&service, &[(2, 4), (3, 4), (1, 2), (1, 3)]).await;
    gateway.take();

    let plan = service.send_need_to_go(CarId(4)).await.unwrap();

    assert_eq!(plan.blockers, vec![CarId(2), CarId(1), CarId(3)]);
    let recipients = plan.recipients();
    assert_eq!(recipients, vec![UserId(20), UserId(10), UserId(30)]);
    assert_eq!(gateway.sent().len(), 3);
}

#[tokio::test]
async fn test_owner_of_several_blockers_notified_once() {
    let (service, gateway) = service(&[(1, &[10]), (2, &[10]), (3, &[30])]);
    chain(&service, &[(1, 3), (2, 3)]).await;
    gateway.take();

    let plan = service.send_need_to_go(CarId(3)).await.unwrap();

    assert_eq!(plan.blockers, vec![CarId(1), CarId(2)]);
    assert_eq!(
        gateway.sent(),
        vec![Notification::new(
            UserId(10),
            MessageKind::NeedToGo,
            CarId(1),
            CarId(3)
        )]
    );
}

#[tokio::test]
async fn test_stored_cycle_is_truncated() {
    let store = Arc::new(FixedStore::new(vec![
        relation(1, 1, 2),
        relation(2, 2, 3),
        relation(3, 3, 1),
    ]));
    let (service, gateway) = service_with(store, CHAIN_CARS);

    let plan = service.send_need_to_go(CarId(3)).await.unwrap();

    assert_eq!(plan.blockers, vec![CarId(2), CarId(1)]);
    assert_eq!(plan.truncated_cycles, vec![(CarId(3), CarId(1))]);
    // The leaving car's own owner is never asked to move
    assert_eq!(plan.recipients(), vec![UserId(20), UserId(10)]);
    assert_eq!(gateway.sent().len(), 2);
}

#[tokio::test]
async fn test_ownerless_blocker_is_skipped_but_walked_through() {
    // Car 2 has no owner, but car 1 behind it still has to move
    let (service, gateway) = service(&[(1, &[10]), (2, &[]), (3, &[30])]);
    chain(&service, &[(1, 2), (2, 3)]).await;
    gateway.take();

    let plan = service.send_need_to_go(CarId(3)).await.unwrap();

    assert_eq!(plan.ownerless, vec![CarId(2)]);
    assert_eq!(plan.blockers, vec![CarId(2), CarId(1)]);
    assert_eq!(gateway.sent().len(), 1);
    assert_eq!(gateway.sent()[0].recipient, UserId(10));
}

#[tokio::test]
async fn test_unblocked_car_is_rejected() {
    let (service, gateway) = service(CHAIN_CARS);
    chain(&service, &[(1, 2)]).await;
    gateway.take();

    let err = service.send_need_to_go(CarId(1)).await.unwrap_err();

    assert!(matches!(err, Error::NotBlocked(CarId(1))));
    assert_eq!(err.reason(), "car is not blocked");
    assert!(err.is_client_error());
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_car_is_rejected_before_walking() {
    let (service, _) = service(CHAIN_CARS);

    let err = service.send_need_to_go(CarId(99)).await.unwrap_err();
    assert!(matches!(err, Error::CarNotFound(CarId(99))));
}

#[tokio::test]
async fn test_propagation_does_not_change_relations() {
    let (service, _) = service(CHAIN_CARS);
    chain(&service, &[(1, 2), (2, 3)]).await;

    let before = service.relations_of(CarId(2)).await.unwrap();
    service.send_need_to_go(CarId(3)).await.unwrap();
    let after = service.relations_of(CarId(2)).await.unwrap();

    assert_eq!(before, after);
}

/// Refuses every message for one user
struct RejectingGateway {
    rejected: UserId,
    inner: CollectingGateway,
}

#[async_trait]
impl NotificationGateway for RejectingGateway {
    async fn dispatch(&self, notification: &Notification) -> Result<(), GatewayError> {
        if notification.recipient == self.rejected {
            return Err(GatewayError::Delivery {
                recipient: notification.recipient,
                reason: "device unregistered".to_string(),
            });
        }
        self.inner.dispatch(notification).await
    }
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_the_rest() {
    let gateway = Arc::new(RejectingGateway {
        rejected: UserId(20),
        inner: CollectingGateway::default(),
    });
    let service = BlockingService::new(
        Arc::from(new_in_memory_store()),
        Arc::new(directory(CHAIN_CARS)),
        Dispatcher::new(gateway.clone(), DispatchMode::Inline),
    );
    chain(&service, &[(1, 2), (2, 3), (3, 4)]).await;
    gateway.inner.take();

    let plan = service.send_need_to_go(CarId(4)).await.unwrap();

    assert_eq!(plan.notifications.len(), 3);
    let delivered: Vec<UserId> = gateway.inner.sent().iter().map(|n| n.recipient).collect();
    assert_eq!(delivered, vec![UserId(30), UserId(10)]);
}

#[tokio::test]
async fn test_background_dispatch_eventually_delivers() {
    let gateway = Arc::new(CollectingGateway::default());
    let service = BlockingService::new(
        Arc::from(new_in_memory_store()),
        Arc::new(directory(CHAIN_CARS)),
        Dispatcher::new(gateway.clone(), DispatchMode::Background),
    );
    chain(&service, &[(1, 2), (2, 3)]).await;

    let plan = service.send_need_to_go(CarId(3)).await.unwrap();
    assert_eq!(plan.notifications.len(), 2);

    // Two BEEN_BLOCKED messages from `chain` plus the two NEED_TO_GO ones
    let delivered = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let sent = gateway.sent();
            if sent.len() == 4 {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("background notifications were not delivered");

    let need_to_go: Vec<UserId> = delivered
        .iter()
        .filter(|n| n.kind == MessageKind::NeedToGo)
        .map(|n| n.recipient)
        .collect();
    assert_eq!(need_to_go.len(), 2);
    assert!(need_to_go.contains(&UserId(10)));
    assert!(need_to_go.contains(&UserId(20)));
}
