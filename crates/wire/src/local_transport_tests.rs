// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pd_core::InvocationId;

#[tokio::test]
async fn attach_round_trips_through_the_worker_channel() {
    let (client, mut inbox) = worker_channel(8);

    tokio::spawn(async move {
        match inbox.recv().await.expect("call") {
            WorkerCall::Attach(request, reply) => {
                assert_eq!(request.session_id, "s1");
                let _ = reply.send(Ok(()));
            }
            _ => unreachable!(),
        }
    });

    let request = BuildStartData {
        invocation_id: InvocationId::new("activity-1", "test"),
        worker_id: WorkerId::new(3),
        session_id: "s1".to_string(),
    };
    assert!(client.attach(request).await.is_ok());
}

#[tokio::test]
async fn dropping_the_inbox_surfaces_transport_closed() {
    let (client, inbox) = worker_channel(8);
    drop(inbox);

    let request = BuildStartData {
        invocation_id: InvocationId::new("activity-1", "test"),
        worker_id: WorkerId::new(1),
        session_id: "s1".to_string(),
    };
    assert_eq!(client.attach(request).await, Err(RpcError::TransportClosed));
}

#[tokio::test]
async fn orchestrator_hello_round_trips_and_can_report_no_slots() {
    let (client, mut inbox) = orchestrator_channel(8);

    tokio::spawn(async move {
        match inbox.recv().await.expect("call") {
            OrchestratorCall::Hello(_location, _requested, reply) => {
                let _ = reply.send(Ok(HelloResponse::NoSlots));
            }
            _ => unreachable!(),
        }
    });

    let response = client
        .hello(ServiceLocation { host: "127.0.0.1".to_string(), port: 9000 }, None)
        .await
        .unwrap();
    assert_eq!(response, HelloResponse::NoSlots);
}
