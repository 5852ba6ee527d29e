//! Running and draining the event pipeline.

use std::time::Duration;

use eventrouter::informer::{EventInformer, Informer};
use eventrouter::lifecycle::supervisor::{supervise, SHUTDOWN_EXIT_CODE};
use eventrouter::lifecycle::Shutdown;
use eventrouter::router::EventRouter;
use futures_util::{stream, StreamExt};
use kube::runtime::watcher;

mod common;

#[tokio::test]
async fn stop_drains_router_and_informer_then_exits_nonzero() {
    let source = stream::iter(vec![
        Ok(watcher::Event::Init),
        Ok(watcher::Event::InitApply(common::event("pulled", "1"))),
        Ok(watcher::Event::InitDone),
        Ok(watcher::Event::Apply(common::event("started", "1"))),
    ])
    .chain(stream::pending())
    .boxed();
    let mut informer: EventInformer = Informer::from_stream(source, Duration::from_secs(60));
    let sink = common::RecordingSink::default();
    let router = EventRouter::new(&mut informer, Box::new(sink.clone()));

    let shutdown = Shutdown::new();
    let supervisor = tokio::spawn(supervise(router, informer, shutdown.subscribe()));

    for _ in 0..100 {
        if sink.seen.lock().unwrap().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*sink.seen.lock().unwrap(), vec!["pulled", "started"]);
    assert!(!supervisor.is_finished());

    assert!(shutdown.trigger());
    let code = tokio::time::timeout(Duration::from_secs(2), supervisor)
        .await
        .expect("supervisor did not return after stop")
        .unwrap();

    assert_eq!(code, SHUTDOWN_EXIT_CODE);
    assert_ne!(code, 0);
}
