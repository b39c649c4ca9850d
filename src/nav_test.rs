use super::*;

#[test]
fn channel_router_forwards_in_order() {
    let (router, mut rx) = ChannelRouter::new();
    router.refresh();
    router.push("/login");

    assert_eq!(rx.try_recv().unwrap(), NavCommand::Refresh);
    assert_eq!(rx.try_recv().unwrap(), NavCommand::Push("/login".into()));
    assert!(rx.try_recv().is_err());
}

#[test]
fn channel_router_survives_dropped_receiver() {
    let (router, rx) = ChannelRouter::new();
    drop(rx);
    router.push("/login");
    router.refresh();
}

#[test]
fn channel_router_usable_as_trait_object() {
    let (router, mut rx) = ChannelRouter::new();
    let dyn_router: std::sync::Arc<dyn Router> = std::sync::Arc::new(router);
    dyn_router.push("/groups");
    assert_eq!(rx.try_recv().unwrap(), NavCommand::Push("/groups".into()));
}
