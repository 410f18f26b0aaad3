//! Tests for single-flight model loading and progress delivery.

use futures_util::future::join_all;
use papilio_session::{
    AssistantConfig, LoadEvent, LoadState, SessionManager,
    testing::{ScriptedLoader, ScriptedModel},
};
use std::sync::{Arc, Mutex};

fn manager(loader: ScriptedLoader) -> SessionManager<ScriptedLoader> {
    SessionManager::new(loader, AssistantConfig::default())
}

fn retrying(loader: ScriptedLoader) -> SessionManager<ScriptedLoader> {
    SessionManager::new(
        loader,
        AssistantConfig {
            retry_on_failure: true,
            ..AssistantConfig::default()
        },
    )
}

fn percents() -> (Arc<Mutex<Vec<u8>>>, impl Fn(u8) + Send + Sync + 'static) {
    let seen: Arc<Mutex<Vec<u8>>> = Arc::default();
    let sink = seen.clone();
    (seen, move |percent| sink.lock().unwrap().push(percent))
}

fn events() -> (
    Arc<Mutex<Vec<LoadEvent>>>,
    impl Fn(&LoadEvent) + Send + Sync + 'static,
) {
    let seen: Arc<Mutex<Vec<LoadEvent>>> = Arc::default();
    let sink = seen.clone();
    (seen, move |event: &LoadEvent| sink.lock().unwrap().push(event.clone()))
}

#[tokio::test]
async fn nothing_loads_before_first_subscriber() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"]));
    let session = manager(loader.clone());
    tokio::task::yield_now().await;

    assert!(matches!(session.state(), LoadState::Unloaded));
    assert_eq!(session.progress(), 0);
    assert!(session.handle().is_none());
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn concurrent_callers_share_one_load() {
    let model = ScriptedModel::new(["hi"]);
    let loader = ScriptedLoader::new(model.clone()).with_progress([25, 50, 75]);
    let session = manager(loader.clone());

    let handles = join_all((0..8).map(|_| session.ensure_loaded(|_| {}))).await;

    assert_eq!(loader.calls(), 1);
    for handle in handles {
        assert!(handle.unwrap().same_as(&model));
    }
    assert!(session.handle().unwrap().same_as(&model));
    assert!(session.state().is_ready());
}

#[tokio::test]
async fn concurrent_callers_see_identical_progress() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"])).with_progress(1..=100);
    let session = manager(loader.clone());

    let (first, on_first) = percents();
    let (second, on_second) = percents();
    let (a, b) = tokio::join!(
        session.ensure_loaded(on_first),
        session.ensure_loaded(on_second)
    );
    assert!(a.unwrap().same_as(&b.unwrap()));

    let expected: Vec<u8> = (0..=100).collect();
    assert_eq!(*first.lock().unwrap(), expected);
    assert_eq!(*second.lock().unwrap(), expected);
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn progress_never_decreases() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"])).with_progress([10, 10, 30, 60]);
    let session = manager(loader);

    let (seen, observer) = percents();
    session.ensure_loaded(observer).await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![0, 10, 30, 60, 100]);
}

#[tokio::test]
async fn subscriber_after_ready_gets_100_then_ready() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"]));
    let session = manager(loader.clone());
    session.ensure_loaded(|_| {}).await.unwrap();

    let (seen, observer) = events();
    let _subscription = session.subscribe_progress(observer);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![LoadEvent::Progress(100), LoadEvent::Ready]
    );

    let (percent, on_progress) = percents();
    session.ensure_loaded(on_progress).await.unwrap();
    assert_eq!(*percent.lock().unwrap(), vec![100]);
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn subscriber_mid_load_gets_latest_percent_first() {
    let (loader, gate) = ScriptedLoader::new(ScriptedModel::new(["hi"]))
        .with_progress([40, 80])
        .gated();
    let session = manager(loader);

    let (early, observer) = events();
    let _early = session.subscribe_progress(observer);
    for _ in 0..100 {
        if session.progress() == 80 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(session.progress(), 80);
    assert!(matches!(session.state(), LoadState::Loading(80)));

    let (late, observer) = events();
    let _late = session.subscribe_progress(observer);
    assert_eq!(*late.lock().unwrap(), vec![LoadEvent::Progress(80)]);

    gate.open();
    session.ensure_loaded(|_| {}).await.unwrap();

    assert_eq!(
        *late.lock().unwrap(),
        vec![
            LoadEvent::Progress(80),
            LoadEvent::Progress(100),
            LoadEvent::Ready
        ]
    );
    assert_eq!(
        *early.lock().unwrap(),
        vec![
            LoadEvent::Progress(0),
            LoadEvent::Progress(40),
            LoadEvent::Progress(80),
            LoadEvent::Progress(100),
            LoadEvent::Ready
        ]
    );
}

#[tokio::test]
async fn dropped_subscription_stops_delivery() {
    let (loader, gate) = ScriptedLoader::new(ScriptedModel::new(["hi"]))
        .with_progress([50])
        .gated();
    let session = manager(loader);

    let (seen, observer) = events();
    let subscription = session.subscribe_progress(observer);
    drop(subscription);

    gate.open();
    session.ensure_loaded(|_| {}).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![LoadEvent::Progress(0)]);
}

#[tokio::test]
async fn failure_reaches_every_waiter() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"]))
        .with_progress([30])
        .failing(1);
    let session = manager(loader.clone());

    let (seen, observer) = events();
    let _subscription = session.subscribe_progress(observer);
    let (a, b) = tokio::join!(session.ensure_loaded(|_| {}), session.ensure_loaded(|_| {}));

    let a = a.unwrap_err();
    assert_eq!(a, b.unwrap_err());
    assert!(a.message().contains("scripted load failure"));
    assert!(matches!(session.state(), LoadState::Failed(_)));
    assert!(session.handle().is_none());

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.last(), Some(&LoadEvent::Failed(a)));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn failed_load_stays_failed_by_default() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"])).failing(1);
    let session = manager(loader.clone());

    let first = session.ensure_loaded(|_| {}).await.unwrap_err();
    let second = session.ensure_loaded(|_| {}).await.unwrap_err();
    assert_eq!(first, second);

    let (seen, observer) = events();
    let _subscription = session.subscribe_progress(observer);
    tokio::task::yield_now().await;

    assert_eq!(loader.calls(), 1);
    assert_eq!(session.engine().attempts(), 1);
    assert!(matches!(
        seen.lock().unwrap().last(),
        Some(LoadEvent::Failed(_))
    ));
}

#[tokio::test]
async fn retry_on_failure_starts_a_new_attempt() {
    let model = ScriptedModel::new(["hi"]);
    let loader = ScriptedLoader::new(model.clone()).failing(1);
    let session = retrying(loader.clone());

    assert!(session.ensure_loaded(|_| {}).await.is_err());
    let handle = session.ensure_loaded(|_| {}).await.unwrap();

    assert!(handle.same_as(&model));
    assert_eq!(loader.calls(), 2);
    assert_eq!(session.engine().attempts(), 2);
    assert!(session.state().is_ready());
}

#[tokio::test]
async fn retry_subscriber_starts_from_fresh_attempt() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"]))
        .with_progress([60])
        .failing(1);
    let session = retrying(loader.clone());
    assert!(session.ensure_loaded(|_| {}).await.is_err());

    let (seen, observer) = events();
    let _subscription = session.subscribe_progress(observer);
    assert_eq!(*seen.lock().unwrap(), vec![LoadEvent::Progress(0)]);

    session.ensure_loaded(|_| {}).await.unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            LoadEvent::Progress(0),
            LoadEvent::Progress(60),
            LoadEvent::Progress(100),
            LoadEvent::Ready
        ]
    );
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn retry_waiter_progress_starts_at_zero() {
    let loader = ScriptedLoader::new(ScriptedModel::new(["hi"]))
        .with_progress([60])
        .failing(1);
    let session = retrying(loader);
    assert!(session.ensure_loaded(|_| {}).await.is_err());

    let (seen, on_progress) = percents();
    session.ensure_loaded(on_progress).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 60, 100]);
}

#[tokio::test]
async fn clones_share_state() {
    let model = ScriptedModel::new(["hi"]);
    let loader = ScriptedLoader::new(model.clone());
    let session = manager(loader.clone());
    let other = session.clone();

    session.ensure_loaded(|_| {}).await.unwrap();
    assert!(other.handle().unwrap().same_as(&model));
    other.ensure_loaded(|_| {}).await.unwrap();
    assert_eq!(loader.calls(), 1);
}
