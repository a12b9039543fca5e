//! 历史栈同步：回退通知、地址恢复与失败重置。

mod common;

use std::sync::Arc;

use common::{Harness, HostCall, with_gated_initializer, with_gated_veto};
use futures::join;
use serde_json::{Value, json};
use spark_nav::{
    CallbackError, HistoryState, NavigatorConfig, RouteDefinition, RouteParams, RouteRequest,
};
use tracing_test::traced_test;

fn user_edit() -> RouteDefinition {
    RouteDefinition::new("user.edit", "Edit user")
        .with_parent("user")
        .with_parse_url(|segments: &[String]| {
            segments.get(1).map(|id| RouteParams::new().with("id", id.as_str()))
        })
        .with_get_url(|params: &RouteParams| {
            params.get("id").and_then(Value::as_str).map(str::to_owned)
        })
}

async fn seeded(address: &str, config: NavigatorConfig) -> Harness {
    let h = Harness::with_config(address, config);
    h.nav
        .add_route(RouteDefinition::new("home", "Home"))
        .await
        .expect("注册 home");
    h.nav.add_route(RouteDefinition::new("user", "Users")).await.expect("注册 user");
    h.nav.add_route(user_edit()).await.expect("注册 user.edit");
    h
}

#[tokio::test(flavor = "current_thread")]
async fn startup_resets_entry_state() {
    let h = Harness::new("/app/?lang=en");
    assert_eq!(
        h.host.calls(),
        vec![HostCall::Replace {
            state: None,
            title: String::new(),
            address: None,
        }]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn commits_push_state_title_and_address() {
    let h = seeded("/app/?lang=en", NavigatorConfig::default()).await;
    h.nav
        .set_route(RouteRequest::to("user.edit").with_params(RouteParams::new().with("id", "42")))
        .await
        .expect("激活 user.edit");

    assert_eq!(
        h.host.calls_after_startup(),
        vec![HostCall::Push {
            state: Some(json!({"routeId": "user.edit", "params": {"id": "42"}})),
            title: "Edit user".into(),
            address: "/app/?lang=en#user.edit/42".into(),
        }]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn query_is_dropped_when_configured() {
    let config = NavigatorConfig {
        preserve_query: false,
        ..NavigatorConfig::default()
    };
    let h = seeded("/app/?lang=en", config).await;
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");
    assert_eq!(h.host.pushes(), vec!["/app/#home".to_owned()]);
}

#[tokio::test(flavor = "current_thread")]
async fn pop_state_navigates_without_recording() {
    let h = seeded("/app/", NavigatorConfig::default()).await;
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");
    h.nav
        .set_route(RouteRequest::to("user.edit").with_params(RouteParams::new().with("id", "1")))
        .await
        .expect("激活 user.edit");
    let calls = h.host.calls().len();

    h.host.move_to("/app/#home");
    let active = h
        .nav
        .handle_pop_state(Some(json!({"routeId": "home", "params": {}})))
        .await
        .expect("回退到 home");

    assert_eq!(active.id(), "home");
    assert_eq!(h.host.calls().len(), calls);
    assert_eq!(h.nav.previous().map(|a| a.id().to_owned()), Some("user.edit".into()));
    assert_eq!(h.set_events(), 3);
}

#[tokio::test(flavor = "current_thread")]
async fn missing_state_is_recovered_from_address() {
    let h = seeded("/app/", NavigatorConfig::default()).await;
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");

    h.host.move_to("/app/#user.edit/a%20b");
    let active = h.nav.handle_pop_state(None).await.expect("从地址恢复");

    assert_eq!(active.id(), "user.edit");
    assert_eq!(active.params().get("id"), Some(&json!("a b")));

    let repaired = HistoryState {
        route_id: Some("user.edit".into()),
        params: Some(RouteParams::new().with("id", "a b")),
    };
    assert_eq!(
        h.host.calls().last(),
        Some(&HostCall::Replace {
            state: Some(repaired.to_value()),
            title: "Edit user".into(),
            address: None,
        })
    );
}

#[tokio::test(flavor = "current_thread")]
async fn foreign_state_payload_is_treated_as_missing() {
    let h = seeded("/app/", NavigatorConfig::default()).await;
    h.host.move_to("/app/#home");
    let active = h
        .nav
        .handle_pop_state(Some(json!("legacy-token")))
        .await
        .expect("从地址恢复");
    assert_eq!(active.id(), "home");
}

#[tokio::test(flavor = "current_thread")]
async fn vetoed_pop_state_restores_the_entry() {
    let h = Harness::new("/app/");
    h.nav
        .add_route(
            RouteDefinition::new("form", "Form")
                .with_before_unload(|| async { Ok::<_, CallbackError>(false) }),
        )
        .await
        .expect("注册 form");
    h.nav
        .add_route(RouteDefinition::new("home", "Home"))
        .await
        .expect("注册 home");
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");
    h.nav.set_route(RouteRequest::to("form")).await.expect("激活 form");
    let events = h.set_events();

    h.host.move_to("/app/#home");
    let active = h
        .nav
        .handle_pop_state(Some(json!({"routeId": "home", "params": {}})))
        .await
        .expect("仍停留在 form");

    assert_eq!(active.id(), "form");
    assert_eq!(h.host.address(), "/app/#form");
    assert_eq!(
        h.host.calls().last(),
        Some(&HostCall::Push {
            state: Some(json!({"routeId": "form", "params": {}})),
            title: "Form".into(),
            address: "/app/#form".into(),
        })
    );
    assert_eq!(h.set_events(), events, "补写历史不发通知");
}

#[tokio::test(flavor = "current_thread")]
#[traced_test]
async fn failed_back_navigation_resets_to_start() {
    let h = seeded("/app/?lang=en", NavigatorConfig::default()).await;
    h.nav
        .add_route(
            RouteDefinition::new("broken", "Broken").with_set_state(|_params: RouteParams| async {
                Err::<(), _>(CallbackError::new("session expired"))
            }),
        )
        .await
        .expect("注册 broken");
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");

    h.host.move_to("/app/?lang=en#broken");
    let active = h
        .nav
        .handle_pop_state(Some(json!({"routeId": "broken"})))
        .await;

    assert!(active.is_none());
    assert!(logs_contain("failed to navigate back"));
    assert_eq!(h.host.address(), "/app/?lang=en");
    assert_eq!(
        h.host.calls().last(),
        Some(&HostCall::Replace {
            state: None,
            title: String::new(),
            address: Some("/app/?lang=en".into()),
        })
    );
}

#[tokio::test(flavor = "current_thread")]
async fn failed_back_navigation_falls_back_to_default() {
    let h = seeded("/app/", NavigatorConfig::default()).await;
    h.nav
        .set_default("user", RouteParams::new())
        .await
        .expect("设置默认路由");
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");

    let active = h
        .nav
        .handle_pop_state(Some(json!({"routeId": "vanished", "params": {}})))
        .await
        .expect("回落到默认路由");
    assert_eq!(active.id(), "user");
}

#[tokio::test(flavor = "current_thread")]
async fn reset_can_be_disabled() {
    let config = NavigatorConfig {
        reset_on_back_failure: false,
        ..NavigatorConfig::default()
    };
    let h = seeded("/app/", config).await;
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");
    let calls = h.host.calls().len();

    let active = h
        .nav
        .handle_pop_state(Some(json!({"routeId": "vanished"})))
        .await
        .expect("保持 home");
    assert_eq!(active.id(), "home");
    assert_eq!(h.host.calls().len(), calls);
}

#[tokio::test(flavor = "current_thread")]
async fn reset_route_follows_current_address() {
    let h = seeded("/app/", NavigatorConfig::default()).await;
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");

    h.host.move_to("/app/#user.edit/9");
    let active = h
        .nav
        .reset_route()
        .await
        .expect("按地址重置")
        .expect("应有激活路由");
    assert_eq!(active.id(), "user.edit");
    assert_eq!(active.params().get("id"), Some(&json!("9")));

    h.host.move_to("/app/#later");
    let unchanged = h.nav.reset_route().await.expect("路由尚未注册");
    assert!(Arc::ptr_eq(&unchanged.expect("保持 user.edit"), &active));

    h.nav
        .add_route(RouteDefinition::new("later", "Later"))
        .await
        .expect("注册 later");
    assert_eq!(h.current_id().as_deref(), Some("later"));
}

#[tokio::test(flavor = "current_thread")]
#[traced_test]
async fn superseded_pop_state_is_not_a_failure() {
    let h = seeded("/app/", NavigatorConfig::default()).await;
    let (slow, release) = with_gated_initializer(RouteDefinition::new("slow", "Slow"));
    h.nav.add_route(slow).await.expect("注册 slow");
    h.nav.set_route(RouteRequest::to("home")).await.expect("激活 home");

    h.host.move_to("/app/#slow");
    let (popped, user) = join!(
        h.nav.handle_pop_state(Some(json!({"routeId": "slow", "params": {}}))),
        async {
            let user = h.nav.set_route(RouteRequest::to("user")).await;
            release.send(()).expect("slow 仍在等待");
            user
        }
    );

    let user = user.expect("user 提交").expect("应有激活路由");
    assert_eq!(user.id(), "user");
    assert!(Arc::ptr_eq(&popped.expect("当前为 user"), &user));
    assert!(!logs_contain("failed to navigate back"));
    assert!(
        !h.host
            .calls_after_startup()
            .iter()
            .any(|call| matches!(call, HostCall::Replace { state: None, .. })),
        "被取代的回退不应清空地址"
    );
    assert_eq!(h.host.address(), "/app/#user");
}

#[tokio::test(flavor = "current_thread")]
async fn stale_veto_does_not_restore_the_entry() {
    let h = Harness::new("/app/");
    let (form, release) = with_gated_veto(RouteDefinition::new("form", "Form"));
    h.nav.add_route(form).await.expect("注册 form");
    h.nav
        .add_route(RouteDefinition::new("home", "Home"))
        .await
        .expect("注册 home");
    h.nav
        .add_route(RouteDefinition::new("other", "Other"))
        .await
        .expect("注册 other");
    h.nav.set_route(RouteRequest::to("form")).await.expect("激活 form");

    h.host.move_to("/app/#home");
    let (popped, other) = join!(
        h.nav.handle_pop_state(Some(json!({"routeId": "home", "params": {}}))),
        async {
            let other = h.nav.set_route(RouteRequest::to("other").forced()).await;
            release.send(()).expect("守卫仍在等待");
            other
        }
    );

    other.expect("other 提交");
    assert_eq!(popped.map(|a| a.id().to_owned()), Some("other".into()));
    assert_eq!(
        h.host.pushes(),
        vec!["/app/#form".to_owned(), "/app/#other".to_owned()],
        "过期的否决不应补写历史"
    );
    assert_eq!(h.host.address(), "/app/#other");
}
