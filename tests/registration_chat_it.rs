// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use tourney_gate::{
	_preludet::*,
	config::GateConfig,
	registration::CallbackParams,
	render::PageKind,
	roster::RosterStore,
	state::{Leg, StateSigner},
};

const MEMBER_PATH: &str = "/chat/api/guilds/100200300/members/999";

fn chat_callback(config: &GateConfig, identity_id: u64, username: &str) -> CallbackParams {
	let leg = Leg::Chat { identity_id, identity_username: username.to_owned() };

	CallbackParams {
		state: Some(StateSigner::new(config).encode(&leg)),
		code: Some("code-b".into()),
		error: None,
	}
}

async fn mock_token_and_self(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/chat/oauth2/token")
				.body_includes("grant_type=authorization_code")
				.body_includes("scope=identify+guilds.join");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "chat-token" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/chat/api/users/@me")
				.header("authorization", "Bearer chat-token");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "id": "999", "username": "bar", "discriminator": "1234" }));
		})
		.await;
}

#[tokio::test]
async fn absent_member_is_joined_with_roles_and_nickname() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url());
	let (registrar, roster, notifier) = build_test_registrar(config.clone());

	roster.append(test_record(42, "foo")).await.expect("Seeding the roster should succeed.");
	mock_token_and_self(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(MEMBER_PATH).header("authorization", "Bot bot-token");
			then.status(404);
		})
		.await;

	let join_mock = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(MEMBER_PATH)
				.header("authorization", "Bot bot-token")
				.json_body_includes(
					r#"{"access_token":"chat-token","roles":["111","222"],"nick":"foo"}"#,
				);
			then.status(201);
		})
		.await;
	let page = registrar.handle_callback(chat_callback(&config, 42, "foo")).await;

	assert_eq!(page.kind, PageKind::GuildJoined);
	assert!(page.html.contains("bar#1234"));

	let rows = roster.rows();

	assert_eq!(rows[0].chat_tag.as_deref(), Some("bar#1234"));
	assert_eq!(rows[0].chat_id.as_deref(), Some("999"));
	assert_eq!(rows[0].was_in_guild, Some(false));
	assert!(notifier.stuck().is_empty());

	join_mock.assert_async().await;
}

#[tokio::test]
async fn idempotent_join_response_still_counts_as_joined() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url());
	let (registrar, roster, notifier) = build_test_registrar(config.clone());

	roster.append(test_record(42, "foo")).await.expect("Seeding the roster should succeed.");
	mock_token_and_self(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(MEMBER_PATH).header("authorization", "Bot bot-token");
			then.status(404);
		})
		.await;

	// The provider answers 204 when it raced us and the user is already in.
	let join_mock = server
		.mock_async(|when, then| {
			when.method(PUT).path(MEMBER_PATH).header("authorization", "Bot bot-token");
			then.status(204);
		})
		.await;
	let page = registrar.handle_callback(chat_callback(&config, 42, "foo")).await;

	assert_eq!(page.kind, PageKind::GuildJoined);
	assert_eq!(roster.rows()[0].was_in_guild, Some(false));
	assert!(notifier.stuck().is_empty());

	join_mock.assert_async().await;
}

#[tokio::test]
async fn existing_member_gets_every_role_despite_partial_failure() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url());
	let (registrar, roster, notifier) = build_test_registrar(config.clone());

	roster.append(test_record(42, "foo")).await.expect("Seeding the roster should succeed.");
	mock_token_and_self(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(MEMBER_PATH).header("authorization", "Bot bot-token");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "user": { "id": "999" } }));
		})
		.await;

	let first_role = server
		.mock_async(|when, then| {
			when.method(PUT).path(format!("{MEMBER_PATH}/roles/111"));
			then.status(204);
		})
		.await;
	let second_role = server
		.mock_async(|when, then| {
			when.method(PUT).path(format!("{MEMBER_PATH}/roles/222"));
			then.status(403);
		})
		.await;
	let page = registrar.handle_callback(chat_callback(&config, 42, "foo")).await;

	assert_eq!(page.kind, PageKind::RolesUpdated);
	assert_eq!(roster.rows()[0].was_in_guild, Some(true));
	assert!(notifier.stuck().is_empty());

	// One grant per configured role, even after the second one is refused.
	first_role.assert_async().await;
	second_role.assert_async().await;
}

#[tokio::test]
async fn failed_exchange_alerts_the_operator_and_leaves_the_row_untouched() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url());
	let (registrar, roster, notifier) = build_test_registrar(config.clone());

	roster.append(test_record(42, "foo")).await.expect("Seeding the roster should succeed.");
	server
		.mock_async(|when, then| {
			when.method(POST).path("/chat/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.json_body(json!({ "error": "invalid_grant" }));
		})
		.await;

	let page = registrar.handle_callback(chat_callback(&config, 42, "foo")).await;

	assert_eq!(page.kind, PageKind::Error);
	assert_eq!(notifier.stuck(), vec![(42, "foo".to_owned())]);
	assert_eq!(roster.rows()[0].chat_tag, None);
}

#[tokio::test]
async fn inconclusive_probe_still_writes_the_linkage_then_alerts() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url());
	let (registrar, roster, notifier) = build_test_registrar(config.clone());

	roster.append(test_record(42, "foo")).await.expect("Seeding the roster should succeed.");
	mock_token_and_self(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(MEMBER_PATH);
			then.status(500);
		})
		.await;

	let page = registrar.handle_callback(chat_callback(&config, 42, "foo")).await;

	assert_eq!(page.kind, PageKind::Error);
	assert_eq!(notifier.stuck(), vec![(42, "foo".to_owned())]);

	let rows = roster.rows();

	// Identity is still recorded; membership remains undetermined.
	assert_eq!(rows[0].chat_id.as_deref(), Some("999"));
	assert_eq!(rows[0].was_in_guild, None);
}

#[tokio::test]
async fn unknown_registrant_is_reported_as_stuck() {
	let server = MockServer::start_async().await;
	let config = test_config(&server.base_url());
	let (registrar, roster, notifier) = build_test_registrar(config.clone());

	mock_token_and_self(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(MEMBER_PATH);
			then.status(404);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PUT).path(MEMBER_PATH);
			then.status(201);
		})
		.await;

	let page = registrar.handle_callback(chat_callback(&config, 42, "foo")).await;

	assert_eq!(page.kind, PageKind::Error);
	assert_eq!(notifier.stuck(), vec![(42, "foo".to_owned())]);
	assert!(roster.rows().is_empty());
}
