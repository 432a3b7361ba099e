// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use tourney_gate::{
	_preludet::*,
	exchange::TokenExchanger,
	profile::ProfileFetcher,
	roster::{ChatColumns, MemoryRoster, RosterStore},
	sweep::{RosterSweep, SweepReport},
};

fn profile_body(identity_id: u64, username: &str, rank: u64) -> serde_json::Value {
	json!({
		"id": identity_id,
		"username": username,
		"avatar_url": format!("https://a.example.com/{identity_id}.png"),
		"country_code": "PT",
		"join_date": "2015-06-01T00:00:00+00:00",
		"badges": [],
		"statistics": { "pp_rank": rank, "pp": 100.0, "play_count": 777 },
	})
}

fn build_sweep(server: &MockServer, roster: Arc<MemoryRoster>) -> RosterSweep {
	let config = Arc::new(test_config(&server.base_url()));
	let http = ReqwestClient::new();
	let exchanger = TokenExchanger::new(config.clone(), http.clone());
	let profiles = ProfileFetcher::new(config, http);

	RosterSweep::new(exchanger, profiles, roster)
}

async fn mock_service_token(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").body_includes("grant_type=client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "service-token" }));
		})
		.await;
}

#[tokio::test]
async fn sweep_refreshes_profiles_and_tags_restricted_rows() {
	let server = MockServer::start_async().await;
	let roster =
		Arc::new(MemoryRoster::with_rows([test_record(1, "one"), test_record(2, "two")]));

	roster
		.update_chat_columns(
			0,
			ChatColumns { tag: "one#0001".into(), id: "901".into(), was_in_guild: Some(true) },
		)
		.await
		.expect("Seeding the chat columns should succeed.");
	mock_service_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v2/users/1/osu")
				.header("authorization", "Bearer service-token");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(profile_body(1, "one-renamed", 10));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/users/2/osu");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({
					"id": 2,
					"username": "two",
					"join_date": "2015-06-01T00:00:00+00:00",
					"is_restricted": true,
					"statistics": { "pp_rank": null, "pp": null },
				}));
		})
		.await;

	let report = build_sweep(&server, roster.clone())
		.refresh()
		.await
		.expect("Sweep over healthy mocks should succeed.");

	assert_eq!(report, SweepReport { refreshed: 1, restricted: 1, skipped: 0 });

	let rows = roster.rows();

	assert_eq!(rows[0].username, "one-renamed");
	assert_eq!(rows[0].rank, Some(10));
	assert_eq!(rows[0].play_count, 777);
	// Chat linkage never participates in the sweep.
	assert_eq!(rows[0].chat_tag.as_deref(), Some("one#0001"));
	assert_eq!(rows[0].was_in_guild, Some(true));
	// Restricted rows keep their data; only the username gets tagged.
	assert_eq!(rows[1].username, "two [RESTRICTED]");
	assert_eq!(rows[1].rank, test_record(2, "two").rank);
}

#[tokio::test]
async fn unreachable_profiles_are_skipped_not_fatal() {
	let server = MockServer::start_async().await;
	let roster =
		Arc::new(MemoryRoster::with_rows([test_record(1, "one"), test_record(2, "two")]));

	mock_service_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/users/1/osu");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(profile_body(1, "one", 10));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/users/2/osu");
			then.status(500);
		})
		.await;

	let report = build_sweep(&server, roster.clone())
		.refresh()
		.await
		.expect("Sweep with one failing profile should still succeed.");

	assert_eq!(report, SweepReport { refreshed: 1, restricted: 0, skipped: 1 });
	assert_eq!(roster.rows()[1].username, "two");
}

#[tokio::test]
async fn failed_service_grant_fails_the_whole_sweep() {
	let server = MockServer::start_async().await;
	let roster = Arc::new(MemoryRoster::with_rows([test_record(1, "one")]));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.json_body(json!({ "error": "invalid_client" }));
		})
		.await;

	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/users/1/osu");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(profile_body(1, "one", 10));
		})
		.await;

	build_sweep(&server, roster.clone())
		.refresh()
		.await
		.expect_err("Sweep without a service token should fail.");

	assert_eq!(roster.rows()[0].username, "one");

	profile_mock.assert_calls_async(0).await;
}
