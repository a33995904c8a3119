//! Integration tests for the full login pipeline.
//!
//! Tests: redirect → callback → token exchange → affiliation → allowlist →
//! account provisioning → session binding → step-up
//!
//! Verifies:
//! - The redirect and callback requests cooperate only through the session
//! - Nothing is provisioned or bound for rejected identities
//! - The client secret stays out of everything observable

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::Engine;
    use chrono::{DateTime, Duration};
    use serde_json::json;

    use ssogate_auth::session::{LAST_LOGIN_SECRET, RETURN_TO_KEY, STATE_KEY};
    use ssogate_auth::{
        AccountName, AccountStore, AllowlistConfig, CallbackParams, ErrorKind, LoginFlow,
        LoginState, RequestBody, SessionStore, SsoConfig, StepUpStatus,
    };
    use ssogate_core::{FixedClock, GroupId, SubjectId};

    use crate::accounts::InMemoryAccountStore;
    use crate::pages::StaticPageResolver;
    use crate::scripted::ScriptedTransport;
    use crate::session::SessionRegistry;

    const NOW: i64 = 1_700_000_000;
    const SECRET: &str = "client-secret-do-not-log";
    const SESSION_ID: &str = "session-1";

    struct Harness {
        flow: LoginFlow,
        transport: Arc<ScriptedTransport>,
        clock: Arc<FixedClock>,
        sessions: Arc<SessionRegistry>,
        accounts: InMemoryAccountStore,
        pages: StaticPageResolver,
    }

    fn setup(allowlist: AllowlistConfig) -> Harness {
        let config = SsoConfig::new("wiki-client", SECRET, "https://wiki.example.org/callback")
            .with_allowlist(allowlist);
        let transport = Arc::new(ScriptedTransport::new());
        let clock = Arc::new(FixedClock::new(DateTime::from_timestamp(NOW, 0).unwrap()));
        let flow = LoginFlow::new(config, transport.clone()).with_clock(clock.clone());
        Harness {
            flow,
            transport,
            accounts: InMemoryAccountStore::with_clock(clock.clone()),
            clock,
            sessions: SessionRegistry::new(),
            pages: StaticPageResolver::new("https://wiki.example.org/wiki", "Main Page")
                .with_page("PageX"),
        }
    }

    fn access_token(subject: &str, name: &str) -> String {
        let payload = json!({
            "sub": format!("CHARACTER:EVE:{subject}"),
            "name": name,
            "owner": "8PmzCeTKb4VFUDrHLc/AeZXDSWM=",
            "exp": NOW + 1199,
            "scp": "publicData",
        });
        format!(
            "eyJhbGciOiJSUzI1NiJ9.{}.signature",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    fn script_provider(h: &Harness, subject: i64, name: &str, corporation: i64, alliance: Option<i64>) {
        h.transport.push_json(
            200,
            json!({
                "access_token": access_token(&subject.to_string(), name),
                "token_type": "Bearer",
                "expires_in": 1199,
                "refresh_token": "refresh",
            }),
        );
        let mut entry = json!({"character_id": subject, "corporation_id": corporation});
        if let Some(alliance) = alliance {
            entry["alliance_id"] = json!(alliance);
        }
        h.transport.push_json(200, json!([entry]));
    }

    /// Redirect request: returns the state the provider will echo back.
    fn redirect(h: &Harness, return_to: Option<&str>) -> String {
        let mut session = h.sessions.open(SESSION_ID);
        let redirect = h.flow.begin_login(&mut session, return_to).unwrap();
        let state = session.get(STATE_KEY).unwrap();
        assert!(redirect.url.contains(&format!("state={state}")));
        state
    }

    #[test]
    fn first_login_creates_account_and_establishes_session() {
        let h = setup(AllowlistConfig::default());
        let state = redirect(&h, Some("PageX"));
        script_provider(&h, 2112625428, "Pilot One", 98000001, Some(99000001));

        let mut session = h.sessions.open(SESSION_ID);
        let done = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("auth-code", state))
            .unwrap();

        assert_eq!(done.state, LoginState::SessionEstablished);
        assert_eq!(done.redirect_url, "https://wiki.example.org/wiki/PageX");
        assert_eq!(done.account.name.as_str(), "Pilot One");
        assert_eq!(done.account.real_name, "Pilot One");
        assert!(!done.account.has_password);
        assert_eq!(h.accounts.len(), 1);

        let saved = h.sessions.snapshot(SESSION_ID).unwrap();
        assert_eq!(saved.user, Some(AccountName::parse("Pilot One").unwrap()));
        assert_eq!(
            saved.secrets.get(LAST_LOGIN_SECRET).map(String::as_str),
            Some("1700000000")
        );
        assert!(!saved.values.contains_key(RETURN_TO_KEY));
        assert!(!saved.values.contains_key(STATE_KEY));

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "https://login.eveonline.com/v2/oauth/token");
        assert_eq!(
            requests[1].url,
            "https://esi.evetech.net/latest/characters/affiliation/"
        );
        assert_eq!(requests[1].body, RequestBody::Json(json!([2112625428_i64])));
    }

    #[test]
    fn missing_return_target_lands_on_home() {
        let h = setup(AllowlistConfig::default());
        let state = redirect(&h, None);
        script_provider(&h, 1, "Pilot", 1, None);

        let mut session = h.sessions.open(SESSION_ID);
        let done = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap();

        assert_eq!(done.redirect_url, "https://wiki.example.org/wiki/Main_Page");
    }

    #[test]
    fn forged_state_is_rejected_without_network_calls() {
        let h = setup(AllowlistConfig::default());
        redirect(&h, Some("PageX"));
        script_provider(&h, 1, "Pilot", 1, None);

        let mut session = h.sessions.open(SESSION_ID);
        let failure = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", "attacker-state"))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::StateMismatch);
        assert_eq!(h.transport.request_count(), 0);
        assert!(h.accounts.is_empty());
    }

    #[test]
    fn callback_in_a_fresh_session_is_rejected() {
        let h = setup(AllowlistConfig::default());
        let state = redirect(&h, None);

        let mut other = h.sessions.open("another-browser");
        let failure = h
            .flow
            .complete_login(&mut other, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::StateMismatch);
        assert_eq!(h.transport.request_count(), 0);
    }

    #[test]
    fn allowlisted_alliance_member_gets_in_and_others_do_not() {
        let allowlist = AllowlistConfig {
            allowed_group_ids_secondary: [GroupId::new("99000001")].into(),
            ..Default::default()
        };

        let h = setup(allowlist.clone());
        let state = redirect(&h, None);
        script_provider(&h, 5, "Member", 98000001, Some(99000001));
        let mut session = h.sessions.open(SESSION_ID);
        assert!(h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .is_ok());

        let h = setup(allowlist);
        let state = redirect(&h, Some("PageX"));
        script_provider(&h, 6, "Outsider", 98000002, None);
        let mut session = h.sessions.open(SESSION_ID);
        let failure = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::NotAuthorized);
        assert_eq!(
            failure.user_message(),
            "The character that you authenticated (Outsider) is not authorized to view this site"
        );
        assert!(h.accounts.is_empty());
        let saved = h.sessions.snapshot(SESSION_ID).unwrap();
        assert!(saved.user.is_none());
        assert!(!saved.secrets.contains_key(LAST_LOGIN_SECRET));
        assert!(!saved.values.contains_key(STATE_KEY));
    }

    #[test]
    fn listed_subject_is_allowed() {
        let allowlist = AllowlistConfig {
            allowed_subject_ids: [SubjectId::new("123")].into(),
            ..Default::default()
        };
        let h = setup(allowlist);
        let state = redirect(&h, None);
        script_provider(&h, 123, "Listed", 98000003, None);

        let mut session = h.sessions.open(SESSION_ID);
        let done = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap();
        assert_eq!(done.account.name.as_str(), "Listed");
    }

    #[test]
    fn ambiguous_affiliation_stops_the_login() {
        let h = setup(AllowlistConfig::default());
        let state = redirect(&h, None);
        h.transport.push_json(200, json!({"access_token": access_token("7", "Seven")}));
        h.transport.push_json(
            200,
            json!([{"corporation_id": 1}, {"corporation_id": 2}, {"corporation_id": 3}]),
        );

        let mut session = h.sessions.open(SESSION_ID);
        let failure = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::AmbiguousIdentity);
        assert_eq!(failure.reached, LoginState::ClaimsExtracted);
        assert_eq!(
            failure.user_message(),
            "Unable to retrieve character information. Please try again later"
        );
        assert!(h.accounts.is_empty());
    }

    #[test]
    fn provider_rejection_is_reported_to_the_user() {
        let h = setup(AllowlistConfig::default());
        let state = redirect(&h, None);
        h.transport.push_json(
            400,
            json!({"error": "invalid_grant", "error_description": "Authorization code expired"}),
        );

        let mut session = h.sessions.open(SESSION_ID);
        let failure = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::Provider);
        assert_eq!(failure.reached, LoginState::CallbackReceived);
        assert_eq!(
            failure.user_message(),
            "Retrieving access token failed: Error: invalid_grant. Authorization code expired"
        );
    }

    #[test]
    fn returning_pilot_reuses_account_with_persistent_cookie() {
        let h = setup(AllowlistConfig::default());
        let name = AccountName::parse("Pilot One").unwrap();
        let existing = h.accounts.create_account(&name, "Pilot One").unwrap();
        h.accounts.set_preference(&name, "ssogate-persist", "1");

        let state = redirect(&h, None);
        script_provider(&h, 2112625428, "Pilot One", 98000001, None);
        let mut session = h.sessions.open(SESSION_ID);
        let done = h
            .flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap();

        assert_eq!(done.account.id, existing.id);
        assert!(done.persistent);
        assert!(h.sessions.snapshot(SESSION_ID).unwrap().remember);
        assert_eq!(h.accounts.len(), 1);
    }

    #[test]
    fn step_up_window_tracks_the_sso_login() {
        let h = setup(AllowlistConfig::default());
        let state = redirect(&h, None);
        script_provider(&h, 1, "Pilot", 1, None);
        let mut session = h.sessions.open(SESSION_ID);
        h.flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap();

        h.clock.advance(Duration::seconds(100));
        let session = h.sessions.open(SESSION_ID);
        assert_eq!(
            h.flow.check_step_up_freshness("ChangeEmail", &session),
            StepUpStatus::Ok
        );

        h.clock.advance(Duration::seconds(201));
        assert_eq!(
            h.flow.check_step_up_freshness("ChangeEmail", &session),
            StepUpStatus::ReauthRequired
        );
    }

    #[test]
    fn client_secret_only_travels_to_the_token_endpoint() {
        let h = setup(AllowlistConfig::default());
        let state = redirect(&h, None);
        script_provider(&h, 1, "Pilot", 1, None);
        let mut session = h.sessions.open(SESSION_ID);
        h.flow
            .complete_login(&mut session, &h.accounts, &h.pages, &CallbackParams::new("c", state))
            .unwrap();

        let requests = h.transport.requests();
        let RequestBody::Form(pairs) = &requests[0].body else {
            panic!("token request must be a form post");
        };
        assert!(pairs.contains(&("client_secret".to_string(), SECRET.to_string())));
        assert!(!format!("{:?}", requests[0].body).contains(SECRET));
        assert!(!format!("{:?}", requests[1].body).contains(SECRET));

        let saved = h.sessions.snapshot(SESSION_ID).unwrap();
        assert!(!format!("{saved:?}").contains(SECRET));
        assert!(!format!("{:?}", h.flow.config()).contains(SECRET));
        assert!(!h.flow.config().display_json().to_string().contains(SECRET));
    }
}
