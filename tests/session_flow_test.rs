use parenting_chat::credentials::{CredentialSource, SecretStore};
use parenting_chat::{
    AgeRange, ClientSettings, FormSubmission, Message, Role, Session, SessionContext,
    SessionError, SessionState, Temperament,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "gsk_test_key";

fn session_for(server: &MockServer) -> Session {
    Session::new(
        ClientSettings {
            api_base: server.uri(),
            model: "llama3-8b-8192".to_string(),
        },
        CredentialSource::new("GROQ_API_KEY", SecretStore::empty())
            .with_env_lookup(|key| (key == "GROQ_API_KEY").then(|| API_KEY.to_string())),
    )
}

async fn mount_models(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("authorization", format!("Bearer {}", API_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "llama3-8b-8192", "object": "model"}]
        })))
        .mount(server)
        .await;
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

fn toddler_shy() -> FormSubmission {
    FormSubmission {
        age_range: AgeRange::Toddler,
        temperament_traits: vec![Temperament::Shy],
        current_challenges: String::new(),
    }
}

#[test_log::test(tokio::test)]
async fn test_entry_action_seeds_system_and_welcome_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_form(toddler_shy()).unwrap();
    session.enter_chat().await.unwrap();
    // Guarded by the client being set: no second probe, no duplicate seed.
    session.enter_chat().await.unwrap();

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, Role::System);
    assert!(transcript[0].content.contains("Toddler (1-3 years) age range"));
    assert!(transcript[0].content.contains("described as: Shy / Cautious."));
    assert!(!transcript[0].content.contains("facing challenges with"));
    assert_eq!(
        transcript[1],
        Message::assistant(
            "Hello! I'm ready to help with parenting tips for your toddler (1-3 years) (described as shy / cautious). How can I assist you today?"
        )
    );
    assert!(session.has_client());
    assert_eq!(session.state(), SessionState::Chatting);
}

#[test_log::test(tokio::test)]
async fn test_successful_turn_appends_user_then_assistant() {
    let server = MockServer::start().await;
    mount_models(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", format!("Bearer {}", API_KEY).as_str()))
        .and(body_partial_json(json!({
            "model": "llama3-8b-8192",
            "max_tokens": 1500,
            "stream": false
        })))
        .respond_with(completion("Try staying calm..."))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_form(toddler_shy()).unwrap();
    session.enter_chat().await.unwrap();

    let reply = session
        .send_user_message("How do I handle tantrums?")
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("Try staying calm..."));

    let transcript = session.transcript();
    assert_eq!(transcript[0].role, Role::System);
    let tail = &transcript[transcript.len() - 2..];
    assert_eq!(tail[0], Message::user("How do I handle tantrums?"));
    assert_eq!(tail[1], Message::assistant("Try staying calm..."));

    let view = session.view();
    assert!(view.messages.iter().all(|m| m.role != Role::System));
    assert_eq!(view.messages.len(), transcript.len() - 1);

    // The request carried the whole transcript, system message first.
    let requests = server.received_requests().await.unwrap();
    let chat_request = requests
        .iter()
        .find(|r| r.url.path() == "/chat/completions")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&chat_request.body).unwrap();
    let sent = body["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["role"], "system");
    assert_eq!(sent[1]["role"], "assistant");
    assert_eq!(sent[2]["content"], "How do I handle tantrums?");
}

#[test_log::test(tokio::test)]
async fn test_failed_turn_keeps_user_message_and_allows_next_turn() {
    let server = MockServer::start().await;
    mount_models(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_form(toddler_shy()).unwrap();
    session.enter_chat().await.unwrap();
    let seeded = session.transcript().len();

    let err = session.send_user_message("Bedtime tips?").await.unwrap_err();
    assert!(matches!(err, SessionError::CompletionRequest(_)));
    assert!(!err.is_fatal());
    assert!(err
        .to_string()
        .starts_with("An error occurred while communicating with Groq:"));
    assert!(err.to_string().contains("over capacity"));

    assert_eq!(session.transcript().len(), seeded + 1);
    assert_eq!(session.transcript().last(), Some(&Message::user("Bedtime tips?")));
    assert_eq!(session.state(), SessionState::Chatting);

    // The next submission is a fresh turn against the current transcript.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("A steady routine helps."))
        .mount(&server)
        .await;
    let reply = session.send_user_message("Anything else?").await.unwrap();
    assert_eq!(reply.as_deref(), Some("A steady routine helps."));

    let roles: Vec<Role> = session.transcript()[seeded..].iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
}

#[test_log::test(tokio::test)]
async fn test_completion_without_content_is_an_error() {
    let server = MockServer::start().await;
    mount_models(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_form(FormSubmission::default()).unwrap();
    session.enter_chat().await.unwrap();

    let err = session.send_user_message("Hi").await.unwrap_err();
    assert!(matches!(err, SessionError::CompletionRequest(_)));
    assert_eq!(session.transcript().last().map(|m| m.role), Some(Role::User));
}

#[test_log::test(tokio::test)]
async fn test_probe_failure_halts_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session.submit_form(toddler_shy()).unwrap();

    let err = session.enter_chat().await.unwrap_err();
    assert!(matches!(err, SessionError::ServiceConnect(_)));
    assert!(err
        .to_string()
        .starts_with("Failed to initialize or connect with Groq client:"));
    assert_eq!(session.state(), SessionState::Halted);
    assert!(session.transcript().is_empty());
    assert!(!session.has_client());

    assert!(matches!(
        session.send_user_message("Hello?").await,
        Err(SessionError::Halted(_))
    ));
    assert!(matches!(
        session.submit_form(FormSubmission::default()),
        Err(SessionError::Halted(_))
    ));
}

#[test_log::test(tokio::test)]
async fn test_credential_from_secrets_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("authorization", "Bearer gsk_from_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = SecretStore::from_toml_str("GROQ_API_KEY = \"gsk_from_file\"", "inline").unwrap();
    let mut session = Session::new(
        ClientSettings {
            api_base: server.uri(),
            model: "llama3-8b-8192".to_string(),
        },
        CredentialSource::new("GROQ_API_KEY", secrets).with_env_lookup(|_| None),
    );
    session.submit_form(FormSubmission::default()).unwrap();
    session.enter_chat().await.unwrap();
    assert!(session.has_client());
}

#[test_log::test(tokio::test)]
async fn test_reset_then_resubmit_uses_only_new_answers() {
    let server = MockServer::start().await;
    mount_models(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("Sure."))
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    session
        .submit_form(FormSubmission {
            age_range: AgeRange::Teenager,
            temperament_traits: vec![Temperament::Intense, Temperament::Persistent],
            current_challenges: "curfew arguments".to_string(),
        })
        .unwrap();
    session.enter_chat().await.unwrap();
    for question in ["One?", "Two?", "Three?"] {
        session.send_user_message(question).await.unwrap();
    }

    session.reset();
    assert_eq!(session.state(), SessionState::CollectingInfo);
    assert_eq!(session.context(), &SessionContext::default());
    assert!(session.transcript().is_empty());
    assert!(!session.has_client());

    session
        .submit_form(FormSubmission {
            age_range: AgeRange::NotSpecified,
            temperament_traits: vec![],
            current_challenges: "  ".to_string(),
        })
        .unwrap();
    session.enter_chat().await.unwrap();

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    let system = &transcript[0].content;
    assert!(system.contains("has not specified a child's age range"));
    assert!(!system.contains("Teenager"));
    assert!(!system.contains("Intense"));
    assert!(!system.contains("curfew"));
    assert_eq!(
        transcript[1].content,
        "Hello! I'm ready to help with parenting tips. How can I assist you today?"
    );
}
