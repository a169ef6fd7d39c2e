mod common;

use common::{request_body, serve_once};
use unimate_lib::chat::ChatSession;
use unimate_lib::config::WebhookConfig;
use unimate_lib::webhook::{
    AssistantGateway, AssistantRequest, ChatRole, GatewayError, HistoryEntry, ReplyField, AI_FAILURE_MESSAGE,
};
use unimate_lib::webhook::WebhookClient;

fn client(url: String) -> WebhookClient {
    WebhookClient::new(&WebhookConfig { url, timeout_secs: Some(5) }).unwrap()
}

fn entry(role: ChatRole, content: &str) -> HistoryEntry {
    HistoryEntry { role, content: content.to_string() }
}

#[tokio::test]
async fn envelope_carries_prompt_session_and_last_five_messages() {
    let (url, server) = serve_once(200, r#"{"output": "Recursion is a function calling itself."}"#).await;

    let history = (1..=7)
        .map(|i| entry(if i % 2 == 0 { ChatRole::Assistant } else { ChatRole::User }, &format!("m{}", i)))
        .collect();
    let reply = client(url)
        .send(AssistantRequest::Chat { message: "What is recursion?".to_string(), history })
        .await
        .unwrap();

    assert_eq!(reply.text, "Recursion is a function calling itself.");
    assert_eq!(reply.field, ReplyField::Output);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /webhook/chat"));
    let body = request_body(&raw);
    assert_eq!(body["action"], "sendMessage");
    assert_eq!(body["chatInput"], "What is recursion?");
    assert!(body["sessionId"].as_str().unwrap().starts_with("session_"));

    let sent = body["metadata"]["conversationHistory"].as_array().unwrap();
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[0]["content"], "m3");
    assert_eq!(sent[4]["content"], "m7");
    assert_eq!(sent[4]["role"], "user");
}

#[tokio::test]
async fn each_call_uses_a_fresh_session_id() {
    let (url_a, server_a) = serve_once(200, r#"{"response": "a"}"#).await;
    let (url_b, server_b) = serve_once(200, r#"{"response": "b"}"#).await;

    client(url_a).send(AssistantRequest::GenerateQuiz { prompt: "p".into() }).await.unwrap();
    client(url_b).send(AssistantRequest::GenerateQuiz { prompt: "p".into() }).await.unwrap();

    let a = request_body(&server_a.await.unwrap());
    let b = request_body(&server_b.await.unwrap());
    assert_ne!(a["sessionId"], b["sessionId"]);
    assert_eq!(a["metadata"]["conversationHistory"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn later_reply_fields_are_found() {
    let (url, server) = serve_once(200, r#"[{"content": "from content"}]"#).await;
    let reply = client(url).send(AssistantRequest::GradeQuiz { prompt: "grade".into() }).await.unwrap();
    assert_eq!(reply.text, "from content");
    assert_eq!(reply.field, ReplyField::Content);
    server.await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (url, server) = serve_once(503, r#"{"output": "ignored"}"#).await;
    let err = client(url).send(AssistantRequest::GradeQuiz { prompt: "grade".into() }).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status(503)));
    assert_eq!(err.user_message(), AI_FAILURE_MESSAGE);
    server.await.unwrap();
}

#[tokio::test]
async fn reply_without_known_field_is_an_error() {
    let (url, server) = serve_once(200, r#"{"status": "ok", "data": {"output": "nested"}}"#).await;
    let err = client(url).send(AssistantRequest::GradeQuiz { prompt: "grade".into() }).await.unwrap_err();
    assert!(matches!(err, GatewayError::MissingReplyField));
    server.await.unwrap();
}

#[tokio::test]
async fn chat_session_forwards_prior_messages_and_appends_reply() {
    let (url, server) = serve_once(200, r#"{"message": "Arrays hold values of one type."}"#).await;
    let gateway = client(url);
    let mut chat = ChatSession::new("Programming Fundamentals");

    assert!(chat.send(&gateway, "   ").await.unwrap().is_none());
    assert_eq!(chat.messages().len(), 1);

    let reply = chat.send(&gateway, "What is an array?").await.unwrap().unwrap();
    assert_eq!(reply.role, ChatRole::Assistant);
    assert_eq!(chat.messages().len(), 3);

    let body = request_body(&server.await.unwrap());
    let history = body["metadata"]["conversationHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["role"], "assistant");
    assert_eq!(body["chatInput"], "What is an array?");
}

#[tokio::test]
async fn chat_failure_keeps_user_message_only() {
    let (url, server) = serve_once(500, "{}").await;
    let gateway = client(url);
    let mut chat = ChatSession::default();

    assert!(chat.send(&gateway, "hello?").await.is_err());
    assert_eq!(chat.messages().len(), 2);
    assert_eq!(chat.messages()[1].role, ChatRole::User);
    server.await.unwrap();
}
