//! Conversation lifecycle driven through the public API with a scripted service

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use edubot::api::{ApiError, ApiErrorKind, ChatService, Reply};
use edubot::conversation::{
    Completion, ConversationStore, FixedClock, MessageId, Rejection, RequestOrigin, Sender,
    SessionStatus, WELCOME_TEXT,
};
use edubot::ui::conversation::{ConversationComposer, MAX_DRAFT_CHARS, Submission};
use pretty_assertions::assert_eq;

/// Answers from a fixed table and records every question it receives
#[derive(Default)]
struct ScriptedService {
    answers: HashMap<String, Result<String, ApiErrorKind>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn answer(mut self, question: &str, reply: &str) -> Self {
        self.answers.insert(question.to_string(), Ok(reply.to_string()));
        self
    }

    fn fail(mut self, question: &str, kind: ApiErrorKind) -> Self {
        self.answers.insert(question.to_string(), Err(kind));
        self
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatService for ScriptedService {
    async fn send(&self, text: &str) -> Result<Reply, ApiError> {
        self.asked.lock().unwrap().push(text.to_string());
        match self.answers.get(text) {
            Some(Ok(reply)) => Ok(Reply {
                text: reply.clone(),
                conversation_id: None,
            }),
            Some(Err(kind)) => Err(ApiError::of_kind(*kind)),
            None => Err(ApiError::of_kind(ApiErrorKind::InternalServiceError)),
        }
    }
}

fn store() -> ConversationStore {
    let start = Local.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap();
    ConversationStore::new(Arc::new(FixedClock::new(start)))
}

fn contents(store: &ConversationStore) -> Vec<(Sender, String)> {
    store
        .messages()
        .iter()
        .map(|m| (m.sender(), m.content().to_string()))
        .collect()
}

#[test]
fn initialized_conversation_holds_only_the_welcome() {
    let store = store();

    assert_eq!(store.messages().len(), 1);
    assert!(store.messages()[0].id().is_welcome());
    assert_eq!(store.messages()[0].content(), WELCOME_TEXT);
    assert_eq!(store.status(), SessionStatus::Idle);
    assert!(store.error().is_none());
}

#[tokio::test]
async fn question_is_answered_and_appended() {
    let service = ScriptedService::default().answer("¿Qué es una variable?", "Una variable es...");
    let mut store = store();

    let pending = store.send_user_message("¿Qué es una variable?").unwrap();
    assert_eq!(store.status(), SessionStatus::AwaitingResponse);
    assert_eq!(
        contents(&store)[1],
        (Sender::User, "¿Qué es una variable?".to_string())
    );

    let completed = pending.execute(&service).await;
    assert!(matches!(store.complete(completed), Completion::Replied(_)));

    assert_eq!(store.status(), SessionStatus::Idle);
    assert_eq!(
        contents(&store),
        vec![
            (Sender::Bot, WELCOME_TEXT.to_string()),
            (Sender::User, "¿Qué es una variable?".to_string()),
            (Sender::Bot, "Una variable es...".to_string()),
        ]
    );
}

#[tokio::test]
async fn failed_request_keeps_user_turn_and_records_error() {
    let service = ScriptedService::default().fail("hola", ApiErrorKind::RateLimited);
    let mut store = store();

    let pending = store.send_user_message("hola").unwrap();
    let completion = store.complete(pending.execute(&service).await);

    assert!(matches!(completion, Completion::Failed(_)));
    assert_eq!(store.status(), SessionStatus::Errored);
    assert_eq!(store.messages().len(), 2);
    assert_eq!(store.messages()[1].sender(), Sender::User);

    let error = store.error().unwrap();
    assert_eq!(error.kind, ApiErrorKind::RateLimited);
    assert_eq!(error.message, "Demasiadas solicitudes. Por favor, espera un momento.");
}

#[tokio::test]
async fn retry_after_error_clears_it_before_the_outcome() {
    let service = ScriptedService::default().fail("hola", ApiErrorKind::RateLimited);
    let mut store = store();

    let first = store.send_user_message("hola").unwrap();
    store.complete(first.execute(&service).await);
    assert_eq!(store.status(), SessionStatus::Errored);

    let _second = store.send_user_message("hola").unwrap();
    assert_eq!(store.status(), SessionStatus::AwaitingResponse);
    assert!(store.error().is_none());
    assert_eq!(store.messages().len(), 3);
}

#[test]
fn overlong_draft_is_capped_at_the_limit() {
    let mut composer = ConversationComposer::new("Escribe tu pregunta...");

    let draft = "a".repeat(MAX_DRAFT_CHARS + 1);
    let accepted = composer.handle_paste(&draft);
    assert_eq!(accepted, MAX_DRAFT_CHARS);
    assert_eq!(composer.char_count(), MAX_DRAFT_CHARS);

    composer.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE));
    assert_eq!(composer.char_count(), MAX_DRAFT_CHARS);
}

#[tokio::test]
async fn clear_requires_confirmation() {
    let service = ScriptedService::default().answer("hola", "¡Hola! ¿Qué estudiamos?");
    let mut store = store();

    let pending = store.send_user_message("hola").unwrap();
    store.complete(pending.execute(&service).await);
    assert_eq!(store.messages().len(), 3);

    let mut prompt_seen = String::new();
    let cleared = store.clear_conversation(|prompt| {
        prompt_seen = prompt.to_string();
        false
    });
    assert!(!cleared);
    assert!(!prompt_seen.is_empty());
    assert_eq!(store.messages().len(), 3);

    assert!(store.clear_conversation(|_| true));
    assert_eq!(store.messages().len(), 1);
    assert!(store.messages()[0].id().is_welcome());
    assert_eq!(store.status(), SessionStatus::Idle);
}

#[test]
fn only_one_request_may_be_in_flight() {
    let mut store = store();

    let _pending = store.send_user_message("primera").unwrap();
    assert_eq!(store.send_user_message("segunda"), Err(Rejection::RequestInFlight));
    assert_eq!(store.messages().len(), 2);

    let welcome = MessageId::welcome();
    assert_eq!(store.regenerate(&welcome), Err(Rejection::RequestInFlight));
}

#[tokio::test]
async fn reply_arriving_after_clear_is_discarded() {
    let service = ScriptedService::default().answer("hola", "tarde");
    let mut store = store();

    let pending = store.send_user_message("hola").unwrap();
    assert!(store.clear_conversation(|_| true));

    let completion = store.complete(pending.execute(&service).await);
    assert_eq!(completion, Completion::Discarded);
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn regenerate_resends_the_question_without_duplicating_it() {
    let service = ScriptedService::default().answer("¿Qué es un bucle?", "Un bucle repite...");
    let mut store = store();

    let pending = store.send_user_message("¿Qué es un bucle?").unwrap();
    let Completion::Replied(answer_id) = store.complete(pending.execute(&service).await) else {
        panic!("expected a reply");
    };

    let pending = store.regenerate(&answer_id).unwrap();
    assert_eq!(pending.origin, RequestOrigin::Regenerate(answer_id.clone()));
    assert_eq!(pending.text, "¿Qué es un bucle?");
    assert_eq!(store.messages().len(), 3);

    let Completion::Replied(second_id) = store.complete(pending.execute(&service).await) else {
        panic!("expected a reply");
    };

    // Regenerating the newer answer still finds the same question
    let pending = store.regenerate(&second_id).unwrap();
    assert_eq!(pending.text, "¿Qué es un bucle?");
    store.complete(pending.execute(&service).await);

    let users = store
        .messages()
        .iter()
        .filter(|m| m.sender() == Sender::User)
        .count();
    assert_eq!(users, 1);
    assert_eq!(store.messages().len(), 5);
    assert_eq!(service.asked(), vec!["¿Qué es un bucle?"; 3]);
}

#[tokio::test]
async fn welcome_and_user_turns_cannot_be_regenerated() {
    let service = ScriptedService::default().fail("hola", ApiErrorKind::ServiceUnavailable);
    let mut store = store();
    assert_eq!(
        store.regenerate(&MessageId::welcome()),
        Err(Rejection::NoPrecedingUserTurn(MessageId::welcome()))
    );

    let pending = store.send_user_message("hola").unwrap();
    store.complete(pending.execute(&service).await);
    let user_id = store.messages()[1].id().clone();

    assert_eq!(
        store.regenerate(&user_id),
        Err(Rejection::NotABotMessage(user_id.clone()))
    );

    let unknown = MessageId::generate();
    assert_eq!(
        store.regenerate(&unknown),
        Err(Rejection::UnknownMessage(unknown.clone()))
    );
    assert_eq!(store.status(), SessionStatus::Errored);
}

#[tokio::test]
async fn answers_never_land_after_a_different_question() {
    let service = ScriptedService::default()
        .answer("q1", "a1")
        .fail("q2", ApiErrorKind::RateLimited);
    let mut store = store();

    let pending = store.send_user_message("q1").unwrap();
    let Completion::Replied(a1) = store.complete(pending.execute(&service).await) else {
        panic!("expected a reply");
    };
    let pending = store.send_user_message("q2").unwrap();
    store.complete(pending.execute(&service).await);

    // The only earlier answer belongs to q1, which is no longer the last question
    assert!(store.regenerable_answer().is_none());
    assert_eq!(store.regenerate(&a1), Err(Rejection::LaterTurnExists(a1.clone())));

    // Retrying resends q2 in place instead
    let service = ScriptedService::default().answer("q2", "a2");
    let pending = store.retry_unanswered().unwrap();
    assert_eq!(pending.text, "q2");
    store.complete(pending.execute(&service).await);

    assert_eq!(
        contents(&store)[1..],
        [
            (Sender::User, "q1".to_string()),
            (Sender::Bot, "a1".to_string()),
            (Sender::User, "q2".to_string()),
            (Sender::Bot, "a2".to_string()),
        ]
    );
    assert_eq!(store.regenerate(&a1), Err(Rejection::LaterTurnExists(a1.clone())));
}

#[tokio::test]
async fn composer_submission_drives_the_store() {
    let service = ScriptedService::default().answer("¿Qué es una función?", "Una función agrupa...");
    let mut store = store();
    let mut composer = ConversationComposer::new("Escribe tu pregunta...");
    composer.handle_paste("¿Qué es una función?");

    let Submission::Sent(pending) = composer.submit(&mut store) else {
        panic!("expected the draft to be sent");
    };
    assert_eq!(composer.content(), "");
    assert!(store.is_awaiting_response());

    store.complete(pending.execute(&service).await);
    assert_eq!(store.messages().last().unwrap().content(), "Una función agrupa...");
}

#[test]
fn timestamps_follow_the_injected_clock() {
    let mut store = store();
    let _pending = store.send_user_message("hola").unwrap();

    let welcome = store.messages()[0].timestamp();
    let user = store.messages()[1].timestamp();
    assert!(user > welcome);
    assert_eq!(store.messages()[0].time_label(), "10:00");
}
