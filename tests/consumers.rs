mod common;

use chat_service::common::error::{
    AppError, CLOSE_FORBIDDEN, CLOSE_NOT_FOUND, CLOSE_UNAUTHENTICATED,
};
use chat_service::consumers::Outgoing;
use chat_service::consumers::admin_logs::AdminLogsConsumer;
use chat_service::consumers::chat_room::ChatRoomConsumer;
use chat_service::consumers::conversation::ConversationConsumer;
use chat_service::consumers::notifications::NotificationsConsumer;
use chat_service::consumers::tweet_queue::TweetQueueConsumer;
use chat_service::common::context::Context;
use chat_service::models::frames::OutboundFrame;
use chat_service::models::messages::{MessageTarget, NewMessage};
use chat_service::repositories::groups::{GroupEvent, GroupName};
use chat_service::entities::conversations::Conversation;
use chat_service::usecases::{conversations, messages, notifications};
use common::{TestApp, TestSocket};
use serde_json::json;
use std::io::Write;

async fn connect_conversation(
    app: &TestApp,
    session: Option<chat_service::entities::sessions::Session>,
    conversation_id: i64,
) -> TestSocket {
    let authorized =
        ConversationConsumer::authorize(app.state.clone(), session, conversation_id).await;
    TestSocket::connect(&app.state, authorized)
}

#[tokio::test]
async fn messages_reach_the_other_participant_only() {
    let app = TestApp::new();
    let alice = app.add_user(1, "alice");
    let bob = app.add_user(2, "bob");
    let alice_session = app.session(&alice).await;
    let bob_session = app.session(&bob).await;
    let conversation = conversations::start_with_user(&app.state, &alice_session, bob.id)
        .await
        .unwrap()
        .conversation;

    let mut alice_socket = connect_conversation(&app, Some(alice_session), conversation.id).await;
    let mut bob_socket = connect_conversation(&app, Some(bob_session), conversation.id).await;
    let group = Some(format!("conversation_{}", conversation.id));
    assert_eq!(
        alice_socket.recv_frame().await,
        OutboundFrame::ConnectionEstablished {
            group: group.clone(),
            user_id: alice.id
        }
    );
    assert_eq!(
        bob_socket.recv_frame().await,
        OutboundFrame::ConnectionEstablished {
            group,
            user_id: bob.id
        }
    );

    alice_socket
        .send(r#"{"type":"chat_message","message":"hello bob"}"#)
        .await;
    match bob_socket.recv_frame().await {
        OutboundFrame::ChatMessage {
            message,
            user_id,
            username,
            ..
        } => {
            assert_eq!(message, "hello bob");
            assert_eq!(user_id, alice.id);
            assert_eq!(username, "alice");
        }
        other => panic!("unexpected frame {other:?}"),
    }
    alice_socket.assert_silent().await;

    bob_socket.send(r#"{"type":"typing"}"#).await;
    assert_eq!(
        alice_socket.recv_frame().await,
        OutboundFrame::TypingIndicator {
            user_id: bob.id,
            username: "bob".to_owned(),
            is_typing: true
        }
    );
    bob_socket.assert_silent().await;

    alice_socket.close().await;
    bob_socket.close().await;
}

#[tokio::test]
async fn confirmed_messages_are_deleted() {
    let app = TestApp::new();
    let alice = app.add_user(1, "alice");
    let bob = app.add_user(2, "bob");
    let alice_session = app.session(&alice).await;
    let bob_session = app.session(&bob).await;
    let conversation = conversations::start_with_user(&app.state, &alice_session, bob.id)
        .await
        .unwrap()
        .conversation;
    let target = MessageTarget::Conversation(conversation.id);
    let first = messages::send(&app.state, &alice_session, target, NewMessage::text("one"))
        .await
        .unwrap();
    let second = messages::send(&app.state, &alice_session, target, NewMessage::text("two"))
        .await
        .unwrap();

    // the sender cannot confirm their own message
    let mut alice_socket =
        connect_conversation(&app, Some(alice_session), conversation.id).await;
    alice_socket.recv_frame().await;
    alice_socket
        .send(&json!({"type": "delivery_confirmation", "message_id": first.id}).to_string())
        .await;
    alice_socket.assert_silent().await;
    assert!(app.store.fetch_message(first.id).is_some());

    let mut bob_socket =
        connect_conversation(&app, Some(bob_session.clone()), conversation.id).await;
    bob_socket.recv_frame().await;
    bob_socket
        .send(&json!({"type": "delivery_confirmation", "message_id": first.id}).to_string())
        .await;
    // unknown ids are a silent no-op
    bob_socket
        .send(r#"{"type":"delivery_confirmation","message_id":4242}"#)
        .await;
    bob_socket.send(r#"{"type":"ping"}"#).await;
    assert!(matches!(bob_socket.recv_frame().await, OutboundFrame::Pong { .. }));

    assert!(app.store.fetch_message(first.id).is_none());
    assert!(app.store.fetch_message(second.id).is_some());
    let remaining = messages::list(&app.state, &bob_session, conversation.id)
        .await
        .unwrap();
    assert_eq!(
        remaining.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![second.id]
    );

    alice_socket.close().await;
    bob_socket.close().await;
}

#[tokio::test]
async fn bad_frames_get_error_replies() {
    let app = TestApp::new();
    let alice = app.add_user(1, "alice");
    let bob = app.add_user(2, "bob");
    let session = app.session(&alice).await;
    let conversation = conversations::start_with_user(&app.state, &session, bob.id)
        .await
        .unwrap()
        .conversation;

    let mut socket = connect_conversation(&app, Some(session), conversation.id).await;
    socket.recv_frame().await;

    for (text, error) in [
        ("not json", AppError::FramesInvalidJson),
        (r#"{"type":"dance"}"#, AppError::FramesUnknownType),
        (r#"{"type":"chat_message"}"#, AppError::FramesInvalidFrame),
        (r#"{"type":"chat_message","message":"  "}"#, AppError::MessagesMissingContent),
        (r#"{"type":"start_stream","source":"app"}"#, AppError::FramesUnknownType),
    ] {
        socket.send(text).await;
        assert_eq!(socket.recv_frame().await, OutboundFrame::error(&error));
    }

    // the connection survives every failure
    socket.send(r#"{"type":"ping"}"#).await;
    assert!(matches!(socket.recv_frame().await, OutboundFrame::Pong { .. }));
    socket.close().await;
}

#[tokio::test]
async fn rejected_connections_are_closed_with_a_code() {
    let app = TestApp::new();
    let alice = app.add_user(1, "alice");
    let bob = app.add_user(2, "bob");
    let eve = app.add_user(3, "eve");
    let conversation =
        conversations::start_with_user(&app.state, &app.session(&alice).await, bob.id)
            .await
            .unwrap()
            .conversation;

    let cases = [
        (None, conversation.id, CLOSE_UNAUTHENTICATED),
        (Some(app.session(&eve).await), conversation.id, CLOSE_FORBIDDEN),
        (Some(app.session(&alice).await), 999, CLOSE_NOT_FOUND),
    ];
    for (session, conversation_id, code) in cases {
        let mut socket = connect_conversation(&app, session, conversation_id).await;
        match socket.recv().await {
            Outgoing::Close { code: actual, .. } => assert_eq!(actual, code),
            other => panic!("expected close, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn legacy_rooms_relay_between_brand_and_user() {
    let app = TestApp::new();
    let owner = app.add_user(1, "owner");
    let creator = app.add_user(2, "creator");
    let outsider = app.add_user(3, "outsider");
    let brand = app.add_brand(10, owner.id, None);
    let room = app.store.insert_room(brand.id, creator.id).unwrap();

    let rejected = ChatRoomConsumer::authorize(
        app.state.clone(),
        Some(app.session(&outsider).await),
        room.id,
    )
    .await;
    assert_eq!(rejected.err(), Some(AppError::RoomsForbidden));

    let owner_consumer =
        ChatRoomConsumer::authorize(app.state.clone(), Some(app.session(&owner).await), room.id).await;
    let creator_consumer =
        ChatRoomConsumer::authorize(app.state.clone(), Some(app.session(&creator).await), room.id)
            .await;
    let mut owner_socket = TestSocket::connect(&app.state, owner_consumer);
    let mut creator_socket = TestSocket::connect(&app.state, creator_consumer);
    owner_socket.recv_frame().await;
    creator_socket.recv_frame().await;

    creator_socket
        .send(r#"{"type":"chat_message","message":"hello brand"}"#)
        .await;
    match owner_socket.recv_frame().await {
        OutboundFrame::ChatMessage { message, .. } => assert_eq!(message, "hello brand"),
        other => panic!("unexpected frame {other:?}"),
    }
    creator_socket.assert_silent().await;

    owner_socket.close().await;
    creator_socket.close().await;
}

#[tokio::test]
async fn notifications_announce_new_and_updated_conversations() {
    let app = TestApp::new();
    let alice = app.add_user(1, "alice");
    let bob = app.add_user(2, "bob");
    let alice_session = app.session(&alice).await;

    let mut bob_notifications = TestSocket::connect(
        &app.state,
        NotificationsConsumer::authorize(Some(app.session(&bob).await)),
    );
    assert_eq!(
        bob_notifications.recv_frame().await,
        OutboundFrame::ConnectionEstablished {
            group: Some("user_2".to_owned()),
            user_id: bob.id
        }
    );

    let conversation = conversations::start_with_user(&app.state, &alice_session, bob.id)
        .await
        .unwrap()
        .conversation;
    match bob_notifications.recv_frame().await {
        OutboundFrame::NewConversation {
            conversation_id,
            counterparty,
            brand,
            ..
        } => {
            assert_eq!(conversation_id, conversation.id);
            assert_eq!(counterparty.id, alice.id);
            assert!(brand.is_none());
        }
        other => panic!("unexpected frame {other:?}"),
    }

    // resolving an existing conversation announces nothing
    conversations::start_with_user(&app.state, &alice_session, bob.id)
        .await
        .unwrap();
    bob_notifications.assert_silent().await;

    let sent = messages::send(
        &app.state,
        &alice_session,
        MessageTarget::Conversation(conversation.id),
        NewMessage::text("ping"),
    )
    .await
    .unwrap();
    match bob_notifications.recv_frame().await {
        OutboundFrame::ConversationUpdated {
            conversation_id,
            message_id,
            sender_id,
            ..
        } => {
            assert_eq!(conversation_id, conversation.id);
            assert_eq!(message_id, sent.id);
            assert_eq!(sender_id, alice.id);
        }
        other => panic!("unexpected frame {other:?}"),
    }
    bob_notifications.close().await;
}

#[tokio::test]
async fn tweet_queue_forwards_published_updates() {
    let app = TestApp::new();
    let owner = app.add_user(1, "owner");
    let stranger = app.add_user(2, "stranger");
    let brand = app.add_brand(10, owner.id, Some(5));

    let forbidden =
        TweetQueueConsumer::authorize(&app.state, Some(app.session(&stranger).await), 5, brand.id)
            .await;
    assert_eq!(forbidden.err(), Some(AppError::TweetQueueForbidden));
    let wrong_org =
        TweetQueueConsumer::authorize(&app.state, Some(app.session(&owner).await), 6, brand.id)
            .await;
    assert_eq!(wrong_org.err(), Some(AppError::BrandsNotFound));
    let staff =
        TweetQueueConsumer::authorize(&app.state, Some(app.staff_session(&stranger).await), 5, brand.id)
            .await;
    assert!(staff.is_ok());

    let authorized =
        TweetQueueConsumer::authorize(&app.state, Some(app.session(&owner).await), 5, brand.id)
            .await;
    let mut socket = TestSocket::connect(&app.state, authorized);
    socket.recv_frame().await;

    let update: OutboundFrame = serde_json::from_value(json!({
        "type": "tweet_queue_update",
        "tweet_id": 7,
        "status": "posted"
    }))
    .unwrap();
    let group = GroupName::TweetQueue {
        organization_id: 5,
        brand_id: brand.id,
    };
    app.state
        .broadcaster()
        .publish(group, GroupEvent::new(update.clone()))
        .await
        .unwrap();
    assert_eq!(socket.recv_frame().await, update);
    socket.close().await;
}

#[tokio::test]
async fn admin_log_stream_tails_selected_source() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "service started").unwrap();
    file.flush().unwrap();
    let app = TestApp::with_log_sources(vec![("api".to_owned(), file.path().to_path_buf())]);
    let admin = app.add_user(1, "admin");
    let user = app.add_user(2, "user");

    let rejected =
        AdminLogsConsumer::authorize(Some(app.session(&user).await), app.state.log_sources.clone());
    assert_eq!(rejected.err(), Some(AppError::AdminForbidden));

    let authorized = AdminLogsConsumer::authorize(
        Some(app.staff_session(&admin).await),
        app.state.log_sources.clone(),
    );
    let mut socket = TestSocket::connect(&app.state, authorized);
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::ConnectionEstablished {
            group: None,
            user_id: admin.id
        }
    );
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogSources {
            sources: vec!["api".to_owned()]
        }
    );

    socket.send(r#"{"type":"start_stream","source":"api"}"#).await;
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogStreamStarted {
            source: "api".to_owned()
        }
    );
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogLine {
            source: "api".to_owned(),
            line: "service started".to_owned()
        }
    );

    socket.send(r#"{"type":"stop_stream"}"#).await;
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogStreamStopped {
            source: "api".to_owned(),
            reason: "stopped".to_owned()
        }
    );
    socket.close().await;
}

#[tokio::test]
async fn switching_log_source_replaces_the_running_tail() {
    let mut api_log = tempfile::NamedTempFile::new().unwrap();
    writeln!(api_log, "api booted").unwrap();
    api_log.flush().unwrap();
    let mut worker_log = tempfile::NamedTempFile::new().unwrap();
    writeln!(worker_log, "worker booted").unwrap();
    worker_log.flush().unwrap();
    let app = TestApp::with_log_sources(vec![
        ("api".to_owned(), api_log.path().to_path_buf()),
        ("worker".to_owned(), worker_log.path().to_path_buf()),
    ]);
    let admin = app.add_user(1, "admin");
    let authorized = AdminLogsConsumer::authorize(
        Some(app.staff_session(&admin).await),
        app.state.log_sources.clone(),
    );
    let mut socket = TestSocket::connect(&app.state, authorized);
    socket.recv_frame().await;
    socket.recv_frame().await;

    socket.send(r#"{"type":"start_stream","source":"api"}"#).await;
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogStreamStarted {
            source: "api".to_owned()
        }
    );
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogLine {
            source: "api".to_owned(),
            line: "api booted".to_owned()
        }
    );

    socket.send(r#"{"type":"start_stream","source":"worker"}"#).await;
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogStreamStarted {
            source: "worker".to_owned()
        }
    );
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogLine {
            source: "worker".to_owned(),
            line: "worker booted".to_owned()
        }
    );

    writeln!(api_log, "api request").unwrap();
    api_log.flush().unwrap();
    writeln!(worker_log, "worker job").unwrap();
    worker_log.flush().unwrap();
    assert_eq!(
        socket.recv_frame().await,
        OutboundFrame::LogLine {
            source: "worker".to_owned(),
            line: "worker job".to_owned()
        }
    );
    socket.assert_silent().await;
    socket.close().await;
}

#[tokio::test]
async fn new_conversation_is_announced_when_its_brand_is_gone() {
    let app = TestApp::new();
    let alice = app.add_user(1, "alice");
    let bob = app.add_user(2, "bob");
    let mut bob_notifications = TestSocket::connect(
        &app.state,
        NotificationsConsumer::authorize(Some(app.session(&bob).await)),
    );
    bob_notifications.recv_frame().await;

    let now = chrono::Utc::now();
    let conversation = Conversation {
        id: 77,
        brand_id: Some(404),
        participant1_id: alice.id,
        participant2_id: bob.id,
        created_at: now,
        updated_at: now,
    };
    notifications::notify_new_conversation(&app.state, &conversation).await;

    match bob_notifications.recv_frame().await {
        OutboundFrame::NewConversation {
            conversation_id,
            counterparty,
            brand,
            ..
        } => {
            assert_eq!(conversation_id, 77);
            assert_eq!(counterparty.id, alice.id);
            assert!(brand.is_none());
        }
        other => panic!("unexpected frame {other:?}"),
    }
    bob_notifications.close().await;
}
