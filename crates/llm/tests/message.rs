//! Tests for messages, roles and the streaming message builder.

use llm::{Message, MessageBuilder, Role, StreamChunk};

#[test]
fn constructors_set_roles() {
    assert_eq!(Message::system("s").role, Role::System);
    assert_eq!(Message::user("u").role, Role::User);
    assert_eq!(Message::assistant("a").role, Role::Assistant);
}

#[test]
fn role_serializes_lowercase() {
    let json = serde_json::to_string(&Message::user("hello")).unwrap();
    assert_eq!(json, r#"{"role":"user","content":"hello"}"#);

    let msg: Message = serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
    assert_eq!(msg, Message::assistant("hi"));
}

#[test]
fn unknown_role_is_rejected() {
    let result = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
    assert!(result.is_err());
}

#[test]
fn role_as_str_matches_wire_name() {
    for role in [Role::System, Role::User, Role::Assistant] {
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, format!("\"{}\"", role.as_str()));
    }
}

#[test]
fn builder_accumulates_chunks_in_order() {
    let mut builder = Message::builder(Role::Assistant);
    assert!(builder.accept(&StreamChunk::new("Hello")));
    assert!(!builder.accept(&StreamChunk::default()));
    assert!(builder.accept(&StreamChunk::new(", world")));
    assert_eq!(builder.content(), "Hello, world");
    assert_eq!(builder.build(), Message::assistant("Hello, world"));
}

#[test]
fn empty_builder_builds_empty_message() {
    let message = MessageBuilder::new(Role::Assistant).build();
    assert!(message.content.is_empty());
}
