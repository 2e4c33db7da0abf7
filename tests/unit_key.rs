//! Unit tests for Key and Token identity

use ferrous_injector::{forward_ref, key_of_type, of, Key, Provide, Target, Token};
use std::any::TypeId;
use std::collections::HashSet;

trait Plugin: Send + Sync {}

#[test]
fn test_key_display_name_type() {
    let key = Key::Type(TypeId::of::<String>(), "alloc::string::String");
    assert_eq!(key.display_name(), "alloc::string::String");
    assert_eq!(key.to_string(), "alloc::string::String");
    assert!(!key.is_token());
}

#[test]
fn test_key_display_name_token() {
    let token: Token<u16> = Token::new("database_port");
    assert_eq!(token.key().display_name(), "database_port");
    assert_eq!(token.key().to_string(), "Token(database_port)");
    assert_eq!(token.description(), "database_port");
    assert!(token.key().is_token());
}

#[test]
fn test_key_equality_ignores_names() {
    let a = Key::Type(TypeId::of::<u32>(), "u32");
    let b = Key::Type(TypeId::of::<u32>(), "renamed");
    assert_eq!(a, b);
    assert_eq!(a, key_of_type::<u32>());
    assert_ne!(a, key_of_type::<u64>());
}

#[test]
fn test_tokens_with_same_description_differ() {
    let first: Token<String> = Token::new("name");
    let second: Token<String> = Token::new("name");
    assert_ne!(first.key(), second.key());
    assert_eq!(first.key(), first.clone().key());
}

#[test]
fn test_trait_object_keys() {
    let iface = key_of_type::<dyn Plugin>();
    assert_eq!(iface, key_of_type::<dyn Plugin>());
    assert_ne!(iface, of::<Box<dyn Plugin>>().key());
    assert!(iface.display_name().contains("Plugin"));
}

#[test]
fn test_keys_hash_by_identity() {
    let token: Token<u8> = Token::new("hashed");
    let mut set = HashSet::new();
    set.insert(key_of_type::<String>());
    set.insert(Key::Type(TypeId::of::<String>(), "other name"));
    set.insert(token.key());
    set.insert(token.key());
    assert_eq!(set.len(), 2);
}

#[test]
fn test_target_from_key_and_forward_ref() {
    let token: Token<u8> = Token::new("target");
    let direct: Target = token.key().into();
    let deferred: Target = forward_ref({
        let token = token.clone();
        move || token.key()
    })
    .into();
    assert_eq!(direct.key(), deferred.key());
}
