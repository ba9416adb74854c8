// tests/named_fonts.rs
//! Named font lifecycle as seen through the font environment

use std::cell::Cell;
use std::rc::Rc;

use fontweave::weave_core::dummy_backend::DummyBackend;
use fontweave::weave_core::{FontAttributes, FontError, Weight};
use fontweave::{EnvironmentConfig, FontEnvironment};

fn env() -> FontEnvironment<DummyBackend> {
    FontEnvironment::new(DummyBackend::standard(), EnvironmentConfig::default())
}

fn counting_listener(env: &mut FontEnvironment<DummyBackend>) -> Rc<Cell<usize>> {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    env.on_world_changed(Box::new(move || seen.set(seen.get() + 1)));
    calls
}

#[test]
fn test_named_font_resolves_by_name() {
    let mut env = env();
    env.create_named("heading", FontAttributes::new("Times", 18)).unwrap();

    let font = env.get_font("heading").unwrap();
    assert_eq!(env.subfont_faces(font).unwrap(), vec!["Times"]);
    assert_eq!(env.actual(font).unwrap().size, 18);
    assert_eq!(env.list_named(), vec!["heading"]);
}

#[test]
fn test_delete_then_revive_updates_holder() {
    let mut env = env();
    let calls = counting_listener(&mut env);
    env.create_named("X", FontAttributes::new("Times", 12)).unwrap();
    let font = env.get_font("X").unwrap();

    env.delete_named("X").unwrap();
    assert!(env.list_named().is_empty());
    assert!(env.named_attributes("X").is_err());
    // The holder keeps working while the name is pending.
    assert_eq!(env.subfont_faces(font).unwrap(), vec!["Times"]);
    assert!(!env.world_changed_pending());

    env.create_named("X", FontAttributes::new("Courier", 10)).unwrap();
    assert_eq!(env.list_named(), vec!["X"]);
    assert_eq!(env.subfont_faces(font).unwrap(), vec!["Courier"]);
    assert_eq!(env.actual(font).unwrap().family.as_deref(), Some("Courier"));

    assert!(env.world_changed_pending());
    assert!(env.flush_pending_notifications());
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_configure_rebuilds_and_coalesces_notifications() {
    let mut env = env();
    let calls = counting_listener(&mut env);
    env.create_named("body", FontAttributes::new("Helvetica", 12)).unwrap();
    let font = env.get_font("body").unwrap();
    assert_eq!(env.text_width(font, "ab").unwrap(), 14);

    env.configure_named("body", &["-weight", "bold"]).unwrap();
    env.configure_named("body", &["-size", "20"]).unwrap();

    let actual = env.actual(font).unwrap();
    assert_eq!(actual.weight, Weight::Bold);
    assert_eq!(actual.size, 20);
    assert_eq!(env.text_width(font, "ab").unwrap(), 16);

    assert!(env.flush_pending_notifications());
    assert!(!env.flush_pending_notifications());
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_unused_name_changes_do_not_notify() {
    let mut env = env();
    let calls = counting_listener(&mut env);
    env.create_named("idle", FontAttributes::new("Times", 12)).unwrap();
    env.configure_named("idle", &["-size", "14"]).unwrap();

    assert!(!env.flush_pending_notifications());
    assert_eq!(calls.get(), 0);
    assert_eq!(env.named_attributes("idle").unwrap().size, 14);
}

#[test]
fn test_pending_name_disappears_with_last_holder() {
    let mut env = env();
    env.create_named("temp", FontAttributes::new("Times", 12)).unwrap();
    let font = env.get_font("temp").unwrap();
    env.delete_named("temp").unwrap();
    assert_eq!(
        env.delete_named("temp"),
        Err(FontError::UnknownNamedFont { name: "temp".into() })
    );

    env.release(font).unwrap();
    // Gone for good: creating it again is a fresh name, not a revival.
    let calls = counting_listener(&mut env);
    env.create_named("temp", FontAttributes::new("Courier", 9)).unwrap();
    assert!(!env.world_changed_pending());
    assert_eq!(calls.get(), 0);
    assert_eq!(env.named_attributes("temp").unwrap().family.as_deref(), Some("Courier"));
}

#[test]
fn test_duplicate_name_is_rejected() {
    let mut env = env();
    env.create_named("dup", FontAttributes::default()).unwrap();
    assert_eq!(
        env.create_named("dup", FontAttributes::default()),
        Err(FontError::NamedFontExists { name: "dup".into() })
    );
}
