use libby_core::config::OnboardingConfig;
use libby_core::{
    LibbyError, LocalIdentity, MemoryStore, OnboardingWizard, PreferenceCache, Session, User,
};

fn wizard_on_last_page() -> OnboardingWizard {
    let mut wizard = OnboardingWizard::new(&OnboardingConfig::default());
    wizard.next();
    wizard.next();
    assert!(wizard.is_last_page());
    wizard
}

fn session() -> (Session, PreferenceCache) {
    let store = MemoryStore::new().shared();
    let cache = PreferenceCache::new(store.clone());
    let identity = LocalIdentity::open(store);
    (Session::new(Box::new(identity), cache.clone(), None), cache)
}

fn reader() -> User {
    User {
        id: "u1".into(),
        display_name: "Reader".into(),
        ..Default::default()
    }
}

#[test]
fn three_interests_enable_finish() {
    let mut wizard = wizard_on_last_page();
    for tag in ["fantasy", "mystery", "romance"] {
        wizard.toggle(tag);
    }
    assert!(wizard.can_finish());
}

#[test]
fn two_interests_keep_finish_disabled() {
    let mut wizard = wizard_on_last_page();
    wizard.toggle("fantasy");
    wizard.toggle("mystery");
    assert!(!wizard.can_finish());

    let (mut session, _) = session();
    session.sign_in(reader(), None).unwrap();
    match wizard.finish(&mut session) {
        Err(LibbyError::NotEnoughInterests { selected, required }) => {
            assert_eq!(selected, 2);
            assert_eq!(required, 3);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn enough_interests_before_last_page_cannot_finish() {
    let mut wizard = OnboardingWizard::new(&OnboardingConfig::default());
    for tag in ["fantasy", "mystery", "romance", "horror"] {
        wizard.toggle(tag);
    }
    assert!(!wizard.can_finish());
}

#[test]
fn navigating_back_preserves_selection() {
    let mut wizard = OnboardingWizard::new(&OnboardingConfig::default());
    wizard.toggle("fantasy");
    wizard.next();
    wizard.toggle("history");
    wizard.back();

    assert_eq!(wizard.page(), 0);
    assert!(wizard.is_selected("fantasy"));
    assert!(wizard.is_selected("history"));

    // Toggling twice is a no-op on the set.
    wizard.toggle("mystery");
    wizard.toggle("mystery");
    assert_eq!(wizard.selection().len(), 2);
}

#[test]
fn finish_without_session_asks_for_sign_in() {
    let mut wizard = wizard_on_last_page();
    for tag in ["fantasy", "mystery", "romance"] {
        wizard.toggle(tag);
    }
    let (mut session, _) = session();
    let err = wizard.finish(&mut session).unwrap_err();
    assert!(err.requires_sign_in());
}

#[test]
fn finish_saves_selection_to_cache_and_metadata() {
    let mut wizard = wizard_on_last_page();
    for tag in ["Fantasy", "mystery", "romance"] {
        wizard.toggle(tag);
    }
    let (mut session, cache) = session();
    session.sign_in(reader(), None).unwrap();

    let saved = wizard.finish(&mut session).unwrap();
    assert_eq!(saved.len(), 3);
    assert!(cache.load_interests("u1").contains("fantasy"));
    assert_eq!(session.interests(), &saved);

    let user = session.user().unwrap();
    let from_metadata = user.metadata_interests().unwrap();
    assert_eq!(from_metadata, saved);
}

#[test]
fn redo_from_existing_interests_starts_prefilled() {
    let (mut session, _) = session();
    session.sign_in(reader(), None).unwrap();
    session
        .save_interests(libby_core::InterestSelection::from_tags(["poetry", "law", "travel"]))
        .unwrap();

    let mut wizard =
        OnboardingWizard::with_selection(&OnboardingConfig::default(), session.interests().clone());
    assert_eq!(wizard.page(), 0);
    assert!(wizard.is_selected("law"));

    wizard.redo();
    assert!(wizard.selection().is_empty());
}
