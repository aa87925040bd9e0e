use leadsift::LeadsiftError;
use leadsift::config::Settings;
use leadsift::construct::{NewContact, PersistenceMode, TenantId};
use leadsift::filter::FilterPolicy;
use leadsift::persist::Persistor;

#[test]
fn locations_select_the_mode() {
    assert_eq!(PersistenceMode::from_location(":memory:"), PersistenceMode::InMemory);
    assert_eq!(PersistenceMode::from_location("  "), PersistenceMode::InMemory);
    assert_eq!(
        PersistenceMode::from_location("contacts.db"),
        PersistenceMode::File("contacts.db".to_string())
    );
}

#[test]
fn in_memory_mode_allows_basic_operations() {
    let tenant = TenantId::new("org_1");
    let persistor = Persistor::new(PersistenceMode::InMemory).expect("store");
    persistor.add_contact(&tenant, &NewContact::new("c1")).unwrap();
    persistor.add_workflow_state("c1", "nurture").unwrap();
    assert_eq!(persistor.contact_ids(&tenant).unwrap(), vec!["c1"]);
    assert_eq!(persistor.workflow_state_count("c1").unwrap(), 1);
}

#[test]
fn workflow_states_need_an_existing_contact() {
    let persistor = Persistor::new(PersistenceMode::InMemory).expect("store");
    let err = persistor.add_workflow_state("ghost", "nurture").unwrap_err();
    assert!(matches!(err, LeadsiftError::ConstraintViolation(_)));
}

#[test]
fn file_mode_keeps_contacts_between_connections() {
    // Use a temp path and make sure we start clean
    let path = std::env::temp_dir().join("leadsift_persistence_mode_test.db");
    let _ = std::fs::remove_file(&path);
    let location = path.to_string_lossy().to_string();
    let tenant = TenantId::new("org_1");
    {
        let persistor = Persistor::new(PersistenceMode::File(location.clone())).expect("store");
        persistor.add_contact(&tenant, &NewContact::new("c1")).unwrap();
        persistor.tag_contact(&tenant, "c1", "vip").unwrap();
    }
    let reopened = Persistor::new(PersistenceMode::File(location)).expect("store");
    assert_eq!(reopened.contact_ids(&tenant).unwrap(), vec!["c1"]);
    drop(reopened);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn settings_fall_back_to_defaults() {
    let settings = Settings::load(Some("leadsift_settings_that_do_not_exist")).unwrap();
    assert_eq!(settings.filter_policy, FilterPolicy::Lenient);
    assert!(!settings.expose_error_details);
    if std::env::var("LEADSIFT_DATABASE").is_err() {
        assert_eq!(settings.persistence_mode(), PersistenceMode::InMemory);
    }
}
