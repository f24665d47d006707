use super::*;
use crate::core::test_support::MemoryProperties;

const KEY: &str = "ADMIN_EMAILS";

fn roster(props: MemoryProperties) -> AdminRoster<MemoryProperties> {
    AdminRoster::new(props, KEY)
}

#[test]
fn test_is_admin_matches_normalized_identity() {
    let roster = roster(MemoryProperties::default().with(KEY, " Admin1@Empresa.com ,admin2@empresa.com"));

    assert!(roster.is_admin("admin1@empresa.com"));
    assert!(roster.is_admin("  ADMIN2@EMPRESA.COM"));
    assert!(!roster.is_admin("vendedor@empresa.com"));
}

#[test]
fn test_is_admin_false_when_roster_unset() {
    let roster = roster(MemoryProperties::default());
    assert!(!roster.is_admin("admin@empresa.com"));
}

#[test]
fn test_is_admin_false_when_roster_empty() {
    let roster = roster(MemoryProperties::default().with(KEY, " , ,"));
    assert!(!roster.is_admin("admin@empresa.com"));
}

#[test]
fn test_is_admin_false_when_store_unavailable() {
    let props = MemoryProperties::default().with(KEY, "admin@empresa.com");
    props.fail_reads(true);
    let roster = roster(props);

    assert!(!roster.is_admin("admin@empresa.com"));
}

#[test]
fn test_blank_identity_is_never_admin() {
    let roster = roster(MemoryProperties::default().with(KEY, "admin@empresa.com"));
    assert!(!roster.is_admin("   "));
}

#[test]
fn test_admin_emails_round_trip() {
    let roster = roster(MemoryProperties::default());
    let admins = Email::parse_list("b@x.io,A@X.io");

    roster.set_admin_emails(&admins).unwrap();

    assert_eq!(roster.admin_emails().unwrap(), admins);
    assert!(roster.is_admin("a@x.io"));
}

#[test]
fn test_admin_emails_surfaces_store_failure() {
    let props = MemoryProperties::default();
    props.fail_reads(true);

    roster(props).admin_emails().unwrap_err();
}
