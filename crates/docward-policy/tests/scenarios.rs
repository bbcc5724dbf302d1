//! End-to-end scenarios for the standard policies, checked on both faces.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use docward_policy::{
    DocumentPolicy, PermissionRequest, PolicyChain, PolicyError, StandardPolicies,
};
use docward_query::{Expr, Literal, Query, Reference};
use docward_test_harness::{InMemoryDocument, InMemoryRepository, StaticDirectory};
use docward_types::{Decision, MembershipOracle, Principal};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 8, 10, 0, 0).unwrap()
}

fn directory() -> Arc<StaticDirectory> {
    Arc::new(
        StaticDirectory::new()
            .with_user("alice", ["GROUP1"])
            .with_user("bob", ["GROUP2"])
            .with_user("carol", ["itar_readers", "GROUP3"]),
    )
}

fn chain_of(policy: DocumentPolicy) -> PolicyChain {
    PolicyChain::builder(directory())
        .policy(policy)
        .without_audit()
        .build()
        .unwrap()
}

fn decide(chain: &PolicyChain, doc: &InMemoryDocument, user: &str) -> Decision {
    chain
        .decide_at(doc, &Principal::new(user), &PermissionRequest::read(), now())
        .unwrap()
}

fn listing(chain: &PolicyChain, repo: &InMemoryRepository, user: &str) -> Vec<String> {
    let query = chain
        .transform_at(&Principal::new(user), Query::all_documents(), now())
        .unwrap();
    repo.query(&query).unwrap()
}

#[test]
fn itar_file_hidden_from_non_readers() {
    let chain = chain_of(StandardPolicies::no_itar());
    let itar = InMemoryDocument::new("itar", "File").with_text("ITAR:ITAR_doc", "Yes");
    let plain = InMemoryDocument::new("plain", "File").with_text("ITAR:ITAR_doc", "No");
    let note = InMemoryDocument::new("note", "Note").with_text("ITAR:ITAR_doc", "Yes");
    let repo: InMemoryRepository = [itar.clone(), plain.clone(), note.clone()].into_iter().collect();

    assert_eq!(decide(&chain, &itar, "alice"), Decision::Deny);
    assert_eq!(decide(&chain, &plain, "alice"), Decision::Unknown);
    assert_eq!(decide(&chain, &note, "alice"), Decision::Unknown);
    assert_eq!(listing(&chain, &repo, "alice"), ["plain", "note"]);

    assert_eq!(decide(&chain, &itar, "carol"), Decision::Unknown);
    assert_eq!(listing(&chain, &repo, "carol"), ["itar", "plain", "note"]);
}

#[test]
fn itar_reader_query_is_unchanged() {
    let chain = chain_of(StandardPolicies::no_itar());
    let q = Query::all_documents().with_where(Expr::eq(Reference::field("a"), 1_i64));
    let out = chain.transform_at(&Principal::new("carol"), q.clone(), now()).unwrap();
    assert_eq!(out, q);
}

#[test]
fn archived_policy_ignores_documents_without_lifecycle() {
    let chain = chain_of(StandardPolicies::archived());
    let no_state = InMemoryDocument::new("none", "CustomFile");
    let archived = InMemoryDocument::new("arch", "CustomFile").with_lifecycle("archived");
    let live = InMemoryDocument::new("live", "CustomFile").with_lifecycle("project");
    let other_type = InMemoryDocument::new("file", "File").with_lifecycle("project");
    let repo: InMemoryRepository = [no_state.clone(), archived.clone(), live.clone(), other_type.clone()]
        .into_iter()
        .collect();

    assert_eq!(decide(&chain, &no_state, "alice"), Decision::Unknown);
    assert_eq!(decide(&chain, &archived, "alice"), Decision::Unknown);
    assert_eq!(decide(&chain, &live, "alice"), Decision::Deny);
    assert_eq!(decide(&chain, &other_type, "alice"), Decision::Unknown);
    assert_eq!(listing(&chain, &repo, "alice"), ["none", "arch", "file"]);
}

#[test]
fn lifecycle_policy_requires_approval_when_state_is_set() {
    let chain = chain_of(StandardPolicies::lifecycle_approved());
    let approved = InMemoryDocument::new("ok", "File").with_lifecycle("approved");
    let draft = InMemoryDocument::new("draft", "File").with_lifecycle("project");
    let none = InMemoryDocument::new("none", "File");
    let repo: InMemoryRepository = [approved.clone(), draft.clone(), none.clone()].into_iter().collect();

    assert_eq!(decide(&chain, &approved, "bob"), Decision::Unknown);
    assert_eq!(decide(&chain, &draft, "bob"), Decision::Deny);
    assert_eq!(decide(&chain, &none, "bob"), Decision::Unknown);
    assert_eq!(listing(&chain, &repo, "bob"), ["ok", "none"]);
}

#[test]
fn expired_documents_are_denied() {
    let chain = chain_of(StandardPolicies::dc_expired());
    let past = InMemoryDocument::new("past", "File").with_date("dc:expired", now() - Duration::days(3));
    let future = InMemoryDocument::new("future", "File").with_date("dc:expired", now() + Duration::days(3));
    let none = InMemoryDocument::new("none", "File");
    let repo: InMemoryRepository = [past.clone(), future.clone(), none.clone()].into_iter().collect();

    assert_eq!(decide(&chain, &past, "alice"), Decision::Deny);
    assert_eq!(decide(&chain, &future, "alice"), Decision::Unknown);
    assert_eq!(decide(&chain, &none, "alice"), Decision::Unknown);
    assert_eq!(listing(&chain, &repo, "alice"), ["future", "none"]);
}

#[test]
fn dc_rights_grants_only_the_mapped_group() {
    let chain = chain_of(StandardPolicies::dc_rights());
    let g2 = InMemoryDocument::new("g2", "File").with_text("dc:rights", "GROUP2");
    let default = InMemoryDocument::new("default", "File").with_text("dc:rights", "DEFAULT");
    let unset = InMemoryDocument::new("unset", "File");
    let repo: InMemoryRepository = [g2.clone(), default.clone(), unset.clone()].into_iter().collect();

    assert_eq!(decide(&chain, &g2, "bob"), Decision::Grant);
    assert_eq!(decide(&chain, &g2, "alice"), Decision::Deny);
    assert_eq!(decide(&chain, &default, "alice"), Decision::Grant);
    assert_eq!(decide(&chain, &default, "bob"), Decision::Deny);
    for user in ["alice", "bob", "carol", "nobody"] {
        assert_eq!(decide(&chain, &unset, user), Decision::Unknown, "{user}");
    }

    assert_eq!(listing(&chain, &repo, "bob"), ["g2", "unset"]);
    assert_eq!(listing(&chain, &repo, "alice"), ["default", "unset"]);
}

#[test]
fn dc_rights_hides_mapped_documents_from_ungrouped_users() {
    let dir = Arc::new(StaticDirectory::new().with_user("dave", Vec::<String>::new()));
    let chain = PolicyChain::builder(dir)
        .policy(StandardPolicies::dc_rights())
        .without_audit()
        .build()
        .unwrap();
    let g1 = InMemoryDocument::new("g1", "File").with_text("dc:rights", "GROUP1");
    let public = InMemoryDocument::new("public", "File").with_text("dc:rights", "PUBLIC");
    let repo: InMemoryRepository = [g1.clone(), public.clone()].into_iter().collect();

    assert_eq!(decide(&chain, &g1, "dave"), Decision::Deny);
    assert_eq!(decide(&chain, &public, "dave"), Decision::Unknown);
    assert_eq!(listing(&chain, &repo, "dave"), ["public"]);
}

#[test]
fn denial_filter_is_conjoined_with_existing_where() {
    let chain = chain_of(StandardPolicies::archived());
    let alice = Principal::new("alice");
    let expected_term = "NOT (ecm:primaryType = 'CustomFile' AND \
                         ecm:currentLifeCycleState IS NOT NULL AND \
                         ecm:currentLifeCycleState <> 'archived')";

    let with_where = Query::all_documents().with_where(Expr::eq(Reference::field("a"), 1_i64));
    let out = chain.transform_at(&alice, with_where, now()).unwrap();
    assert_eq!(
        out.filter().map(ToString::to_string),
        Some(format!("a = 1 AND {expected_term}"))
    );

    let out = chain.transform_at(&alice, Query::all_documents(), now()).unwrap();
    assert_eq!(out.to_string(), format!("SELECT * FROM Document WHERE {expected_term}"));
}

#[test]
fn terms_follow_registration_order() {
    let chain = PolicyChain::builder(directory())
        .policy(StandardPolicies::dc_expired())
        .policy(StandardPolicies::archived())
        .without_audit()
        .build()
        .unwrap();
    let out = chain
        .transform_at(&Principal::new("alice"), Query::all_documents(), now())
        .unwrap();
    let rendered = out.to_string();
    let expired = rendered.find("dc:expired").unwrap();
    let archived = rendered.find("CustomFile").unwrap();
    assert!(expired < archived, "{rendered}");
}

#[test]
fn privileged_principals_bypass_both_faces() {
    let chain = PolicyChain::builder(directory())
        .policies(StandardPolicies::all())
        .without_audit()
        .build()
        .unwrap();
    let doc = InMemoryDocument::new("d", "File")
        .with_text("ITAR:ITAR_doc", "Yes")
        .with_date("dc:expired", now() - Duration::days(1));
    let q = Query::all_documents().with_where(Expr::eq(Reference::field("a"), 1_i64));

    for principal in [
        Principal::new("system"),
        Principal::new("Administrator"),
        Principal::system("kernel"),
        Principal::administrator("ops"),
    ] {
        assert_eq!(
            chain.decide_at(&doc, &principal, &PermissionRequest::read(), now()).unwrap(),
            Decision::Unknown
        );
        assert_eq!(chain.transform_at(&principal, q.clone(), now()).unwrap(), q);
    }
}

#[test]
fn rewriting_preserves_query_shape() {
    let chain = chain_of(StandardPolicies::dc_expired());
    let q = Query::select_all_from(["File", "Note"])
        .with_select(["ecm:uuid"])
        .with_order_by(docward_query::OrderBy::desc(Reference::field("dc:modified")))
        .with_limit(10)
        .with_offset(5);
    let out = chain.transform_at(&Principal::new("alice"), q.clone(), now()).unwrap();
    assert_eq!(out.select(), q.select());
    assert_eq!(out.types(), q.types());
    assert_eq!(out.order_by(), q.order_by());
    assert_eq!(out.limit(), q.limit());
    assert_eq!(out.offset(), q.offset());
}

#[test]
fn query_date_literal_is_taken_at_transform_time() {
    let chain = chain_of(StandardPolicies::dc_expired());
    let before = Utc::now();
    let out = chain.transform(&Principal::new("alice"), Query::all_documents()).unwrap();
    let after = Utc::now();

    let literal = find_date(out.filter().unwrap()).expect("date literal in filter");
    // same calendar second as the surrounding clock reads
    assert!(literal.timestamp() >= before.timestamp());
    assert!(literal.timestamp() <= after.timestamp());
}

#[test]
fn oracle_outage_fails_permission_check_without_guessing() {
    let dir = directory();
    let chain = PolicyChain::builder(Arc::clone(&dir) as Arc<dyn MembershipOracle>)
        .policy(StandardPolicies::no_itar())
        .without_audit()
        .build()
        .unwrap();
    dir.set_unavailable(true);

    let itar = InMemoryDocument::new("itar", "File").with_text("ITAR:ITAR_doc", "Yes");
    let err = chain
        .decide_at(&itar, &Principal::new("alice"), &PermissionRequest::read(), now())
        .unwrap_err();
    assert!(matches!(err, PolicyError::Oracle(_)));

    // membership is never consulted when the document is not ITAR
    let plain = InMemoryDocument::new("plain", "File");
    assert_eq!(decide(&chain, &plain, "alice"), Decision::Unknown);
}

fn find_date(expr: &Expr) -> Option<DateTime<Utc>> {
    match expr {
        Expr::Compare {
            literal: Literal::Date(d),
            ..
        } => Some(*d),
        Expr::And(terms) | Expr::Or(terms) => terms.iter().find_map(find_date),
        Expr::Not(inner) => find_date(inner),
        _ => None,
    }
}
