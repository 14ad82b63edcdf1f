use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use signed_policy::crypto::{decode_unpadded, sign_url};
use signed_policy::{IssueError, Policy, PolicyIssuer, SecretKey};

const BASE: &str = "wss://edge01.example.com/app/stream";
const KEY: &str = "testkey";

fn ms(v: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(v).unwrap()
}

fn issuer() -> PolicyIssuer {
    PolicyIssuer::new(BASE, KEY).unwrap()
}

/// Split an issued URL into (candidate URL, policy value, signature value).
fn split_issued(url: &str) -> (&str, &str, &str) {
    let (candidate, signature) = url.rsplit_once("&signature=").unwrap();
    let (_, policy) = candidate.split_once("?policy=").unwrap();
    (candidate, policy, signature)
}

fn policy_json(encoded: &str) -> serde_json::Value {
    serde_json::from_slice(&decode_unpadded(encoded).unwrap()).unwrap()
}

#[test]
fn pinned_vector_url_expire_only() {
    let url = issuer().issue(&Policy::new(ms(1_700_000_000_000))).unwrap();
    assert_eq!(
        url,
        "wss://edge01.example.com/app/stream\
         ?policy=eyJ1cmxfZXhwaXJlIjoxNzAwMDAwMDAwMDAwfQ\
         &signature=c7JQOfCJtmjPKPCxGuU1UNfV3ns"
    );
}

#[test]
fn pinned_vector_all_fields() {
    let policy = Policy::new(ms(1_700_000_000_000))
        .activate_at(ms(1_699_990_000_000))
        .stream_expire_at(ms(1_700_003_600_000))
        .allow_ip("192.168.0.0/24");
    let url = issuer().issue(&policy).unwrap();
    assert_eq!(
        url,
        "wss://edge01.example.com/app/stream\
         ?policy=eyJ1cmxfZXhwaXJlIjoxNzAwMDAwMDAwMDAwLCJ1cmxfYWN0aXZhdGUiOjE2OTk5OTAwMDAwMDAsInN0cmVhbV9leHBpcmUiOjE3MDAwMDM2MDAwMDAsImFsbG93X2lwIjoiMTkyLjE2OC4wLjAvMjQifQ\
         &signature=SyiMSXdU813pcu68c2XQbrjceyI"
    );
}

#[test]
fn pinned_vector_allow_ip() {
    let url = issuer()
        .issue_with(ms(1_700_000_000_000), None, None, Some("10.0.0.1/32"))
        .unwrap();
    let (_, policy, signature) = split_issued(&url);
    assert_eq!(
        policy,
        "eyJ1cmxfZXhwaXJlIjoxNzAwMDAwMDAwMDAwLCJhbGxvd19pcCI6IjEwLjAuMC4xLzMyIn0"
    );
    assert_eq!(signature, "fF_FuQ5A0OwENH7H8W1vHLlAjFw");
}

#[test]
fn issue_is_deterministic() {
    let policy = Policy::new(ms(1_700_000_000_000)).allow_ip("10.0.0.0/8");
    let issuer = issuer();
    assert_eq!(issuer.issue(&policy).unwrap(), issuer.issue(&policy).unwrap());
}

#[test]
fn signature_recomputes_over_candidate_url() {
    let url = issuer()
        .issue(&Policy::new(ms(1_700_000_000_000)).stream_expire_at(ms(1_700_000_500_000)))
        .unwrap();
    let (candidate, _, signature) = split_issued(&url);
    assert_eq!(sign_url(&SecretKey::from(KEY), candidate), signature);
}

#[test]
fn signature_depends_on_key() {
    let policy = Policy::new(ms(1_700_000_000_000));
    let a = issuer().issue(&policy).unwrap();
    let b = PolicyIssuer::new(BASE, "otherkey").unwrap().issue(&policy).unwrap();
    assert_eq!(split_issued(&a).1, split_issued(&b).1);
    assert_ne!(split_issued(&a).2, split_issued(&b).2);
}

#[test]
fn tampered_policy_byte_changes_signature() {
    let url = issuer()
        .issue(&Policy::new(ms(1_700_000_000_000)).allow_ip("10.0.0.1/32"))
        .unwrap();
    let (_, policy, signature) = split_issued(&url);
    let key = SecretKey::from(KEY);
    for i in 0..policy.len() {
        let mut bytes = policy.as_bytes().to_vec();
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let mutated = String::from_utf8(bytes).unwrap();
        let candidate = format!("{}?policy={}", BASE, mutated);
        assert_ne!(sign_url(&key, &candidate), signature, "byte {} flip went undetected", i);
    }
}

#[test]
fn only_url_expire_yields_single_key() {
    let url = issuer().issue(&Policy::new(ms(1_700_000_000_000))).unwrap();
    let json = policy_json(split_issued(&url).1);
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 1);
    assert_eq!(obj["url_expire"], serde_json::json!(1_700_000_000_000u64));
}

#[test]
fn allow_ip_adds_exactly_one_key() {
    let url = issuer()
        .issue(&Policy::new(ms(1_700_000_000_000)).allow_ip("10.0.0.1/32"))
        .unwrap();
    let json = policy_json(split_issued(&url).1);
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 2);
    assert_eq!(obj["url_expire"], serde_json::json!(1_700_000_000_000u64));
    assert_eq!(obj["allow_ip"], serde_json::json!("10.0.0.1/32"));
}

#[test]
fn activate_after_expire_is_issued_unchanged() {
    // Ordering of url_activate and url_expire is left to the edge.
    let policy = Policy::new(ms(1_700_000_000_000)).activate_at(ms(1_800_000_000_000));
    let url = issuer().issue(&policy).unwrap();
    let decoded = Policy::decode(split_issued(&url).1).unwrap();
    assert_eq!(decoded, policy);
}

#[test]
fn allow_ip_is_not_validated() {
    let policy = Policy::new(ms(1_700_000_000_000)).allow_ip("not-an-address");
    assert!(issuer().issue(&policy).is_ok());
}

#[test]
fn pre_epoch_expiry_fails_without_partial_output() {
    let err = issuer().issue(&Policy::new(ms(-1_000))).unwrap_err();
    assert!(matches!(err, IssueError::Input(_)));
}

#[test]
fn issuer_is_usable_across_threads() {
    let issuer = std::sync::Arc::new(issuer());
    let expected = issuer.issue(&Policy::new(ms(1_700_000_000_000))).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let issuer = issuer.clone();
            std::thread::spawn(move || issuer.issue(&Policy::new(ms(1_700_000_000_000))).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

fn arb_policy() -> impl Strategy<Value = Policy> {
    let ts = 0i64..4_102_444_800_000;
    let ip = proptest::option::of("[0-9]{1,3}(\\.[0-9]{1,3}){3}/[0-9]{1,2}");
    (ts.clone(), proptest::option::of(ts.clone()), proptest::option::of(ts), ip.clone(), ip).prop_map(
        |(expire, activate, stream, allow_ip, real_ip)| Policy {
            url_expire: ms(expire),
            url_activate: activate.map(ms),
            stream_expire: stream.map(ms),
            allow_ip,
            real_ip,
        },
    )
}

proptest! {
    #[test]
    fn decoded_policy_matches_issued(policy in arb_policy()) {
        let url = issuer().issue(&policy).unwrap();
        let (candidate, encoded, signature) = split_issued(&url);
        prop_assert!(!encoded.contains('='));
        prop_assert!(!signature.contains('='));
        prop_assert_eq!(Policy::decode(encoded).unwrap(), policy.clone());
        prop_assert_eq!(sign_url(&SecretKey::from(KEY), candidate), signature);
        prop_assert_eq!(issuer().issue(&policy).unwrap(), url);
    }
}
