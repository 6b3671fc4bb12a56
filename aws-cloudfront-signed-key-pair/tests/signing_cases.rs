/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_cloudfront_signed_key_pair::error::{ErrorKind, SigningError};
use aws_cloudfront_signed_key_pair::{
    sign_cookies, sign_url, KeyMaterial, SigningRequest, TimeInput, UrlSafeEncoding,
};
use percent_encoding::percent_decode_str;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct TestCase {
    id: String,
    documentation: String,
    input: TestInput,
    expected: TestExpected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestInput {
    resource_url: String,
    resource_pattern: Option<String>,
    key_pair_id: String,
    expires: Option<TimeInput>,
    active_at: Option<TimeInput>,
    ip_range: Option<String>,
    encoding: Option<UrlSafeEncoding>,
    #[serde(default)]
    cookies: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestExpected {
    query_params: Option<Vec<String>>,
    #[serde(default)]
    query_values: HashMap<String, String>,
    cookies: Option<Vec<String>>,
    #[serde(default)]
    cookie_values: HashMap<String, String>,
    policy_json: Option<String>,
    #[serde(default)]
    raw_contains: Vec<String>,
    error_kind: Option<String>,
    error_contains: Option<Vec<String>>,
}

fn load_test_cases() -> Vec<TestCase> {
    let json = include_str!("signing-cases.json");
    serde_json::from_str(json).expect("Failed to parse test cases")
}

fn key_material() -> KeyMaterial {
    let pem = std::fs::read("tests/rsa-private-key.pem").expect("Failed to read test key");
    KeyMaterial::from_private_key_pem(&pem).expect("Failed to parse test key")
}

fn error_kind(name: &str) -> ErrorKind {
    match name {
        "InvalidKeyMaterial" => ErrorKind::InvalidKeyMaterial,
        "InvalidPolicy" => ErrorKind::InvalidPolicy,
        "InvalidInput" => ErrorKind::InvalidInput,
        "InvalidCookieValue" => ErrorKind::InvalidCookieValue,
        "InvalidConfiguration" => ErrorKind::InvalidConfiguration,
        "SigningFailure" => ErrorKind::SigningFailure,
        other => panic!("unknown error kind in test cases: {other}"),
    }
}

fn from_cloudfront_alphabet(value: &str) -> String {
    value.replace('-', "+").replace('_', "=").replace('~', "/")
}

fn percent_decode(value: &str) -> String {
    percent_decode_str(value)
        .decode_utf8()
        .expect("value should be UTF-8")
        .into_owned()
}

/// Decodes a `Signature` or `Policy` value as it reads after URL decoding.
///
/// Legacy values are percent-escaped base64, so they are unescaped first.
fn decode_value(value: &str, encoding: UrlSafeEncoding) -> Vec<u8> {
    let standard = match encoding {
        UrlSafeEncoding::Legacy => percent_decode(value),
        _ => from_cloudfront_alphabet(value),
    };
    base64_simd::STANDARD
        .decode_to_vec(standard)
        .expect("value should be base64")
}

fn verify(public_key: &RsaPublicKey, policy_json: &str, signature: &[u8], id: &str) {
    public_key
        .verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(policy_json.as_bytes()),
            signature,
        )
        .unwrap_or_else(|e| panic!("Test {id}: signature does not verify: {e}"));
}

fn run(case: &TestCase, material: &KeyMaterial) -> Result<(), SigningError> {
    let input = &case.input;
    let encoding = input.encoding.unwrap_or_default();
    let mut builder = SigningRequest::builder()
        .resource_url(&input.resource_url)
        .key_pair_id(&input.key_pair_id)
        .private_key(material.private_key().clone())
        .encoding(encoding);
    if let Some(pattern) = &input.resource_pattern {
        builder = builder.resource_pattern(pattern);
    }
    if let Some(expires) = &input.expires {
        builder = builder.expires_at(expires.clone());
    }
    if let Some(active) = &input.active_at {
        builder = builder.active_at(active.clone());
    }
    if let Some(ip) = &input.ip_range {
        builder = builder.ip_range(ip);
    }
    let request = builder.build()?;

    let public_key = RsaPublicKey::from_public_key_pem(material.public_key()).unwrap();
    let expected = &case.expected;
    let id = case.id.as_str();

    if input.cookies {
        let cookies = sign_cookies(request)?;
        let names: Vec<&str> = cookies.iter().map(|(name, _)| name).collect();
        assert_eq!(
            Some(names.iter().map(|n| n.to_string()).collect::<Vec<_>>()),
            expected.cookies,
            "Test {id}: cookie names"
        );
        for (name, value) in &expected.cookie_values {
            assert_eq!(cookies.get(name), Some(value.as_str()), "Test {id}: cookie {name}");
        }
        let header = cookies.to_header_string();
        for raw in &expected.raw_contains {
            assert!(header.contains(raw.as_str()), "Test {id}: `{header}` lacks `{raw}`");
        }
        if let Some(policy_json) = &expected.policy_json {
            let signature = cookies.get("CloudFront-Signature").unwrap();
            // Legacy cookies escape the signature twice.
            let signature = match encoding {
                UrlSafeEncoding::Legacy => decode_value(&percent_decode(signature), encoding),
                _ => decode_value(signature, encoding),
            };
            verify(&public_key, policy_json, &signature, id);
            if let Some(policy) = cookies.get("CloudFront-Policy") {
                let policy = match encoding {
                    UrlSafeEncoding::Legacy => percent_decode(policy).into_bytes(),
                    _ => decode_value(policy, encoding),
                };
                assert_eq!(policy, policy_json.as_bytes(), "Test {id}: policy cookie");
            }
        }
    } else {
        let signed_url = sign_url(request)?;
        for raw in &expected.raw_contains {
            assert!(
                signed_url.as_str().contains(raw.as_str()),
                "Test {id}: `{signed_url}` lacks `{raw}`"
            );
        }
        let pairs: Vec<(String, String)> = signed_url.as_url().query_pairs().into_owned().collect();
        assert_eq!(
            Some(pairs.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>()),
            expected.query_params,
            "Test {id}: query parameter names"
        );
        let params: HashMap<String, String> = pairs.into_iter().collect();
        for (name, value) in &expected.query_values {
            assert_eq!(params.get(name), Some(value), "Test {id}: query param {name}");
        }
        if let Some(policy_json) = &expected.policy_json {
            verify(
                &public_key,
                policy_json,
                &decode_value(&params["Signature"], encoding),
                id,
            );
            if let Some(policy) = params.get("Policy") {
                let policy = match encoding {
                    UrlSafeEncoding::Legacy => percent_decode(policy).into_bytes(),
                    _ => decode_value(policy, encoding),
                };
                assert_eq!(policy, policy_json.as_bytes(), "Test {id}: policy param");
            }
        }
    }
    Ok(())
}

#[test]
fn test_signing_cases() {
    let material = key_material();

    for case in load_test_cases() {
        println!("\nRunning test: {} - {}", case.id, case.documentation);

        match (run(&case, &material), &case.expected.error_kind) {
            (Ok(()), None) => {}
            (Ok(()), Some(kind)) => panic!("Test {} expected {kind} but succeeded", case.id),
            (Err(err), None) => panic!("Test {} failed: {err}", case.id),
            (Err(err), Some(kind)) => {
                assert_eq!(err.kind(), error_kind(kind), "Test {}: error kind", case.id);
                let message = err.to_string().to_lowercase();
                for expected_text in case.expected.error_contains.iter().flatten() {
                    assert!(
                        message.contains(&expected_text.to_lowercase()),
                        "Test {} error message '{}' does not contain '{}'",
                        case.id,
                        message,
                        expected_text
                    );
                }
            }
        }
    }
}
