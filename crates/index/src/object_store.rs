use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::ObjectStoreError;

type HmacSha256 = Hmac<Sha256>;

/// Object-storage collaborator. Owns full document content; the relational
/// store only ever sees previews.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        metadata: &HashMap<String, String>,
    ) -> Result<(), ObjectStoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjectStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, ObjectStoreError>;
}

#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// Key convention for stored document content.
pub fn document_content_key(user_id: &str, document_id: &str) -> String {
    format!("users/{}/documents/{}/content.txt", user_id, document_id)
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl S3Config {
    /// Bucket and endpoint come from `OBJECT_STORE_*`; credentials from the
    /// standard `AWS_*` variables.
    pub fn from_env() -> Result<Self, ObjectStoreError> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| ObjectStoreError::Credentials("AWS_ACCESS_KEY_ID not set".to_string()))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            ObjectStoreError::Credentials("AWS_SECRET_ACCESS_KEY not set".to_string())
        })?;

        Ok(Self {
            bucket: std::env::var("OBJECT_STORE_BUCKET")
                .unwrap_or_else(|_| "documents".to_string()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: std::env::var("OBJECT_STORE_ENDPOINT").ok(),
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

/// S3-compatible object store over the REST API with AWS SigV4 signing.
/// Pure-Rust signing (`hmac` + `sha2`); no vendor SDK.
pub struct S3ObjectStore {
    config: S3Config,
    client: reqwest::Client,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn host(&self) -> String {
        match &self.config.endpoint_url {
            Some(endpoint) => endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string(),
            None => format!(
                "{}.s3.{}.amazonaws.com",
                self.config.bucket, self.config.region
            ),
        }
    }

    fn scheme(&self) -> &'static str {
        match &self.config.endpoint_url {
            Some(endpoint) if endpoint.starts_with("http://") => "http",
            _ => "https",
        }
    }

    /// Send one SigV4-signed request. `canonical_uri` must already be
    /// URI-encoded; `query` must be sorted by key.
    async fn send(
        &self,
        method: reqwest::Method,
        canonical_uri: &str,
        query: &[(String, String)],
        body: Vec<u8>,
        extra_headers: Vec<(String, String)>,
    ) -> Result<reqwest::Response, ObjectStoreError> {
        let host = self.host();
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(&body);

        let mut headers = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = &self.config.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.extend(extra_headers);
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();
        let canonical_querystring: String = query
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri,
            canonical_querystring,
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.config.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.config.access_key_id, credential_scope, signed_headers, signature
        );

        let url = if canonical_querystring.is_empty() {
            format!("{}://{}{}", self.scheme(), host, canonical_uri)
        } else {
            format!(
                "{}://{}{}?{}",
                self.scheme(),
                host,
                canonical_uri,
                canonical_querystring
            )
        };

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", &authorization);
        for (name, value) in headers.iter().filter(|(name, _)| name != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        Ok(request.body(body).send().await?)
    }

    fn object_uri(key: &str) -> String {
        let encoded = key
            .split('/')
            .map(uri_encode)
            .collect::<Vec<_>>()
            .join("/");
        format!("/{}", encoded)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        metadata: &HashMap<String, String>,
    ) -> Result<(), ObjectStoreError> {
        let meta_headers = metadata
            .iter()
            .map(|(k, v)| (format!("x-amz-meta-{}", k.to_lowercase()), v.clone()))
            .collect();

        let response = self
            .send(
                reqwest::Method::PUT,
                &Self::object_uri(key),
                &[],
                content.to_vec(),
                meta_headers,
            )
            .await?;

        if !response.status().is_success() {
            return Err(ObjectStoreError::Status {
                status: response.status(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ObjectStoreError> {
        let response = self
            .send(
                reqwest::Method::GET,
                &Self::object_uri(key),
                &[],
                Vec::new(),
                Vec::new(),
            )
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ObjectStoreError::Status {
                status: response.status(),
                key: key.to_string(),
            });
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let response = self
            .send(
                reqwest::Method::DELETE,
                &Self::object_uri(key),
                &[],
                Vec::new(),
                Vec::new(),
            )
            .await?;

        // Deleting an absent key is a success for S3; mirror that.
        if !response.status().is_success() && response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::Status {
                status: response.status(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, ObjectStoreError> {
        let query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("prefix".to_string(), prefix.to_string()),
        ];

        let response = self
            .send(reqwest::Method::GET, "/", &query, Vec::new(), Vec::new())
            .await?;

        if !response.status().is_success() {
            return Err(ObjectStoreError::Status {
                status: response.status(),
                key: prefix.to_string(),
            });
        }

        let xml = response.text().await?;
        Ok(parse_list_response(&xml))
    }
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => result.push_str(&format!("%{:02X}", byte)),
        }
    }
    result
}

/// Minimal `ListObjectsV2` XML scan; enough for `<Contents>` blocks with
/// `<Key>` and `<Size>`.
fn parse_list_response(xml: &str) -> Vec<ObjectSummary> {
    let mut objects = Vec::new();
    let mut remaining = xml;

    while let Some(start) = remaining.find("<Contents>") {
        let block_start = start + "<Contents>".len();
        let Some(end) = remaining[block_start..].find("</Contents>") else {
            break;
        };
        let block = &remaining[block_start..block_start + end];

        if let Some(key) = extract_xml_value(block, "Key") {
            let size = extract_xml_value(block, "Size")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            objects.push(ObjectSummary { key, size });
        }

        remaining = &remaining[block_start + end..];
    }

    objects
}

fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_key_follows_the_user_scoped_convention() {
        assert_eq!(
            document_content_key("u-42", "d-7"),
            "users/u-42/documents/d-7/content.txt"
        );
    }

    #[test]
    fn uri_encoding_leaves_unreserved_chars() {
        assert_eq!(uri_encode("users/a b.txt"), "users%2Fa%20b.txt");
        assert_eq!(uri_encode("plain-key_1.txt"), "plain-key_1.txt");
    }

    #[test]
    fn list_response_parsing_reads_keys_and_sizes() {
        let xml = r#"<?xml version="1.0"?>
<ListBucketResult>
  <Contents><Key>users/u/documents/d/content.txt</Key><Size>1204</Size></Contents>
  <Contents><Key>users/u/documents/e/content.txt</Key><Size>88</Size></Contents>
</ListBucketResult>"#;

        let objects = parse_list_response(xml);
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].key, "users/u/documents/d/content.txt");
        assert_eq!(objects[0].size, 1204);
        assert_eq!(objects[1].size, 88);
    }

    #[test]
    fn signing_key_derivation_is_deterministic() {
        let a = derive_signing_key("secret", "20260101", "us-east-1", "s3");
        let b = derive_signing_key("secret", "20260101", "us-east-1", "s3");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
