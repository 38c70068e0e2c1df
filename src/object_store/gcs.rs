use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{validate_key, ObjectStore, ObjectStoreError};

const STORAGE_API: &str = "https://storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Google Cloud Storage object store.
///
/// Every key is placed under `prefix` inside the bucket, so one bucket can hold
/// both the table documents (`<db_path>/<table>.json`) and the blobs
/// (`<file_path>/<file_id>`).
pub struct GcsStore {
    bucket: String,
    prefix: String,
    client: Client,
    access_token: tokio::sync::RwLock<String>,
    credentials_file: Option<String>,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl GcsStore {
    pub async fn new(
        bucket: &str,
        prefix: &str,
        credentials_file: Option<&str>,
    ) -> Result<Self, anyhow::Error> {
        let store = Self {
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            client: Client::builder().build()?,
            access_token: tokio::sync::RwLock::new(String::new()),
            credentials_file: credentials_file.map(|s| s.to_string()),
        };

        store.refresh_token().await?;
        Ok(store)
    }

    async fn refresh_token(&self) -> Result<(), anyhow::Error> {
        let token = match self.credentials_file {
            Some(ref path) => self.token_from_service_account(path).await?,
            None => self.token_from_metadata_server().await?,
        };

        *self.access_token.write().await = token;
        Ok(())
    }

    async fn token_from_service_account(&self, path: &str) -> Result<String, anyhow::Error> {
        let key: ServiceAccountKey =
            serde_json::from_str(&tokio::fs::read_to_string(path).await?)?;

        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": "https://www.googleapis.com/auth/devstorage.read_write",
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        let header = base64_url_encode(&serde_json::to_vec(&serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        }))?);
        let payload = base64_url_encode(&serde_json::to_vec(&claims)?);
        let unsigned = format!("{header}.{payload}");
        let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
        let jwt = format!("{unsigned}.{}", base64_url_encode(&signature));

        let resp: TokenResponse = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    async fn token_from_metadata_server(&self) -> Result<String, anyhow::Error> {
        let resp: TokenResponse = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    /// Full object name inside the bucket, percent-encoded for use in a URL path
    /// segment or query value.
    fn object_name(&self, key: &str) -> Result<String, ObjectStoreError> {
        validate_key(key)?;
        let name = if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        };
        Ok(encode_object_name(&name))
    }

    fn upload_url(&self, key: &str) -> Result<String, ObjectStoreError> {
        Ok(format!(
            "{STORAGE_API}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket,
            self.object_name(key)?
        ))
    }

    fn object_url(&self, key: &str) -> Result<String, ObjectStoreError> {
        Ok(format!(
            "{STORAGE_API}/storage/v1/b/{}/o/{}",
            self.bucket,
            self.object_name(key)?
        ))
    }

    async fn token(&self) -> String {
        self.access_token.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError> {
        let resp = self
            .client
            .post(self.upload_url(key)?)
            .bearer_auth(self.token().await)
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS upload of {key} failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let resp = self
            .client
            .get(format!("{}?alt=media", self.object_url(key)?))
            .bearer_auth(self.token().await)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS download of {key} failed ({status}): {body}"
            )));
        }

        resp.bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let resp = self
            .client
            .delete(self.object_url(key)?)
            .bearer_auth(self.token().await)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        // 404 means the object is already gone
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS delete of {key} failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let resp = self
            .client
            .get(self.object_url(key)?)
            .bearer_auth(self.token().await)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(ObjectStoreError::Backend(format!(
                "GCS metadata lookup of {key} failed ({status})"
            )))
        }
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set, including `/`.
fn encode_object_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    let der_b64: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &der_b64)?;

    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| anyhow::anyhow!("Failed to parse RSA key: {e}"))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            data,
            &mut signature,
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign: {e}"))?;

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::encode_object_name;

    #[test]
    fn test_encode_object_name_escapes_separators() {
        assert_eq!(encode_object_name("gallery_db/files.json"), "gallery_db%2Ffiles.json");
        assert_eq!(encode_object_name("a b+c"), "a%20b%2Bc");
        assert_eq!(encode_object_name("AgAD-x_1~"), "AgAD-x_1~");
    }
}
