use async_trait::async_trait;
use sp_api_feeds::credentials::{
    ConfigRecord, CredentialResolver, Environment, LruSecretCache, MissingCredentials,
    SecretCache, SecretStore, SecretStoreError,
};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

const SECRET_JSON: &str = r#"{
    "SP_API_REFRESH_TOKEN": "Atzr|remote",
    "LWA_APP_ID": "remote-app",
    "LWA_CLIENT_SECRET": "remote-client-secret",
    "SP_API_ACCESS_KEY": "AKIAREMOTE",
    "SP_API_SECRET_KEY": "remote-aws-secret"
}"#;

struct CountingStore {
    value: String,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new(value: &str) -> Arc<Self> {
        Arc::new(Self {
            value: value.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for CountingStore {
    async fn fetch(&self, _secret_id: &str) -> Result<String, SecretStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.clone())
    }
}

fn env(vars: &[(&str, &str)]) -> Arc<dyn Environment> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(map)
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn missing_path() -> PathBuf {
    tempfile::tempdir()
        .unwrap()
        .path()
        .join("python-sp-api")
        .join("credentials.yml")
}

async fn resolve(
    account: &str,
    env: Arc<dyn Environment>,
    store: Arc<dyn SecretStore>,
    cache: Arc<dyn SecretCache>,
    path: PathBuf,
) -> Result<CredentialResolver, MissingCredentials> {
    CredentialResolver::builder(account)
        .default_sources(env, store, cache, path)
        .resolve()
        .await
}

#[tokio::test]
async fn test_explicit_credentials_missing_secret_key_named_in_error() {
    let record = ConfigRecord {
        refresh_token: Some("Atzr|token".into()),
        lwa_app_id: Some("app".into()),
        lwa_client_secret: Some("client-secret".into()),
        aws_access_key: Some("AKIA".into()),
        ..ConfigRecord::default()
    };

    let err = CredentialResolver::builder("default")
        .explicit(record)
        .resolve()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("aws_secret_key"));
}

#[tokio::test]
async fn test_remote_secret_is_fetched_once_per_shared_cache() {
    let store = CountingStore::new(SECRET_JSON);
    let cache: Arc<dyn SecretCache> = Arc::new(LruSecretCache::default());
    let vars = env(&[("SP_API_AWS_SECRET_ID", "sp-api/credentials")]);

    let first = resolve(
        "default",
        vars.clone(),
        store.clone(),
        cache.clone(),
        missing_path(),
    )
    .await
    .unwrap();
    assert_eq!(first.credentials().lwa_app_id, "remote-app");
    assert_eq!(store.calls(), 1);

    let second = resolve("default", vars, store.clone(), cache, missing_path())
        .await
        .unwrap();
    assert_eq!(second.credentials(), first.credentials());
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_config_file_default_section_resolves_exactly() {
    let file = config_file(
        "version: '1.0'\n\
         default:\n  \
           refresh_token: Atzr|file\n  \
           lwa_app_id: file-app\n  \
           lwa_client_secret: file-client-secret\n  \
           aws_access_key: AKIAFILE\n  \
           aws_secret_key: file-aws-secret\n  \
           role_arn: arn:aws:iam::123456789012:role/sp-api\n",
    );

    let resolver = resolve(
        "default",
        env(&[]),
        CountingStore::new(SECRET_JSON),
        Arc::new(LruSecretCache::default()),
        file.path().to_path_buf(),
    )
    .await
    .unwrap();

    let expected = ConfigRecord {
        refresh_token: Some("Atzr|file".into()),
        lwa_app_id: Some("file-app".into()),
        lwa_client_secret: Some("file-client-secret".into()),
        aws_access_key: Some("AKIAFILE".into()),
        aws_secret_key: Some("file-aws-secret".into()),
        role_arn: Some("arn:aws:iam::123456789012:role/sp-api".into()),
        use_instance_profile: None,
    }
    .validate()
    .unwrap();
    assert_eq!(resolver.credentials(), &expected);
    assert_eq!(resolver.account(), "default");
}

#[tokio::test]
async fn test_nothing_available_fails() {
    let store = CountingStore::new(SECRET_JSON);
    let err = resolve(
        "default",
        env(&[]),
        store.clone(),
        Arc::new(LruSecretCache::default()),
        missing_path(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MissingCredentials::NoSource { .. }));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_missing_account_section_names_the_account() {
    let file = config_file(
        "default:\n  lwa_app_id: a\n  lwa_client_secret: b\n  aws_access_key: c\n  aws_secret_key: d\n",
    );

    let err = resolve(
        "production",
        env(&[]),
        CountingStore::new(SECRET_JSON),
        Arc::new(LruSecretCache::default()),
        file.path().to_path_buf(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("production"));
}

#[tokio::test]
async fn test_account_scoped_variable_wins() {
    let vars = env(&[
        ("LWA_APP_ID", "generic-app"),
        ("LWA_APP_ID_myaccount", "scoped-app"),
        ("LWA_CLIENT_SECRET", "client-secret"),
        ("SP_API_ACCESS_KEY", "AKIA"),
        ("SP_API_SECRET_KEY", "aws-secret"),
    ]);

    let resolver = resolve(
        "myaccount",
        vars,
        CountingStore::new(SECRET_JSON),
        Arc::new(LruSecretCache::default()),
        missing_path(),
    )
    .await
    .unwrap();

    assert_eq!(resolver.credentials().lwa_app_id, "scoped-app");
    assert_eq!(resolver.credentials().lwa_client_secret, "client-secret");
}

#[tokio::test]
async fn test_environment_beats_config_file() {
    let file = config_file(
        "default:\n  lwa_app_id: file-app\n  lwa_client_secret: b\n  aws_access_key: c\n  aws_secret_key: d\n",
    );
    let vars = env(&[
        ("LWA_APP_ID", "env-app"),
        ("LWA_CLIENT_SECRET", "client-secret"),
        ("SP_API_ACCESS_KEY", "AKIA"),
        ("SP_API_SECRET_KEY", "aws-secret"),
    ]);

    let resolver = resolve(
        "default",
        vars,
        CountingStore::new(SECRET_JSON),
        Arc::new(LruSecretCache::default()),
        file.path().to_path_buf(),
    )
    .await
    .unwrap();

    assert_eq!(resolver.credentials().lwa_app_id, "env-app");
}
