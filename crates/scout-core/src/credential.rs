use crate::error::ScoutError;
use crate::traits::{CredentialStore, StoreNamespace};

/// Key under which the API key lives in every namespace.
pub const CREDENTIAL_KEY: &str = "scout_api_key";

/// Look the API key up, sync namespace first, then local.
///
/// Blank values count as absent. A namespace that fails to read is skipped;
/// the error only surfaces when no namespace could be read at all.
pub async fn resolve_credential<S: CredentialStore>(
    store: &S,
) -> Result<Option<String>, ScoutError> {
    let mut last_error = None;
    let mut any_read = false;

    for namespace in StoreNamespace::READ_ORDER {
        match store.get(namespace, CREDENTIAL_KEY).await {
            Ok(Some(value)) if !value.trim().is_empty() => {
                return Ok(Some(value.trim().to_string()));
            }
            Ok(_) => any_read = true,
            Err(e) => {
                tracing::warn!(%namespace, error = %e, "Credential lookup failed");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !any_read => Err(e),
        _ => Ok(None),
    }
}

/// Store the API key in both namespaces.
pub async fn save_credential<S: CredentialStore>(store: &S, key: &str) -> Result<(), ScoutError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ScoutError::ConfigError("Please enter an API key".into()));
    }
    for namespace in StoreNamespace::READ_ORDER {
        store.set(namespace, CREDENTIAL_KEY, key).await?;
    }
    tracing::info!("API key saved");
    Ok(())
}

/// Remove the API key from both namespaces.
pub async fn clear_credential<S: CredentialStore>(store: &S) -> Result<(), ScoutError> {
    for namespace in StoreNamespace::READ_ORDER {
        store.remove(namespace, CREDENTIAL_KEY).await?;
    }
    tracing::info!("API key cleared");
    Ok(())
}
