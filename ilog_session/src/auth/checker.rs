use crate::storage::{
    DataStore, UnitOfWork, UnitOfWorkError, UnitOfWorkHost, with_attached_unit_of_work,
};
use crate::userdb::UserStore;

use super::credentials::Credentials;
use super::errors::AuthError;

/// Checks credentials against the users table.
///
/// Carries its unit of work as an attribute while a check is running.
pub struct CredentialsChecker {
    store: DataStore,
    unit: Option<UnitOfWork>,
}

impl UnitOfWorkHost for CredentialsChecker {
    fn unit_of_work_slot(&mut self) -> &mut Option<UnitOfWork> {
        &mut self.unit
    }
}

impl CredentialsChecker {
    pub fn new(store: DataStore) -> Self {
        Self { store, unit: None }
    }

    /// The username the credentials log in as.
    ///
    /// Password logins touch the user and record the login time on success.
    /// A wrong password changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn request_avatar_id(&mut self, credentials: &Credentials) -> Result<String, AuthError> {
        let store = self.store.clone();
        let credentials = credentials.clone();

        with_attached_unit_of_work::<_, _, AuthError, _>(&store, self, move |checker| {
            Box::pin(async move {
                let (username, password) = match &credentials {
                    Credentials::Anonymous => {
                        return Err(UnitOfWorkError::Operation(AuthError::Unauthorized));
                    }
                    Credentials::UsernamePassword { username, password } => {
                        (username.as_str(), Some(password.as_str()))
                    }
                    Credentials::PreAuthenticated { username } => (username.as_str(), None),
                };

                let uow = checker.unit_of_work()?;
                let Some(mut user) = UserStore::get_user(uow, username).await? else {
                    tracing::debug!("No user by the username: \"{}\"", username);
                    return Err(UnitOfWorkError::Operation(AuthError::Unauthorized));
                };

                let Some(password) = password else {
                    tracing::debug!("Passwordless pre-authenticating \"{}\"", username);
                    return Ok(user.username);
                };

                tracing::debug!("Authenticating {}", username);
                if !user.authenticate(password) {
                    tracing::warn!("Password didn't match for {}", username);
                    return Err(UnitOfWorkError::Operation(AuthError::Unauthorized));
                }

                UserStore::record_login(uow, &user).await?;
                uow.commit().await?;
                Ok(user.username)
            })
        })
        .await
        .map_err(UnitOfWorkError::flatten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fetch_user, insert_test_user, memory_store};

    fn password(username: &str, password: &str) -> Credentials {
        Credentials::UsernamePassword {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_valid_password_records_login() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;
        let before = fetch_user(&store, "alice").await.unwrap();

        let mut checker = CredentialsChecker::new(store.clone());
        let avatar = checker
            .request_avatar_id(&password("alice", "secret"))
            .await
            .unwrap();

        assert_eq!(avatar, "alice");
        let after = fetch_user(&store, "alice").await.unwrap();
        assert!(after.last_login >= before.last_login);
        assert!(after.last_used >= before.last_used);
    }

    #[tokio::test]
    async fn test_wrong_password_changes_nothing() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;
        let before = fetch_user(&store, "alice").await.unwrap();

        let mut checker = CredentialsChecker::new(store.clone());
        let result = checker.request_avatar_id(&password("alice", "wrong")).await;

        assert!(matches!(result, Err(AuthError::Unauthorized)));
        let after = fetch_user(&store, "alice").await.unwrap();
        assert_eq!(after.last_login, before.last_login);
        assert_eq!(after.last_used, before.last_used);
    }

    #[tokio::test]
    async fn test_unknown_and_unconfirmed_users_are_unauthorized() {
        let store = memory_store().await;
        insert_test_user(&store, "mallory", "secret", false).await;
        let mut checker = CredentialsChecker::new(store.clone());

        let unknown = checker.request_avatar_id(&password("nobody", "secret")).await;
        assert!(matches!(unknown, Err(AuthError::Unauthorized)));

        let unconfirmed = checker
            .request_avatar_id(&password("mallory", "secret"))
            .await;
        assert!(matches!(unconfirmed, Err(AuthError::Unauthorized)));

        let anonymous = checker.request_avatar_id(&Credentials::Anonymous).await;
        assert!(matches!(anonymous, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_pre_authenticated_skips_password() {
        let store = memory_store().await;
        insert_test_user(&store, "alice", "secret", true).await;

        let mut checker = CredentialsChecker::new(store.clone());
        let creds = Credentials::PreAuthenticated {
            username: "alice".to_string(),
        };

        assert_eq!(checker.request_avatar_id(&creds).await.unwrap(), "alice");
        // Detached again once the check is over
        assert!(matches!(
            checker.unit_of_work(),
            Err(crate::storage::StorageError::Detached)
        ));
    }
}
