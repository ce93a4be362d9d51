use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::storage::{DataStore, UnitOfWorkError, with_unit_of_work};
use crate::userdb::{DEFAULT_DISPLAY_NAME, DEFAULT_ITEMS_PER_PAGE, DEFAULT_TZINFO, User, UserStore};

use super::credentials::Credentials;
use super::errors::AuthError;

pub const ANONYMOUS_USERNAME: &str = "anonymous";

/// Snapshot of the principal behind a session, rebuilt on every login
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mind {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub identifier: Option<String>,
    pub is_admin: bool,
    pub confirmed: bool,
    pub agreed_to_tos: bool,
    pub items_per_page: i64,
    pub show_adult_content: bool,
    pub tzinfo: String,
    pub authenticated: bool,
}

impl Mind {
    pub fn anonymous() -> Self {
        Self {
            username: ANONYMOUS_USERNAME.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            email: None,
            identifier: None,
            is_admin: false,
            confirmed: false,
            agreed_to_tos: false,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            show_adult_content: false,
            tzinfo: DEFAULT_TZINFO.to_string(),
            authenticated: false,
        }
    }
}

impl From<&User> for Mind {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            identifier: user.identifier.clone(),
            is_admin: user.is_admin,
            confirmed: user.confirmed,
            agreed_to_tos: user.agreed_to_tos,
            items_per_page: user.items_per_page,
            show_adult_content: false,
            tzinfo: user.tzinfo.clone(),
            authenticated: true,
        }
    }
}

/// Builds the mind stored in a session at login.
#[async_trait]
pub trait MindFactory: Send + Sync {
    async fn create_mind(
        &self,
        store: &DataStore,
        credentials: &Credentials,
    ) -> Result<Mind, AuthError>;
}

/// Anonymous credentials and unknown users get the anonymous mind, everyone
/// else a snapshot of their user row.
#[derive(Clone, Copy, Debug, Default)]
pub struct IlogMindFactory;

#[async_trait]
impl MindFactory for IlogMindFactory {
    async fn create_mind(
        &self,
        store: &DataStore,
        credentials: &Credentials,
    ) -> Result<Mind, AuthError> {
        let Some(username) = credentials.username() else {
            return Ok(Mind::anonymous());
        };
        let username = username.to_string();

        let user = with_unit_of_work::<_, AuthError, _>(store, move |uow| {
            Box::pin(async move { Ok(UserStore::get_user(uow, &username).await?) })
        })
        .await
        .map_err(UnitOfWorkError::flatten)?;

        Ok(user.as_ref().map_or_else(Mind::anonymous, Mind::from))
    }
}
