use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use jansetu_core::credentials;
use jansetu_core::domain::identity::{Admin, AdminId, AdminRole, AuthPrincipal, User, UserId};
use jansetu_core::errors::IdentityError;
use jansetu_core::idgen;
use jansetu_core::validation;

use super::{parse_ts, IdentityStore, RepositoryError};
use crate::DbPool;

const ID_MINT_ATTEMPTS: u32 = 10;

pub struct SqlIdentityStore {
    pool: DbPool,
    session_ttl: Duration,
}

impl SqlIdentityStore {
    pub fn new(pool: DbPool, session_ttl_hours: u64) -> Self {
        Self { pool, session_ttl: Duration::hours(session_ttl_hours as i64) }
    }
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub full_name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub aadhaar: Option<String>,
    pub password: String,
    pub language_preference: Option<String>,
}

/// Login identifier precedence follows the legacy handler: mobile, then
/// Aadhaar, then email.
#[derive(Clone, Debug)]
pub struct UserLogin {
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub aadhaar: Option<String>,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct AdminLogin {
    pub admin_id: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub language_preference: Option<String>,
}

impl ProfileUpdate {
    fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.mobile.is_none()
            && self.language_preference.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub mobile: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct CreatedAdmin {
    pub admin: Admin,
    /// Returned exactly once; only the salted digest is stored.
    pub initial_password: String,
}

fn store_err(error: impl std::fmt::Display) -> IdentityError {
    IdentityError::Store(error.to_string())
}

impl From<RepositoryError> for IdentityError {
    fn from(error: RepositoryError) -> Self {
        IdentityError::Store(error.to_string())
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Ok(User {
        id: UserId(row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        full_name: row.try_get("full_name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        email: row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        mobile: row.try_get("mobile").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        language_preference: row
            .try_get("language_preference")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        created_at: parse_ts("created_at", &created_at)?,
    })
}

fn admin_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Admin, RepositoryError> {
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Ok(Admin {
        id: AdminId(row.try_get("admin_id").map_err(|e| RepositoryError::Decode(e.to_string()))?),
        name: row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        email: row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        mobile: row.try_get("mobile").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        role: AdminRole::parse(&role)
            .ok_or_else(|| RepositoryError::Decode(format!("role: `{role}`")))?,
        created_at: parse_ts("created_at", &created_at)?,
    })
}

impl SqlIdentityStore {
    async fn email_in_use(
        &self,
        email: &str,
        excluding: Option<&UserId>,
    ) -> Result<bool, IdentityError> {
        let row = match excluding {
            Some(user) => {
                sqlx::query("SELECT user_id FROM user_account WHERE email = ? AND user_id != ?")
                    .bind(email)
                    .bind(&user.0)
                    .fetch_optional(&self.pool)
                    .await
            }
            None => sqlx::query("SELECT user_id FROM user_account WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await,
        }
        .map_err(store_err)?;
        Ok(row.is_some())
    }

    async fn mobile_in_use(
        &self,
        mobile: &str,
        excluding: Option<&UserId>,
    ) -> Result<bool, IdentityError> {
        let row = match excluding {
            Some(user) => {
                sqlx::query("SELECT user_id FROM user_account WHERE mobile = ? AND user_id != ?")
                    .bind(mobile)
                    .bind(&user.0)
                    .fetch_optional(&self.pool)
                    .await
            }
            None => sqlx::query("SELECT user_id FROM user_account WHERE mobile = ?")
                .bind(mobile)
                .fetch_optional(&self.pool)
                .await,
        }
        .map_err(store_err)?;
        Ok(row.is_some())
    }

    async fn mint_user_id(&self) -> Result<String, IdentityError> {
        for _ in 0..ID_MINT_ATTEMPTS {
            let candidate = idgen::generate_user_id();
            let taken = sqlx::query("SELECT user_id FROM user_account WHERE user_id = ?")
                .bind(&candidate)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
            if taken.is_none() {
                return Ok(candidate);
            }
        }
        Err(IdentityError::Store("unable to mint a unique user id".to_string()))
    }

    async fn mint_admin_id(&self) -> Result<String, IdentityError> {
        for _ in 0..ID_MINT_ATTEMPTS {
            let candidate = idgen::generate_admin_id();
            let taken = sqlx::query("SELECT admin_id FROM admin_account WHERE admin_id = ?")
                .bind(&candidate)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
            if taken.is_none() {
                return Ok(candidate);
            }
        }
        Err(IdentityError::Store("unable to mint a unique admin id".to_string()))
    }

    async fn issue_session(
        &self,
        user_id: Option<&str>,
        admin_id: Option<&str>,
    ) -> Result<IssuedSession, IdentityError> {
        let token = Uuid::new_v4().to_string();
        let issued_at = Utc::now();
        let expires_at = issued_at + self.session_ttl;

        sqlx::query(
            "INSERT INTO auth_session (token, user_id, admin_id, issued_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(admin_id)
        .bind(issued_at.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(IssuedSession { token, expires_at })
    }
}

#[async_trait::async_trait]
impl IdentityStore for SqlIdentityStore {
    async fn register_user(&self, new_user: NewUser) -> Result<UserId, IdentityError> {
        let has_identifier = new_user.email.is_some()
            || new_user.mobile.is_some()
            || new_user.aadhaar.is_some();
        if new_user.full_name.trim().is_empty() || !has_identifier {
            return Err(IdentityError::MissingCredentials);
        }
        validation::validate_password(&new_user.password)?;

        if let Some(email) = &new_user.email {
            validation::validate_email(email)?;
            if self.email_in_use(email, None).await? {
                return Err(IdentityError::DuplicateEmail);
            }
        }
        if let Some(mobile) = &new_user.mobile {
            validation::validate_mobile(mobile)?;
            if self.mobile_in_use(mobile, None).await? {
                return Err(IdentityError::DuplicateMobile);
            }
        }
        let aadhaar_digest = new_user.aadhaar.as_deref().map(credentials::digest_aadhaar);
        if let Some(digest) = &aadhaar_digest {
            let taken = sqlx::query("SELECT user_id FROM user_account WHERE aadhaar_digest = ?")
                .bind(digest)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
            if taken.is_some() {
                return Err(IdentityError::DuplicateAadhaar);
            }
        }

        let user_id = self.mint_user_id().await?;
        let salt = credentials::generate_salt();
        let digest = credentials::digest_password(&new_user.password, &salt);

        sqlx::query(
            "INSERT INTO user_account (user_id, full_name, email, mobile, aadhaar_digest,
                                       credential_digest, credential_salt, language_preference, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user_id)
        .bind(new_user.full_name.trim())
        .bind(&new_user.email)
        .bind(&new_user.mobile)
        .bind(&aadhaar_digest)
        .bind(&digest)
        .bind(&salt)
        .bind(new_user.language_preference.as_deref().unwrap_or("en"))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(UserId(user_id))
    }

    async fn login_user(&self, login: UserLogin) -> Result<IssuedSession, IdentityError> {
        if login.password.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }

        let row = if let Some(mobile) = &login.mobile {
            sqlx::query(
                "SELECT user_id, credential_digest, credential_salt FROM user_account WHERE mobile = ?",
            )
            .bind(mobile)
            .fetch_optional(&self.pool)
            .await
        } else if let Some(aadhaar) = &login.aadhaar {
            sqlx::query(
                "SELECT user_id, credential_digest, credential_salt FROM user_account WHERE aadhaar_digest = ?",
            )
            .bind(credentials::digest_aadhaar(aadhaar))
            .fetch_optional(&self.pool)
            .await
        } else if let Some(email) = &login.email {
            sqlx::query(
                "SELECT user_id, credential_digest, credential_salt FROM user_account WHERE email = ?",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
        } else {
            return Err(IdentityError::MissingCredentials);
        }
        .map_err(store_err)?;

        let row = row.ok_or(IdentityError::InvalidCredentials)?;
        let user_id: String =
            row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let digest: String =
            row.try_get("credential_digest").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let salt: String =
            row.try_get("credential_salt").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        if !credentials::verify_password(&login.password, &salt, &digest) {
            return Err(IdentityError::InvalidCredentials);
        }

        self.issue_session(Some(&user_id), None).await
    }

    async fn login_admin(&self, login: AdminLogin) -> Result<IssuedSession, IdentityError> {
        if login.password.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }

        let row = if let Some(admin_id) = &login.admin_id {
            sqlx::query(
                "SELECT admin_id, credential_digest, credential_salt FROM admin_account WHERE admin_id = ?",
            )
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await
        } else if let Some(email) = &login.email {
            sqlx::query(
                "SELECT admin_id, credential_digest, credential_salt FROM admin_account WHERE email = ?",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
        } else {
            return Err(IdentityError::MissingCredentials);
        }
        .map_err(store_err)?;

        let row = row.ok_or(IdentityError::InvalidCredentials)?;
        let admin_id: String =
            row.try_get("admin_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let digest: String =
            row.try_get("credential_digest").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let salt: String =
            row.try_get("credential_salt").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        if !credentials::verify_password(&login.password, &salt, &digest) {
            return Err(IdentityError::InvalidCredentials);
        }

        self.issue_session(None, Some(&admin_id)).await
    }

    async fn authenticate(&self, token: &str) -> Result<AuthPrincipal, IdentityError> {
        let row = sqlx::query(
            "SELECT user_id, admin_id, expires_at FROM auth_session WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or(IdentityError::Unauthenticated)?;

        let expires_at: String =
            row.try_get("expires_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        if parse_ts("expires_at", &expires_at)? <= Utc::now() {
            return Err(IdentityError::Unauthenticated);
        }

        let user_id: Option<String> =
            row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let admin_id: Option<String> =
            row.try_get("admin_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        // The account row is re-checked so removed principals stop
        // resolving even while their sessions are unexpired.
        if let Some(user_id) = user_id {
            let user = self
                .find_user(&UserId(user_id))
                .await?
                .ok_or(IdentityError::Unauthenticated)?;
            return Ok(AuthPrincipal::User(user.id));
        }
        if let Some(admin_id) = admin_id {
            let admin = self
                .find_admin(&AdminId(admin_id))
                .await?
                .ok_or(IdentityError::Unauthenticated)?;
            return Ok(AuthPrincipal::Admin { id: admin.id, role: admin.role });
        }

        Err(IdentityError::Unauthenticated)
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, full_name, email, mobile, language_preference, created_at
             FROM user_account WHERE user_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_admin(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query(
            "SELECT admin_id, name, email, mobile, role, created_at
             FROM admin_account WHERE admin_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(admin_from_row).transpose()
    }

    async fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<(), IdentityError> {
        if update.is_empty() {
            return Err(IdentityError::NoFieldsToUpdate);
        }
        if self.find_user(id).await?.is_none() {
            return Err(IdentityError::UserNotFound);
        }

        if let Some(email) = &update.email {
            validation::validate_email(email)?;
            if self.email_in_use(email, Some(id)).await? {
                return Err(IdentityError::DuplicateEmail);
            }
        }
        if let Some(mobile) = &update.mobile {
            validation::validate_mobile(mobile)?;
            if self.mobile_in_use(mobile, Some(id)).await? {
                return Err(IdentityError::DuplicateMobile);
            }
        }

        let mut query = QueryBuilder::new("UPDATE user_account SET ");
        let mut fields = query.separated(", ");
        if let Some(full_name) = &update.full_name {
            fields.push("full_name = ").push_bind_unseparated(full_name);
        }
        if let Some(email) = &update.email {
            fields.push("email = ").push_bind_unseparated(email);
        }
        if let Some(mobile) = &update.mobile {
            fields.push("mobile = ").push_bind_unseparated(mobile);
        }
        if let Some(language) = &update.language_preference {
            fields.push("language_preference = ").push_bind_unseparated(language);
        }
        query.push(" WHERE user_id = ").push_bind(&id.0);

        query.build().execute(&self.pool).await.map_err(store_err)?;
        Ok(())
    }

    async fn change_password(
        &self,
        id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        validation::validate_password(new_password)?;

        let row = sqlx::query(
            "SELECT credential_digest, credential_salt FROM user_account WHERE user_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .ok_or(IdentityError::UserNotFound)?;

        let digest: String =
            row.try_get("credential_digest").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let salt: String =
            row.try_get("credential_salt").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        if !credentials::verify_password(current_password, &salt, &digest) {
            return Err(IdentityError::InvalidCredentials);
        }

        let new_salt = credentials::generate_salt();
        let new_digest = credentials::digest_password(new_password, &new_salt);
        sqlx::query(
            "UPDATE user_account SET credential_digest = ?, credential_salt = ? WHERE user_id = ?",
        )
        .bind(&new_digest)
        .bind(&new_salt)
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn create_admin(&self, new_admin: NewAdmin) -> Result<CreatedAdmin, IdentityError> {
        if new_admin.name.trim().is_empty() {
            return Err(IdentityError::MissingCredentials);
        }
        validation::validate_email(&new_admin.email)?;

        let taken = sqlx::query("SELECT admin_id FROM admin_account WHERE email = ?")
            .bind(&new_admin.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        if taken.is_some() {
            return Err(IdentityError::DuplicateEmail);
        }

        let admin_id = self.mint_admin_id().await?;
        let initial_password = idgen::generate_admin_password();
        let salt = credentials::generate_salt();
        let digest = credentials::digest_password(&initial_password, &salt);
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO admin_account (admin_id, name, email, mobile, credential_digest,
                                        credential_salt, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&admin_id)
        .bind(new_admin.name.trim())
        .bind(&new_admin.email)
        .bind(&new_admin.mobile)
        .bind(&digest)
        .bind(&salt)
        .bind(new_admin.role.as_str())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(CreatedAdmin {
            admin: Admin {
                id: AdminId(admin_id),
                name: new_admin.name.trim().to_string(),
                email: new_admin.email,
                mobile: new_admin.mobile,
                role: new_admin.role,
                created_at,
            },
            initial_password,
        })
    }
}
