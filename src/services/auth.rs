//! Authentication service: credential store and session issuer

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginUser, NewUser, RegisterUser, Role, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account and open a session for it
    pub async fn register(&self, request: RegisterUser) -> AppResult<(String, User)> {
        let email = normalize_email(&request.email);

        if self.repository.users.get_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        if request.role == Role::Librarian
            && request.librarian_code.as_deref() != Some(self.config.librarian_code.as_str())
        {
            return Err(AppError::InvalidLibrarianCode);
        }

        let user = self
            .repository
            .users
            .create(&NewUser {
                name: request.name.trim().to_string(),
                email,
                password_hash: self.hash_password(&request.password)?,
                role: request.role,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    pub async fn login(&self, request: LoginUser) -> AppResult<(String, User)> {
        let email = normalize_email(&request.email);

        let user = self
            .repository
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_password(&user, &request.password)? {
            tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    /// Resolve a bearer token to its claims
    pub fn verify(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| {
                tracing::debug!(kind = ?e.kind(), "Rejected bearer token");
                AppError::Authentication
            })
    }

    pub async fn get_user(&self, claims: &UserClaims) -> AppResult<User> {
        self.repository
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AppError::Authentication)
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user.id, user.role, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
