//! User accounts: unique username, unique lowercase email, Argon2 PHC hash,
//! role flag and superuser override. Users are never hard-deleted.

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::identity::Role;

use super::{bool_at, i64_at, new_id, now_ms, str_at, Store};

const TABLE: &str = "users";

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub superuser: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Admin check used by the authorizer: explicit admin role or the
    /// superuser override flag.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.superuser
    }

    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            superuser: self.superuser,
        }
    }

    /// Reference shape embedded in expanded posts.
    pub fn author_ref(&self) -> AuthorRef {
        AuthorRef { id: self.id.clone(), username: self.username.clone(), email: self.email.clone() }
    }
}

/// Author fields displayed on an expanded post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthorRef {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Profile fields safe to return to clients; never carries the hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPublic {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isSuperUser")]
    pub superuser: bool,
}

pub(crate) fn empty_users_df() -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("id".into(), Vec::<String>::new()).into(),
        Series::new("username".into(), Vec::<String>::new()).into(),
        Series::new("email".into(), Vec::<String>::new()).into(),
        Series::new("password_hash".into(), Vec::<String>::new()).into(),
        Series::new("role".into(), Vec::<String>::new()).into(),
        Series::new("superuser".into(), Vec::<bool>::new()).into(),
        Series::new("created_at".into(), Vec::<i64>::new()).into(),
        Series::new("updated_at".into(), Vec::<i64>::new()).into(),
    ])?;
    Ok(df)
}

fn users_df(users: &[User]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("id".into(), users.iter().map(|u| u.id.clone()).collect::<Vec<_>>()).into(),
        Series::new("username".into(), users.iter().map(|u| u.username.clone()).collect::<Vec<_>>()).into(),
        Series::new("email".into(), users.iter().map(|u| u.email.clone()).collect::<Vec<_>>()).into(),
        Series::new("password_hash".into(), users.iter().map(|u| u.password_hash.clone()).collect::<Vec<_>>()).into(),
        Series::new("role".into(), users.iter().map(|u| u.role.as_str().to_string()).collect::<Vec<_>>()).into(),
        Series::new("superuser".into(), users.iter().map(|u| u.superuser).collect::<Vec<_>>()).into(),
        Series::new("created_at".into(), users.iter().map(|u| u.created_at).collect::<Vec<_>>()).into(),
        Series::new("updated_at".into(), users.iter().map(|u| u.updated_at).collect::<Vec<_>>()).into(),
    ])?;
    Ok(df)
}

fn user_from_row(df: &DataFrame, i: usize) -> Result<User> {
    Ok(User {
        id: str_at(df, "id", i)?,
        username: str_at(df, "username", i)?,
        email: str_at(df, "email", i)?,
        password_hash: str_at(df, "password_hash", i)?,
        role: Role::parse(&str_at(df, "role", i)?),
        superuser: bool_at(df, "superuser", i)?,
        created_at: i64_at(df, "created_at", i)?,
        updated_at: i64_at(df, "updated_at", i)?,
    })
}

impl Store {
    pub(crate) fn load_users(&self) -> Result<Vec<User>> {
        let df = self.read_table(TABLE, empty_users_df)?;
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            out.push(user_from_row(&df, i)?);
        }
        Ok(out)
    }

    pub(crate) fn save_users(&self, users: &[User]) -> Result<()> {
        self.write_table(TABLE, users_df(users)?)
    }

    /// Persist a new account. The password must already be hashed by the
    /// identity layer; this function never sees plaintext. Fails with
    /// `Conflict` when the username or email (case-insensitive) is taken.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        let username = username.trim().to_string();
        let mut users = self.load_users()?;
        if users.iter().any(|u| u.username == username || u.email == email) {
            return Err(AppError::conflict("user_exists", "user already exists with that email or username"));
        }
        let now = now_ms();
        let user = User {
            id: new_id(),
            username,
            email,
            password_hash: password_hash.to_string(),
            role: Role::User,
            superuser: false,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        self.save_users(&users)?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let users = self.load_users()?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    pub fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        let users = self.load_users()?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    /// Flip the superuser flag on the account with the given email.
    /// Used by the admin tool; fails with `NotFound` for unknown emails.
    pub fn grant_superuser(&self, email: &str) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        let mut users = self.load_users()?;
        let Some(user) = users.iter_mut().find(|u| u.email == email) else {
            return Err(AppError::not_found("user_not_found", "no user with that email"));
        };
        user.superuser = true;
        user.updated_at = now_ms();
        let updated = user.clone();
        self.save_users(&users)?;
        Ok(updated)
    }
}
