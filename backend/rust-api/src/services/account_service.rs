use std::collections::BTreeMap;

use anyhow::{Context, Result};
use bcrypt::{hash, verify};

use crate::{
    config::AccountSettings,
    models::user::{Account, UserRole},
};

pub const TRAINER_USERNAME: &str = "trainer";

/// The fixed set of tutor accounts. Passwords come from configuration and are
/// only kept as bcrypt hashes.
pub struct AccountRegistry {
    accounts: BTreeMap<String, Account>,
}

impl AccountRegistry {
    pub fn from_settings(settings: &AccountSettings) -> Result<Self> {
        let mut accounts = BTreeMap::new();

        accounts.insert(
            TRAINER_USERNAME.to_string(),
            Account {
                username: TRAINER_USERNAME.to_string(),
                role: UserRole::Trainer,
                password_hash: hash(&settings.trainer_password, settings.bcrypt_cost)
                    .context("Failed to hash trainer password")?,
                lab_id: None,
            },
        );

        for (index, password) in settings.student_passwords.iter().enumerate() {
            let lab_id = index as u32 + 1;
            let username = student_username(lab_id);
            let password_hash = hash(password, settings.bcrypt_cost)
                .with_context(|| format!("Failed to hash password for {}", username))?;
            accounts.insert(
                username.clone(),
                Account {
                    username,
                    role: UserRole::Student,
                    password_hash,
                    lab_id: Some(lab_id),
                },
            );
        }

        tracing::info!(
            "Account registry ready: {} trainer, {} students",
            1,
            settings.student_passwords.len()
        );

        Ok(Self { accounts })
    }

    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn usernames(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }

    /// Returns the account when the credentials match, `None` otherwise.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<&Account>> {
        let Some(account) = self.accounts.get(username) else {
            return Ok(None);
        };

        let valid =
            verify(password, &account.password_hash).context("Failed to verify password")?;

        Ok(valid.then_some(account))
    }
}

pub fn student_username(lab_id: u32) -> String {
    format!("student{:02}", lab_id)
}
