use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, User};

const MAX_FIELD_LEN: usize = 255;

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub fn register(&self, email: &str, name: &str) -> Result<User, DomainError> {
        let user = self.repo.create(validate_registration(email, name)?)?;
        log::info!("User {} registered", user.id);
        Ok(user)
    }
}

/// `local@domain.tld` with no whitespace and a single `@`.
fn is_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let labels_ok = domain
        .rsplit_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());
    !local.is_empty() && !domain.contains('@') && labels_ok && !email.contains(char::is_whitespace)
}

pub fn validate_registration(email: &str, name: &str) -> Result<NewUser, DomainError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(DomainError::validation("email", "email is required"));
    }
    if email.len() > MAX_FIELD_LEN || !is_email(email) {
        return Err(DomainError::validation("email", "invalid email format"));
    }

    let name = name.trim();
    let name_len = name.chars().count();
    if name_len == 0 || name_len > MAX_FIELD_LEN {
        return Err(DomainError::validation(
            "name",
            format!("name must be 1 to {MAX_FIELD_LEN} characters"),
        ));
    }

    Ok(NewUser {
        email: email.to_string(),
        name: name.to_string(),
    })
}
