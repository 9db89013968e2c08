//! Input validation performed before any network call

use crate::error::ValidationError;
use crate::models::Movie;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_WORDS: usize = 50;
pub const MAX_WORDS: usize = 500;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_DISPLAY_NAME_LEN: usize = 2;
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Whitespace-separated word count
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

pub fn validate_word_count(content: &str) -> Result<usize, ValidationError> {
    let count = word_count(content);
    if (MIN_WORDS..=MAX_WORDS).contains(&count) {
        Ok(count)
    } else {
        Err(ValidationError::WordCount {
            count,
            min: MIN_WORDS,
            max: MAX_WORDS,
        })
    }
}

/// A publishable submission: a selected movie and an ending of valid length
pub fn validate_submission(movie: Option<&Movie>, content: &str) -> Result<(), ValidationError> {
    if movie.is_none() {
        return Err(ValidationError::MissingMovie);
    }
    validate_word_count(content)?;
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::Email)
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        })
    }
}

pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if len < MIN_DISPLAY_NAME_LEN {
        return Err(ValidationError::DisplayNameTooShort {
            min: MIN_DISPLAY_NAME_LEN,
        });
    }
    if len > MAX_DISPLAY_NAME_LEN {
        return Err(ValidationError::DisplayNameTooLong {
            max: MAX_DISPLAY_NAME_LEN,
        });
    }
    Ok(())
}

/// Sign-in checks email then password; sign-up also checks the display name
pub fn validate_credentials(
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_password(password)?;
    if let Some(name) = display_name {
        validate_display_name(name)?;
    }
    Ok(())
}
