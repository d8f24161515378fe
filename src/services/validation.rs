//! Form field rules
//!
//! Every check returns a [`FieldError`] naming the offending field. Checks
//! that normalise their input (names, country codes) return the cleaned value.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());
static NICK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+$").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static COUNTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2}$").unwrap());

pub const USERNAME_MAX: usize = 150;
pub const NICK_MIN: usize = 4;
pub const NICK_MAX: usize = 20;
pub const EMAIL_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 8;
pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 30;
pub const TITLE_MIN: usize = 10;
pub const TITLE_MAX: usize = 300;
pub const ENTRY_MIN: usize = 200;
pub const COMMENT_MIN: usize = 10;
pub const COMMENT_MAX: usize = 400;
pub const BIRTH_YEAR_MIN: i32 = 1930;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type FieldResult<T = ()> = Result<T, FieldError>;

fn is_only_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn required(field: &'static str, value: &str) -> FieldResult {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "This field is required."));
    }
    Ok(())
}

fn length_between(field: &'static str, value: &str, min: usize, max: Option<usize>) -> FieldResult {
    let len = value.chars().count();
    if len < min {
        return Err(FieldError::new(
            field,
            format!("Ensure this value has at least {} characters (it has {}).", min, len),
        ));
    }
    if let Some(max) = max {
        if len > max {
            return Err(FieldError::new(
                field,
                format!("Ensure this value has at most {} characters (it has {}).", max, len),
            ));
        }
    }
    Ok(())
}

fn not_only_digits(field: &'static str, label: &str, value: &str) -> FieldResult {
    if is_only_digits(value) {
        return Err(FieldError::new(field, format!("{} can't be only digit.", label)));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> FieldResult {
    required("username", username)?;
    length_between("username", username, 1, Some(USERNAME_MAX))?;
    if !USERNAME_RE.is_match(username) {
        return Err(FieldError::new(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    not_only_digits("username", "Username", username)
}

pub fn validate_nick(nick: &str) -> FieldResult {
    required("nick", nick)?;
    length_between("nick", nick, NICK_MIN, Some(NICK_MAX))?;
    if !NICK_RE.is_match(nick) {
        return Err(FieldError::new("nick", "Only alphanumeric characters are allowed."));
    }
    not_only_digits("nick", "Nick", nick)
}

pub fn validate_nick_differs(username: &str, nick: &str) -> FieldResult {
    if username == nick {
        return Err(FieldError::new(
            "nick",
            format!("Nick and username can't be same {} != {}", username, nick),
        ));
    }
    Ok(())
}

pub fn validate_email(field: &'static str, email: &str) -> FieldResult {
    required(field, email)?;
    length_between(field, email, 1, Some(EMAIL_MAX))?;
    if !EMAIL_RE.is_match(email) {
        return Err(FieldError::new(field, "Enter a valid email address."));
    }
    Ok(())
}

pub fn validate_email_pair(email1: &str, email2: &str) -> FieldResult {
    validate_email("email1", email1)?;
    if email1 != email2 {
        return Err(FieldError::new("email2", "The two email fields didn't match."));
    }
    Ok(())
}

pub fn validate_password_pair(password1: &str, password2: &str) -> FieldResult {
    if password1 != password2 {
        return Err(FieldError::new(
            "password2",
            "The two password fields didn't match.",
        ));
    }
    if password1.chars().count() < PASSWORD_MIN {
        return Err(FieldError::new(
            "password2",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN
            ),
        ));
    }
    if is_only_digits(password1) {
        return Err(FieldError::new("password2", "This password is entirely numeric."));
    }
    Ok(())
}

/// First letter upper-case, the rest lower-case
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Letters-only personal name; returns it capitalized.
pub fn validate_person_name(field: &'static str, value: &str) -> FieldResult<String> {
    required(field, value)?;
    length_between(field, value, NAME_MIN, Some(NAME_MAX))?;
    if !NAME_RE.is_match(value) {
        return Err(FieldError::new(field, "Only letters are allowed."));
    }
    Ok(capitalize(value))
}

/// Two-letter country code; returns it upper-cased.
pub fn validate_country(country: &str) -> FieldResult<String> {
    if !COUNTRY_RE.is_match(country) {
        return Err(FieldError::new(
            "country",
            "Select a valid choice. Use a two-letter ISO country code.",
        ));
    }
    Ok(country.to_ascii_uppercase())
}

/// Birth year must fall between 1930 and four years before `today`.
pub fn validate_birth_date(date_birth: NaiveDate, today: NaiveDate) -> FieldResult {
    let latest = today.year() - 4;
    if date_birth.year() < BIRTH_YEAR_MIN || date_birth.year() > latest {
        return Err(FieldError::new(
            "date_birth",
            format!("Year of birth must be between {} and {}.", BIRTH_YEAR_MIN, latest),
        ));
    }
    Ok(())
}

pub fn validate_article_title(title: &str) -> FieldResult {
    required("title", title)?;
    length_between("title", title, TITLE_MIN, Some(TITLE_MAX))?;
    not_only_digits("title", "Title", title)
}

pub fn validate_article_entry(entry: &str) -> FieldResult {
    required("entry", entry)?;
    length_between("entry", entry, ENTRY_MIN, None)?;
    not_only_digits("entry", "Entry", entry)
}

pub fn validate_comment_content(content: &str) -> FieldResult {
    required("content", content)?;
    length_between("content", content, COMMENT_MIN, Some(COMMENT_MAX))?;
    not_only_digits("content", "Comment", content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("john.doe+1@x").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert_eq!(
            validate_username("12345").unwrap_err().message,
            "Username can't be only digit."
        );
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_nick_rules() {
        assert!(validate_nick("abc1").is_ok());
        assert!(validate_nick("abc").is_err());
        assert!(validate_nick(&"a".repeat(21)).is_err());
        assert!(validate_nick("nick_name").is_err());
        assert_eq!(validate_nick("123456").unwrap_err().message, "Nick can't be only digit.");
    }

    #[test]
    fn test_nick_must_differ_from_username() {
        assert!(validate_nick_differs("john", "johnny").is_ok());
        let err = validate_nick_differs("john", "john").unwrap_err();
        assert_eq!(err.field, "nick");
        assert_eq!(err.message, "Nick and username can't be same john != john");
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("email", "a@b.co").is_ok());
        assert!(validate_email("email", "nope").is_err());
        assert!(validate_email("email", &format!("{}@b.co", "a".repeat(100))).is_err());
        assert_eq!(
            validate_email_pair("a@b.co", "c@d.co").unwrap_err().message,
            "The two email fields didn't match."
        );
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password_pair("s3cretpass", "s3cretpass").is_ok());
        assert_eq!(
            validate_password_pair("s3cretpass", "other").unwrap_err().message,
            "The two password fields didn't match."
        );
        assert!(validate_password_pair("short", "short").is_err());
        assert!(validate_password_pair("12345678", "12345678").is_err());
    }

    #[test]
    fn test_person_name_is_capitalized() {
        assert_eq!(validate_person_name("first_name", "aNNA").unwrap(), "Anna");
        assert!(validate_person_name("first_name", "Al").is_err());
        assert!(validate_person_name("first_name", "Anna-Maria").is_err());
        assert!(validate_person_name("last_name", &"a".repeat(31)).is_err());
    }

    #[test]
    fn test_country_code() {
        assert_eq!(validate_country("pl").unwrap(), "PL");
        assert!(validate_country("POL").is_err());
        assert!(validate_country("P1").is_err());
    }

    #[test]
    fn test_birth_year_window() {
        let today = date(2024, 6, 1);
        assert!(validate_birth_date(date(1930, 1, 1), today).is_ok());
        assert!(validate_birth_date(date(2020, 12, 31), today).is_ok());
        assert!(validate_birth_date(date(1929, 12, 31), today).is_err());
        assert!(validate_birth_date(date(2021, 1, 1), today).is_err());
    }

    #[test]
    fn test_article_and_comment_lengths() {
        assert!(validate_article_title("Ten chars!").is_ok());
        assert!(validate_article_title("Too short").is_err());
        assert!(validate_article_title(&"1".repeat(20)).is_err());
        assert!(validate_article_title(&"t".repeat(301)).is_err());

        assert!(validate_article_entry(&"e".repeat(200)).is_ok());
        assert!(validate_article_entry(&"e".repeat(199)).is_err());
        assert!(validate_article_entry(&"9".repeat(250)).is_err());

        assert!(validate_comment_content("ten chars.").is_ok());
        assert!(validate_comment_content("too short").is_err());
        assert!(validate_comment_content(&"c".repeat(401)).is_err());
        assert!(validate_comment_content("12345678901").is_err());
    }

    proptest! {
        #[test]
        fn capitalize_matches_ascii_rule(name in "[a-zA-Z]{1,30}") {
            let result = capitalize(&name);
            let mut chars = result.chars();
            prop_assert!(chars.next().unwrap().is_ascii_uppercase());
            prop_assert!(chars.all(|c| c.is_ascii_lowercase()));
            prop_assert_eq!(result.to_lowercase(), name.to_lowercase());
        }

        #[test]
        fn digit_only_titles_always_rejected(title in "[0-9]{10,300}") {
            prop_assert!(validate_article_title(&title).is_err());
        }
    }
}
