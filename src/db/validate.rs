use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::model::{DbError, DbResult, Film, User};

pub const MAX_DESCRIPTION_LEN: usize = 200;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

/// Earliest acceptable release date: the first public film screening.
pub fn cinema_birthday() -> NaiveDate {
    NaiveDate::from_ymd_opt(1895, 12, 28).unwrap_or(NaiveDate::MIN)
}

pub fn validate_film(film: &Film, today: NaiveDate) -> DbResult<()> {
    if film.name.trim().is_empty() {
        return Err(DbError::validation("film name must not be blank"));
    }
    if film.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DbError::validation(format!(
            "film description must not exceed {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    if film.release_date < cinema_birthday() {
        return Err(DbError::validation(
            "release date must not be earlier than 1895-12-28",
        ));
    }
    if film.release_date > today {
        return Err(DbError::validation("release date must not be in the future"));
    }
    if film.duration <= 0 {
        return Err(DbError::validation("film duration must be positive"));
    }
    Ok(())
}

/// Checks a user and fills in a blank name from the login.
pub fn normalize_user(user: &mut User, today: NaiveDate) -> DbResult<()> {
    if user.login.trim().is_empty() {
        return Err(DbError::validation("login must not be blank"));
    }
    if user.login.chars().any(char::is_whitespace) {
        return Err(DbError::validation("login must not contain whitespace"));
    }
    if user.email.trim().is_empty() {
        return Err(DbError::validation("email must not be blank"));
    }
    if !EMAIL_RE.is_match(&user.email) {
        return Err(DbError::validation(format!(
            "malformed email address: {}",
            user.email
        )));
    }
    if user.birthday > today {
        return Err(DbError::validation("birthday must not be in the future"));
    }
    if user.name.trim().is_empty() {
        user.name = user.login.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::model::RatingMpa;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn film() -> Film {
        Film {
            id: 0,
            name: "Nosferatu".to_string(),
            description: "A symphony of horror".to_string(),
            release_date: NaiveDate::from_ymd_opt(1922, 3, 4).unwrap(),
            duration: 5640,
            mpa: RatingMpa { id: 4, name: String::new() },
            genres: vec![],
            likes: Default::default(),
        }
    }

    fn user() -> User {
        User {
            id: 0,
            login: "dolores".to_string(),
            name: String::new(),
            email: "dolores@example.com".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            friends: Default::default(),
        }
    }

    fn is_validation(res: DbResult<()>) -> bool {
        matches!(res, Err(DbError::Validation(_)))
    }

    #[test]
    fn test_valid_film() {
        assert!(validate_film(&film(), today()).is_ok());
    }

    #[test]
    fn test_release_date_bounds() {
        let mut f = film();
        f.release_date = NaiveDate::from_ymd_opt(1895, 12, 27).unwrap();
        assert!(is_validation(validate_film(&f, today())));

        f.release_date = cinema_birthday();
        assert!(validate_film(&f, today()).is_ok());

        f.release_date = today().succ_opt().unwrap();
        assert!(is_validation(validate_film(&f, today())));

        f.release_date = today();
        assert!(validate_film(&f, today()).is_ok());
    }

    #[test]
    fn test_film_fields() {
        let mut f = film();
        f.duration = 0;
        assert!(is_validation(validate_film(&f, today())));

        let mut f = film();
        f.name = "   ".to_string();
        assert!(is_validation(validate_film(&f, today())));

        let mut f = film();
        f.description = "ж".repeat(200);
        assert!(validate_film(&f, today()).is_ok());
        f.description.push('ж');
        assert!(is_validation(validate_film(&f, today())));
    }

    #[test]
    fn test_blank_name_defaults_to_login() {
        let mut u = user();
        normalize_user(&mut u, today()).unwrap();
        assert_eq!(u.name, "dolores");

        let mut u = user();
        u.name = "Dolores Haze".to_string();
        normalize_user(&mut u, today()).unwrap();
        assert_eq!(u.name, "Dolores Haze");
    }

    #[test]
    fn test_email_without_dotted_domain() {
        let mut u = user();
        u.email = "mail@localhost".to_string();
        assert!(normalize_user(&mut u, today()).is_ok());
    }

    #[test]
    fn test_user_rejections() {
        let mut u = user();
        u.login = "dolores haze".to_string();
        assert!(is_validation(normalize_user(&mut u, today())));

        let mut u = user();
        u.login = String::new();
        assert!(is_validation(normalize_user(&mut u, today())));

        let mut u = user();
        u.email = "dolores.example.com".to_string();
        assert!(is_validation(normalize_user(&mut u, today())));

        let mut u = user();
        u.email = "dolores@home@example.com".to_string();
        assert!(is_validation(normalize_user(&mut u, today())));

        let mut u = user();
        u.email = " ".to_string();
        assert!(is_validation(normalize_user(&mut u, today())));

        let mut u = user();
        u.birthday = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(is_validation(normalize_user(&mut u, today())));
    }
}
