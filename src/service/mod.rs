pub mod film;
pub mod user;

pub use film::FilmService;
pub use user::UserService;

use chrono::{Local, NaiveDate};

fn today() -> NaiveDate {
    Local::now().date_naive()
}
