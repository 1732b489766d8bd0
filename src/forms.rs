use axum::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;

use crate::{blob::secure_filename, error::AppResult};

const REQUIRED: &str = "This field is required.";
const USERNAME_MIN: usize = 2;
const USERNAME_MAX: usize = 20;

/// Field-level messages collected while validating a form, in field order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<(&'static str, String)>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter().filter(move |(f, _)| *f == field).map(|(_, m)| m.as_str())
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|(f, _)| *f == field)
    }

    fn into_result<T>(self, valid: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(valid()) } else { Err(self) }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Required check; returns false when later checks on the field should be skipped.
fn require(errors: &mut FormErrors, field: &'static str, value: &str) -> bool {
    if is_blank(value) {
        errors.add(field, REQUIRED);
        return false;
    }
    true
}

fn check_username(errors: &mut FormErrors, value: &str) {
    if !require(errors, "username", value) {
        return;
    }
    let len = value.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        errors.add(
            "username",
            format!("Field must be between {USERNAME_MIN} and {USERNAME_MAX} characters long."),
        );
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub username: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::default();
        check_username(&mut errors, &self.username);
        require(&mut errors, "password", &self.password);
        if require(&mut errors, "confirm_password", &self.confirm_password)
            && self.confirm_password != self.password
        {
            errors.add("confirm_password", "Field must be equal to password.");
        }

        errors.into_result(|| Registration {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FormErrors> {
        let mut errors = FormErrors::default();
        check_username(&mut errors, &self.username);
        require(&mut errors, "password", &self.password);

        errors.into_result(|| Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct PosterUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Raw add-movie submission as read off a multipart body.
#[derive(Clone, Debug, Default)]
pub struct AddMovieForm {
    pub poster: Option<PosterUpload>,
    pub title: String,
    pub description: String,
    pub classification: String,
    pub season: String,
    pub color: String,
}

#[derive(Clone, Debug)]
pub struct MovieSubmission {
    pub poster: PosterUpload,
    pub title: String,
    pub description: String,
    pub classification: String,
    pub season: String,
    pub color: String,
}

impl AddMovieForm {
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "poster" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    if !filename.is_empty() && !bytes.is_empty() {
                        form.poster = Some(PosterUpload { filename, bytes });
                    }
                }
                "title" => form.title = field.text().await?,
                "description" => form.description = field.text().await?,
                "classification" => form.classification = field.text().await?,
                "season" => form.season = field.text().await?,
                "color" => form.color = field.text().await?,
                _ => {}
            }
        }
        Ok(form)
    }

    pub fn validate(&self) -> Result<MovieSubmission, FormErrors> {
        let mut errors = FormErrors::default();
        match &self.poster {
            None => errors.add("poster", REQUIRED),
            Some(upload) if secure_filename(&upload.filename).is_empty() => {
                errors.add("poster", "Invalid file name.")
            }
            Some(_) => {}
        }
        require(&mut errors, "title", &self.title);
        require(&mut errors, "description", &self.description);
        require(&mut errors, "classification", &self.classification);
        require(&mut errors, "season", &self.season);
        require(&mut errors, "color", &self.color);

        let Some(poster) = self.poster.clone().filter(|_| errors.is_empty()) else {
            return Err(errors);
        };
        Ok(MovieSubmission {
            poster,
            title: self.title.clone(),
            description: self.description.clone(),
            classification: self.classification.clone(),
            season: self.season.clone(),
            color: self.color.clone(),
        })
    }
}
