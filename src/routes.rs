use axum::{
    extract::{Form, Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;

use crate::{
    AppState,
    entities::user,
    error::{AppError, AppResult},
    forms::{AddMovieForm, FormErrors, LoginForm, RegisterForm},
    models::NewMovie,
    session::{self, Identity, RequireAdmin, RequireUser},
    templates,
};

fn landing_for(user: &user::Model) -> &'static str {
    if user.admin { "/admin" } else { "/movies" }
}

pub async fn home(identity: Identity) -> Html<String> {
    Html(templates::home_page(identity.user()))
}

pub async fn register_form() -> Html<String> {
    Html(templates::register_page(&RegisterForm::default(), &FormErrors::default()))
}

pub async fn register(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let registration = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => return Ok(Html(templates::register_page(&form, &errors)).into_response()),
    };

    let user = state
        .repo
        .register_user(state.config.admin_policy, registration.username, registration.password)
        .await?;
    tracing::info!(user_id = user.id, username = %user.username, admin = user.admin, "user registered");

    let jar = session::login(jar, &user);
    Ok((jar, Redirect::to(landing_for(&user))).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

pub async fn login_form(Query(q): Query<NextQuery>) -> Html<String> {
    let form = LoginForm { next: q.next, ..Default::default() };
    Html(templates::login_page(&form, &FormErrors::default()))
}

pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let credentials = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => return Ok(Html(templates::login_page(&form, &errors)).into_response()),
    };

    let user = state.repo.find_user_by_username(&credentials.username).await?;
    // Stored passwords are plaintext and compared as-is.
    let Some(user) = user.filter(|u| u.password == credentials.password) else {
        tracing::info!(username = %credentials.username, "login rejected");
        return Ok(Html(templates::login_page(&form, &FormErrors::default())).into_response());
    };

    let target = session::safe_next(form.next.as_deref())
        .unwrap_or_else(|| landing_for(&user))
        .to_string();
    let jar = session::login(jar, &user);
    Ok((jar, Redirect::to(&target)).into_response())
}

pub async fn logout(jar: SignedCookieJar) -> impl IntoResponse {
    (session::logout(jar), Redirect::to("/"))
}

pub async fn admin(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
) -> AppResult<Html<String>> {
    let movies = state.repo.list_movies().await?;
    Ok(Html(templates::add_movie_page(
        &user,
        &AddMovieForm::default(),
        &FormErrors::default(),
        Some(&movies),
    )))
}

pub async fn add_movie_form(RequireAdmin(user): RequireAdmin) -> Html<String> {
    Html(templates::add_movie_page(&user, &AddMovieForm::default(), &FormErrors::default(), None))
}

pub async fn add_movie(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = AddMovieForm::from_multipart(multipart).await?;
    let submission = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => {
            return Ok(Html(templates::add_movie_page(&user, &form, &errors, None)).into_response());
        }
    };

    let poster = state.blobs.save(submission.poster.bytes, &submission.poster.filename).await?;
    let inserted = state
        .repo
        .insert_movie(NewMovie {
            poster: poster.clone(),
            title: submission.title,
            description: submission.description,
            classification: submission.classification,
            color: submission.color,
            season: submission.season,
        })
        .await;
    let movie = match inserted {
        Ok(movie) => movie,
        Err(err) => {
            // The row never landed, so the poster has no owner.
            if let Err(cleanup) = state.blobs.remove(&poster).await {
                tracing::warn!(%poster, error = %cleanup, "could not remove orphaned poster");
            }
            return Err(err);
        }
    };
    tracing::info!(movie_id = movie.id, title = %movie.title, poster = %movie.poster, "movie added");

    Ok(Redirect::to("/movies").into_response())
}

pub async fn user_home(RequireUser(_): RequireUser) -> Redirect {
    Redirect::to("/movies")
}

pub async fn movies(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> AppResult<Html<String>> {
    let movies = state.repo.list_movies().await?;
    Ok(Html(templates::movies_page(&user, &movies)))
}

pub async fn movie(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let id: i32 = id.parse().map_err(|_| AppError::NotFound)?;
    let movie = state.repo.find_movie_by_id(id).await?.ok_or(AppError::NotFound)?;
    let reviews = state.repo.reviews_for_movie(movie.id).await?;
    Ok(Html(templates::movie_page(&user, &movie, &reviews)))
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
