use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::{
    entities::{movie, user},
    forms::{AddMovieForm, FormErrors, LoginForm, RegisterForm},
    models::ReviewWithAuthor,
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

const INPUT_CLASS: &str = "mt-2 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";
const INPUT_ERROR_CLASS: &str = "mt-2 w-full rounded-md border border-red-500 px-3 py-2 focus:border-red-500 focus:outline-none focus:ring-1 focus:ring-red-500";
const BUTTON_CLASS: &str =
    "w-full rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";

pub fn home_page(current: Option<&user::Model>) -> String {
    page(
        "Marquee",
        current,
        html! {
            div class="max-w-2xl mx-auto px-6 py-12" {
                div class="bg-white shadow rounded-lg p-8" {
                    h1 class="text-3xl font-bold text-gray-900" { "Marquee" }
                    p class="mt-2 text-gray-600" { "Browse the catalog and read what people think." }
                    div class="mt-8 flex gap-4" {
                        @if let Some(user) = current {
                            a class="text-blue-600 hover:text-blue-800" href="/movies" { "Browse movies" }
                            @if user.admin {
                                a class="text-blue-600 hover:text-blue-800" href="/admin" { "Admin" }
                            }
                        } @else {
                            a class="text-blue-600 hover:text-blue-800" href="/login" { "Log in" }
                            a class="text-blue-600 hover:text-blue-800" href="/register" { "Sign up" }
                        }
                    }
                }
            }
        },
    )
}

pub fn register_page(form: &RegisterForm, errors: &FormErrors) -> String {
    page(
        "Sign Up",
        None,
        card(html! {
            h1 class="text-2xl font-bold text-gray-900" { "Sign Up" }
            form class="mt-8 space-y-6" method="post" action="/register" {
                (text_input("username", "Username", "text", &form.username, errors))
                (text_input("password", "Password", "password", "", errors))
                (text_input("confirm_password", "Confirm Password", "password", "", errors))
                button class=(BUTTON_CLASS) type="submit" { "Sign Up" }
            }
            p class="mt-4 text-sm text-gray-600" {
                "Already registered? " a class="text-blue-600" href="/login" { "Log in" }
            }
        }),
    )
}

pub fn login_page(form: &LoginForm, errors: &FormErrors) -> String {
    page(
        "Log In",
        None,
        card(html! {
            h1 class="text-2xl font-bold text-gray-900" { "Log In" }
            form class="mt-8 space-y-6" method="post" action="/login" {
                @if let Some(next) = &form.next {
                    input type="hidden" name="next" value=(next);
                }
                (text_input("username", "Username", "text", &form.username, errors))
                (text_input("password", "Password", "password", "", errors))
                button class=(BUTTON_CLASS) type="submit" { "Log In" }
            }
            p class="mt-4 text-sm text-gray-600" {
                "New here? " a class="text-blue-600" href="/register" { "Sign up" }
            }
        }),
    )
}

/// Admin dashboard: the add-movie form, plus the catalog when `movies` is given.
pub fn add_movie_page(
    current: &user::Model,
    form: &AddMovieForm,
    errors: &FormErrors,
    movies: Option<&[movie::Model]>,
) -> String {
    page(
        "Add Movie",
        Some(current),
        html! {
            div class="max-w-4xl mx-auto px-6 py-10 space-y-10" {
                div class="bg-white shadow rounded-lg p-8" {
                    h1 class="text-2xl font-bold text-gray-900" { "Add Movie" }
                    form class="mt-8 space-y-6" method="post" action="/admin/add_movie" enctype="multipart/form-data" {
                        div {
                            label class="block text-sm font-medium text-gray-700" for="poster" { "Movie Poster" }
                            input class=(input_class("poster", errors)) type="file" name="poster" id="poster" accept="image/*";
                            (field_errors("poster", errors))
                        }
                        (text_input("title", "Title", "text", &form.title, errors))
                        div {
                            label class="block text-sm font-medium text-gray-700" for="description" { "Description" }
                            textarea class=(input_class("description", errors)) name="description" id="description" rows="5" { (form.description) }
                            (field_errors("description", errors))
                        }
                        (text_input("classification", "Classification", "text", &form.classification, errors))
                        (text_input("season", "Season", "text", &form.season, errors))
                        (text_input("color", "Color", "text", &form.color, errors))
                        button class=(BUTTON_CLASS) type="submit" { "Add Movie" }
                    }
                }

                @if let Some(movies) = movies {
                    div {
                        h2 class="text-xl font-semibold text-gray-900" { "Catalog" }
                        (movie_grid(movies))
                    }
                }
            }
        },
    )
}

pub fn movies_page(current: &user::Model, movies: &[movie::Model]) -> String {
    page(
        "Movies",
        Some(current),
        html! {
            div class="max-w-4xl mx-auto px-6 py-10" {
                h1 class="text-3xl font-bold text-gray-900" { "All movies" }
                (movie_grid(movies))
            }
        },
    )
}

pub fn movie_page(current: &user::Model, movie: &movie::Model, reviews: &[ReviewWithAuthor]) -> String {
    page(
        &movie.title,
        Some(current),
        html! {
            div class="max-w-4xl mx-auto px-6 py-10" {
                div class="bg-white shadow rounded-lg p-6 md:flex gap-8" {
                    img class="w-48 rounded" src=(poster_url(movie)) alt=(movie.title);
                    div {
                        h1 class="text-3xl font-bold text-gray-900" { (movie.title) }
                        dl class="mt-4 grid grid-cols-2 gap-2 text-sm text-gray-700" {
                            dt class="font-medium" { "Classification" } dd { (movie.classification) }
                            dt class="font-medium" { "Season" } dd { (movie.season) }
                            dt class="font-medium" { "Color" } dd { (movie.color) }
                        }
                        p class="mt-4 text-gray-700 whitespace-pre-line" { (movie.description) }
                    }
                }

                h2 class="mt-10 text-xl font-semibold text-gray-900" { "Reviews" }
                @if reviews.is_empty() {
                    p class="mt-2 text-gray-500" { "No reviews yet." }
                } @else {
                    ul class="mt-4 space-y-3" {
                        @for entry in reviews {
                            li class="bg-white shadow rounded-lg p-4" {
                                p class="text-gray-800" { (entry.review.content) }
                                p class="mt-1 text-xs text-gray-500" { "by " (entry.author_name()) }
                            }
                        }
                    }
                }
                a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/movies" { "Back to movies" }
            }
        },
    )
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    page(
        "Error",
        None,
        card(html! {
            h1 class="text-2xl font-bold text-gray-900" { (status.as_u16()) " " (status.canonical_reason().unwrap_or("Error")) }
            p class="mt-4 text-gray-700" { (message) }
            a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
        }),
    )
}

fn page(title: &str, current: Option<&user::Model>, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" {
                nav class="bg-white shadow" {
                    div class="max-w-4xl mx-auto px-6 py-3 flex items-center justify-between" {
                        a class="font-bold text-gray-900" href="/" { "Marquee" }
                        div class="flex gap-4 text-sm" {
                            @if let Some(user) = current {
                                span class="text-gray-500" { (user.username) }
                                a class="text-blue-600" href="/movies" { "Movies" }
                                a class="text-blue-600" href="/logout" { "Log out" }
                            }
                        }
                    }
                }
                (body)
            }
        }
    }
    .into_string()
}

fn card(inner: Markup) -> Markup {
    html! {
        div class="max-w-xl mx-auto px-6 py-12" {
            div class="bg-white shadow rounded-lg p-8" { (inner) }
        }
    }
}

fn text_input(name: &str, label: &str, kind: &str, value: &str, errors: &FormErrors) -> Markup {
    html! {
        div {
            label class="block text-sm font-medium text-gray-700" for=(name) { (label) }
            input class=(input_class(name, errors)) type=(kind) name=(name) id=(name) value=(value);
            (field_errors(name, errors))
        }
    }
}

fn input_class(name: &str, errors: &FormErrors) -> &'static str {
    if errors.has(name) { INPUT_ERROR_CLASS } else { INPUT_CLASS }
}

fn field_errors(name: &str, errors: &FormErrors) -> Markup {
    html! {
        @for message in errors.for_field(name) {
            p class="mt-1 text-sm text-red-600" { (message) }
        }
    }
}

fn movie_grid(movies: &[movie::Model]) -> Markup {
    html! {
        @if movies.is_empty() {
            p class="mt-4 text-gray-600" { "No movies yet." }
        } @else {
            div class="mt-4 grid gap-4 sm:grid-cols-2 md:grid-cols-3" {
                @for movie in movies {
                    a class="block bg-white shadow rounded-lg p-4 hover:shadow-md" href=(format!("/movie/{}", movie.id)) {
                        img class="w-full rounded" src=(poster_url(movie)) alt=(movie.title);
                        h3 class="mt-2 font-semibold text-gray-900" { (movie.title) }
                        p class="text-sm text-gray-500" { (movie.classification) " · " (movie.season) }
                    }
                }
            }
        }
    }
}

fn poster_url(movie: &movie::Model) -> String {
    format!("/static/{}", movie.poster.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_with_errors_are_highlighted() {
        let form = RegisterForm { username: "r".into(), ..Default::default() };
        let clean = register_page(&form, &FormErrors::default());
        assert!(!clean.contains("border-red-500"));

        let mut errors = FormErrors::default();
        errors.add("username", "Field must be between 2 and 20 characters long.");
        let flagged = register_page(&form, &errors);
        assert_eq!(flagged.matches("border-red-500").count(), 1);
        assert!(flagged.contains("Field must be between 2 and 20 characters long."));
    }
}
