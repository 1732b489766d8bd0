use crate::entities::{review, user};

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub admin: bool,
}

#[derive(Clone, Debug)]
pub struct NewMovie {
    pub poster: String,
    pub title: String,
    pub description: String,
    pub classification: String,
    pub color: String,
    pub season: String,
}

#[derive(Clone, Debug)]
pub struct NewReview {
    pub content: String,
    pub user_id: i32,
    pub movie_id: i32,
}

#[derive(Clone, Debug)]
pub struct ReviewWithAuthor {
    pub review: review::Model,
    pub author: Option<user::Model>,
}

impl ReviewWithAuthor {
    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|u| u.username.as_str()).unwrap_or("unknown")
    }
}
