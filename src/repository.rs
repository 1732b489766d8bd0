use anyhow::anyhow;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement, Value,
};

use crate::{
    config::AdminPolicy,
    entities::{movie, review, user},
    error::AppResult,
    models::{NewMovie, NewReview, NewUser, ReviewWithAuthor},
};

/// Query functions over the catalog tables. Lookups return `Ok(None)` when
/// nothing matches; constraint violations come back as errors.
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_user_by_id(&self, id: i32) -> AppResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_user_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        Ok(found)
    }

    #[cfg(test)]
    pub async fn count_users(&self) -> AppResult<u64> {
        use sea_orm::PaginatorTrait;
        Ok(user::Entity::find().count(&self.db).await?)
    }

    /// Creates a self-registered account. Under `FirstUser` the admin flag is
    /// decided inside the insert itself, so concurrent sign-ups cannot both
    /// see an empty table.
    pub async fn register_user(
        &self,
        policy: AdminPolicy,
        username: String,
        password: String,
    ) -> AppResult<user::Model> {
        if policy == AdminPolicy::Everyone {
            return self.insert_user(NewUser { username, password, admin: true }).await;
        }

        let created = user::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                r#"INSERT INTO "user" (username, password, admin)
                   VALUES (?, ?, NOT EXISTS (SELECT 1 FROM "user"))
                   RETURNING id, username, password, admin"#,
                [Value::from(username), Value::from(password)],
            ))
            .one(&self.db)
            .await?;
        created.ok_or_else(|| anyhow!("insert into user returned no row").into())
    }

    pub async fn list_movies(&self) -> AppResult<Vec<movie::Model>> {
        let movies = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(movies)
    }

    pub async fn find_movie_by_id(&self, id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn insert_movie(&self, new: NewMovie) -> AppResult<movie::Model> {
        let model = movie::ActiveModel {
            id: Default::default(),
            poster: Set(new.poster),
            title: Set(new.title),
            description: Set(new.description),
            classification: Set(new.classification),
            color: Set(new.color),
            season: Set(new.season),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn insert_review(&self, new: NewReview) -> AppResult<review::Model> {
        let model = review::ActiveModel {
            id: Default::default(),
            content: Set(new.content),
            user_id: Set(new.user_id),
            movie_id: Set(new.movie_id),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn reviews_for_movie(&self, movie_id: i32) -> AppResult<Vec<ReviewWithAuthor>> {
        let rows = review::Entity::find()
            .filter(review::Column::MovieId.eq(movie_id))
            .order_by_asc(review::Column::Id)
            .find_also_related(user::Entity)
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(|(review, author)| ReviewWithAuthor { review, author }).collect())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;

    async fn create_test_repository() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("test.db").display());
        let db = crate::db::connect_and_migrate(&db_url).await.unwrap();
        (Repository::new(db), temp_dir)
    }

    fn new_user(name: &str) -> NewUser {
        NewUser { username: name.to_string(), password: "secret".to_string(), admin: false }
    }

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            poster: "movie/poster.jpg".to_string(),
            title: title.to_string(),
            description: "A long description".to_string(),
            classification: "PG".to_string(),
            color: "black".to_string(),
            season: "winter".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_lookup_by_id_and_username() {
        let (repo, _dir) = create_test_repository().await;

        let created = repo.insert_user(new_user("alice")).await.unwrap();
        assert!(created.id > 0);
        assert!(!created.admin);

        let by_name = repo.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name, created);
        let by_id = repo.find_user_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(repo.find_user_by_username("bob").await.unwrap().is_none());
        assert!(repo.find_user_by_id(created.id + 100).await.unwrap().is_none());
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected_by_storage() {
        let (repo, _dir) = create_test_repository().await;

        repo.insert_user(new_user("alice")).await.unwrap();
        let err = repo.insert_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "unexpected error: {err:?}");
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_user_applies_admin_policy() {
        let (repo, _dir) = create_test_repository().await;

        let first = repo.register_user(AdminPolicy::FirstUser, "ripley".into(), "pw".into()).await.unwrap();
        let second = repo.register_user(AdminPolicy::FirstUser, "hicks".into(), "pw".into()).await.unwrap();
        let third = repo.register_user(AdminPolicy::Everyone, "bishop".into(), "pw".into()).await.unwrap();
        assert!(first.admin);
        assert!(!second.admin);
        assert!(third.admin);
        assert_eq!(repo.find_user_by_username("hicks").await.unwrap().unwrap(), second);

        let err = repo
            .register_user(AdminPolicy::FirstUser, "ripley".into(), "again".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_concurrent_first_user_registrations_promote_exactly_one() {
        let (repo, _dir) = create_test_repository().await;

        let signups = (0..16).map(|i| {
            let repo = repo.clone();
            async move { repo.register_user(AdminPolicy::FirstUser, format!("user{i}"), "pw".into()).await }
        });
        let results = futures::future::join_all(signups).await;
        assert!(results.iter().all(Result::is_ok), "registration failed: {results:?}");

        let admins = user::Entity::find()
            .filter(user::Column::Admin.eq(true))
            .count(&repo.db)
            .await
            .unwrap();
        assert_eq!(admins, 1);
        assert_eq!(repo.count_users().await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_movies_are_listed_in_insertion_order() {
        let (repo, _dir) = create_test_repository().await;

        assert!(repo.list_movies().await.unwrap().is_empty());
        let first = repo.insert_movie(new_movie("Alien")).await.unwrap();
        let second = repo.insert_movie(new_movie("Brazil")).await.unwrap();

        let titles: Vec<_> =
            repo.list_movies().await.unwrap().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, ["Alien", "Brazil"]);

        let found = repo.find_movie_by_id(second.id).await.unwrap().unwrap();
        assert_eq!(found, second);
        assert!(repo.find_movie_by_id(first.id + second.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reviews_carry_their_author() {
        let (repo, _dir) = create_test_repository().await;

        let user = repo.insert_user(new_user("critic")).await.unwrap();
        let movie = repo.insert_movie(new_movie("Heat")).await.unwrap();
        let other = repo.insert_movie(new_movie("Ran")).await.unwrap();

        repo.insert_review(NewReview {
            content: "Tense.".to_string(),
            user_id: user.id,
            movie_id: movie.id,
        })
        .await
        .unwrap();

        let reviews = repo.reviews_for_movie(movie.id).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].review.content, "Tense.");
        assert_eq!(reviews[0].author_name(), "critic");
        assert!(repo.reviews_for_movie(other.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_requires_existing_user_and_movie() {
        let (repo, _dir) = create_test_repository().await;

        let user = repo.insert_user(new_user("critic")).await.unwrap();
        let movie = repo.insert_movie(new_movie("Heat")).await.unwrap();

        let missing_movie = repo
            .insert_review(NewReview {
                content: "?".to_string(),
                user_id: user.id,
                movie_id: movie.id + 1,
            })
            .await;
        assert!(missing_movie.is_err());

        let missing_user = repo
            .insert_review(NewReview {
                content: "?".to_string(),
                user_id: user.id + 1,
                movie_id: movie.id,
            })
            .await;
        assert!(missing_user.is_err());
    }
}
