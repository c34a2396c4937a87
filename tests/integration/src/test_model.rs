//! Model facade tests against the in-memory store.

#[cfg(test)]
mod tests {
    use dynaschema_core::{DynaSchemaError, Params, UpdateOptions};
    use dynaschema_model::AttributeValue;

    use crate::memory_db;

    fn post_params(user_id: &str, content: &str) -> Params {
        Params::new()
            .with("userID", user_id)
            .with("content", content)
            .with("createdAt", "2024-03-01T10:00:00Z")
    }

    #[tokio::test]
    async fn test_should_create_user_with_generated_sort_key() {
        let db = memory_db("create");
        db.admin().create_table().await.unwrap();
        let users = db.model("user").unwrap();

        let user = users
            .create(&Params::new().with("username", "a").with("name", "b"))
            .await
            .unwrap();

        assert_eq!(user["pk"], AttributeValue::from("user:"));
        assert_eq!(user["sk"], user["userID"]);
        assert_eq!(user["username"], AttributeValue::from("a"));
        assert_eq!(user["name"], AttributeValue::from("b"));
        assert!(user["age"].is_null());

        let fetched = users.get(user["sk"].clone()).await.unwrap();
        assert_eq!(fetched, Some(user));
    }

    #[tokio::test]
    async fn test_should_compute_derived_fields() {
        let db = memory_db("derived");
        db.admin().create_table().await.unwrap();
        let posts = db.model("post").unwrap();

        let post = posts.create(&post_params("u1", "Hello World")).await.unwrap();
        assert_eq!(post["slug"], AttributeValue::from("hello-world"));
    }

    #[tokio::test]
    async fn test_should_reject_invalid_field_without_writing() {
        let db = memory_db("invalid");
        db.admin().create_table().await.unwrap();
        let posts = db.model("post").unwrap();

        let err = posts
            .create(
                &Params::new()
                    .with("userID", "u1")
                    .with("content", "x")
                    .with("createdAt", "yesterday"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DynaSchemaError::Validation { ref field, .. } if field == "createdAt"
        ));
        assert_eq!(posts.all().await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_should_create_many_in_one_batch() {
        let db = memory_db("batch");
        db.admin().create_table().await.unwrap();
        let posts = db.model("post").unwrap();

        let batch: Vec<Params> = (0..10).map(|i| post_params("u1", &format!("p{i}"))).collect();
        let created = posts.create_many(&batch).await.unwrap();
        assert_eq!(created.len(), 10);
        assert_eq!(posts.all().await.unwrap().count, 10);

        assert!(posts.create_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_should_write_nothing_when_one_batch_element_is_invalid() {
        let db = memory_db("batch-invalid");
        db.admin().create_table().await.unwrap();
        let posts = db.model("post").unwrap();

        let batch = vec![post_params("u1", "ok"), Params::new().with("userID", "u1")];
        assert!(posts.create_many(&batch).await.is_err());
        assert_eq!(posts.all().await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_should_update_keeping_stored_values() {
        let db = memory_db("update");
        db.admin().create_table().await.unwrap();
        let posts = db.model("post").unwrap();

        let post = posts.create(&post_params("u1", "first")).await.unwrap();
        let sk = post["sk"].clone();

        let updated = posts
            .update(
                sk.clone(),
                &Params::new().with("content", "second"),
                UpdateOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated["content"], AttributeValue::from("first"));
        assert_eq!(updated["postID"], post["postID"]);
        assert_eq!(updated["sk"], sk);
        assert_eq!(posts.get(sk).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_should_fail_update_of_missing_item_unless_upsert() {
        let db = memory_db("upsert");
        db.admin().create_table().await.unwrap();
        let posts = db.model("post").unwrap();

        let err = posts
            .update("nope", &post_params("u1", "x"), UpdateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DynaSchemaError::ItemNotFound { .. }));

        let item = posts
            .update("nope", &post_params("u1", "x"), UpdateOptions::upsert())
            .await
            .unwrap();
        assert_eq!(item["sk"], AttributeValue::from("nope"));
        assert_eq!(item["pk"], AttributeValue::from("post:"));
        assert!(posts.get("nope").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_should_delete_item() {
        let db = memory_db("delete");
        db.admin().create_table().await.unwrap();
        let users = db.model("user").unwrap();

        let user = users
            .create(&Params::new().with("username", "a").with("name", "b"))
            .await
            .unwrap();
        users.delete(user["sk"].clone()).await.unwrap();
        assert_eq!(users.get(user["sk"].clone()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_should_scan_every_model() {
        let db = memory_db("scan");
        db.admin().create_table().await.unwrap();
        let users = db.model("user").unwrap();
        let posts = db.model("post").unwrap();

        users
            .create(&Params::new().with("username", "a").with("name", "b"))
            .await
            .unwrap();
        posts.create(&post_params("u1", "x")).await.unwrap();

        assert_eq!(posts.all().await.unwrap().count, 2);
        assert_eq!(users.all().await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_should_fail_against_missing_table() {
        let db = memory_db("no-table");
        let users = db.model("user").unwrap();
        let err = users
            .create(&Params::new().with("username", "a").with("name", "b"))
            .await
            .unwrap_err();
        assert!(err.is_resource_not_found());
    }
}
