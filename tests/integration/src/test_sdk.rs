//! End-to-end tests against a DynamoDB-compatible endpoint.

#[cfg(test)]
mod tests {
    use dynaschema_core::{KeyCondition, KeyQuery, Params};
    use dynaschema_model::AttributeValue;

    use crate::sdk_db;

    #[tokio::test]
    #[ignore = "requires a DynamoDB-compatible endpoint"]
    async fn test_should_run_user_and_post_flow() {
        let db = sdk_db("flow");
        let admin = db.admin();
        admin.delete_table_if_exists().await.unwrap();
        admin.create_table().await.unwrap();

        let users = db.model("user").unwrap();
        let posts = db.model("post").unwrap();

        let user = users
            .create(&Params::new().with("username", "nicole").with("name", "Nicole"))
            .await
            .unwrap();
        let user_id = user["userID"].as_s().unwrap().to_owned();

        let batch: Vec<Params> = (0..10)
            .map(|i| {
                Params::new()
                    .with("userID", user_id.as_str())
                    .with("content", format!("post {i}"))
                    .with("createdAt", chrono::Utc::now().to_rfc3339())
            })
            .collect();
        let created = posts.create_many(&batch).await.unwrap();
        assert_eq!(created.len(), 10);

        let sk = created[0]["sk"].clone();
        assert_eq!(posts.get(sk.clone()).await.unwrap(), Some(created[0].clone()));

        posts.delete(sk.clone()).await.unwrap();
        assert_eq!(posts.get(sk).await.unwrap(), None);

        let by_user = db
            .query(
                &KeyQuery::new(user_id.as_str())
                    .partition_key("userID", user_id.as_str())
                    .sort_key("pk", KeyCondition::new().eq("post:"))
                    .index("userID"),
            )
            .await
            .unwrap();
        assert_eq!(by_user.count, 9);
        assert!(
            by_user
                .items
                .iter()
                .all(|i| i["pk"] == AttributeValue::from("post:"))
        );

        admin.delete_table().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a DynamoDB-compatible endpoint"]
    async fn test_should_tolerate_missing_table_on_delete() {
        let db = sdk_db("missing");
        assert!(!db.admin().delete_table_if_exists().await.unwrap());
    }
}
