//! Key-condition queries against the in-memory store.

#[cfg(test)]
mod tests {
    use dynaschema_core::condition::compile_query;
    use dynaschema_core::{DynaSchema, KeyCondition, KeyQuery, Params};
    use dynaschema_model::AttributeValue;
    use dynaschema_store::MemoryStore;

    use crate::memory_db;

    async fn seeded(prefix: &str) -> DynaSchema<MemoryStore> {
        let db = memory_db(prefix);
        db.admin().create_table().await.unwrap();
        let posts = db.model("post").unwrap();
        for (sk, user, day) in [
            ("abc1", "u1", "01"),
            ("abc2", "u1", "02"),
            ("abd1", "u2", "03"),
            ("xyz9", "u1", "04"),
        ] {
            posts
                .update(
                    sk,
                    &Params::new()
                        .with("userID", user)
                        .with("content", sk)
                        .with("createdAt", format!("2024-03-{day}T00:00:00Z")),
                    dynaschema_core::UpdateOptions::upsert(),
                )
                .await
                .unwrap();
        }
        db
    }

    fn sort_keys(items: &[dynaschema_model::Item]) -> Vec<&str> {
        items
            .iter()
            .filter_map(|i| i.get("sk").and_then(AttributeValue::as_s))
            .collect()
    }

    #[test]
    fn test_should_compile_begins_with_query() {
        let input = compile_query(
            "test-table",
            &KeyQuery::new("post:").sort_key("sk", KeyCondition::new().begins_with("abc")),
        )
        .unwrap();
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("pk = :pk and begins_with(sk, :beginsWith)")
        );
        assert_eq!(
            input.expression_attribute_values[":pk"],
            AttributeValue::from("post:")
        );
        assert_eq!(
            input.expression_attribute_values[":beginsWith"],
            AttributeValue::from("abc")
        );
    }

    #[tokio::test]
    async fn test_should_query_model_by_prefix() {
        let db = seeded("prefix").await;
        let posts = db.model("post").unwrap();

        let output = posts
            .query(KeyCondition::new().begins_with("abc"))
            .await
            .unwrap();
        assert_eq!(sort_keys(&output.items), vec!["abc1", "abc2"]);
    }

    #[tokio::test]
    async fn test_should_query_whole_partition_without_condition() {
        let db = seeded("partition").await;
        let posts = db.model("post").unwrap();

        let output = posts.query(KeyCondition::new()).await.unwrap();
        assert_eq!(output.count, 4);
    }

    #[tokio::test]
    async fn test_should_query_range_in_descending_order() {
        let db = seeded("range").await;
        let output = db
            .query(
                &KeyQuery::new("post:")
                    .sort_key("sk", KeyCondition::new().between("abc1", "abd1"))
                    .descending(),
            )
            .await
            .unwrap();
        assert_eq!(sort_keys(&output.items), vec!["abd1", "abc2", "abc1"]);
    }

    #[tokio::test]
    async fn test_should_query_global_index() {
        let db = seeded("gsi").await;
        let output = db
            .query(
                &KeyQuery::new("u1")
                    .partition_key("userID", "u1")
                    .sort_key("pk", KeyCondition::new().eq("post:"))
                    .index("userID"),
            )
            .await
            .unwrap();
        assert_eq!(output.count, 3);
    }

    #[tokio::test]
    async fn test_should_query_local_index() {
        let db = seeded("lsi").await;
        let output = db
            .query(
                &KeyQuery::new("post:")
                    .sort_key(
                        "createdAt",
                        KeyCondition::new().ge("2024-03-03T00:00:00Z"),
                    )
                    .index("createdAt"),
            )
            .await
            .unwrap();
        assert_eq!(sort_keys(&output.items), vec!["abd1", "xyz9"]);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_index() {
        let db = seeded("unknown-index").await;
        let result = db
            .query(&KeyQuery::new("post:").index("missing"))
            .await;
        assert!(result.is_err());
    }
}
