//! Table administration tests against the in-memory store.

#[cfg(test)]
mod tests {
    use dynaschema_model::AttributeType;

    use crate::memory_db;

    #[tokio::test]
    async fn test_should_create_table_after_deleting_missing_one() {
        let db = memory_db("recreate");
        let admin = db.admin();

        assert!(!admin.delete_table_if_exists().await.unwrap());
        admin.create_table().await.unwrap();
        assert!(admin.delete_table_if_exists().await.unwrap());
        admin.create_table().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_describe_created_indexes() {
        let db = memory_db("describe");
        let output = db.admin().create_table().await.unwrap();
        let description = output.table_description.unwrap();

        let gsi_names: Vec<&str> = description
            .global_secondary_indexes
            .iter()
            .map(|g| g.index_name.as_str())
            .collect();
        assert_eq!(gsi_names, vec!["userID"]);
        assert_eq!(description.local_secondary_indexes.len(), 1);

        let created_at = description
            .attribute_definitions
            .iter()
            .find(|d| d.attribute_name == "createdAt")
            .unwrap();
        assert_eq!(created_at.attribute_type, AttributeType::S);
    }

    #[tokio::test]
    async fn test_should_refuse_to_create_table_twice() {
        let db = memory_db("twice");
        db.admin().create_table().await.unwrap();
        assert!(db.admin().create_table().await.is_err());
    }
}
