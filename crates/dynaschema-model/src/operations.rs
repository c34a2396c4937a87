//! Store operation enum.

use std::fmt;

/// All store operations this workspace issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamoDBOperation {
    // Table management
    /// Create a new table.
    CreateTable,
    /// Delete a table.
    DeleteTable,

    // Item CRUD
    /// Put (insert or replace) an item.
    PutItem,
    /// Get an item by primary key.
    GetItem,
    /// Delete an item by primary key.
    DeleteItem,

    // Query & Scan
    /// Query items by key condition.
    Query,
    /// Scan all items in a table.
    Scan,

    // Batch operations
    /// Batch write (put/delete) items.
    BatchWriteItem,
}

impl DynamoDBOperation {
    /// Returns the operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "CreateTable",
            Self::DeleteTable => "DeleteTable",
            Self::PutItem => "PutItem",
            Self::GetItem => "GetItem",
            Self::DeleteItem => "DeleteItem",
            Self::Query => "Query",
            Self::Scan => "Scan",
            Self::BatchWriteItem => "BatchWriteItem",
        }
    }
}

impl fmt::Display for DynamoDBOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
