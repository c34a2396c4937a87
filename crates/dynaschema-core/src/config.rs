//! Table configuration.

use std::env;

use dynaschema_model::types::ProvisionedThroughput;

/// Settings for the single table every model lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Table name.
    pub table_name: String,
    /// Capacity for the table and for each of its global indexes.
    pub provisioned_throughput: ProvisionedThroughput,
}

impl TableConfig {
    /// Configuration for `table_name` with 10 read and 10 write units.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            provisioned_throughput: ProvisionedThroughput::default(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `DYNASCHEMA_TABLE_NAME`, `DYNASCHEMA_READ_CAPACITY` and
    /// `DYNASCHEMA_WRITE_CAPACITY`, falling back to `default_table` and the
    /// default capacity.
    #[must_use]
    pub fn from_env(default_table: &str) -> Self {
        let defaults = ProvisionedThroughput::default();
        Self {
            table_name: env::var("DYNASCHEMA_TABLE_NAME")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default_table.to_owned()),
            provisioned_throughput: ProvisionedThroughput {
                read_capacity_units: env_i64(
                    "DYNASCHEMA_READ_CAPACITY",
                    defaults.read_capacity_units,
                ),
                write_capacity_units: env_i64(
                    "DYNASCHEMA_WRITE_CAPACITY",
                    defaults.write_capacity_units,
                ),
            },
        }
    }

    /// Override the provisioned capacity.
    #[must_use]
    pub fn with_throughput(mut self, read_capacity_units: i64, write_capacity_units: i64) -> Self {
        self.provisioned_throughput = ProvisionedThroughput {
            read_capacity_units,
            write_capacity_units,
        };
        self
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_default_to_ten_units() {
        let config = TableConfig::new("test-table");
        assert_eq!(config.provisioned_throughput.read_capacity_units, 10);
        assert_eq!(config.provisioned_throughput.write_capacity_units, 10);
    }

    #[test]
    fn test_should_override_throughput() {
        let config = TableConfig::new("t").with_throughput(5, 1);
        assert_eq!(
            config.provisioned_throughput,
            ProvisionedThroughput {
                read_capacity_units: 5,
                write_capacity_units: 1,
            }
        );
    }
}
