/// Switches for the rewrite passes.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Turn products guarded by equality predicates into inner joins.
    pub join_optimization: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            join_optimization: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: OptimizerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.join_optimization);
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"join_optimization": false}"#).unwrap();
        assert!(!config.join_optimization);
    }
}
